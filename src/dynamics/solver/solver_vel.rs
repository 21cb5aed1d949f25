use crate::math::{AngVector, Vector};
use num::Zero;

/// The six-dimensional velocity block of one body, split into its linear and
/// angular parts.
///
/// The solver uses it both for the per-body constraint impulse accumulator
/// and for the external-velocity scratch folded into the right-hand side.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) struct SolverVel {
    /// The linear part.
    pub linear: Vector,
    /// The angular part.
    pub angular: AngVector,
}

impl SolverVel {
    pub fn zero() -> Self {
        Self {
            linear: Vector::zero(),
            angular: AngVector::zero(),
        }
    }
}
