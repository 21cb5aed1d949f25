use crate::math::Real;

/// The strategy used to order constraint rows inside each relaxation sweep.
///
/// Whatever the strategy, rows whose bounds are coupled to another row's
/// multiplier are always visited after every uncoupled row, so the multiplier
/// they depend on is up to date within the same sweep.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum RowOrdering {
    /// Visit rows in the order the joints emitted them, every iteration.
    Fixed,
    /// From the third iteration onward, sort rows so that the ones whose
    /// multipliers moved the most during the previous sweep are visited last.
    ///
    /// The per-iteration sort is not free and the optimal order is problem
    /// dependent; the fixed order is quite often the best way to go,
    /// especially for low CFM.
    Adaptive,
}

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
/// Parameters for the constraint solver, captured immutably for the duration
/// of one step.
pub struct IntegrationParameters {
    /// The Error Reduction Parameter: the proportion of positional error
    /// corrected at each timestep, in `[0, 1]` (default: `0.2`).
    ///
    /// Joints read this value when they build the right-hand side of their
    /// constraint rows.
    pub erp: Real,
    /// The default Constraint Force Mixing value, a non-negative diagonal
    /// regularizer that softens otherwise hard constraints (default:
    /// `1.0e-5` in single precision, `1.0e-10` in double precision).
    ///
    /// Individual rows may override it.
    pub cfm: Real,
    /// The number of relaxation sweeps performed by the solver (default: `20`).
    ///
    /// There is no convergence test and no early exit: the iteration count is
    /// the sole cost knob, and cost stays predictable.
    pub num_iterations: usize,
    /// The over-relaxation factor, in `(0, 2)` (default: `1.3`).
    ///
    /// `1.0` is plain Gauss–Seidel; larger values accelerate convergence on
    /// well-conditioned systems and risk oscillation on stiff ones.
    pub sor_w: Real,
    /// Re-derive the bounds of friction-coupled rows from their governing
    /// row's current multiplier at every iteration (default: `true`).
    ///
    /// Disabling this freezes friction bounds at their assembled values for
    /// the whole step, the way a one-shot LCP solver would.
    pub recouple_friction_limits: bool,
    /// The strategy used to order constraint rows inside each sweep
    /// (default: [`RowOrdering::Fixed`]).
    pub row_ordering: RowOrdering,
}

impl Default for IntegrationParameters {
    fn default() -> Self {
        Self {
            erp: 0.2,
            #[cfg(feature = "f32")]
            cfm: 1.0e-5,
            #[cfg(feature = "f64")]
            cfm: 1.0e-10,
            num_iterations: 20,
            sor_w: 1.3,
            recouple_friction_limits: true,
            row_ordering: RowOrdering::Fixed,
        }
    }
}
