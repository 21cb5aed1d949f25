use crate::math::{AngVector, Real, Vector};

/// The sizes a joint reports before its constraint rows are gathered.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct ConstraintCounts {
    /// The number of constraint rows this joint will emit, in `0..=6`.
    ///
    /// A joint reporting zero rows is inactive and skipped for the step.
    pub num_rows: usize,
    /// The number of leading rows unaffected by bounds, `<= num_rows`.
    pub num_unbounded: usize,
}

/// One row of the packed constraint system.
///
/// The Jacobian of a row maps the twists of up to two bodies to a scalar
/// constraint-velocity error; it is stored split per body and per
/// linear/angular part. The second body's blocks are ignored for rows
/// attached to a single body.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct ConstraintRow {
    /// The linear part of the Jacobian for the first body.
    pub lin_jac1: Vector,
    /// The angular part of the Jacobian for the first body.
    pub ang_jac1: AngVector,
    /// The linear part of the Jacobian for the second body.
    pub lin_jac2: Vector,
    /// The angular part of the Jacobian for the second body.
    pub ang_jac2: AngVector,
    /// The right-hand side of the row.
    ///
    /// Joints write the constraint-velocity target here (positional error
    /// correction included); assembly then folds the current velocities and
    /// external forces in to form the full right-hand side.
    pub rhs: Real,
    /// The Constraint Force Mixing value of this row.
    ///
    /// Pre-filled with the global default; joints may overwrite it.
    pub cfm: Real,
    /// The lower bound on this row's multiplier.
    pub lo: Real,
    /// The upper bound on this row's multiplier.
    pub hi: Real,
    /// Couples this row's bounds to another row's multiplier.
    ///
    /// When set, the bounds become `±|hi_assembled · lambda[findex]|`,
    /// re-derived at every iteration. Joints write the index of one of their
    /// own earlier rows; assembly rebases it onto the whole system.
    pub findex: Option<usize>,
}

impl Default for ConstraintRow {
    fn default() -> Self {
        Self {
            lin_jac1: Vector::zeros(),
            ang_jac1: na::zero(),
            lin_jac2: Vector::zeros(),
            ang_jac2: na::zero(),
            rhs: 0.0,
            cfm: 0.0,
            lo: -Real::INFINITY,
            hi: Real::INFINITY,
            findex: None,
        }
    }
}

/// The output block handed to a joint when its constraint rows are gathered.
pub struct JointConstraintBlock<'a> {
    /// The rows reserved for this joint in the packed system, zeroed except
    /// for their default bounds and CFM.
    pub rows: &'a mut [ConstraintRow],
    /// The inverse of the timestep length (the frame rate).
    pub inv_dt: Real,
    /// The Error Reduction Parameter captured for this step.
    pub erp: Real,
}

/// The capability set the stepper requires of a joint.
///
/// Concrete joint kinds (hinges, sliders, contacts, …) are defined, owned and
/// dispatched by the caller; the stepper only consumes their constraint rows
/// through this trait.
pub trait Joint {
    /// First query: how many rows this joint contributes this step.
    fn constraint_counts(&self) -> ConstraintCounts;

    /// The indices of the attached bodies into the stepped body slice.
    ///
    /// The second index is `None` for joints anchoring a body to the world.
    fn body_pair(&self) -> (usize, Option<usize>);

    /// Second query: fill in the Jacobian rows, right-hand side, CFM, bounds
    /// and friction indices.
    ///
    /// Friction indices are joint-local: they refer to one of this joint's
    /// own rows, and must point at a strictly earlier row.
    fn write_constraints(&mut self, block: &mut JointConstraintBlock<'_>);
}
