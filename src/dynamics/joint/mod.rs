//! The constraint query interface between joints and the solver.

pub use self::joint::{ConstraintCounts, ConstraintRow, Joint, JointConstraintBlock};

mod joint;
