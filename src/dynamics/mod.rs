//! Structures related to dynamics: bodies, joints, parameters and the stepper.

pub use self::integration_parameters::{IntegrationParameters, RowOrdering};
pub use self::joint::*;
pub use self::mass_properties::MassProperties;
pub use self::rigid_body::{RigidBody, RigidBodyBuilder, RigidBodyFlags};
pub use self::solver::{PoseIntegrator, quickstep};

mod integration_parameters;
mod joint;
mod mass_properties;
mod rigid_body;
mod solver;
