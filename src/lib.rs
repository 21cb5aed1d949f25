//! # Quickstep3d
//!
//! Quickstep3d is the core of a 3-dimensional rigid-body dynamics stepper: it
//! advances a set of rigid bodies by one time step subject to equality and
//! inequality constraints expressed in Jacobian form.
//!
//! Constraint rows are gathered from caller-owned joints through a narrow
//! query interface, packed into a mixed Linear Complementarity Problem, and
//! solved iteratively with a projected Successive Over-Relaxation scheme. The
//! resulting impulses are folded into the body velocities before position
//! integration is delegated back to the caller.
//!
//! Collision detection, concrete joint definitions and pose integration are
//! deliberately not part of this crate; only their interface contracts are.

#![deny(bare_trait_objects)]
#![warn(missing_docs)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::module_inception)]

pub extern crate nalgebra as na;
#[cfg(feature = "serde-serialize")]
#[macro_use]
extern crate serde;
extern crate num_traits as num;

#[cfg(all(feature = "f32", feature = "f64"))]
std::compile_error!("The `f32` and `f64` features cannot both be enabled.");
#[cfg(not(any(feature = "f32", feature = "f64")))]
std::compile_error!("Either the `f32` or the `f64` feature must be enabled.");

/// The string version of quickstep3d.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod dynamics;
pub mod error_handler;
pub mod utils;

/// Elementary mathematical entities (vectors, matrices, isometries, etc).
pub mod math {
    /// The scalar type used throughout the crate.
    #[cfg(feature = "f32")]
    pub type Real = f32;
    /// The scalar type used throughout the crate.
    #[cfg(feature = "f64")]
    pub type Real = f64;

    /// The dimension of the simulated space.
    pub const DIM: usize = 3;
    /// The number of rotational degrees of freedom of a rigid-body.
    pub const ANG_DIM: usize = 3;
    /// The maximum number of possible translations and rotations of a rigid-body.
    pub const SPATIAL_DIM: usize = 6;

    /// The point type.
    pub type Point = na::Point3<Real>;
    /// The vector type.
    pub type Vector = na::Vector3<Real>;
    /// The angular vector type: a scaled rotation axis.
    pub type AngVector = na::Vector3<Real>;
    /// The orientation type.
    pub type Rotation = na::UnitQuaternion<Real>;
    /// The translation type.
    pub type Translation = na::Translation3<Real>;
    /// The transformation type.
    pub type Isometry = na::Isometry3<Real>;
    /// The 3×3 matrix type.
    pub type Matrix = na::Matrix3<Real>;
    /// The angular inertia tensor type.
    pub type AngularInertia = na::Matrix3<Real>;
}

/// Prelude containing the common types defined by quickstep3d.
pub mod prelude {
    pub use crate::dynamics::*;
    pub use crate::math::*;
    pub use na::{point, vector};
    pub extern crate nalgebra;
}
