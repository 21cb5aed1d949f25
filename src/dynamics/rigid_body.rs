use crate::dynamics::MassProperties;
use crate::math::{AngVector, Isometry, Matrix, Real, Rotation, Vector};

bitflags::bitflags! {
    #[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
    /// Flags affecting how external forces are applied to a rigid-body.
    pub struct RigidBodyFlags: u8 {
        /// Gravity is not applied to this rigid-body.
        const IGNORE_GRAVITY = 1 << 0;
    }
}

impl Default for RigidBodyFlags {
    fn default() -> Self {
        RigidBodyFlags::empty()
    }
}

#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
/// A rigid body.
///
/// To create a new rigid-body, use the `RigidBodyBuilder` structure.
///
/// Rigid-bodies are owned by the caller and handed to the stepper as a
/// contiguous slice; joints refer to them by their index in that slice.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBody {
    /// The world-space position of the rigid-body.
    pub position: Isometry,
    /// The local mass properties of the rigid-body.
    pub local_mprops: MassProperties,
    /// The linear velocity of the rigid-body.
    pub linvel: Vector,
    /// The angular velocity of the rigid-body.
    pub angvel: AngVector,
    /// The force accumulator, applied at the next timestep and then cleared.
    pub force: Vector,
    /// The torque accumulator, applied at the next timestep and then cleared.
    pub torque: AngVector,
    /// Flags affecting how external forces are applied to this rigid-body.
    pub flags: RigidBodyFlags,
}

impl RigidBody {
    fn new() -> Self {
        Self {
            position: Isometry::identity(),
            local_mprops: MassProperties::default(),
            linvel: Vector::zeros(),
            angvel: na::zero(),
            force: Vector::zeros(),
            torque: na::zero(),
            flags: RigidBodyFlags::empty(),
        }
    }

    /// The mass of this rigid body, or zero if it is infinite.
    pub fn mass(&self) -> Real {
        self.local_mprops.mass()
    }

    /// The world-space orientation of this rigid-body as a rotation matrix.
    pub fn rotation_matrix(&self) -> Matrix {
        self.position.rotation.to_rotation_matrix().into_inner()
    }

    /// Adds a force to the force accumulator, expressed in world space.
    pub fn add_force(&mut self, force: Vector) {
        self.force += force;
    }

    /// Adds a torque to the torque accumulator, expressed in world space.
    pub fn add_torque(&mut self, torque: AngVector) {
        self.torque += torque;
    }

    /// Clears the force and torque accumulators.
    ///
    /// The stepper does this automatically at the end of each step.
    pub fn reset_forces(&mut self) {
        self.force = Vector::zeros();
        self.torque = na::zero();
    }

    /// Is gravity applied to this rigid-body?
    pub fn is_gravity_enabled(&self) -> bool {
        !self.flags.contains(RigidBodyFlags::IGNORE_GRAVITY)
    }
}

/// A builder for rigid-bodies.
#[derive(Clone, Debug, PartialEq)]
#[must_use = "Builder functions return the updated builder"]
pub struct RigidBodyBuilder {
    position: Isometry,
    mprops: MassProperties,
    linvel: Vector,
    angvel: AngVector,
    flags: RigidBodyFlags,
}

impl RigidBodyBuilder {
    /// Initializes the builder of a new rigid body.
    pub fn new() -> Self {
        Self {
            position: Isometry::identity(),
            mprops: MassProperties::default(),
            linvel: Vector::zeros(),
            angvel: na::zero(),
            flags: RigidBodyFlags::empty(),
        }
    }

    /// Sets the initial translation of the rigid-body to be created.
    pub fn translation(mut self, x: Real, y: Real, z: Real) -> Self {
        self.position.translation.x = x;
        self.position.translation.y = y;
        self.position.translation.z = z;
        self
    }

    /// Sets the initial orientation of the rigid-body to be created.
    pub fn rotation(mut self, angle: AngVector) -> Self {
        self.position.rotation = Rotation::from_scaled_axis(angle);
        self
    }

    /// Sets the initial position (translation and orientation) of the rigid-body to be created.
    pub fn position(mut self, pos: Isometry) -> Self {
        self.position = pos;
        self
    }

    /// Sets the mass properties of the rigid-body being built.
    pub fn mass_properties(mut self, mprops: MassProperties) -> Self {
        self.mprops = mprops;
        self
    }

    /// Sets the mass and principal angular inertia of the rigid-body being built.
    pub fn mass(mut self, mass: Real, principal_inertia: AngVector) -> Self {
        self.mprops = MassProperties::new(mass, principal_inertia);
        self
    }

    /// Sets the initial linear velocity of the rigid-body to be created.
    pub fn linvel(mut self, x: Real, y: Real, z: Real) -> Self {
        self.linvel = Vector::new(x, y, z);
        self
    }

    /// Sets the initial angular velocity of the rigid-body to be created.
    pub fn angvel(mut self, angvel: AngVector) -> Self {
        self.angvel = angvel;
        self
    }

    /// Prevents gravity from being applied to the rigid-body to be created.
    pub fn ignore_gravity(mut self) -> Self {
        self.flags |= RigidBodyFlags::IGNORE_GRAVITY;
        self
    }

    /// Builds the rigid-body.
    pub fn build(&self) -> RigidBody {
        let mut rb = RigidBody::new();
        rb.position = self.position;
        rb.local_mprops = self.mprops;
        rb.linvel = self.linvel;
        rb.angvel = self.angvel;
        rb.flags = self.flags;
        rb
    }
}

impl Default for RigidBodyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::{RigidBodyBuilder, RigidBodyFlags};
    use crate::math::{AngVector, Vector};

    #[test]
    fn builder_roundtrip() {
        let rb = RigidBodyBuilder::new()
            .translation(1.0, 2.0, 3.0)
            .mass(2.0, AngVector::repeat(0.4))
            .linvel(0.5, 0.0, 0.0)
            .ignore_gravity()
            .build();
        assert_eq!(rb.position.translation.vector, Vector::new(1.0, 2.0, 3.0));
        assert_eq!(rb.local_mprops.inv_mass, 0.5);
        assert_eq!(rb.linvel.x, 0.5);
        assert!(rb.flags.contains(RigidBodyFlags::IGNORE_GRAVITY));
        assert!(!rb.is_gravity_enabled());
    }

    #[test]
    fn force_accumulators() {
        let mut rb = RigidBodyBuilder::new().build();
        rb.add_force(Vector::new(1.0, 0.0, 0.0));
        rb.add_force(Vector::new(1.0, 0.0, 0.0));
        rb.add_torque(AngVector::new(0.0, 3.0, 0.0));
        assert_eq!(rb.force.x, 2.0);
        assert_eq!(rb.torque.y, 3.0);
        rb.reset_forces();
        assert_eq!(rb.force, Vector::zeros());
        assert_eq!(rb.torque, AngVector::zeros());
    }
}
