use crate::math::{AngVector, AngularInertia, Matrix, Real};
use crate::utils;

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
/// The mass and body-frame inertia of a rigid-body.
pub struct MassProperties {
    /// The inverse of the mass of the rigid-body.
    pub inv_mass: Real,
    /// The inertia tensor of the rigid-body, expressed in its local frame.
    pub inertia: AngularInertia,
    /// The inverse of the inertia tensor, expressed in the local frame.
    pub inv_inertia: AngularInertia,
}

impl MassProperties {
    /// Initializes the mass properties from a mass and the principal angular
    /// inertia along the local coordinate axes.
    pub fn new(mass: Real, principal_inertia: AngVector) -> Self {
        Self {
            inv_mass: utils::inv(mass),
            inertia: Matrix::from_diagonal(&principal_inertia),
            inv_inertia: Matrix::from_diagonal(&principal_inertia.map(utils::inv)),
        }
    }

    /// Initializes the mass properties from a mass and a full inertia tensor.
    ///
    /// Returns `None` if the tensor is not invertible.
    pub fn from_inertia_tensor(mass: Real, inertia: AngularInertia) -> Option<Self> {
        let inv_inertia = inertia.try_inverse()?;
        Some(Self {
            inv_mass: utils::inv(mass),
            inertia,
            inv_inertia,
        })
    }

    /// The mass of the rigid-body, or zero if it is infinite.
    pub fn mass(&self) -> Real {
        utils::inv(self.inv_mass)
    }

    /// The inertia tensor conjugated into the world frame: `R · I · Rᵀ`.
    pub fn world_inertia(&self, rot: &Matrix) -> AngularInertia {
        rot * self.inertia * rot.transpose()
    }

    /// The inverse inertia tensor conjugated into the world frame: `R · I⁻¹ · Rᵀ`.
    pub fn world_inv_inertia(&self, rot: &Matrix) -> AngularInertia {
        rot * self.inv_inertia * rot.transpose()
    }
}

impl Default for MassProperties {
    fn default() -> Self {
        Self::new(1.0, AngVector::repeat(1.0))
    }
}
