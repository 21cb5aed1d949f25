use super::solver_constraints::SolverConstraints;
use super::sor_lcp;
use crate::dynamics::joint::Joint;
use crate::dynamics::{IntegrationParameters, RigidBody};
use crate::error_handler::{Error, default_error_handler};
use crate::math::{AngularInertia, Real, Vector};

/// Advances a rigid-body's position and orientation from its velocities.
///
/// Pose integration is external to the stepper: after the constraint solve
/// has produced the new velocities, each body is handed to this integrator
/// exactly once per step.
pub trait PoseIntegrator {
    /// Advances `body`'s position and orientation over a timestep of length `dt`.
    fn integrate(&mut self, body: &mut RigidBody, dt: Real);
}

impl<F: FnMut(&mut RigidBody, Real)> PoseIntegrator for F {
    fn integrate(&mut self, body: &mut RigidBody, dt: Real) {
        self(body, dt)
    }
}

/// Advances `bodies` by one timestep of length `dt`, subject to the
/// constraints of `joints`.
///
/// `bodies` and `joints` form one island: a connected set solved as a whole.
/// Joints refer to bodies by their index in `bodies`.
///
/// This mutates the body velocities, delegates position integration to
/// `pose_integrator`, and clears every body's force and torque accumulators.
/// Joints are left unchanged except through their own query callbacks. The
/// call is synchronous and single-threaded; all solver scratch lives for
/// exactly this call.
///
/// # Panics
///
/// Panics if `dt` is not positive, or if a joint reports more than six rows,
/// more unbounded rows than rows, or a friction index that does not refer to
/// an earlier row of the same joint.
pub fn quickstep(
    gravity: &Vector,
    params: &IntegrationParameters,
    bodies: &mut [RigidBody],
    joints: &mut [&mut dyn Joint],
    dt: Real,
    mut pose_integrator: impl PoseIntegrator,
) {
    assert!(dt > 0.0, "The timestep length must be positive.");

    let world_inv_inertia = prepare_bodies(gravity, bodies);

    if !joints.is_empty() {
        let mut constraints =
            SolverConstraints::assemble(params, bodies, &world_inv_inertia, joints, dt);

        if !constraints.rows.is_empty() {
            let solution = sor_lcp::solve(params, &mut constraints, bodies, &world_inv_inertia);

            // fc is inv(M)·Jᵀ·lambda: scaled by the timestep it becomes the
            // velocity change produced by the constraint forces.
            for (rb, fc) in bodies.iter_mut().zip(&solution.fc) {
                rb.linvel += fc.linear * dt;
                rb.angvel += fc.angular * dt;
            }
        }
    }

    // Fold in the external impulses, advance the poses, clear the
    // accumulators.
    for (rb, inv_inertia) in bodies.iter_mut().zip(&world_inv_inertia) {
        rb.linvel += rb.force * (rb.local_mprops.inv_mass * dt);
        rb.angvel += inv_inertia * (rb.torque * dt);
        pose_integrator.integrate(rb, dt);
        rb.reset_forces();
    }
}

/// Computes the world-frame inverse inertia of every body, accumulates the
/// gyroscopic torque, and applies gravity to bodies that accept it.
fn prepare_bodies(gravity: &Vector, bodies: &mut [RigidBody]) -> Vec<AngularInertia> {
    bodies
        .iter_mut()
        .enumerate()
        .map(|(i, rb)| {
            let rot = rb.rotation_matrix();
            let inertia = rb.local_mprops.world_inertia(&rot);
            let inv_inertia = rb.local_mprops.world_inv_inertia(&rot);

            if na::linalg::Cholesky::new(inertia).is_none() {
                default_error_handler()(Error::DegenerateInertiaTensor(format!(
                    "body {}: world-frame inertia tensor is not positive-definite",
                    i
                )));
            }

            rb.torque -= rb.angvel.cross(&(inertia * rb.angvel));
            if rb.is_gravity_enabled() {
                rb.force += gravity * rb.mass();
            }

            inv_inertia
        })
        .collect()
}
