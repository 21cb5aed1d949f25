use super::SolverVel;
use crate::dynamics::joint::{ConstraintRow, Joint, JointConstraintBlock};
use crate::dynamics::{IntegrationParameters, RigidBody};
use crate::math::{AngularInertia, Real};

/// The packed constraint system assembled for one step.
///
/// `rows` and `body_pairs` are parallel, one entry per constraint row, laid
/// out joint by joint in registration order. Both live for exactly one step.
pub(crate) struct SolverConstraints {
    /// The constraint rows, with globalized friction indices and the full
    /// right-hand side folded in.
    pub rows: Vec<ConstraintRow>,
    /// The bodies each row applies to: indices into the stepped slice, the
    /// second entry `None` when the row attaches to a single body.
    pub body_pairs: Vec<(usize, Option<usize>)>,
}

impl SolverConstraints {
    /// Queries every joint and packs the surviving constraint rows.
    ///
    /// Joints reporting zero rows are dropped, preserving order. On return,
    /// `rows[i].rhs` is the complete right-hand side
    /// `c/dt − J·(v/dt + M⁻¹·f_ext)` and every `cfm` has been scaled by the
    /// frame rate.
    pub fn assemble(
        params: &IntegrationParameters,
        bodies: &[RigidBody],
        world_inv_inertia: &[AngularInertia],
        joints: &mut [&mut dyn Joint],
        dt: Real,
    ) -> Self {
        let inv_dt = 1.0 / dt;

        // First query: row counts. Each active joint keeps the offset of its
        // row range in the packed system.
        let mut active = Vec::with_capacity(joints.len());
        let mut num_rows = 0;
        for (joint_id, joint) in joints.iter().enumerate() {
            let counts = joint.constraint_counts();
            assert!(
                counts.num_rows <= 6 && counts.num_unbounded <= counts.num_rows,
                "joint {} reported malformed constraint counts",
                joint_id
            );
            if counts.num_rows > 0 {
                active.push((joint_id, num_rows, counts.num_rows));
                num_rows += counts.num_rows;
            }
        }

        let mut rows = vec![
            ConstraintRow {
                cfm: params.cfm,
                ..Default::default()
            };
            num_rows
        ];
        let mut body_pairs = Vec::with_capacity(num_rows);

        // Second query: Jacobian blocks, right-hand-side targets, bounds and
        // friction indices. Friction indices come back joint-local and are
        // rebased onto the packed row numbering.
        for &(joint_id, offset, len) in &active {
            let mut block = JointConstraintBlock {
                rows: &mut rows[offset..offset + len],
                inv_dt,
                erp: params.erp,
            };
            joints[joint_id].write_constraints(&mut block);

            for j in 0..len {
                let row = &mut rows[offset + j];
                match row.findex {
                    Some(local) => {
                        assert!(
                            local < j,
                            "joint {} wrote a friction index that does not refer to an earlier row",
                            joint_id
                        );
                        row.findex = Some(local + offset);
                    }
                    None => debug_assert!(row.lo <= row.hi),
                }
            }

            let pair = joints[joint_id].body_pair();
            debug_assert!(pair.0 < bodies.len());
            debug_assert!(pair.1.map_or(true, |b2| b2 < bodies.len()));
            body_pairs.resize(body_pairs.len() + len, pair);
        }

        // The velocity each body would reach from its external forces alone,
        // expressed per unit time: v/dt + M⁻¹·f_ext.
        let ext_vels: Vec<SolverVel> = bodies
            .iter()
            .zip(world_inv_inertia)
            .map(|(rb, inv_inertia)| SolverVel {
                linear: rb.force * rb.local_mprops.inv_mass + rb.linvel * inv_dt,
                angular: inv_inertia * rb.torque + rb.angvel * inv_dt,
            })
            .collect();

        for (row, &(b1, b2)) in rows.iter_mut().zip(&body_pairs) {
            let mut projected =
                row.lin_jac1.dot(&ext_vels[b1].linear) + row.ang_jac1.dot(&ext_vels[b1].angular);
            if let Some(b2) = b2 {
                projected +=
                    row.lin_jac2.dot(&ext_vels[b2].linear) + row.ang_jac2.dot(&ext_vels[b2].angular);
            }
            row.rhs = row.rhs * inv_dt - projected;
            row.cfm *= inv_dt;
        }

        Self { rows, body_pairs }
    }

    /// The total number of packed constraint rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }
}
