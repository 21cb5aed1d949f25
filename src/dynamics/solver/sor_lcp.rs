use super::SolverVel;
use super::solver_constraints::SolverConstraints;
use crate::dynamics::{IntegrationParameters, RigidBody, RowOrdering};
use crate::error_handler::{Error, default_error_handler};
use crate::math::{AngVector, AngularInertia, Real, Vector};
use std::cmp::Ordering;

/// `inv(M)·Jᵀ` for one row, stored row-parallel to the Jacobian.
///
/// The second body's blocks are zero for rows attached to a single body and
/// never read.
#[derive(Copy, Clone, Debug)]
struct InvMassJac {
    lin1: Vector,
    ang1: AngVector,
    lin2: Vector,
    ang2: AngVector,
}

/// The result of one SOR-LCP solve.
pub(crate) struct SorLcpSolution {
    /// The constraint multipliers, one per row, within their bounds.
    pub lambda: Vec<Real>,
    /// `inv(M)·Jᵀ·lambda` per body. Scaling by the timestep length turns it
    /// into the velocity change produced by the constraint forces.
    pub fc: Vec<SolverVel>,
}

/// Iteratively relaxes the constraint multipliers of `constraints` subject to
/// their per-row box bounds.
///
/// The Jacobian, right-hand side and CFM of every row are rescaled in place
/// by the effective-diagonal factor `w / (A_dd + cfm)`; the relaxation sweep
/// itself then runs division-free. The iteration count is fixed: there is no
/// convergence test and no early exit.
pub(crate) fn solve(
    params: &IntegrationParameters,
    constraints: &mut SolverConstraints,
    bodies: &[RigidBody],
    world_inv_inertia: &[AngularInertia],
) -> SorLcpSolution {
    let num_rows = constraints.len();
    let mut lambda = vec![0.0; num_rows];
    let mut last_lambda = vec![0.0; num_rows];
    let mut fc = vec![SolverVel::zero(); bodies.len()];

    // Bounds of friction-coupled rows are re-derived from this snapshot of
    // the assembled upper bounds, which typically encodes the Coulomb
    // friction coefficient.
    let hi_snapshot: Vec<Real> = constraints.rows.iter().map(|row| row.hi).collect();

    let imj: Vec<InvMassJac> = constraints
        .rows
        .iter()
        .zip(&constraints.body_pairs)
        .map(|(row, &(b1, b2))| {
            let mut imj = InvMassJac {
                lin1: row.lin_jac1 * bodies[b1].local_mprops.inv_mass,
                ang1: world_inv_inertia[b1] * row.ang_jac1,
                lin2: na::zero(),
                ang2: na::zero(),
            };
            if let Some(b2) = b2 {
                imj.lin2 = row.lin_jac2 * bodies[b2].local_mprops.inv_mass;
                imj.ang2 = world_inv_inertia[b2] * row.ang_jac2;
            }
            imj
        })
        .collect();

    // Effective diagonal of the system matrix, and the in-place rescale that
    // moves the per-row division out of the sweep.
    for (i, row) in constraints.rows.iter_mut().enumerate() {
        let mut diag = imj[i].lin1.dot(&row.lin_jac1) + imj[i].ang1.dot(&row.ang_jac1);
        if constraints.body_pairs[i].1.is_some() {
            diag += imj[i].lin2.dot(&row.lin_jac2) + imj[i].ang2.dot(&row.ang_jac2);
        }
        let denom = diag + row.cfm;
        if !(denom > 0.0) {
            default_error_handler()(Error::ZeroPivot(format!(
                "constraint row {}: effective diagonal {} is not positive",
                i, denom
            )));
        }
        let scale = params.sor_w / denom;
        row.lin_jac1 *= scale;
        row.ang_jac1 *= scale;
        row.lin_jac2 *= scale;
        row.ang_jac2 *= scale;
        row.rhs *= scale;
        // From here on the row's CFM has absorbed the diagonal scale and the
        // over-relaxation factor; it implicitly damps the multiplier below.
        row.cfm *= scale;
    }

    let mut order = initial_order(constraints);

    for iteration in 0..params.num_iterations {
        if params.row_ordering == RowOrdering::Adaptive && iteration >= 2 {
            reorder_by_error(&mut order, constraints, &lambda, &last_lambda);
        }

        last_lambda.copy_from_slice(&lambda);

        for &index in &order {
            let (b1, b2) = constraints.body_pairs[index];

            // Friction-coupled rows track their governing row's current
            // multiplier. This is where the iterative method differs from a
            // direct LCP solve, which would adjust these bounds once per
            // step instead of once per iteration per row; the sweep order
            // guarantees the multiplier read here is already up to date.
            if let Some(governing) = constraints.rows[index].findex {
                if params.recouple_friction_limits {
                    let hi = (hi_snapshot[index] * lambda[governing]).abs();
                    constraints.rows[index].hi = hi;
                    constraints.rows[index].lo = -hi;
                }
            }

            let row = constraints.rows[index];
            let mut delta = row.rhs
                - lambda[index] * row.cfm
                - row.lin_jac1.dot(&fc[b1].linear)
                - row.ang_jac1.dot(&fc[b1].angular);
            if let Some(b2) = b2 {
                delta -=
                    row.lin_jac2.dot(&fc[b2].linear) + row.ang_jac2.dot(&fc[b2].angular);
            }

            // Clamp the updated multiplier to its bounds, adjusting `delta`
            // so it reflects the change actually applied.
            let new_lambda = lambda[index] + delta;
            if new_lambda < row.lo {
                delta = row.lo - lambda[index];
                lambda[index] = row.lo;
            } else if new_lambda > row.hi {
                delta = row.hi - lambda[index];
                lambda[index] = row.hi;
            } else {
                lambda[index] = new_lambda;
            }

            fc[b1].linear += imj[index].lin1 * delta;
            fc[b1].angular += imj[index].ang1 * delta;
            if let Some(b2) = b2 {
                fc[b2].linear += imj[index].lin2 * delta;
                fc[b2].angular += imj[index].ang2 * delta;
            }
        }
    }

    SorLcpSolution { lambda, fc }
}

/// The fixed sweep order: rows with uncoupled bounds first, in emission
/// order, then friction-coupled rows, in emission order.
fn initial_order(constraints: &SolverConstraints) -> Vec<usize> {
    let mut order = Vec::with_capacity(constraints.len());
    order.extend(
        (0..constraints.len()).filter(|&i| constraints.rows[i].findex.is_none()),
    );
    order.extend(
        (0..constraints.len()).filter(|&i| constraints.rows[i].findex.is_some()),
    );
    order
}

/// Re-sorts the sweep order so the rows whose multipliers moved the most in
/// the previous sweep are solved last, keeping every friction-coupled row
/// after every uncoupled one.
///
/// Rows whose current and previous multipliers are both zero sort as if
/// their error were infinite.
fn reorder_by_error(
    order: &mut [usize],
    constraints: &SolverConstraints,
    lambda: &[Real],
    last_lambda: &[Real],
) {
    let error = |i: usize| -> Real {
        if lambda[i].abs().max(last_lambda[i].abs()) > 0.0 {
            (lambda[i] - last_lambda[i]).abs()
        } else {
            Real::INFINITY
        }
    };

    order.sort_by(|&a, &b| {
        let coupled_a = constraints.rows[a].findex.is_some();
        let coupled_b = constraints.rows[b].findex.is_some();
        if coupled_a != coupled_b {
            return if coupled_a {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }
        error(a).partial_cmp(&error(b)).unwrap_or(Ordering::Equal)
    });
}

#[cfg(test)]
mod test {
    use super::super::solver_constraints::SolverConstraints;
    use super::{initial_order, reorder_by_error, solve};
    use crate::dynamics::joint::ConstraintRow;
    use crate::dynamics::{IntegrationParameters, RigidBodyBuilder, RowOrdering};
    use crate::math::{AngVector, AngularInertia, Real, Vector};
    use approx::assert_relative_eq;

    fn params(num_iterations: usize, sor_w: Real) -> IntegrationParameters {
        IntegrationParameters {
            cfm: 0.0,
            num_iterations,
            sor_w,
            ..Default::default()
        }
    }

    fn unit_bodies(n: usize) -> Vec<crate::dynamics::RigidBody> {
        (0..n)
            .map(|_| {
                RigidBodyBuilder::new()
                    .mass(1.0, AngVector::repeat(1.0))
                    .build()
            })
            .collect()
    }

    fn identity_inertia(n: usize) -> Vec<AngularInertia> {
        vec![AngularInertia::identity(); n]
    }

    fn row(lin_jac1: Vector, rhs: Real) -> ConstraintRow {
        ConstraintRow {
            lin_jac1,
            rhs,
            ..Default::default()
        }
    }

    #[test]
    fn unbounded_row_solves_in_closed_form() {
        // For a single row, lambda = rhs / (J·inv(M)·Jᵀ) after one plain
        // Gauss-Seidel iteration.
        let bodies = unit_bodies(1);
        let mut constraints = SolverConstraints {
            rows: vec![row(Vector::new(2.0, 0.0, 0.0), 3.0)],
            body_pairs: vec![(0, None)],
        };

        let solution = solve(
            &params(1, 1.0),
            &mut constraints,
            &bodies,
            &identity_inertia(1),
        );

        assert_relative_eq!(solution.lambda[0], 3.0 / 4.0, epsilon = 1.0e-6);
        assert_relative_eq!(
            solution.fc[0].linear,
            Vector::new(1.5, 0.0, 0.0),
            epsilon = 1.0e-6
        );
    }

    #[test]
    fn zero_iterations_leave_multipliers_zero() {
        let bodies = unit_bodies(1);
        let mut constraints = SolverConstraints {
            rows: vec![row(Vector::x(), 10.0)],
            body_pairs: vec![(0, None)],
        };

        let solution = solve(
            &params(0, 1.0),
            &mut constraints,
            &bodies,
            &identity_inertia(1),
        );

        assert_eq!(solution.lambda, vec![0.0]);
        assert_eq!(solution.fc[0].linear, Vector::zeros());
        assert_eq!(solution.fc[0].angular, AngVector::zeros());
    }

    #[test]
    fn multipliers_stay_within_bounds() {
        let bodies = unit_bodies(1);
        for num_iterations in 1..6 {
            let mut constraints = SolverConstraints {
                rows: vec![
                    // Wants a large negative multiplier, floored at zero.
                    ConstraintRow {
                        lin_jac1: Vector::x(),
                        rhs: -10.0,
                        lo: 0.0,
                        ..Default::default()
                    },
                    // Wants a large positive multiplier, capped at one.
                    ConstraintRow {
                        lin_jac1: Vector::y(),
                        rhs: 10.0,
                        lo: -1.0,
                        hi: 1.0,
                        ..Default::default()
                    },
                ],
                body_pairs: vec![(0, None); 2],
            };

            let solution = solve(
                &params(num_iterations, 1.0),
                &mut constraints,
                &bodies,
                &identity_inertia(1),
            );

            assert_eq!(solution.lambda[0], 0.0);
            assert_eq!(solution.lambda[1], 1.0);
        }
    }

    #[test]
    fn impulse_accumulator_tracks_multipliers() {
        // fc must equal inv(M)·Jᵀ·lambda for the unscaled Jacobian, whatever
        // the iterate.
        let bodies = unit_bodies(2);
        let rows = vec![
            ConstraintRow {
                lin_jac1: Vector::new(1.0, 0.5, 0.0),
                ang_jac1: AngVector::new(0.0, 0.0, 0.3),
                lin_jac2: Vector::new(-1.0, 0.0, 0.0),
                ang_jac2: AngVector::new(0.1, 0.0, 0.0),
                rhs: 2.0,
                ..Default::default()
            },
            ConstraintRow {
                lin_jac1: Vector::new(0.0, 1.0, 0.0),
                rhs: -1.0,
                ..Default::default()
            },
        ];
        let body_pairs = vec![(0, Some(1)), (1, None)];
        let unscaled = rows.clone();

        let mut constraints = SolverConstraints {
            rows,
            body_pairs: body_pairs.clone(),
        };
        let solution = solve(
            &params(7, 1.0),
            &mut constraints,
            &bodies,
            &identity_inertia(2),
        );

        let mut expected = vec![super::SolverVel::zero(); 2];
        for (i, row) in unscaled.iter().enumerate() {
            let (b1, b2) = body_pairs[i];
            expected[b1].linear += row.lin_jac1 * solution.lambda[i];
            expected[b1].angular += row.ang_jac1 * solution.lambda[i];
            if let Some(b2) = b2 {
                expected[b2].linear += row.lin_jac2 * solution.lambda[i];
                expected[b2].angular += row.ang_jac2 * solution.lambda[i];
            }
        }
        for (actual, expected) in solution.fc.iter().zip(&expected) {
            assert_relative_eq!(actual.linear, expected.linear, epsilon = 1.0e-5);
            assert_relative_eq!(actual.angular, expected.angular, epsilon = 1.0e-5);
        }
    }

    #[test]
    fn fixed_points_do_not_depend_on_relaxation_factor() {
        // Over-relaxation changes the trajectory of the iteration, not the
        // solution it converges to.
        let bodies = unit_bodies(2);
        let make_constraints = || SolverConstraints {
            rows: vec![ConstraintRow {
                lin_jac1: Vector::x(),
                lin_jac2: -Vector::x(),
                rhs: 5.0,
                ..Default::default()
            }],
            body_pairs: vec![(0, Some(1))],
        };

        let plain = solve(
            &params(50, 1.0),
            &mut make_constraints(),
            &bodies,
            &identity_inertia(2),
        );
        let over_relaxed = solve(
            &params(50, 1.5),
            &mut make_constraints(),
            &bodies,
            &identity_inertia(2),
        );

        assert_relative_eq!(plain.lambda[0], over_relaxed.lambda[0], epsilon = 1.0e-4);
    }

    #[test]
    fn friction_bounds_follow_the_governing_multiplier() {
        // A normal row building up a positive multiplier, and a friction row
        // whose assembled upper bound encodes the friction coefficient.
        let mu = 0.5;
        let bodies = unit_bodies(1);
        let mut constraints = SolverConstraints {
            rows: vec![
                ConstraintRow {
                    lin_jac1: Vector::y(),
                    rhs: 100.0,
                    lo: 0.0,
                    ..Default::default()
                },
                ConstraintRow {
                    lin_jac1: Vector::x(),
                    rhs: -100.0,
                    lo: -mu,
                    hi: mu,
                    findex: Some(0),
                    ..Default::default()
                },
            ],
            body_pairs: vec![(0, None); 2],
        };

        let solution = solve(
            &params(1, 1.0),
            &mut constraints,
            &bodies,
            &identity_inertia(1),
        );

        assert!(solution.lambda[0] > 0.0);
        assert!(solution.lambda[1].abs() <= mu * solution.lambda[0] + 1.0e-6);
    }

    #[test]
    fn frozen_friction_bounds_keep_their_assembled_values() {
        let mu = 0.5;
        let bodies = unit_bodies(1);
        let mut constraints = SolverConstraints {
            rows: vec![
                ConstraintRow {
                    lin_jac1: Vector::y(),
                    rhs: 100.0,
                    lo: 0.0,
                    ..Default::default()
                },
                ConstraintRow {
                    lin_jac1: Vector::x(),
                    rhs: -100.0,
                    lo: -mu,
                    hi: mu,
                    findex: Some(0),
                    ..Default::default()
                },
            ],
            body_pairs: vec![(0, None); 2],
        };

        let mut frozen = params(1, 1.0);
        frozen.recouple_friction_limits = false;
        let solution = solve(&frozen, &mut constraints, &bodies, &identity_inertia(1));

        // Without re-coupling the friction row saturates its assembled bound.
        assert_relative_eq!(solution.lambda[1], -mu, epsilon = 1.0e-6);
    }

    #[test]
    fn coupled_rows_are_swept_last() {
        let rows = vec![
            ConstraintRow {
                findex: Some(0),
                ..Default::default()
            },
            ConstraintRow::default(),
            ConstraintRow {
                findex: Some(1),
                ..Default::default()
            },
            ConstraintRow::default(),
        ];
        let constraints = SolverConstraints {
            body_pairs: vec![(0, None); rows.len()],
            rows,
        };

        let order = initial_order(&constraints);
        assert_eq!(order, vec![1, 3, 0, 2]);
    }

    #[test]
    fn error_reordering_keeps_the_partition_and_sorts_ascending() {
        let rows = vec![
            ConstraintRow::default(),
            ConstraintRow::default(),
            ConstraintRow {
                findex: Some(0),
                ..Default::default()
            },
            ConstraintRow::default(),
        ];
        let constraints = SolverConstraints {
            body_pairs: vec![(0, None); rows.len()],
            rows,
        };

        let mut order = initial_order(&constraints);
        // Row 0 moved a lot, row 1 a little, row 3 not at all (stale at a
        // nonzero value), and the coupled row 2 moved somewhat.
        let lambda = vec![5.0, 1.1, 3.0, 2.0];
        let last_lambda = vec![1.0, 1.0, 2.0, 2.0];
        reorder_by_error(&mut order, &constraints, &lambda, &last_lambda);

        // Uncoupled rows by ascending error (0.1, 0, 4 → rows 3, 1, 0), the
        // coupled row still last.
        assert_eq!(order, vec![3, 1, 0, 2]);
    }

    #[test]
    fn untouched_rows_sort_as_infinite_error() {
        let rows = vec![ConstraintRow::default(), ConstraintRow::default()];
        let constraints = SolverConstraints {
            body_pairs: vec![(0, None); rows.len()],
            rows,
        };

        let mut order = initial_order(&constraints);
        // Row 0 never moved away from zero: it must sort after row 1 even
        // though its raw error (0) is the smallest.
        let lambda = vec![0.0, 4.0];
        let last_lambda = vec![0.0, 1.0];
        reorder_by_error(&mut order, &constraints, &lambda, &last_lambda);

        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn adaptive_ordering_converges_like_fixed() {
        let bodies = unit_bodies(2);
        let make_constraints = || SolverConstraints {
            rows: vec![ConstraintRow {
                lin_jac1: Vector::x(),
                lin_jac2: -Vector::x(),
                rhs: 5.0,
                ..Default::default()
            }],
            body_pairs: vec![(0, Some(1))],
        };

        let fixed = solve(
            &params(20, 1.0),
            &mut make_constraints(),
            &bodies,
            &identity_inertia(2),
        );
        let mut adaptive_params = params(20, 1.0);
        adaptive_params.row_ordering = RowOrdering::Adaptive;
        let adaptive = solve(
            &adaptive_params,
            &mut make_constraints(),
            &bodies,
            &identity_inertia(2),
        );

        assert_relative_eq!(fixed.lambda[0], adaptive.lambda[0], epsilon = 1.0e-5);
    }
}
