use contact_qp::algebra::{CsrMatrix, VectorMath};
use contact_qp::solver::{IpSettings, IpSettingsBuilder, IpSolver, KktMethod, QpProblem, SolverStatus};

// minimize 0.5*(2 x1^2 + 3 x2^2) + 4 x1 + 6 x2, no constraints
// solution x = -G^{-1} c = (-2, -2)
fn unconstrained() -> QpProblem<f64> {
    let g = CsrMatrix::from_triplets(2, 2, &[(0, 0, 2.), (1, 1, 3.)]);
    let a = CsrMatrix::new(0, 2, true, 0);
    QpProblem::new(g, vec![4., 6.], a, vec![])
}

#[test]
fn test_unconstrained_direct_path() {
    let mut problem = unconstrained();
    let mut solver = IpSolver::new(IpSettings::default());
    let obj = solver.solve(&mut problem).unwrap();

    assert_eq!(solver.info().status, SolverStatus::Solved);
    assert_eq!(solver.info().iterations, 0);
    assert!(problem.x.dist(&vec![-2., -2.]) <= 1e-10);
    assert!(problem.lam.is_empty());

    // objective at the minimizer: 0.5*(8 + 12) - 8 - 12 = -10
    assert!((obj - (-10.0)).abs() <= 1e-9);
}

#[test]
fn test_unconstrained_with_lu_engine() {
    let mut problem = unconstrained();
    let settings = IpSettingsBuilder::<f64>::default()
        .linear_engine("lu".to_string())
        .build()
        .unwrap();
    let mut solver = IpSolver::new(settings);
    solver.solve(&mut problem).unwrap();
    assert!(problem.x.dist(&vec![-2., -2.]) <= 1e-10);
}

#[test]
fn test_unconstrained_standard_layout() {
    let mut problem = unconstrained();
    let settings = IpSettingsBuilder::<f64>::default()
        .kkt_method(KktMethod::Standard)
        .build()
        .unwrap();
    let mut solver = IpSolver::new(settings);
    solver.solve(&mut problem).unwrap();
    assert!(problem.x.dist(&vec![-2., -2.]) <= 1e-10);
}
