use super::*;
use crate::algebra::VectorMath;

fn solve_with(
    n: usize,
    ap: &[usize],
    ai: &[usize],
    ax: &[f64],
    b: &[f64],
    opts: Option<LdlSettings<f64>>,
) -> Vec<f64> {
    let mut fact = LdlFactorisation::new(n, ap, ai, ax, opts).unwrap();
    fact.factor().unwrap();
    let mut x = b.to_vec();
    fact.solve(&mut x);
    x
}

#[test]
fn test_identity() {
    let ap = [0, 1, 2, 3];
    let ai = [0, 1, 2];
    let ax = [1., 1., 1.];
    let b = [3., -1., 2.];
    let x = solve_with(3, &ap, &ai, &ax, &b, None);
    assert!(x.dist(&b.to_vec()) <= 1e-14);
}

#[test]
fn test_positive_definite() {
    // A = [4 1 0; 1 5 2; 0 2 6], x = (1, 2, 3) => b = (6, 17, 22)
    let ap = [0, 1, 3, 5];
    let ai = [0, 0, 1, 1, 2];
    let ax = [4., 1., 5., 2., 6.];
    let b = [6., 17., 22.];

    let mut fact = LdlFactorisation::new(3, &ap, &ai, &ax, None).unwrap();
    fact.factor().unwrap();
    assert_eq!(fact.positive_inertia(), 3);
    assert_eq!(fact.regularize_count(), 0);

    let mut x = b.to_vec();
    fact.solve(&mut x);
    assert!(x.dist(&vec![1., 2., 3.]) <= 1e-12);
}

#[test]
fn test_quasidefinite() {
    // A = [2 1; 1 -3], x = (1, 1) => b = (3, -2)
    let ap = [0, 1, 3];
    let ai = [0, 0, 1];
    let ax = [2., 1., -3.];
    let opts = LdlSettingsBuilder::default()
        .dsigns(vec![1, -1])
        .build()
        .unwrap();

    let mut fact = LdlFactorisation::new(2, &ap, &ai, &ax, Some(opts)).unwrap();
    fact.factor().unwrap();
    assert_eq!(fact.positive_inertia(), 1);

    let mut x = vec![3., -2.];
    fact.solve(&mut x);
    assert!(x.dist(&vec![1., 1.]) <= 1e-12);
}

#[test]
fn test_refactor_with_new_values() {
    let ap = [0, 1, 3];
    let ai = [0, 0, 1];
    let mut fact = LdlFactorisation::new(2, &ap, &ai, &[2., 0., 3.], None).unwrap();
    fact.factor().unwrap();

    // same structure, new values: A = [4 1; 1 5], x = (1, 1) => b = (5, 6)
    fact.load_values(&[4., 1., 5.]);
    fact.factor().unwrap();
    let mut x = vec![5., 6.];
    fact.solve(&mut x);
    assert!(x.dist(&vec![1., 1.]) <= 1e-12);

    // selective update: bump the (1,1) entry to 6 => b = (5, 7) for x = (1, 1)
    fact.update_values(&[2], &[6.]);
    fact.factor().unwrap();
    let mut x = vec![5., 7.];
    fact.solve(&mut x);
    assert!(x.dist(&vec![1., 1.]) <= 1e-12);
}

#[test]
fn test_user_permutation() {
    let ap = [0, 1, 3, 5];
    let ai = [0, 0, 1, 1, 2];
    let ax = [4., 1., 5., 2., 6.];
    let opts = LdlSettingsBuilder::default()
        .perm(vec![2, 0, 1])
        .build()
        .unwrap();
    let x = solve_with(3, &ap, &ai, &ax, &[6., 17., 22.], Some(opts));
    assert!(x.dist(&vec![1., 2., 3.]) <= 1e-12);
}

#[test]
fn test_arrow_matrix_with_amd() {
    // arrowhead matrix: dense first row/col plus diagonal
    let n = 6;
    let mut ap = vec![0usize];
    let mut ai = Vec::new();
    let mut ax = Vec::new();
    ai.push(0);
    ax.push(10.);
    ap.push(1);
    for j in 1..n {
        ai.push(0);
        ax.push(1.);
        ai.push(j);
        ax.push(4. + j as f64);
        ap.push(ai.len());
    }

    // b = A * ones
    let mut b = vec![0.; n];
    b[0] = 10. + (n - 1) as f64;
    for (j, bj) in b.iter_mut().enumerate().skip(1) {
        *bj = 1. + 4. + j as f64;
    }

    let x = solve_with(n, &ap, &ai, &ax, &b, None);
    assert!(x.dist(&vec![1.; n]) <= 1e-12);
}

#[test]
fn test_zero_pivot() {
    let ap = [0, 1, 3];
    let ai = [0, 0, 1];
    let ax = [0., 1., 1.];
    let opts = LdlSettingsBuilder::default()
        .perm(vec![0, 1])
        .regularize_enable(false)
        .build()
        .unwrap();
    let mut fact = LdlFactorisation::new(2, &ap, &ai, &ax, Some(opts)).unwrap();
    assert!(matches!(fact.factor(), Err(LdlError::ZeroPivot)));
}

#[test]
fn test_bad_structure() {
    // empty column
    let r = LdlFactorisation::<f64>::new(2, &[0, 1, 1], &[0], &[1.], None);
    assert!(matches!(r, Err(LdlError::EmptyColumn)));

    // lower triangular entry
    let r = LdlFactorisation::<f64>::new(2, &[0, 2, 3], &[0, 1, 1], &[1., 1., 1.], None);
    assert!(matches!(r, Err(LdlError::NotUpperTriangular)));

    // bad permutation
    let opts = LdlSettingsBuilder::default().perm(vec![0, 0]).build().unwrap();
    let r = LdlFactorisation::<f64>::new(2, &[0, 1, 3], &[0, 0, 1], &[1., 0., 1.], Some(opts));
    assert!(matches!(r, Err(LdlError::InvalidPermutation)));
}
