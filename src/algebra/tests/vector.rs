use crate::algebra::*;

#[test]
fn test_set_scale_negate() {
    let mut x = vec![1., 2., 3.];
    x.set(2.);
    assert_eq!(x, [2., 2., 2.]);
    x.scale(0.5);
    assert_eq!(x, [1., 1., 1.]);
    x.negate();
    assert_eq!(x, [-1., -1., -1.]);
}

#[test]
fn test_translate_hadamard() {
    let mut x = vec![1., 2., 3.];
    x.translate(-1.);
    assert_eq!(x, [0., 1., 2.]);
    x.hadamard(&[3., 3., 0.5]);
    assert_eq!(x, [0., 3., 1.]);
}

#[test]
fn test_norms() {
    let x = vec![3., -4.];
    assert_eq!(x.norm(), 5.);
    assert_eq!(x.norm_inf(), 4.);
    assert_eq!(x.sumsq(), 25.);
    assert_eq!(x.minimum(), -4.);

    let y = [f64::NAN, 1.];
    assert!(y.norm_inf().is_nan());
    assert!(!y.is_finite());
    assert!(x.is_finite());
}

#[test]
fn test_dist() {
    let x = vec![1., 1.];
    let y = vec![4., 5.];
    assert_eq!(x.dist(&y), 5.);
}

#[test]
fn test_axpby() {
    let mut y = vec![1., 2.];
    y.axpby(2., &[10., 20.], -1.);
    assert_eq!(y, [19., 38.]);

    let mut w = vec![0., 0.];
    w.waxpby(2., &[1., 2.], 3., &[10., 10.]);
    assert_eq!(w, [32., 34.]);
}

#[test]
fn test_copy_from() {
    let mut x = vec![0.; 3];
    x.copy_from(&[1., 2., 3.]);
    assert_eq!(x, [1., 2., 3.]);
}
