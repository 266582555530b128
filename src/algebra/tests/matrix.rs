use crate::algebra::*;

fn dense_of(mat: &CsrMatrix<f64>) -> Vec<Vec<f64>> {
    let mut d = vec![vec![0.; mat.ncols()]; mat.nrows()];
    for r in 0..mat.nrows() {
        for c in 0..mat.ncols() {
            d[r][c] = mat.get_element(r, c);
        }
    }
    d
}

#[test]
fn test_insertion_layout_and_pattern_lock() {
    // a 3x3 with 5 reserved slots spread as [0,2,3,5]
    let mut mat = CsrMatrix::<f64>::new(3, 3, true, 5);
    assert_eq!(mat.lead_index(), &[0, 2, 3, 5]);

    mat.set_element(0, 0, 1., true);
    mat.set_element(0, 2, 2., true);
    mat.set_element(1, 1, 3., true);
    mat.set_element(2, 0, 4., true);
    mat.set_element(2, 2, 5., true);

    assert_eq!(mat.lead_index(), &[0, 2, 3, 5]);
    assert_eq!(mat.trail_index(), &[0, 2, 1, 0, 2]);
    assert_eq!(mat.nnz(), 5);
    assert!(mat.is_compressed());
    mat.verify().unwrap();

    // lock the pattern, reset, and refill: structure must survive untouched
    mat.set_sparsity_pattern_lock(true);
    mat.reset(3, 3, 0);
    assert_eq!(mat.nnz(), 5);
    assert_eq!(mat.get_element(0, 0), 0.);

    mat.set_element(0, 0, -1., true);
    mat.set_element(2, 2, -5., true);
    assert_eq!(mat.lead_index(), &[0, 2, 3, 5]);
    assert_eq!(mat.trail_index(), &[0, 2, 1, 0, 2]);
    assert!(mat.is_compressed());
    assert!(!mat.is_pattern_lock_broken());
    assert_eq!(mat.get_element(0, 0), -1.);
    assert_eq!(mat.get_element(1, 1), 0.);
}

#[test]
fn test_structural_write_breaks_lock() {
    let mut mat = CsrMatrix::<f64>::new(3, 3, true, 3);
    mat.set_element(0, 0, 1., true);
    mat.set_element(1, 1, 2., true);
    mat.set_sparsity_pattern_lock(true);

    // new structural position while locked
    mat.set_element(2, 2, 3., true);
    assert!(mat.is_pattern_lock_broken());

    // the next reset compresses the polluted structure and clears the flag
    mat.reset(3, 3, 0);
    assert!(!mat.is_pattern_lock_broken());
    assert!(mat.is_compressed());
    assert_eq!(mat.nnz(), 3);
    assert_eq!(mat.slot_count(), 3);
    mat.verify().unwrap();
}

#[test]
fn test_prune() {
    let mut mat = CsrMatrix::<f64>::new(2, 2, true, 4);
    mat.set_element(0, 0, 1e-20, true);
    mat.set_element(0, 1, 1., true);
    mat.set_element(1, 0, -1., true);
    mat.set_element(1, 1, 1e-20, true);

    mat.prune(1e-10);

    assert_eq!(mat.nnz(), 2);
    assert!(mat.is_compressed());
    assert_eq!(mat.lead_index(), &[0, 1, 2]);
    assert_eq!(mat.trail_index(), &[1, 0]);
    assert_eq!(mat.get_element(0, 1), 1.);
    assert_eq!(mat.get_element(1, 0), -1.);
    assert_eq!(mat.get_element(0, 0), 0.);
    mat.verify().unwrap();
}

#[test]
fn test_round_trip_and_compress_order() {
    // insert in scrambled order, with an accumulation on one entry
    let entries = [
        (2, 3, 1.5),
        (0, 1, -2.),
        (1, 0, 4.),
        (0, 4, 8.),
        (2, 0, -1.),
        (0, 0, 3.),
    ];
    let mut mat = CsrMatrix::<f64>::new(3, 5, true, 2);
    for &(r, c, v) in entries.iter() {
        mat.set_element(r, c, v, true);
    }
    mat.set_element(1, 0, 1., false); // accumulate: (1,0) becomes 5
    mat.verify().unwrap();

    let mut expect = vec![
        (0, 0, 3.),
        (0, 1, -2.),
        (0, 4, 8.),
        (1, 0, 5.),
        (2, 0, -1.),
        (2, 3, 1.5),
    ];
    expect.sort_by_key(|&(r, c, _)| (r, c));

    let mut seen = Vec::new();
    mat.for_each_value(|r, c, v| seen.push((r, c, v)));
    let mut sorted = seen.clone();
    sorted.sort_by_key(|&(r, c, _)| (r, c));
    assert_eq!(sorted, expect);

    // after compress the iteration order is lexicographic
    mat.compress();
    let mut seen = Vec::new();
    mat.for_each_value(|r, c, v| seen.push((r, c, v)));
    assert_eq!(seen, expect);
    assert_eq!(mat.nnz(), mat.slot_count());
    mat.verify().unwrap();
}

#[test]
fn test_forward_shift_insertion() {
    // two slots only: the second insertion in row 0 must steal row 1's slot
    let mut mat = CsrMatrix::<f64>::new(2, 4, true, 2);
    assert_eq!(mat.lead_index(), &[0, 1, 2]);

    mat.set_element(0, 0, 1., true);
    mat.set_element(0, 1, 2., true);
    assert_eq!(mat.lead_index(), &[0, 2, 2]);
    mat.verify().unwrap();

    // row 1 has no slot left: forces a reallocation
    mat.set_element(1, 0, 3., true);
    assert_eq!(mat.get_element(0, 0), 1.);
    assert_eq!(mat.get_element(0, 1), 2.);
    assert_eq!(mat.get_element(1, 0), 3.);
    mat.verify().unwrap();
}

#[test]
fn test_out_of_order_insertion_shifts_right() {
    let mut mat = CsrMatrix::<f64>::new(1, 5, true, 3);
    mat.set_element(0, 1, 1., true);
    mat.set_element(0, 4, 4., true);
    // belongs between the two stored entries; the free third slot is at the end
    mat.set_element(0, 2, 2., true);
    mat.verify().unwrap();
    assert_eq!(mat.get_element(0, 1), 1.);
    assert_eq!(mat.get_element(0, 2), 2.);
    assert_eq!(mat.get_element(0, 4), 4.);
    mat.compress();
    assert_eq!(mat.trail_index(), &[1, 2, 4]);
}

#[test]
fn test_max_shifts_forces_reallocation() {
    let mut mat = CsrMatrix::<f64>::new(2, 2, true, 2);
    mat.set_max_shifts(0);
    mat.set_element(0, 0, 1., true);
    let cap_before = mat.slot_count();
    mat.set_element(0, 1, 2., true); // would need to cross into row 1
    assert!(mat.slot_count() > cap_before);
    assert_eq!(mat.get_element(0, 0), 1.);
    assert_eq!(mat.get_element(0, 1), 2.);
    mat.verify().unwrap();
}

#[test]
fn test_nnz_accounting() {
    let mut mat = CsrMatrix::<f64>::new(4, 4, true, 8);
    mat.set_element(0, 0, 1., true);
    mat.set_element(2, 3, 1., true);
    mat.set_element(3, 1, 1., true);

    let flags = mat.initialized_slots().iter().filter(|&&f| f).count();
    assert_eq!(mat.nnz(), flags);
    assert_eq!(mat.nnz(), 3);
    assert!(!mat.is_compressed());
    assert!(mat.slot_count() > mat.nnz());

    mat.compress();
    assert_eq!(mat.nnz(), mat.slot_count());
    assert_eq!(mat.nnz(), 3);
}

#[test]
fn test_element_accessor() {
    let mut mat = CsrMatrix::<f64>::new(2, 2, true, 2);
    *mat.element(0, 1) = 7.;
    *mat.element(0, 1) += 1.;
    assert_eq!(mat.get_element(0, 1), 8.);
    assert_eq!(mat.get_element(1, 0), 0.);
    assert_eq!(mat.nnz(), 1);
}

#[test]
#[should_panic]
fn test_out_of_bounds_panics() {
    let mat = CsrMatrix::<f64>::new(2, 2, true, 2);
    mat.get_element(2, 0);
}

#[test]
fn test_mat_multiply_against_dense() {
    let mut mat = CsrMatrix::<f64>::new(4, 6, true, 4);
    let entries = [
        (0, 0, 2.),
        (0, 5, -1.),
        (1, 2, 3.),
        (2, 1, 0.5),
        (2, 4, -2.),
        (3, 0, 1.),
        (3, 3, 7.),
    ];
    for &(r, c, v) in entries.iter() {
        mat.set_element(r, c, v, true);
    }

    let x: Vec<f64> = (0..6).map(|i| (i as f64) * 0.7 - 1.0).collect();
    let mut y = vec![0.; 4];
    mat.mat_multiply(&x, &mut y);

    let dense = dense_of(&mat);
    for r in 0..4 {
        let want: f64 = (0..6).map(|c| dense[r][c] * x[c]).sum();
        assert!((y[r] - want).abs() <= 1e-12 * want.abs().max(1.0));
    }
}

#[test]
fn test_mat_multiply_clipped() {
    let mut mat = CsrMatrix::<f64>::new(5, 5, true, 10);
    for r in 0..5 {
        for c in 0..5 {
            if (r + 2 * c) % 3 == 0 {
                mat.set_element(r, c, (r * 5 + c) as f64 + 1., true);
            }
        }
    }

    let x: Vec<f64> = (0..5).map(|i| 1.0 / (i as f64 + 1.0)).collect();

    // clipping to the full range agrees with the plain product
    let mut y_full = vec![0.; 5];
    let mut y_clip = vec![9.; 5];
    mat.mat_multiply(&x, &mut y_full);
    mat.mat_multiply_clipped(&x, &mut y_clip, 0..5, 0..5, 0, 0);
    assert_eq!(y_full, y_clip);

    // an empty column range zeroes the output
    let mut y = vec![9.; 5];
    mat.mat_multiply_clipped(&x, &mut y, 0..5, 3..3, 0, 0);
    assert_eq!(y, vec![0.; 5]);

    // a submatrix window with offsets
    let mut y = vec![9.; 2];
    mat.mat_multiply_clipped(&x[1..4], &mut y, 2..4, 1..4, 0, 0);
    let dense = dense_of(&mat);
    for (i, r) in (2..4).enumerate() {
        let want: f64 = (1..4).map(|c| dense[r][c] * x[c]).sum();
        assert!((y[i] - want).abs() <= 1e-12);
    }
}

#[test]
fn test_column_major_duality() {
    let entries = [(0, 0, 1.), (0, 2, 2.), (1, 1, 3.), (2, 0, 4.), (2, 2, 5.)];
    let mut rm = CsrMatrix::<f64>::new(3, 3, true, 5);
    let mut cm = CsrMatrix::<f64>::new(3, 3, false, 5);
    for &(r, c, v) in entries.iter() {
        rm.set_element(r, c, v, true);
        cm.set_element(r, c, v, true);
    }
    rm.verify().unwrap();
    cm.verify().unwrap();
    assert!(!cm.is_row_major());

    for r in 0..3 {
        for c in 0..3 {
            assert_eq!(rm.get_element(r, c), cm.get_element(r, c));
        }
    }

    let x = vec![1., -2., 3.];
    let mut y_rm = vec![0.; 3];
    let mut y_cm = vec![0.; 3];
    rm.mat_multiply(&x, &mut y_rm);
    cm.mat_multiply(&x, &mut y_cm);
    assert_eq!(y_rm, y_cm);

    let mut trips_rm = Vec::new();
    let mut trips_cm = Vec::new();
    rm.for_each_value(|r, c, v| trips_rm.push((r, c, v)));
    cm.for_each_value(|r, c, v| trips_cm.push((r, c, v)));
    trips_rm.sort_by_key(|&(r, c, _)| (r, c));
    trips_cm.sort_by_key(|&(r, c, _)| (r, c));
    assert_eq!(trips_rm, trips_cm);
}

#[test]
fn test_load_sparsity_pattern() {
    let mut learner = SparsityLearner::new(3, 3);
    // duplicates and out-of-order insertions are fine
    learner.set_element(2, 2, 1.0, true);
    learner.set_element(0, 0, 1.0, true);
    learner.set_element(0, 2, 1.0, true);
    learner.set_element(0, 0, 5.0, false);
    learner.set_element(1, 1, 1.0, true);

    let mut mat = CsrMatrix::<f64>::new(1, 1, true, 0);
    mat.load_sparsity_pattern(&mut learner);

    assert_eq!(mat.size(), (3, 3));
    assert_eq!(mat.nnz(), 4);
    assert!(mat.is_compressed());
    assert_eq!(mat.lead_index(), &[0, 2, 3, 4]);
    assert_eq!(mat.trail_index(), &[0, 2, 1, 2]);
    assert!(mat.values().iter().all(|&v| v == 0.));
    mat.verify().unwrap();

    // values-only pass after locking
    mat.set_sparsity_pattern_lock(true);
    mat.set_element(0, 0, 1., true);
    mat.set_element(0, 2, 2., true);
    mat.set_element(1, 1, 3., true);
    mat.set_element(2, 2, 4., true);
    assert!(!mat.is_pattern_lock_broken());
    assert_eq!(mat.get_element(2, 2), 4.);
}

#[test]
fn test_for_each_variants() {
    let mut mat = CsrMatrix::<f64>::from_triplets(
        3,
        3,
        &[(0, 0, 1.), (0, 2, 3.), (1, 1, -4.), (2, 0, 2.), (2, 2, 5.)],
    );

    let mut in_window = Vec::new();
    mat.for_each_value_in_range(0..2, 0..3, |r, c, v| in_window.push((r, c, v)));
    assert_eq!(in_window, vec![(0, 0, 1.), (0, 2, 3.), (1, 1, -4.)]);

    let mut large = Vec::new();
    mat.for_each_value_where(|_r, _c, v| v.abs() > 2., |r, c, v| large.push((r, c, v)));
    assert_eq!(large, vec![(0, 2, 3.), (1, 1, -4.), (2, 2, 5.)]);

    mat.for_each_value_mut(|_r, _c, v| *v *= 2.);
    assert_eq!(mat.get_element(1, 1), -8.);
    assert_eq!(mat.get_element(2, 2), 10.);
}

#[test]
fn test_identity_and_trim() {
    let mut mat = CsrMatrix::<f64>::identity(3);
    assert_eq!(mat.nnz(), 3);
    assert!(mat.is_compressed());
    assert_eq!(mat.get_element(1, 1), 1.);
    mat.trim();
    assert_eq!(mat.capacity(), 3);
}

#[test]
fn test_distribute_integer_range() {
    let mut v = vec![0usize; 4];
    distribute_integer_range_on_vector(&mut v, 0, 5);
    assert_eq!(v, [0, 2, 3, 5]);

    let mut v = vec![0usize; 5];
    distribute_integer_range_on_vector(&mut v, 0, 8);
    assert_eq!(v, [0, 2, 4, 6, 8]);

    let mut v = vec![9usize; 2];
    distribute_integer_range_on_vector(&mut v, 3, 7);
    assert_eq!(v, [3, 7]);

    let mut v = vec![9usize; 1];
    distribute_integer_range_on_vector(&mut v, 3, 7);
    assert_eq!(v, [3]);
}
