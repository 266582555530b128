use crate::algebra::{FloatT, SparseWrite};

/// A write-only matrix stand-in that records sparsity structure.
///
/// `SparsityLearner` accepts the same assembly calls as
/// [`CsrMatrix`](crate::algebra::CsrMatrix) but stores only the `(row, col)`
/// positions, never the values.  Running an assembly pass against a learner
/// first and handing the result to
/// [`CsrMatrix::load_sparsity_pattern`](crate::algebra::CsrMatrix::load_sparsity_pattern)
/// lets the matrix allocate its exact structure up front, so the value-bearing
/// pass that follows inserts without searching or reallocation.
#[derive(Debug, Clone)]
pub struct SparsityLearner {
    rows: usize,
    cols: usize,
    row_major: bool,
    lists: Vec<Vec<usize>>,
}

impl SparsityLearner {
    /// New learner for a `rows x cols` matrix in row-major orientation.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::with_orientation(rows, cols, true)
    }

    /// New learner with an explicit storage orientation.
    pub fn with_orientation(rows: usize, cols: usize, row_major: bool) -> Self {
        let lead_dim = if row_major { rows } else { cols };
        Self {
            rows,
            cols,
            row_major,
            lists: vec![Vec::new(); lead_dim],
        }
    }

    pub fn is_row_major(&self) -> bool {
        self.row_major
    }

    pub fn nrows(&self) -> usize {
        self.rows
    }

    pub fn ncols(&self) -> usize {
        self.cols
    }

    /// Forget everything recorded so far and adopt a new shape.
    pub fn reset(&mut self, rows: usize, cols: usize) {
        self.rows = rows;
        self.cols = cols;
        let lead_dim = if self.row_major { rows } else { cols };
        self.lists.clear();
        self.lists.resize(lead_dim, Vec::new());
    }

    /// Sort each leading-dimension list ascending, drop duplicates, and
    /// return the per-lead trailing index lists.
    pub fn sorted_pattern(&mut self) -> &[Vec<usize>] {
        for list in self.lists.iter_mut() {
            list.sort_unstable();
            list.dedup();
        }
        &self.lists
    }

    /// Number of recorded positions.  Exact (duplicate-free) once
    /// [`sorted_pattern`](Self::sorted_pattern) has run.
    pub fn nnz(&self) -> usize {
        self.lists.iter().map(|l| l.len()).sum()
    }
}

impl<T: FloatT> SparseWrite<T> for SparsityLearner {
    fn nrows(&self) -> usize {
        self.rows
    }

    fn ncols(&self) -> usize {
        self.cols
    }

    fn set_element(&mut self, row: usize, col: usize, _value: T, _overwrite: bool) {
        assert!(row < self.rows && col < self.cols);
        let (lead, trail) = if self.row_major { (row, col) } else { (col, row) };
        self.lists[lead].push(trail);
    }
}
