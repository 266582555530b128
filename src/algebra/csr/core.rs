use crate::algebra::{FloatT, SparseFormatError, SparseWrite, SparsityLearner};

/// Sentinel trailing index marking a reserved-but-unused slot.
const UNSET: usize = usize::MAX;

/// Sparse matrix in gap-tolerant Compressed Sparse Row format.
///
/// The three classic CSR arrays are kept, with one twist: the arena addressed
/// by `lead_index` may contain more slots than there are stored entries.  A
/// slot is either *initialized* (it holds a real entry) or a free hole that a
/// later insertion can claim without moving its neighbours.  This makes
/// repeated in-place assembly cheap when entries arrive roughly in order and
/// the sparsity pattern is roughly stable between assemblies.
///
/// Terminology follows the storage orientation rather than rows and columns:
/// the *leading* dimension is rows when row-major (the default) and columns
/// when column-major; the *trailing* dimension is the other one.
///
/// __Example usage__ : to construct the 3 x 3 matrix
/// ```text
/// A = [1.  0.  2.]
///     [0.  3.  0.]
///     [4.  0.  5.]
/// ```
///
/// ```
/// use contact_qp::algebra::CsrMatrix;
///
/// let a = CsrMatrix::from_triplets(
///     3,
///     3,
///     &[(0, 0, 1.), (0, 2, 2.), (1, 1, 3.), (2, 0, 4.), (2, 2, 5.)],
/// );
///
/// assert_eq!(a.nnz(), 5);
/// assert_eq!(a.get_element(2, 0), 4.);
/// assert_eq!(a.get_element(1, 0), 0.);
/// ```
#[derive(Debug, Clone)]
pub struct CsrMatrix<T = f64> {
    rows: usize,
    cols: usize,
    row_major: bool,
    /// arena offsets; `lead_index[i]` is where the slots of lead `i` begin
    lead_index: Vec<usize>,
    /// trailing index of each slot; `UNSET` on holes
    trail_index: Vec<usize>,
    /// entry values, parallel to `trail_index`
    values: Vec<T>,
    /// per-slot flag distinguishing entries from holes
    initialized: Vec<bool>,
    /// count of initialized slots
    nnz: usize,
    compressed: bool,
    pattern_lock: bool,
    lock_broken: bool,
    max_shifts: usize,
}

impl<T> CsrMatrix<T>
where
    T: FloatT,
{
    /// New matrix with `nnz_hint` reserved slots spread uniformly over the rows.
    pub fn new(rows: usize, cols: usize, row_major: bool, nnz_hint: usize) -> Self {
        let mut mat = CsrMatrix {
            rows,
            cols,
            row_major,
            lead_index: Vec::new(),
            trail_index: Vec::new(),
            values: Vec::new(),
            initialized: Vec::new(),
            nnz: 0,
            compressed: false,
            pattern_lock: false,
            lock_broken: false,
            max_shifts: usize::MAX,
        };
        mat.reset_arrays(nnz_hint);
        mat
    }

    /// Identity matrix of size `n`, stored compressed.
    pub fn identity(n: usize) -> Self {
        let mut mat = Self::new(n, n, true, n);
        for i in 0..n {
            mat.set_element(i, i, T::one(), true);
        }
        mat.compress();
        mat
    }

    /// Build a row-major matrix from `(row, col, value)` triplets, compressed.
    /// Duplicate positions accumulate.
    pub fn from_triplets(rows: usize, cols: usize, triplets: &[(usize, usize, T)]) -> Self {
        let mut mat = Self::new(rows, cols, true, triplets.len());
        for &(r, c, v) in triplets {
            mat.set_element(r, c, v, false);
        }
        mat.compress();
        mat
    }

    pub fn nrows(&self) -> usize {
        self.rows
    }

    pub fn ncols(&self) -> usize {
        self.cols
    }

    pub fn size(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    pub fn is_row_major(&self) -> bool {
        self.row_major
    }

    /// Number of stored entries.  Holes do not count.
    pub fn nnz(&self) -> usize {
        self.nnz
    }

    /// Total slots in the arena, holes included.  Equals `nnz()` exactly when
    /// the matrix is compressed.
    pub fn slot_count(&self) -> usize {
        self.lead_index[self.lead_dim()]
    }

    /// Allocated capacity of the slot arrays.
    pub fn capacity(&self) -> usize {
        self.trail_index.capacity()
    }

    /// True if the entries are stored contiguously, with no holes.
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// The arena offset array (length `lead_dim + 1`).
    pub fn lead_index(&self) -> &[usize] {
        &self.lead_index
    }

    /// The trailing index array.  Hole slots carry a sentinel value.
    pub fn trail_index(&self) -> &[usize] {
        &self.trail_index
    }

    /// The value array, parallel to [`trail_index`](Self::trail_index).
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// The per-slot initialization flags, parallel to the slot arrays.
    pub fn initialized_slots(&self) -> &[bool] {
        &self.initialized
    }

    /// Split borrow of the storage arrays for in-place traversal.
    pub(crate) fn parts_mut(&mut self) -> (&[usize], &[usize], &mut [T], &[bool]) {
        (
            &self.lead_index,
            &self.trail_index,
            &mut self.values,
            &self.initialized,
        )
    }

    /// How far the insertion algorithm may search forward, in rows, for a free
    /// slot before giving up and reallocating.
    pub fn set_max_shifts(&mut self, max_shifts: usize) {
        self.max_shifts = max_shifts;
    }

    /// Promise (or withdraw the promise) that the set of stored positions will
    /// not change.  While engaged, [`reset`](Self::reset) keeps the structure
    /// and clears only the values.
    pub fn set_sparsity_pattern_lock(&mut self, lock: bool) {
        self.pattern_lock = lock;
        if !lock {
            self.lock_broken = false;
        }
    }

    pub fn is_sparsity_pattern_locked(&self) -> bool {
        self.pattern_lock
    }

    /// True if a structural write has occurred since the pattern lock was
    /// engaged.  The polluted structure is compressed away on the next
    /// [`reset`](Self::reset).
    pub fn is_pattern_lock_broken(&self) -> bool {
        self.lock_broken
    }

    #[inline]
    fn lead_dim(&self) -> usize {
        if self.row_major {
            self.rows
        } else {
            self.cols
        }
    }

    #[inline]
    fn trail_dim(&self) -> usize {
        if self.row_major {
            self.cols
        } else {
            self.rows
        }
    }

    #[inline]
    fn map_index(&self, row: usize, col: usize) -> (usize, usize) {
        if self.row_major {
            (row, col)
        } else {
            (col, row)
        }
    }

    /// Read the entry at `(row, col)`, or zero if it is not stored.  Never
    /// creates structure.
    ///
    /// # Panics
    /// Panics if the index is out of range.
    pub fn get_element(&self, row: usize, col: usize) -> T {
        assert!(row < self.rows && col < self.cols, "index out of bounds");
        let (lead, trail) = self.map_index(row, col);

        let (lo, hi) = (self.lead_index[lead], self.lead_index[lead + 1]);
        for k in lo..hi {
            if self.initialized[k] && self.trail_index[k] == trail {
                return self.values[k];
            }
        }
        T::zero()
    }

    /// Mutable access to the entry at `(row, col)`, creating a zero entry if
    /// none is stored.
    ///
    /// # Panics
    /// Panics if the index is out of range.
    pub fn element(&mut self, row: usize, col: usize) -> &mut T {
        assert!(row < self.rows && col < self.cols, "index out of bounds");
        let (lead, trail) = self.map_index(row, col);
        let (slot, _existing) = self.ensure_slot(lead, trail);
        &mut self.values[slot]
    }

    /// Write `value` at `(row, col)`.  With `overwrite = false` the value is
    /// accumulated into an existing entry instead of replacing it.
    ///
    /// # Panics
    /// Panics if the index is out of range.
    pub fn set_element(&mut self, row: usize, col: usize, value: T, overwrite: bool) {
        assert!(row < self.rows && col < self.cols, "index out of bounds");
        let (lead, trail) = self.map_index(row, col);
        let (slot, existing) = self.ensure_slot(lead, trail);
        if existing && !overwrite {
            self.values[slot] += value;
        } else {
            self.values[slot] = value;
        }
    }

    /// Clear the matrix for a new `rows x cols` assembly with `nnz_hint`
    /// reserved slots.
    ///
    /// If the sparsity-pattern lock is engaged and the shape is unchanged, the
    /// structure survives and only the values are zeroed; a broken lock first
    /// triggers a compression so that the polluted structure is contiguous
    /// again.  Otherwise the arrays are rebuilt from scratch.
    pub fn reset(&mut self, rows: usize, cols: usize, nnz_hint: usize) {
        let shape_unchanged = rows == self.rows && cols == self.cols;
        if self.pattern_lock && shape_unchanged {
            if self.lock_broken {
                self.compress();
                self.lock_broken = false;
            }
            self.values.as_mut_slice().fill(T::zero());
        } else {
            self.rows = rows;
            self.cols = cols;
            self.reset_arrays(nnz_hint);
        }
    }

    /// Remove all holes in place, packing each row's entries to the front while
    /// preserving their order.  Returns whether the matrix was already
    /// compressed.
    pub fn compress(&mut self) -> bool {
        if self.compressed {
            return true;
        }
        self.retain_compressing(|_v| true);
        false
    }

    /// Compress, additionally dropping entries with `|value| <= threshold`.
    pub fn prune(&mut self, threshold: T) {
        let before = self.nnz;
        self.retain_compressing(|v| v.abs() > threshold);
        if self.pattern_lock && self.nnz != before {
            self.lock_broken = true;
        }
    }

    /// Shrink the backing arrays to exactly the used length.
    pub fn trim(&mut self) {
        self.lead_index.shrink_to_fit();
        self.trail_index.shrink_to_fit();
        self.values.shrink_to_fit();
        self.initialized.shrink_to_fit();
    }

    /// Adopt the structure recorded by a [`SparsityLearner`](crate::algebra::SparsityLearner).
    ///
    /// The matrix takes the learner's shape and orientation, allocates exactly
    /// the learned pattern with all values zero, and ends up compressed.
    pub fn load_sparsity_pattern(&mut self, learner: &mut SparsityLearner) {
        self.rows = learner.nrows();
        self.cols = learner.ncols();
        self.row_major = learner.is_row_major();

        let pattern = learner.sorted_pattern();
        let lead_dim = pattern.len();
        let nnz: usize = pattern.iter().map(|l| l.len()).sum();

        self.lead_index.clear();
        self.lead_index.reserve(lead_dim + 1);
        self.trail_index.clear();
        self.trail_index.reserve(nnz);

        self.lead_index.push(0);
        for list in pattern {
            self.trail_index.extend_from_slice(list);
            self.lead_index.push(self.trail_index.len());
        }

        self.values.clear();
        self.values.resize(nnz, T::zero());
        self.initialized.clear();
        self.initialized.resize(nnz, true);

        self.nnz = nnz;
        self.compressed = true;
        self.lock_broken = false;
    }

    /// Internal-consistency check on the storage arrays.
    pub fn verify(&self) -> Result<(), SparseFormatError> {
        let lead_dim = self.lead_dim();

        if self.lead_index.len() != lead_dim + 1 {
            return Err(SparseFormatError::IncompatibleDimension);
        }
        let slots = self.lead_index[lead_dim];
        if self.trail_index.len() != slots
            || self.values.len() != slots
            || self.initialized.len() != slots
        {
            return Err(SparseFormatError::IncompatibleDimension);
        }
        if self.lead_index.windows(2).any(|w| w[0] > w[1]) {
            return Err(SparseFormatError::BadLeadIndex);
        }
        if self.nnz != self.initialized.iter().filter(|&&f| f).count() {
            return Err(SparseFormatError::IncompatibleDimension);
        }

        for lead in 0..lead_dim {
            let mut last: Option<usize> = None;
            for k in self.lead_index[lead]..self.lead_index[lead + 1] {
                if !self.initialized[k] {
                    continue;
                }
                let t = self.trail_index[k];
                if t >= self.trail_dim() {
                    return Err(SparseFormatError::BadTrailIndex);
                }
                if let Some(p) = last {
                    if p >= t {
                        return Err(SparseFormatError::BadTrailOrdering);
                    }
                }
                last = Some(t);
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // slot management

    /// Locate the slot for `(lead, trail)`, creating one if needed.  Returns
    /// the slot position and whether the entry already existed.
    fn ensure_slot(&mut self, lead: usize, trail: usize) -> (usize, bool) {
        let (lo, hi) = (self.lead_index[lead], self.lead_index[lead + 1]);

        // scan the row: find the entry, or a hole bracketing the new trailing
        // index, or the position the new entry must take
        let mut hole: Option<usize> = None;
        let mut pos = hi;
        for k in lo..hi {
            if self.initialized[k] {
                let t = self.trail_index[k];
                if t == trail {
                    return (k, true);
                }
                if t > trail {
                    pos = k;
                    break;
                }
                // holes before an entry with a smaller trailing index are on
                // the wrong side of the insertion point
                hole = None;
            } else if hole.is_none() {
                hole = Some(k);
            }
        }

        if let Some(h) = hole {
            self.claim(h, trail);
            return (h, false);
        }

        // no bracketing hole: free a slot at `pos` by shifting entries toward
        // the nearest hole in a subsequent row
        if let Some(h) = self.hole_forward(pos, lead) {
            self.shift_into_hole(pos, h, lead);
            self.claim(pos, trail);
            return (pos, false);
        }

        // arena exhausted (or the hole is too many rows away): rebuild with
        // spare slots in every row, then the search above must succeed
        self.copy_and_distribute();
        self.ensure_slot(lead, trail)
    }

    /// Turn the hole at `slot` into an entry with the given trailing index.
    fn claim(&mut self, slot: usize, trail: usize) {
        debug_assert!(!self.initialized[slot]);
        self.trail_index[slot] = trail;
        self.values[slot] = T::zero();
        self.initialized[slot] = true;
        self.nnz += 1;
        if self.nnz == self.lead_index[self.lead_dim()] {
            self.compressed = true;
        }
        if self.pattern_lock {
            self.lock_broken = true;
        }
    }

    /// Find the nearest hole at or after `pos`, crossing at most `max_shifts`
    /// row boundaries.
    fn hole_forward(&self, pos: usize, lead: usize) -> Option<usize> {
        let slots = self.values.len();
        let lead_dim = self.lead_dim();
        let mut boundary = lead + 1;
        let mut crossings = 0usize;

        for q in pos..slots {
            while boundary <= lead_dim && self.lead_index[boundary] <= q {
                boundary += 1;
                crossings += 1;
                if crossings > self.max_shifts {
                    return None;
                }
            }
            if !self.initialized[q] {
                return Some(q);
            }
        }
        None
    }

    /// Shift the slots `pos..hole` forward by one, consuming the hole and
    /// freeing `pos`.  Every row whose window starts inside the shifted span
    /// moves with its entries.
    fn shift_into_hole(&mut self, pos: usize, hole: usize, lead: usize) {
        debug_assert!(!self.initialized[hole]);
        for k in (pos..hole).rev() {
            self.trail_index[k + 1] = self.trail_index[k];
            self.values[k + 1] = self.values[k];
            self.initialized[k + 1] = self.initialized[k];
        }
        self.initialized[pos] = false;

        let lead_dim = self.lead_dim();
        let mut j = lead + 1;
        while j <= lead_dim && self.lead_index[j] <= hole {
            self.lead_index[j] += 1;
            j += 1;
        }
    }

    /// Rebuild the arena with each row's entries packed at the front of its
    /// window and the spare capacity distributed uniformly across rows.
    fn copy_and_distribute(&mut self) {
        let lead_dim = self.lead_dim();
        assert!(lead_dim > 0, "cannot grow a matrix with no leading dimension");

        let spare_total = std::cmp::max(lead_dim, self.nnz);
        let new_cap = self.nnz + spare_total;
        let spare_per_row = spare_total / lead_dim;
        let extra = spare_total % lead_dim;

        let mut trail = vec![UNSET; new_cap];
        let mut values = vec![T::zero(); new_cap];
        let mut initialized = vec![false; new_cap];
        let mut lead_index = vec![0usize; lead_dim + 1];

        let mut w = 0;
        for i in 0..lead_dim {
            lead_index[i] = w;
            for k in self.lead_index[i]..self.lead_index[i + 1] {
                if self.initialized[k] {
                    trail[w] = self.trail_index[k];
                    values[w] = self.values[k];
                    initialized[w] = true;
                    w += 1;
                }
            }
            w += spare_per_row + usize::from(i < extra);
        }
        lead_index[lead_dim] = new_cap;
        debug_assert_eq!(w, new_cap);

        self.lead_index = lead_index;
        self.trail_index = trail;
        self.values = values;
        self.initialized = initialized;
        self.compressed = false;
    }

    /// Shared walk for [`compress`](Self::compress) and [`prune`](Self::prune):
    /// keep initialized entries passing `keep`, packed contiguously.
    fn retain_compressing(&mut self, keep: impl Fn(T) -> bool) {
        let lead_dim = self.lead_dim();
        let mut w = 0;
        let mut next_lo = self.lead_index[0];
        for i in 0..lead_dim {
            let lo = next_lo;
            let hi = self.lead_index[i + 1];
            next_lo = hi;
            self.lead_index[i] = w;
            for k in lo..hi {
                if self.initialized[k] && keep(self.values[k]) {
                    self.trail_index[w] = self.trail_index[k];
                    self.values[w] = self.values[k];
                    w += 1;
                }
            }
        }
        self.lead_index[lead_dim] = w;
        self.trail_index.truncate(w);
        self.values.truncate(w);
        self.initialized.clear();
        self.initialized.resize(w, true);
        self.nnz = w;
        self.compressed = true;
    }

    /// Rebuild empty arrays with `nnz_hint` slots spread uniformly.
    fn reset_arrays(&mut self, nnz_hint: usize) {
        let lead_dim = self.lead_dim();
        self.lead_index.clear();
        self.lead_index.resize(lead_dim + 1, 0);
        distribute_integer_range_on_vector(&mut self.lead_index, 0, nnz_hint);

        self.trail_index.clear();
        self.trail_index.resize(nnz_hint, UNSET);
        self.values.clear();
        self.values.resize(nnz_hint, T::zero());
        self.initialized.clear();
        self.initialized.resize(nnz_hint, false);

        self.nnz = 0;
        self.compressed = nnz_hint == 0;
        self.lock_broken = false;
    }
}

impl<T: FloatT> SparseWrite<T> for CsrMatrix<T> {
    fn nrows(&self) -> usize {
        self.rows
    }

    fn ncols(&self) -> usize {
        self.cols
    }

    fn set_element(&mut self, row: usize, col: usize, value: T, overwrite: bool) {
        CsrMatrix::set_element(self, row, col, value, overwrite);
    }
}

/// Fill `v` with `v.len()` equally spaced integers running from `start` to
/// `end`, both endpoints included.  Used to lay out the arena offsets when a
/// matrix reserves capacity without a known pattern.
pub fn distribute_integer_range_on_vector(v: &mut [usize], start: usize, end: usize) {
    let n = v.len();
    if n == 0 {
        return;
    }
    if n == 1 {
        v[0] = start;
        return;
    }
    let step = (end as f64 - start as f64) / (n - 1) as f64;
    for (i, vi) in v.iter_mut().enumerate() {
        *vi = (start as f64 + step * i as f64).round() as usize;
    }
    v[0] = start;
    v[n - 1] = end;
}
