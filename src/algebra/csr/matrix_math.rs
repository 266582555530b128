use crate::algebra::{CsrMatrix, FloatT, VectorMath};
use std::ops::Range;

impl<T> CsrMatrix<T>
where
    T: FloatT,
{
    /// Full matrix-vector product `y = A x`.
    ///
    /// # Panics
    /// Panics if `x` or `y` are shorter than the matrix dimensions require.
    pub fn mat_multiply(&self, x: &[T], y: &mut [T]) {
        self.mat_multiply_clipped(x, y, 0..self.nrows(), 0..self.ncols(), 0, 0);
    }

    /// Matrix-vector product restricted to the submatrix `rows x cols`.
    ///
    /// Computes, for each `i` in `rows`,
    ///
    /// ```text
    /// y[y_offset + i - rows.start] = Σ_{j in cols} A[i,j] * x[x_offset + j - cols.start]
    /// ```
    ///
    /// Stored entries outside the clipping window are skipped; the addressed
    /// span of `y` is overwritten.
    ///
    /// # Panics
    /// Panics if the window exceeds the matrix shape or the vectors are too
    /// short for the addressed spans.
    pub fn mat_multiply_clipped(
        &self,
        x: &[T],
        y: &mut [T],
        rows: Range<usize>,
        cols: Range<usize>,
        x_offset: usize,
        y_offset: usize,
    ) {
        assert!(rows.end <= self.nrows() && cols.end <= self.ncols());
        assert!(x.len() + cols.start >= x_offset + cols.end);
        assert!(y.len() + rows.start >= y_offset + rows.end);

        y[y_offset..y_offset + rows.len()].set(T::zero());
        if rows.is_empty() || cols.is_empty() {
            return;
        }

        if self.is_row_major() {
            for i in rows.clone() {
                let mut acc = T::zero();
                self.scan_window(i, |trail, v| {
                    if cols.contains(&trail) {
                        acc += v * x[x_offset + trail - cols.start];
                    }
                });
                y[y_offset + i - rows.start] = acc;
            }
        } else {
            for j in cols.clone() {
                let xj = x[x_offset + j - cols.start];
                self.scan_window(j, |trail, v| {
                    if rows.contains(&trail) {
                        y[y_offset + trail - rows.start] += v * xj;
                    }
                });
            }
        }
    }

    /// Visit every stored entry as `(row, col, value)`.
    pub fn for_each_value(&self, mut f: impl FnMut(usize, usize, T)) {
        self.for_each_value_in_range(0..self.nrows(), 0..self.ncols(), &mut f);
    }

    /// Visit every stored entry, with write access to the value.
    pub fn for_each_value_mut(&mut self, mut f: impl FnMut(usize, usize, &mut T)) {
        self.for_each_value_in_range_mut(0..self.nrows(), 0..self.ncols(), &mut f);
    }

    /// Visit the stored entries inside the `rows x cols` window.
    pub fn for_each_value_in_range(
        &self,
        rows: Range<usize>,
        cols: Range<usize>,
        mut f: impl FnMut(usize, usize, T),
    ) {
        let (leads, trails) = self.clip_windows(&rows, &cols);
        for lead in leads {
            self.scan_window(lead, |trail, v| {
                if trails.contains(&trail) {
                    let (r, c) = self.unmap_index(lead, trail);
                    f(r, c, v);
                }
            });
        }
    }

    /// Visit the stored entries inside the `rows x cols` window, with write
    /// access to the values.
    pub fn for_each_value_in_range_mut(
        &mut self,
        rows: Range<usize>,
        cols: Range<usize>,
        mut f: impl FnMut(usize, usize, &mut T),
    ) {
        let (leads, trails) = self.clip_windows(&rows, &cols);
        let row_major = self.is_row_major();
        let (lead_index, trail_index, values, initialized) = self.parts_mut();
        for lead in leads {
            for k in lead_index[lead]..lead_index[lead + 1] {
                if !initialized[k] {
                    continue;
                }
                let trail = trail_index[k];
                if trails.contains(&trail) {
                    let (r, c) = if row_major { (lead, trail) } else { (trail, lead) };
                    f(r, c, &mut values[k]);
                }
            }
        }
    }

    /// Visit every stored entry whose `(row, col, value)` triplet satisfies
    /// `requirement`.
    pub fn for_each_value_where(
        &self,
        requirement: impl Fn(usize, usize, T) -> bool,
        mut f: impl FnMut(usize, usize, T),
    ) {
        self.for_each_value(|r, c, v| {
            if requirement(r, c, v) {
                f(r, c, v);
            }
        });
    }

    // map a (rows, cols) window onto (leading, trailing) ranges
    fn clip_windows(&self, rows: &Range<usize>, cols: &Range<usize>) -> (Range<usize>, Range<usize>) {
        assert!(rows.end <= self.nrows() && cols.end <= self.ncols());
        if self.is_row_major() {
            (rows.clone(), cols.clone())
        } else {
            (cols.clone(), rows.clone())
        }
    }

    #[inline]
    fn unmap_index(&self, lead: usize, trail: usize) -> (usize, usize) {
        if self.is_row_major() {
            (lead, trail)
        } else {
            (trail, lead)
        }
    }

    // run over the initialized slots of one leading index
    #[inline]
    fn scan_window(&self, lead: usize, mut f: impl FnMut(usize, T)) {
        let lead_index = self.lead_index();
        for k in lead_index[lead]..lead_index[lead + 1] {
            if self.initialized_at(k) {
                f(self.trail_index()[k], self.values()[k]);
            }
        }
    }

    #[inline]
    fn initialized_at(&self, k: usize) -> bool {
        self.initialized_slots()[k]
    }
}
