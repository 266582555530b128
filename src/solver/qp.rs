use crate::algebra::{CsrMatrix, FloatT, SparseWrite};
use crate::solver::SystemDescriptor;

/// A ready-made [`SystemDescriptor`] for a standalone QP
///
/// ```text
/// minimize   ½ xᵀGx + cᵀx
/// subject to  Ax ≥ b
/// ```
///
/// given in the natural convention; the descriptor handles the sign flips the
/// solver expects from its multibody sources.  After a solve, `x` holds the
/// primal solution and `lam` the (nonnegative) constraint multipliers.
#[derive(Debug, Clone)]
pub struct QpProblem<T = f64> {
    pub g: CsrMatrix<T>,
    pub c: Vec<T>,
    pub a: CsrMatrix<T>,
    pub b: Vec<T>,
    /// diagonal of the compliance matrix E, if any
    pub compliance: Option<Vec<T>>,

    /// primal solution, written by the solver
    pub x: Vec<T>,
    /// constraint multipliers, written by the solver
    pub lam: Vec<T>,
}

impl<T> QpProblem<T>
where
    T: FloatT,
{
    pub fn new(g: CsrMatrix<T>, c: Vec<T>, a: CsrMatrix<T>, b: Vec<T>) -> Self {
        assert!(g.is_square());
        assert_eq!(g.nrows(), c.len());
        assert_eq!(a.ncols(), g.ncols());
        assert_eq!(a.nrows(), b.len());
        let n = c.len();
        let m = b.len();
        Self {
            g,
            c,
            a,
            b,
            compliance: None,
            x: vec![T::zero(); n],
            lam: vec![T::zero(); m],
        }
    }

    pub fn with_compliance(mut self, e_diag: Vec<T>) -> Self {
        assert_eq!(e_diag.len(), self.b.len());
        self.compliance = Some(e_diag);
        self
    }
}

impl<T> SystemDescriptor<T> for QpProblem<T>
where
    T: FloatT,
{
    fn count_active_variables(&self) -> usize {
        self.c.len()
    }

    fn count_active_constraints(&self, _include_bilateral: bool, _skip_contacts_uv: bool) -> usize {
        // every row here is a contact-normal constraint; there are no
        // tangent rows to skip
        self.b.len()
    }

    fn write_system_blocks(
        &self,
        out: &mut dyn SparseWrite<T>,
        at_col: usize,
        _skip_contacts_uv: bool,
    ) {
        let n = self.count_active_variables();
        self.g.for_each_value(|r, c, v| out.set_element(r, c, v, true));
        self.a.for_each_value(|r, c, v| {
            out.set_element(n + r, c, v, true);
            out.set_element(c, at_col + r, -v, true);
        });
    }

    fn write_compliance(&self, out: &mut dyn SparseWrite<T>, _skip_contacts_uv: bool) {
        if let Some(e) = &self.compliance {
            for (i, &ei) in e.iter().enumerate() {
                out.set_element(i, i, -ei, true);
            }
        }
    }

    fn write_vectors(&self, f: &mut [T], b: &mut [T], _skip_contacts_uv: bool) {
        for (fi, &ci) in f.iter_mut().zip(&self.c) {
            *fi = -ci;
        }
        for (bi, &v) in b.iter_mut().zip(&self.b) {
            *bi = -v;
        }
    }

    fn from_vector_to_unknowns(&mut self, sol: &[T], skip_contacts_uv: bool) {
        let n = self.x.len();
        let m = self.lam.len();
        self.x.copy_from_slice(&sol[0..n]);
        let stride = if skip_contacts_uv { 3 } else { 1 };
        for i in 0..m {
            self.lam[i] = -sol[n + i * stride];
        }
    }
}
