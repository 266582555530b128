use crate::algebra::{CsrMatrix, FloatT, SparseWrite, VectorMath};
use crate::solver::core::SolverError;
use crate::solver::KktMethod;

/// One KKT formulation: where its blocks live, which entries the solver owns,
/// and how steps move in and out of the stacked system.
///
/// The descriptor contributes `G`, `A` and `-Aᵀ`; everything else (identity
/// and complementarity stripes, slack diagonal) belongs to the strategy.  The
/// `symmetrized` flag says the `-Aᵀ` block has been flipped to `+Aᵀ` for an
/// engine that factors a symmetric form; the augmented strategy then writes
/// its slack diagonal negated, which makes the system quasidefinite and the
/// extracted multiplier step change sign.
pub(crate) trait KktStrategy<T: FloatT> {
    /// Number of rows of the stacked system.
    fn system_size(&self) -> usize;

    /// Column offset of the `-Aᵀ` block.
    fn at_col(&self) -> usize;

    /// Record the solver-owned structural positions.
    fn learn_stripes(&self, out: &mut dyn SparseWrite<T>);

    /// Write stripe values that never change between iterations.
    fn write_constant_stripes(&self, mat: &mut CsrMatrix<T>);

    /// Per-iteration refresh of the iterate-dependent stripes.
    fn refresh_stripes(
        &self,
        mat: &mut CsrMatrix<T>,
        y: &[T],
        lam: &[T],
        e_diag: Option<&[T]>,
        symmetrized: bool,
    );

    /// Fill the right-hand side for a solve with centering `sigma_mu`
    /// (zero for the affine direction).
    #[allow(clippy::too_many_arguments)]
    fn fill_rhs(
        &self,
        rhs: &mut [T],
        rd: &[T],
        rp: &[T],
        rpd: &[T],
        y: &[T],
        lam: &[T],
        sigma_mu: T,
    );

    /// Pull the primal and multiplier steps out of the stacked solution.
    fn extract_steps(&self, sol: &[T], dx: &mut [T], dlam: &mut [T], symmetrized: bool);
}

pub(crate) fn make_strategy<T: FloatT>(
    method: KktMethod,
    n: usize,
    m: usize,
) -> Result<Box<dyn KktStrategy<T>>, SolverError> {
    match method {
        KktMethod::Augmented => Ok(Box::new(AugmentedKkt { n, m })),
        KktMethod::Standard => Ok(Box::new(StandardKkt { n, m })),
        KktMethod::Normal => Err(SolverError::Unsupported(
            "the normal-equations KKT form is not implemented",
        )),
    }
}

/// Condensed `(n+m) x (n+m)` saddle form: the slack block is eliminated into
/// a multiplier-scaled diagonal.
pub(crate) struct AugmentedKkt {
    pub n: usize,
    pub m: usize,
}

impl<T: FloatT> KktStrategy<T> for AugmentedKkt {
    fn system_size(&self) -> usize {
        self.n + self.m
    }

    fn at_col(&self) -> usize {
        self.n
    }

    fn learn_stripes(&self, out: &mut dyn SparseWrite<T>) {
        // the whole diagonal is kept structural so no factorisation ever
        // meets an empty column
        for i in 0..self.n + self.m {
            out.set_element(i, i, T::zero(), true);
        }
    }

    fn write_constant_stripes(&self, _mat: &mut CsrMatrix<T>) {}

    fn refresh_stripes(
        &self,
        mat: &mut CsrMatrix<T>,
        y: &[T],
        lam: &[T],
        e_diag: Option<&[T]>,
        symmetrized: bool,
    ) {
        let n = self.n;
        for i in 0..self.m {
            let mut d = y[i] / lam[i];
            if let Some(e) = e_diag {
                d += e[i];
            }
            let d = if symmetrized { -d } else { d };
            mat.set_element(n + i, n + i, d, true);
        }
    }

    fn fill_rhs(
        &self,
        rhs: &mut [T],
        rd: &[T],
        rp: &[T],
        _rpd: &[T],
        y: &[T],
        lam: &[T],
        sigma_mu: T,
    ) {
        let n = self.n;
        for (r, &v) in rhs[0..n].iter_mut().zip(rd) {
            *r = -v;
        }
        for i in 0..self.m {
            rhs[n + i] = -rp[i] - y[i] + sigma_mu / lam[i];
        }
    }

    fn extract_steps(&self, sol: &[T], dx: &mut [T], dlam: &mut [T], symmetrized: bool) {
        let n = self.n;
        dx.copy_from(&sol[0..n]);
        dlam.copy_from(&sol[n..n + self.m]);
        if symmetrized {
            // the quasidefinite form solves for the negated multiplier step
            dlam.negate();
        }
    }
}

/// Full `(n+2m) x (n+2m)` primal-dual-complementarity system.
pub(crate) struct StandardKkt {
    pub n: usize,
    pub m: usize,
}

impl<T: FloatT> KktStrategy<T> for StandardKkt {
    fn system_size(&self) -> usize {
        self.n + 2 * self.m
    }

    fn at_col(&self) -> usize {
        self.n + self.m
    }

    fn learn_stripes(&self, out: &mut dyn SparseWrite<T>) {
        let (n, m) = (self.n, self.m);
        for i in 0..n + 2 * m {
            out.set_element(i, i, T::zero(), true);
        }
        // the complementarity stripe sits left of the diagonal
        for i in 0..m {
            out.set_element(n + m + i, n + i, T::zero(), true);
        }
    }

    fn write_constant_stripes(&self, mat: &mut CsrMatrix<T>) {
        let n = self.n;
        for i in 0..self.m {
            mat.set_element(n + i, n + i, -T::one(), true);
        }
    }

    fn refresh_stripes(
        &self,
        mat: &mut CsrMatrix<T>,
        y: &[T],
        lam: &[T],
        _e_diag: Option<&[T]>,
        _symmetrized: bool,
    ) {
        let (n, m) = (self.n, self.m);
        for i in 0..m {
            mat.set_element(n + m + i, n + i, lam[i], true);
            mat.set_element(n + m + i, n + m + i, y[i], true);
        }
    }

    fn fill_rhs(
        &self,
        rhs: &mut [T],
        rd: &[T],
        rp: &[T],
        rpd: &[T],
        _y: &[T],
        _lam: &[T],
        _sigma_mu: T,
    ) {
        // the centering perturbation arrives already folded into rpd
        let (n, m) = (self.n, self.m);
        for (r, &v) in rhs[0..n].iter_mut().zip(rd) {
            *r = -v;
        }
        for i in 0..m {
            rhs[n + i] = -rp[i];
            rhs[n + m + i] = -rpd[i];
        }
    }

    fn extract_steps(&self, sol: &[T], dx: &mut [T], dlam: &mut [T], _symmetrized: bool) {
        let (n, m) = (self.n, self.m);
        dx.copy_from(&sol[0..n]);
        dlam.copy_from(&sol[n + m..n + 2 * m]);
    }
}
