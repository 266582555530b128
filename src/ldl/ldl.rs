use crate::algebra::{AsFloatT, FloatT};
use derive_builder::Builder;
use std::iter::zip;
use thiserror::Error;

/// marker for "no parent" in the elimination tree
const NONE: usize = usize::MAX;

/// Error codes returnable from [`LdlFactorisation`] operations
#[derive(Error, Debug)]
pub enum LdlError {
    #[error("Matrix dimension fields are incompatible")]
    IncompatibleDimension,
    #[error("Matrix has an empty column")]
    EmptyColumn,
    #[error("Matrix is not upper triangular")]
    NotUpperTriangular,
    #[error("Matrix factorization produced a zero pivot")]
    ZeroPivot,
    #[error("Invalid permutation vector")]
    InvalidPermutation,
}

/// Options for [`LdlFactorisation`]
#[derive(Builder, Debug, Clone)]
pub struct LdlSettings<T: FloatT> {
    /// scaling of the AMD dense-column threshold
    #[builder(default = "1.5")]
    pub amd_dense_scale: f64,
    /// user-supplied fill-reducing ordering; AMD is used when absent
    #[builder(default = "None", setter(strip_option))]
    pub perm: Option<Vec<usize>>,
    /// expected signs of the diagonal of D; all positive when absent
    #[builder(default = "None", setter(strip_option))]
    pub dsigns: Option<Vec<i8>>,
    /// bump pivots whose sign disagrees with the expected inertia
    #[builder(default = "true")]
    pub regularize_enable: bool,
    #[builder(default = "(1e-12).as_T()")]
    pub regularize_eps: T,
    #[builder(default = "(1e-7).as_T()")]
    pub regularize_delta: T,
}

impl<T> Default for LdlSettings<T>
where
    T: FloatT,
{
    fn default() -> LdlSettings<T> {
        LdlSettingsBuilder::<T>::default().build().unwrap()
    }
}

/// LDLᵀ factors of a symmetric quasidefinite matrix.
///
/// The matrix is handed over once, in upper-triangular CSC form, at
/// construction time; construction performs the fill-reducing ordering and the
/// symbolic analysis.  Values can then be refreshed any number of times
/// through [`load_values`](Self::load_values) or
/// [`update_values`](Self::update_values) followed by a
/// [`factor`](Self::factor), without repeating the analysis.
#[derive(Debug)]
pub struct LdlFactorisation<T = f64> {
    n: usize,

    // fill-reducing permutation and its inverse
    perm: Vec<usize>,
    iperm: Vec<usize>,

    // permuted upper-triangular matrix PAPᵀ, columns unordered
    pap_p: Vec<usize>,
    pap_i: Vec<usize>,
    pap_x: Vec<T>,
    // mapping from input entry positions to positions in pap_x
    input_map: Vec<usize>,

    // elimination tree and per-column L counts
    etree: Vec<usize>,
    lnz: Vec<usize>,

    // the L factor (unit diagonal implicit) and D
    lp: Vec<usize>,
    li: Vec<usize>,
    lx: Vec<T>,
    d: Vec<T>,
    dinv: Vec<T>,

    // elimination workspace
    ymarker: Vec<bool>,
    yidx: Vec<usize>,
    elim: Vec<usize>,
    colspace: Vec<usize>,
    yvals: Vec<T>,
    fwork: Vec<T>,

    // regularization
    dsigns: Vec<i8>,
    regularize_enable: bool,
    regularize_eps: T,
    regularize_delta: T,
    regularize_count: usize,
    positive_inertia: usize,

    factored: bool,
}

impl<T> LdlFactorisation<T>
where
    T: FloatT,
{
    /// Analyse an `n x n` upper-triangular CSC matrix.
    ///
    /// Numeric factorisation is deferred to [`factor`](Self::factor).
    pub fn new(
        n: usize,
        ap: &[usize],
        ai: &[usize],
        ax: &[T],
        opts: Option<LdlSettings<T>>,
    ) -> Result<Self, LdlError> {
        check_structure(n, ap, ai, ax)?;
        let opts = opts.unwrap_or_default();

        let (perm, iperm) = match opts.perm {
            Some(perm) => {
                let iperm = invert_permutation(&perm)?;
                (perm, iperm)
            }
            None => amd_ordering(n, ap, ai, opts.amd_dense_scale),
        };

        // permute to (another) upper triangular matrix, recording where each
        // input entry lands so values can be refreshed without re-analysis
        let nnz = ap[n];
        let mut pap_p = vec![0; n + 1];
        let mut pap_i = vec![0; nnz];
        let mut pap_x = vec![T::zero(); nnz];
        let mut input_map = vec![0; nnz];
        permute_symmetric(
            n,
            ap,
            ai,
            ax,
            &iperm,
            &mut pap_p,
            &mut pap_i,
            &mut pap_x,
            &mut input_map,
        );

        let mut dsigns = vec![1_i8; n];
        if let Some(ds) = opts.dsigns {
            if ds.len() != n {
                return Err(LdlError::IncompatibleDimension);
            }
            // permute the expected signs along with the matrix
            for (i, s) in dsigns.iter_mut().enumerate() {
                *s = ds[perm[i]];
            }
        }

        let mut etree = vec![NONE; n];
        let mut lnz = vec![0; n];
        elimination_tree(n, &pap_p, &pap_i, &mut etree, &mut lnz)?;
        let lnz_total: usize = lnz.iter().sum();

        Ok(Self {
            n,
            perm,
            iperm,
            pap_p,
            pap_i,
            pap_x,
            input_map,
            etree,
            lnz,
            lp: vec![0; n + 1],
            li: vec![0; lnz_total],
            lx: vec![T::zero(); lnz_total],
            d: vec![T::zero(); n],
            dinv: vec![T::zero(); n],
            ymarker: vec![false; n],
            yidx: vec![0; n],
            elim: vec![0; n],
            colspace: vec![0; n],
            yvals: vec![T::zero(); n],
            fwork: vec![T::zero(); n],
            dsigns,
            regularize_enable: opts.regularize_enable,
            regularize_eps: opts.regularize_eps,
            regularize_delta: opts.regularize_delta,
            regularize_count: 0,
            positive_inertia: 0,
            factored: false,
        })
    }

    pub fn dim(&self) -> usize {
        self.n
    }

    /// Number of positive pivots in D after the last factorisation.
    pub fn positive_inertia(&self) -> usize {
        self.positive_inertia
    }

    /// Number of pivots bumped by dynamic regularization in the last
    /// factorisation.
    pub fn regularize_count(&self) -> usize {
        self.regularize_count
    }

    /// Overwrite selected values.  `indices` address entries by their position
    /// in the matrix originally passed to [`new`](Self::new).
    pub fn update_values(&mut self, indices: &[usize], values: &[T]) {
        for (&idx, &v) in zip(indices, values) {
            self.pap_x[self.input_map[idx]] = v;
        }
        self.factored = false;
    }

    /// Refresh all values.  `ax` is parallel to the value array originally
    /// passed to [`new`](Self::new).
    pub fn load_values(&mut self, ax: &[T]) {
        assert_eq!(ax.len(), self.input_map.len());
        for (&map, &v) in zip(&self.input_map, ax) {
            self.pap_x[map] = v;
        }
        self.factored = false;
    }

    /// Numeric factorisation with the current values.
    pub fn factor(&mut self) -> Result<(), LdlError> {
        let positive_inertia = factor_numeric(
            self.n,
            &self.pap_p,
            &self.pap_i,
            &self.pap_x,
            &mut self.lp,
            &mut self.li,
            &mut self.lx,
            &mut self.d,
            &mut self.dinv,
            &self.lnz,
            &self.etree,
            &mut self.ymarker,
            &mut self.yidx,
            &mut self.elim,
            &mut self.colspace,
            &mut self.yvals,
            &self.dsigns,
            self.regularize_enable,
            self.regularize_eps,
            self.regularize_delta,
            &mut self.regularize_count,
        )?;
        self.positive_inertia = positive_inertia;
        self.factored = true;
        Ok(())
    }

    /// Solve `Ax = b` with the current factors, overwriting `b` with `x`.
    ///
    /// # Panics
    /// Panics if no numeric factorisation is available or `b` has the wrong
    /// length.
    pub fn solve(&mut self, b: &mut [T]) {
        assert!(self.factored, "solve requires a numeric factorisation");
        assert_eq!(b.len(), self.n);

        // permuted copy of the right-hand side
        let x = &mut self.fwork;
        for (xi, &p) in zip(x.iter_mut(), &self.perm) {
            *xi = b[p];
        }

        lsolve(&self.lp, &self.li, &self.lx, x);
        for (xi, &di) in zip(x.iter_mut(), &self.dinv) {
            *xi *= di;
        }
        ltsolve(&self.lp, &self.li, &self.lx, x);

        // inverse permutation puts the solution back in the caller's order
        for (&xi, &p) in zip(x.iter(), &self.perm) {
            b[p] = xi;
        }
    }
}

fn check_structure<T: FloatT>(
    n: usize,
    ap: &[usize],
    ai: &[usize],
    ax: &[T],
) -> Result<(), LdlError> {
    if ap.len() != n + 1 || ai.len() != ap[n] || ax.len() != ap[n] {
        return Err(LdlError::IncompatibleDimension);
    }
    for col in 0..n {
        if ap[col] == ap[col + 1] {
            return Err(LdlError::EmptyColumn);
        }
        if ai[ap[col]..ap[col + 1]].iter().any(|&row| row > col) {
            return Err(LdlError::NotUpperTriangular);
        }
    }
    Ok(())
}

// Compute the elimination tree of the permuted matrix, along with the
// column counts of L.
fn elimination_tree(
    n: usize,
    ap: &[usize],
    ai: &[usize],
    etree: &mut [usize],
    lnz: &mut [usize],
) -> Result<(), LdlError> {
    let mut work = vec![0usize; n];

    etree.fill(NONE);
    lnz.fill(0);

    for j in 0..n {
        work[j] = j;
        for &istart in ai.iter().take(ap[j + 1]).skip(ap[j]) {
            let mut i = istart;
            while work[i] != j {
                if etree[i] == NONE {
                    etree[i] = j;
                }
                lnz[i] += 1;
                work[i] = j;
                i = etree[i];
            }
        }
    }
    Ok(())
}

// Up-looking numeric factorisation.  The argument list mirrors the
// workspace split of the C QDLDL routine this follows.
#[allow(clippy::too_many_arguments)]
fn factor_numeric<T: FloatT>(
    n: usize,
    ap: &[usize],
    ai: &[usize],
    ax: &[T],
    lp: &mut [usize],
    li: &mut [usize],
    lx: &mut [T],
    d: &mut [T],
    dinv: &mut [T],
    lnz: &[usize],
    etree: &[usize],
    ymarker: &mut [bool],
    yidx: &mut [usize],
    elim: &mut [usize],
    colspace: &mut [usize],
    yvals: &mut [T],
    dsigns: &[i8],
    regularize_enable: bool,
    regularize_eps: T,
    regularize_delta: T,
    regularize_count: &mut usize,
) -> Result<usize, LdlError> {
    *regularize_count = 0;
    let mut positive_inertia = 0;

    // set lp to cumsum(lnz) and point each column at its first free slot
    lp[0] = 0;
    for i in 0..n {
        lp[i + 1] = lp[i] + lnz[i];
    }
    colspace.copy_from_slice(&lp[0..n]);

    ymarker.fill(false);
    yvals.fill(T::zero());
    d.fill(T::zero());

    // the first pivot: column 0 of an upper triangular matrix can hold
    // nothing but the diagonal
    if ap[1] > ap[0] {
        d[0] = ax[ap[0]];
    }
    regularize_pivot(&mut d[0], dsigns[0], regularize_enable, regularize_eps, regularize_delta, regularize_count);
    if d[0] == T::zero() {
        return Err(LdlError::ZeroPivot);
    }
    if d[0] > T::zero() {
        positive_inertia += 1;
    }
    dinv[0] = T::recip(d[0]);

    for k in 1..n {
        // Determine the nonzero pattern of the kth row of L: every
        // above-diagonal entry of column k seeds a walk up the elimination
        // tree, and the unvisited part of each path is buffered so that the
        // final ordering is topological.
        let mut nnz_y = 0;
        for p in ap[k]..ap[k + 1] {
            let bidx = ai[p];

            if bidx == k {
                d[k] = ax[p];
                continue;
            }

            yvals[bidx] = ax[p];

            if !ymarker[bidx] {
                ymarker[bidx] = true;
                elim[0] = bidx;
                let mut nnz_e = 1;

                let mut next = etree[bidx];
                while next != NONE && next < k {
                    if ymarker[next] {
                        break;
                    }
                    ymarker[next] = true;
                    elim[nnz_e] = next;
                    nnz_e += 1;
                    next = etree[next];
                }

                while nnz_e != 0 {
                    nnz_e -= 1;
                    yidx[nnz_y] = elim[nnz_e];
                    nnz_y += 1;
                }
            }
        }

        // Eliminate: solve y = L(0:k-1, 0:k-1) \ b and scatter the result
        // into row k of L, updating the pivot as we go.
        for i in (0..nnz_y).rev() {
            let cidx = yidx[i];
            let yc = yvals[cidx];

            let first = lp[cidx];
            let last = colspace[cidx];
            for j in first..last {
                yvals[li[j]] -= lx[j] * yc;
            }

            lx[last] = yc * dinv[cidx];
            li[last] = k;
            d[k] -= yc * lx[last];
            colspace[cidx] += 1;

            yvals[cidx] = T::zero();
            ymarker[cidx] = false;
        }

        regularize_pivot(&mut d[k], dsigns[k], regularize_enable, regularize_eps, regularize_delta, regularize_count);
        if d[k] == T::zero() {
            return Err(LdlError::ZeroPivot);
        }
        if d[k] > T::zero() {
            positive_inertia += 1;
        }
        dinv[k] = T::recip(d[k]);
    }

    Ok(positive_inertia)
}

#[inline]
fn regularize_pivot<T: FloatT>(
    pivot: &mut T,
    sign: i8,
    enable: bool,
    eps: T,
    delta: T,
    count: &mut usize,
) {
    if !enable {
        return;
    }
    let sign = T::from_i8(sign).unwrap();
    if *pivot * sign < eps {
        *pivot = delta * sign;
        *count += 1;
    }
}

// Solves (L+I)x = b, with x replacing b
fn lsolve<T: FloatT>(lp: &[usize], li: &[usize], lx: &[T], x: &mut [T]) {
    for i in 0..x.len() {
        let xi = x[i];
        for (&lij, &lxj) in zip(&li[lp[i]..lp[i + 1]], &lx[lp[i]..lp[i + 1]]) {
            x[lij] -= lxj * xi;
        }
    }
}

// Solves (L+I)ᵀx = b, with x replacing b
fn ltsolve<T: FloatT>(lp: &[usize], li: &[usize], lx: &[T], x: &mut [T]) {
    for i in (0..x.len()).rev() {
        let mut s = T::zero();
        for (&lij, &lxj) in zip(&li[lp[i]..lp[i + 1]], &lx[lp[i]..lp[i + 1]]) {
            s += lxj * x[lij];
        }
        x[i] -= s;
    }
}

fn invert_permutation(p: &[usize]) -> Result<Vec<usize>, LdlError> {
    let mut inv = vec![NONE; p.len()];
    for (i, &j) in p.iter().enumerate() {
        if j >= p.len() || inv[j] != NONE {
            return Err(LdlError::InvalidPermutation);
        }
        inv[j] = i;
    }
    Ok(inv)
}

// Permute a sparse symmetric matrix given in upper triangular form, returning
// another upper triangular matrix along with the entry mapping.  Follows
// Davis, "Direct Methods for Sparse Linear Systems".
#[allow(clippy::too_many_arguments)]
fn permute_symmetric<T: FloatT>(
    n: usize,
    ap: &[usize],
    ai: &[usize],
    ax: &[T],
    iperm: &[usize],
    pp: &mut [usize],
    pi: &mut [usize],
    px: &mut [T],
    input_map: &mut [usize],
) {
    // 1. count the entries each permuted column will receive
    let mut counts = vec![0usize; n];
    for col in 0..n {
        let pcol = iperm[col];
        for &row in ai.iter().take(ap[col + 1]).skip(ap[col]) {
            let prow = iperm[row];
            counts[std::cmp::max(prow, pcol)] += 1;
        }
    }

    // 2. column pointers from the counts
    pp[0] = 0;
    for j in 0..n {
        pp[j + 1] = pp[j] + counts[j];
    }
    // reuse as next-free-slot cursors
    counts.copy_from_slice(&pp[0..n]);

    // 3. place the entries; columns come out unordered, which the
    // factorisation tolerates
    for col in 0..n {
        let pcol = iperm[col];
        for idx in ap[col]..ap[col + 1] {
            let prow = iperm[ai[idx]];
            let dest_col = std::cmp::max(prow, pcol);
            let dest = counts[dest_col];
            pi[dest] = std::cmp::min(prow, pcol);
            px[dest] = ax[idx];
            input_map[idx] = dest;
            counts[dest_col] += 1;
        }
    }
}

fn amd_ordering(n: usize, ap: &[usize], ai: &[usize], dense_scale: f64) -> (Vec<usize>, Vec<usize>) {
    // AMD with a slightly more generous dense-row threshold, which behaves
    // better on KKT systems from QPs than the stock default
    let mut control = amd::Control::default();
    control.dense *= dense_scale;
    let (perm, iperm, _info) = amd::order(n, ap, ai, &control).unwrap();
    (perm, iperm)
}

//configure tests of internals
#[path = "test.rs"]
#[cfg(test)]
mod test;
