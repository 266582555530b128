use super::{EngineError, Job, LinearEngine};
use crate::algebra::{CsrMatrix, FloatT};

/// Reference direct engine: dense LU with partial pivoting.
///
/// The bound sparse matrix is scattered to a dense array and factored as
/// `PA = LU`.  No symmetry is assumed, so this engine handles the full
/// three-block KKT form; the cubic factorisation cost limits it to moderate
/// system sizes, which is what it is for.
pub struct DenseLuEngine<T = f64> {
    n: usize,
    a: Vec<T>,
    lu: Vec<T>,
    piv: Vec<usize>,
    bound: bool,
    factorized: bool,
}

impl<T> DenseLuEngine<T>
where
    T: FloatT,
{
    pub fn new() -> Self {
        Self {
            n: 0,
            a: Vec::new(),
            lu: Vec::new(),
            piv: Vec::new(),
            bound: false,
            factorized: false,
        }
    }

    fn factorize(&mut self) -> Result<(), EngineError> {
        if !self.bound {
            return Err(EngineError::NoMatrix);
        }
        let n = self.n;
        self.lu.clear();
        self.lu.extend_from_slice(&self.a);
        self.piv.clear();
        self.piv.resize(n, 0);

        let lu = &mut self.lu;
        for k in 0..n {
            // pivot row by largest magnitude in column k
            let mut p = k;
            let mut pmax = lu[k * n + k].abs();
            for i in (k + 1)..n {
                let v = lu[i * n + k].abs();
                if v > pmax {
                    pmax = v;
                    p = i;
                }
            }
            if pmax == T::zero() {
                return Err(EngineError::SingularPivot(k));
            }
            self.piv[k] = p;
            if p != k {
                for j in 0..n {
                    lu.swap(k * n + j, p * n + j);
                }
            }

            let pivot = lu[k * n + k];
            for i in (k + 1)..n {
                let l = lu[i * n + k] / pivot;
                lu[i * n + k] = l;
                for j in (k + 1)..n {
                    let u = lu[k * n + j];
                    lu[i * n + j] = lu[i * n + j] - l * u;
                }
            }
        }
        self.factorized = true;
        Ok(())
    }

    fn solve(&mut self, rhs_sol: &mut [T]) -> Result<(), EngineError> {
        if !self.factorized {
            return Err(EngineError::NotFactorized);
        }
        if rhs_sol.len() != self.n {
            return Err(EngineError::BadRhsLength(rhs_sol.len(), self.n));
        }
        let n = self.n;
        let lu = &self.lu;

        for k in 0..n {
            rhs_sol.swap(k, self.piv[k]);
        }
        // forward substitution with the unit-diagonal L
        for i in 1..n {
            let mut s = rhs_sol[i];
            for j in 0..i {
                s -= lu[i * n + j] * rhs_sol[j];
            }
            rhs_sol[i] = s;
        }
        // back substitution with U
        for i in (0..n).rev() {
            let mut s = rhs_sol[i];
            for j in (i + 1)..n {
                s -= lu[i * n + j] * rhs_sol[j];
            }
            rhs_sol[i] = s / lu[i * n + i];
        }
        Ok(())
    }
}

impl<T> Default for DenseLuEngine<T>
where
    T: FloatT,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LinearEngine<T> for DenseLuEngine<T>
where
    T: FloatT,
{
    fn set_matrix(&mut self, mat: &CsrMatrix<T>) {
        assert!(mat.is_square(), "KKT matrix is not square");
        let n = mat.nrows();
        self.n = n;
        self.a.clear();
        self.a.resize(n * n, T::zero());
        let a = &mut self.a;
        mat.for_each_value(|r, c, v| a[r * n + c] = v);
        self.bound = true;
        self.factorized = false;
    }

    fn call(&mut self, job: Job, rhs_sol: &mut [T]) -> Result<(), EngineError> {
        match job {
            // all analysis here is the dense scatter done in set_matrix
            Job::Analyze => {
                if self.bound {
                    Ok(())
                } else {
                    Err(EngineError::NoMatrix)
                }
            }
            Job::Factorize | Job::AnalyzeFactorize => self.factorize(),
            Job::Solve => self.solve(rhs_sol),
            Job::FactorizeSolve => {
                self.factorize()?;
                self.solve(rhs_sol)
            }
            Job::End => {
                self.lu.clear();
                self.piv.clear();
                self.bound = false;
                self.factorized = false;
                Ok(())
            }
        }
    }

    fn requires_symmetric(&self) -> bool {
        false
    }
}
