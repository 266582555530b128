use super::{EngineError, Job, LinearEngine};
use crate::algebra::{CsrMatrix, FloatT};
use crate::ldl::{LdlFactorisation, LdlSettings};

/// Direct engine factoring the symmetric (quasidefinite) KKT form with the
/// in-tree sparse LDLᵀ.
///
/// [`set_matrix`](LinearEngine::set_matrix) reads the lower triangle of the
/// bound matrix, which for a structurally symmetric CSR matrix is exactly the
/// upper-triangular CSC form the factorisation wants.  The symbolic analysis
/// is cached: rebinding a matrix with an unchanged structure refreshes values
/// only, so a caller that keeps its sparsity pattern locked pays for the AMD
/// ordering and elimination tree once.
pub struct LdlEngine<T = f64>
where
    T: FloatT,
{
    settings: LdlSettings<T>,
    n: usize,

    // gathered upper-triangular CSC view of the bound matrix
    ap: Vec<usize>,
    ai: Vec<usize>,
    ax: Vec<T>,

    factors: Option<LdlFactorisation<T>>,
    factorized: bool,
    bound: bool,
}

impl<T> LdlEngine<T>
where
    T: FloatT,
{
    pub fn new(settings: LdlSettings<T>) -> Self {
        Self {
            settings,
            n: 0,
            ap: Vec::new(),
            ai: Vec::new(),
            ax: Vec::new(),
            factors: None,
            factorized: false,
            bound: false,
        }
    }

    fn analyze(&mut self) -> Result<(), EngineError> {
        if !self.bound {
            return Err(EngineError::NoMatrix);
        }
        if self.factors.is_none() {
            let factors = LdlFactorisation::new(
                self.n,
                &self.ap,
                &self.ai,
                &self.ax,
                Some(self.settings.clone()),
            )?;
            self.factors = Some(factors);
        }
        Ok(())
    }

    fn factorize(&mut self) -> Result<(), EngineError> {
        if !self.bound {
            return Err(EngineError::NoMatrix);
        }
        let factors = self.factors.as_mut().ok_or(EngineError::NotAnalyzed)?;
        factors.load_values(&self.ax);
        factors.factor()?;
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
        self.factors.as_mut().unwrap().solve(rhs_sol);
        Ok(())
    }
}

impl<T> Default for LdlEngine<T>
where
    T: FloatT,
{
    fn default() -> Self {
        Self::new(LdlSettings::default())
    }
}

impl<T> LinearEngine<T> for LdlEngine<T>
where
    T: FloatT,
{
    fn set_matrix(&mut self, mat: &CsrMatrix<T>) {
        assert!(mat.is_square(), "KKT matrix is not square");
        let n = mat.nrows();

        // one triangle of the symmetric matrix, read in leading-dimension
        // order: entries with trail <= lead form the upper-triangular CSC
        // view in either storage orientation
        let mut ap = Vec::with_capacity(n + 1);
        let mut ai = Vec::with_capacity(mat.nnz());
        let mut ax = Vec::with_capacity(mat.nnz());
        ap.push(0);
        let lead_index = mat.lead_index();
        let trail_index = mat.trail_index();
        let values = mat.values();
        let initialized = mat.initialized_slots();
        for lead in 0..n {
            for k in lead_index[lead]..lead_index[lead + 1] {
                if initialized[k] && trail_index[k] <= lead {
                    ai.push(trail_index[k]);
                    ax.push(values[k]);
                }
            }
            ap.push(ai.len());
        }

        let structure_unchanged = self.bound && self.n == n && self.ap == ap && self.ai == ai;
        if !structure_unchanged {
            self.factors = None;
        }
        self.n = n;
        self.ap = ap;
        self.ai = ai;
        self.ax = ax;
        self.bound = true;
        self.factorized = false;
    }

    fn call(&mut self, job: Job, rhs_sol: &mut [T]) -> Result<(), EngineError> {
        match job {
            Job::Analyze => self.analyze(),
            Job::Factorize => self.factorize(),
            Job::AnalyzeFactorize => {
                self.analyze()?;
                self.factorize()
            }
            Job::Solve => self.solve(rhs_sol),
            Job::FactorizeSolve => {
                self.factorize()?;
                self.solve(rhs_sol)
            }
            Job::End => {
                self.factors = None;
                self.factorized = false;
                self.bound = false;
                Ok(())
            }
        }
    }

    fn requires_symmetric(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::VectorMath;

    #[test]
    fn test_solves_spd_system() {
        // A = [4 1; 1 3], x = (1, 2) => b = (6, 7)
        let mat =
            CsrMatrix::from_triplets(2, 2, &[(0, 0, 4.), (0, 1, 1.), (1, 0, 1.), (1, 1, 3.)]);

        let mut engine = LdlEngine::<f64>::default();
        engine.set_matrix(&mat);
        let mut rhs = vec![6., 7.];
        engine.call(Job::AnalyzeFactorize, &mut rhs).unwrap();
        engine.call(Job::Solve, &mut rhs).unwrap();
        assert!(rhs.dist(&vec![1., 2.]) <= 1e-12);
    }

    #[test]
    fn test_structure_cache_survives_value_refresh() {
        let mut mat =
            CsrMatrix::from_triplets(2, 2, &[(0, 0, 4.), (0, 1, 1.), (1, 0, 1.), (1, 1, 3.)]);

        let mut engine = LdlEngine::<f64>::default();
        engine.set_matrix(&mat);
        let mut rhs = vec![6., 7.];
        engine.call(Job::AnalyzeFactorize, &mut rhs).unwrap();

        // same structure, new values: only a refactor is needed
        mat.set_element(1, 1, 5., true);
        engine.set_matrix(&mat);
        let mut rhs = vec![6., 11.]; // x = (1, 2) for the updated matrix
        engine.call(Job::FactorizeSolve, &mut rhs).unwrap();
        assert!(rhs.dist(&vec![1., 2.]) <= 1e-12);
    }

    #[test]
    fn test_job_ordering_errors() {
        let mut engine = LdlEngine::<f64>::default();
        let mut rhs = vec![0.; 2];
        assert!(matches!(
            engine.call(Job::Factorize, &mut rhs),
            Err(EngineError::NoMatrix)
        ));

        let mat = CsrMatrix::identity(2);
        engine.set_matrix(&mat);
        assert!(matches!(
            engine.call(Job::Factorize, &mut rhs),
            Err(EngineError::NotAnalyzed)
        ));
        assert!(matches!(
            engine.call(Job::Solve, &mut rhs),
            Err(EngineError::NotFactorized)
        ));

        engine.call(Job::AnalyzeFactorize, &mut rhs).unwrap();
        engine.call(Job::End, &mut rhs).unwrap();
        assert!(matches!(
            engine.call(Job::Solve, &mut rhs),
            Err(EngineError::NotFactorized)
        ));
    }
}
