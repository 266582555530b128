use crate::algebra::{CsrMatrix, FloatT};
use thiserror::Error;

pub(crate) mod config;
pub mod ldl;
pub mod lu;

/// Work requests understood by a [`LinearEngine`].
///
/// The split mirrors the job control of the classic direct-solver libraries:
/// symbolic analysis, numeric factorisation and triangular solves can be
/// issued separately or in the usual fused combinations, and `End` releases
/// whatever the engine holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Analyze,
    Factorize,
    AnalyzeFactorize,
    Solve,
    FactorizeSolve,
    End,
}

/// Error codes returnable from [`LinearEngine`] calls.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("job issued before a matrix was bound")]
    NoMatrix,
    #[error("numeric job issued before symbolic analysis")]
    NotAnalyzed,
    #[error("solve issued before numeric factorisation")]
    NotFactorized,
    #[error("matrix is numerically singular at pivot {0}")]
    SingularPivot(usize),
    #[error("factorization failed: {0}")]
    Factorization(#[from] crate::ldl::LdlError),
    #[error("right-hand side length {0} does not match system size {1}")]
    BadRhsLength(usize, usize),
}

/// A direct sparse solver for the KKT systems built by the interior-point
/// loop.
///
/// The caller owns the CSR matrix and the right-hand-side buffer; the engine
/// owns everything it derives from them (orderings, symbolic analysis,
/// numeric factors).  [`set_matrix`](Self::set_matrix) binds or refreshes the
/// system matrix; an engine may keep its symbolic analysis when the structure
/// is unchanged, so a caller holding the sparsity pattern fixed pays the
/// analysis once.
///
/// `call(Job::Solve, rhs)` overwrites `rhs` with the solution in place; jobs
/// that do not solve ignore the buffer.
pub trait LinearEngine<T: FloatT> {
    /// Bind the system matrix, or refresh its values.
    fn set_matrix(&mut self, mat: &CsrMatrix<T>);

    /// Run one job of the factor/solve state machine.
    fn call(&mut self, job: Job, rhs_sol: &mut [T]) -> Result<(), EngineError>;

    /// Whether this engine factors a symmetric form and therefore expects the
    /// caller to hand over a structurally symmetric matrix.
    fn requires_symmetric(&self) -> bool;
}
