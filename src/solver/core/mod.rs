pub(crate) mod engines;
pub(crate) mod kkt;

use engines::EngineError;
use thiserror::Error;

/// Failures that abort a [`Solve`](crate::solver::IpSolver::solve) call.
///
/// The solver itself stays usable after any of these: its state and the
/// assembled KKT matrix remain valid for the next call.
#[derive(Error, Debug)]
pub enum SolverError {
    /// The direct linear solver reported a failure.
    #[error("linear engine failure")]
    LinearEngine(#[from] EngineError),

    /// Residuals diverged beyond recovery after the starting-point repair.
    #[error("iterate diverged after infeasible-start repair")]
    InfeasibleStart,

    /// The requested KKT formulation is not implemented.
    #[error("unsupported configuration: {0}")]
    Unsupported(&'static str),

    /// The settings are inconsistent (e.g. unknown linear engine name).
    #[error("invalid solver configuration: {0}")]
    Config(String),
}
