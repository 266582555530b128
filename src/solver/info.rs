use crate::algebra::FloatT;

/// Terminal state of a [`solve`](crate::solver::IpSolver::solve) call.
///
/// `MaxIterations` is reported, not fatal: the call still returns the best
/// iterate, so a multibody integrator can proceed with a degraded step.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
pub enum SolverStatus {
    #[default]
    Unsolved,
    Solved,
    MaxIterations,
}

impl std::fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Progress snapshot of the interior-point loop, queryable after each
/// [`solve`](crate::solver::IpSolver::solve).
#[derive(Debug, Clone, Default)]
pub struct IpInfo<T> {
    pub status: SolverStatus,
    /// iterations taken by the last solve
    pub iterations: u32,
    /// solve calls over the solver lifetime
    pub solver_calls: u32,
    /// complementarity measure yᵀλ/m
    pub mu: T,
    /// ‖rp‖₂/m
    pub rp_nnorm: T,
    /// ‖rd‖₂/n
    pub rd_nnorm: T,
    /// last centering parameter
    pub sigma: T,
    /// last primal step length
    pub step_primal: T,
    /// last dual step length
    pub step_dual: T,
}

impl<T> IpInfo<T>
where
    T: FloatT,
{
    pub(crate) fn print_header(&self, verbose: bool) {
        if !verbose {
            return;
        }
        println!("iter      mu        pres      dres      sigma    step(p)  step(d)");
        println!("------------------------------------------------------------------");
    }

    pub(crate) fn print_status(&self, verbose: bool, iter: u32) {
        if !verbose {
            return;
        }
        println!(
            "{:>3}  {:9.2e} {:9.2e} {:9.2e} {:8.2e} {:8.2e} {:8.2e}",
            iter, self.mu, self.rp_nnorm, self.rd_nnorm, self.sigma, self.step_primal, self.step_dual
        );
    }

    pub(crate) fn print_footer(&self, verbose: bool) {
        if !verbose {
            return;
        }
        println!(
            "status = {}, iterations = {} (solver call {})",
            self.status, self.iterations, self.solver_calls
        );
    }
}
