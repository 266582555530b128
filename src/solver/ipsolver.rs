use super::core::engines::{config, Job, LinearEngine};
use super::core::kkt::{make_strategy, KktStrategy};
use super::core::SolverError;
use super::{IpInfo, IpSettings, KktMethod, SolverStatus, SystemDescriptor};
use crate::algebra::*;
use itertools::izip;

/// residual norms beyond this after the starting-point repair mean the
/// problem data is unusable
const DIVERGENCE_LIMIT: f64 = 1e50;

/// Primal-dual predictor-corrector interior-point solver for
///
/// ```text
/// minimize   ½ xᵀGx + cᵀx
/// subject to  Ax ≥ b
/// ```
///
/// The solver owns its KKT matrix, right-hand-side buffer and all dense
/// workspaces; iterations allocate nothing.  Problem data is pulled from a
/// [`SystemDescriptor`](crate::solver::SystemDescriptor) on every
/// [`solve`](Self::solve) call, and the KKT sparsity pattern is learned once
/// and reused for as long as the problem sizes stay put.
pub struct IpSolver<T = f64>
where
    T: FloatT,
{
    settings: IpSettings<T>,

    n: usize,
    m: usize,

    // primal-side iterate, data and workspaces (length n)
    x: Vec<T>,
    dx: Vec<T>,
    c: Vec<T>,
    rd: Vec<T>,
    vectn: Vec<T>,

    // constraint-side iterates, data and workspaces (length m)
    y: Vec<T>,
    lam: Vec<T>,
    dy: Vec<T>,
    dlam: Vec<T>,
    b: Vec<T>,
    rp: Vec<T>,
    rpd: Vec<T>,
    vectm: Vec<T>,

    // the stacked KKT system
    big_mat: CsrMatrix<T>,
    rhs_sol: Vec<T>,
    strategy: Option<Box<dyn KktStrategy<T>>>,
    engine: Option<Box<dyn LinearEngine<T>>>,

    // compliance, when enabled: the positive E matrix and its diagonal
    e_mat: Option<CsrMatrix<T>>,
    e_diag: Vec<T>,

    // solution vector in descriptor layout
    sol: Vec<T>,

    mu: T,
    info: IpInfo<T>,
    pattern_learned: bool,
    analyzed: bool,
    at_flipped: bool,
}

impl<T> IpSolver<T>
where
    T: FloatT,
{
    pub fn new(settings: IpSettings<T>) -> Self {
        Self {
            settings,
            n: 0,
            m: 0,
            x: Vec::new(),
            dx: Vec::new(),
            c: Vec::new(),
            rd: Vec::new(),
            vectn: Vec::new(),
            y: Vec::new(),
            lam: Vec::new(),
            dy: Vec::new(),
            dlam: Vec::new(),
            b: Vec::new(),
            rp: Vec::new(),
            rpd: Vec::new(),
            vectm: Vec::new(),
            big_mat: CsrMatrix::new(1, 1, true, 0),
            rhs_sol: Vec::new(),
            strategy: None,
            engine: None,
            e_mat: None,
            e_diag: Vec::new(),
            sol: Vec::new(),
            mu: T::zero(),
            info: IpInfo::default(),
            pattern_learned: false,
            analyzed: false,
            at_flipped: false,
        }
    }

    pub fn settings(&self) -> &IpSettings<T> {
        &self.settings
    }

    /// Progress of the most recent [`solve`](Self::solve).
    pub fn info(&self) -> &IpInfo<T> {
        &self.info
    }

    /// Solve the QP currently described by `sysd` and hand the solution back
    /// to it.  Returns the objective value at the final iterate.
    ///
    /// A `MaxIterations` outcome is reported through
    /// [`info`](Self::info), not as an error; the best iterate found is still
    /// emitted.
    pub fn solve(&mut self, sysd: &mut dyn SystemDescriptor<T>) -> Result<T, SolverError> {
        self.info.solver_calls += 1;
        self.info.status = SolverStatus::Unsolved;
        self.info.iterations = 0;

        let n = sysd.count_active_variables();
        let m = sysd.count_active_constraints(false, self.settings.skip_contacts_uv);
        assert!(n > 0, "descriptor reports no active variables");

        let sizes_changed = n != self.n || m != self.m || self.strategy.is_none();
        if sizes_changed {
            self.reset_dimensions(n, m)?;
        }

        self.assemble(sysd)?;

        // with no active constraints the QP is a single linear solve
        if m == 0 {
            return self.solve_unconstrained(sysd);
        }

        if self.settings.add_compliance {
            self.load_compliance(sysd);
        }

        self.starting_point(sizes_changed)?;

        self.info.print_header(self.settings.verbose);
        let mut iter = 0;
        let mut converged = self.check_exit_conditions();
        while iter < self.settings.max_iter && !converged {
            iter += 1;
            self.iterate()?;
            converged = self.check_exit_conditions();
            self.info.print_status(self.settings.verbose, iter);
        }

        self.info.iterations = iter;
        self.info.status = if converged {
            SolverStatus::Solved
        } else {
            SolverStatus::MaxIterations
        };
        self.info.print_footer(self.settings.verbose);

        self.generate_solution();
        sysd.from_vector_to_unknowns(&self.sol, self.settings.skip_contacts_uv);
        Ok(self.objective_value())
    }

    // ------------------------------------------------------------------
    // setup

    fn reset_dimensions(&mut self, n: usize, m: usize) -> Result<(), SolverError> {
        self.n = n;
        self.m = m;

        for v in [&mut self.x, &mut self.dx, &mut self.c, &mut self.rd, &mut self.vectn] {
            v.clear();
            v.resize(n, T::zero());
        }
        for v in [
            &mut self.y,
            &mut self.lam,
            &mut self.dy,
            &mut self.dlam,
            &mut self.b,
            &mut self.rp,
            &mut self.rpd,
            &mut self.vectm,
        ] {
            v.clear();
            v.resize(m, T::zero());
        }

        let strategy = make_strategy::<T>(self.settings.kkt_method, n, m)?;
        let sys_size = strategy.system_size();

        self.big_mat = CsrMatrix::new(sys_size, sys_size, true, 0);
        self.big_mat.set_max_shifts(self.settings.max_shifts);
        self.rhs_sol.clear();
        self.rhs_sol.resize(sys_size, T::zero());

        self.engine = Some(config::make_engine(&self.settings, sys_size, n)?);
        self.strategy = Some(strategy);

        let sol_len = n + if self.settings.skip_contacts_uv { 3 * m } else { m };
        self.sol.clear();
        self.sol.resize(sol_len, T::zero());

        self.e_mat = None;
        self.e_diag.clear();
        self.pattern_learned = false;
        self.analyzed = false;
        Ok(())
    }

    /// Pull the system blocks and vectors out of the descriptor.  The first
    /// assembly for a given shape runs a pattern-learning pass so that every
    /// later one reuses the locked structure.
    fn assemble(&mut self, sysd: &mut dyn SystemDescriptor<T>) -> Result<(), SolverError> {
        let skip_uv = self.settings.skip_contacts_uv;
        let strategy = self.strategy.as_ref().unwrap();
        let sys_size = strategy.system_size();
        let at_col = strategy.at_col();

        if !self.pattern_learned {
            let mut learner = SparsityLearner::new(sys_size, sys_size);
            sysd.write_system_blocks(&mut learner, at_col, skip_uv);
            strategy.learn_stripes(&mut learner);
            self.big_mat.load_sparsity_pattern(&mut learner);
            self.big_mat.set_sparsity_pattern_lock(true);
            self.pattern_learned = true;
            self.analyzed = false;
        } else {
            self.big_mat.reset(sys_size, sys_size, 0);
        }

        sysd.write_system_blocks(&mut self.big_mat, at_col, skip_uv);
        let strategy = self.strategy.as_ref().unwrap();
        strategy.write_constant_stripes(&mut self.big_mat);

        // engines that factor a symmetric form get +Aᵀ in place of -Aᵀ
        self.at_flipped = self.engine.as_ref().unwrap().requires_symmetric() && self.m > 0;
        if self.at_flipped {
            self.make_positive_definite();
        }

        // the descriptor delivers f = -c and -b
        sysd.write_vectors(&mut self.c, &mut self.b, skip_uv);
        self.c.negate();
        self.b.negate();
        Ok(())
    }

    /// Flip the sign of the `-Aᵀ` block, turning the saddle system into the
    /// form a symmetric factorisation accepts.
    fn make_positive_definite(&mut self) {
        let (n, m) = (self.n, self.m);
        let at_col = self.strategy.as_ref().unwrap().at_col();
        self.big_mat
            .for_each_value_in_range_mut(0..n, at_col..at_col + m, |_r, _c, v| *v = -*v);
    }

    fn load_compliance(&mut self, sysd: &mut dyn SystemDescriptor<T>) {
        let m = self.m;
        let mut e = CsrMatrix::new(m, m, true, m);
        sysd.write_compliance(&mut e, self.settings.skip_contacts_uv);
        // the descriptor writes the block as it appears in the saddle
        // matrix, i.e. -E
        e.for_each_value_mut(|_r, _c, v| *v = -*v);

        self.e_diag.clear();
        self.e_diag.resize(m, T::zero());
        for (i, ei) in self.e_diag.iter_mut().enumerate() {
            *ei = e.get_element(i, i);
        }
        self.e_mat = Some(e);
    }

    // ------------------------------------------------------------------
    // unconstrained fast path

    fn solve_unconstrained(&mut self, sysd: &mut dyn SystemDescriptor<T>) -> Result<T, SolverError> {
        let n = self.n;
        for (r, &ci) in self.rhs_sol[0..n].iter_mut().zip(&self.c) {
            *r = -ci;
        }

        let engine = self.engine.as_mut().unwrap();
        engine.set_matrix(&self.big_mat);
        engine.call(Job::AnalyzeFactorize, &mut self.rhs_sol)?;
        engine.call(Job::Solve, &mut self.rhs_sol)?;
        self.analyzed = true;

        self.x.copy_from(&self.rhs_sol[0..n]);
        self.mu = T::zero();
        self.info.mu = T::zero();
        self.info.rp_nnorm = T::zero();
        self.info.rd_nnorm = T::zero();
        self.info.status = SolverStatus::Solved;

        self.generate_solution();
        sysd.from_vector_to_unknowns(&self.sol, self.settings.skip_contacts_uv);
        Ok(self.objective_value())
    }

    // ------------------------------------------------------------------
    // starting point

    /// Nocedal's heuristic: unit primal/dual guess, slack from the
    /// constraints, one affine solve, then clamp the conic variables away
    /// from the boundary.
    fn starting_point(&mut self, sizes_changed: bool) -> Result<(), SolverError> {
        let reuse = self.settings.warm_start && !sizes_changed && self.info.solver_calls > 1;
        if !reuse {
            self.x.set(T::one());
            self.lam.set(T::one());
        }

        // y = A x - b; the constraint matrix changes between calls, so this
        // and the residuals are recomputed even on a warm start
        multiply_a(&self.big_mat, self.n, self.m, &self.x, &mut self.y);
        self.y.axpby(-T::one(), &self.b, T::one());

        self.full_residual_update();

        self.kkt_factor()?;
        self.rpd.copy_from(&self.y);
        self.rpd.hadamard(&self.lam);
        self.kkt_solve(T::zero())?;

        self.y.axpby(T::one(), &self.dy, T::one());
        self.lam.axpby(T::one(), &self.dlam, T::one());
        self.y.scalarop(|v| T::max(v.abs(), T::one()));
        self.lam.scalarop(|v| T::max(v.abs(), T::one()));

        self.full_residual_update();

        let limit: T = DIVERGENCE_LIMIT.as_T();
        let usable = self.rp.is_finite()
            && self.rd.is_finite()
            && self.mu.is_finite()
            && self.rp.norm() <= limit
            && self.rd.norm() <= limit;
        if !usable {
            return Err(SolverError::InfeasibleStart);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // the predictor-corrector iteration

    fn iterate(&mut self) -> Result<(), SolverError> {
        // the matrix changes once per iteration; the predictor and corrector
        // solves share its factorisation
        self.kkt_factor()?;

        // predictor: pure Newton direction on the perturbed KKT conditions
        self.rpd.copy_from(&self.y);
        self.rpd.hadamard(&self.lam);
        self.kkt_solve(T::zero())?;

        let mut alpha_p = newton_step_length(&self.y, &self.dy, T::one());
        let mut alpha_d = newton_step_length(&self.lam, &self.dlam, T::one());
        if self.settings.equal_step_length {
            let alpha = T::min(alpha_p, alpha_d);
            alpha_p = alpha;
            alpha_d = alpha;
        }

        let m_t: T = self.m.as_T();
        let mu_pred = izip!(&self.y, &self.dy, &self.lam, &self.dlam)
            .fold(T::zero(), |acc, (&y, &dy, &lam, &dlam)| {
                acc + (y + alpha_p * dy) * (lam + alpha_d * dlam)
            })
            / m_t;

        let eta = self.step_damping();

        if self.settings.only_predict {
            let (alpha_p, alpha_d) = self.damped_step_lengths(eta);
            self.apply_step(alpha_p, alpha_d);
            self.info.sigma = T::zero();
            return Ok(());
        }

        // corrector: recenter toward the path with Mehrotra's heuristic
        let sigma = T::powi(mu_pred / self.mu, 3);
        let sigma_mu = sigma * self.mu;

        if self.settings.kkt_method == KktMethod::Standard {
            // second-order term and centering fold into the complementarity
            // residual
            self.vectm.copy_from(&self.dy);
            self.vectm.hadamard(&self.dlam);
            self.vectm.translate(-sigma_mu);
            self.rpd.axpby(T::one(), &self.vectm, T::one());
        }
        self.kkt_solve(sigma_mu)?;

        let (alpha_p, alpha_d) = self.damped_step_lengths(eta);
        self.apply_step(alpha_p, alpha_d);
        self.info.sigma = sigma;
        Ok(())
    }

    fn damped_step_lengths(&self, eta: T) -> (T, T) {
        let mut alpha_p = newton_step_length(&self.y, &self.dy, eta);
        let mut alpha_d = newton_step_length(&self.lam, &self.dlam, eta);
        if self.settings.equal_step_length {
            let alpha = T::min(alpha_p, alpha_d);
            alpha_p = alpha;
            alpha_d = alpha;
        }
        (alpha_p, alpha_d)
    }

    fn step_damping(&self) -> T {
        if self.settings.adaptive_eta {
            // exponential approach toward a full step as mu shrinks
            T::exp(-self.mu * self.m.as_T()) * (0.1).as_T() + (0.9).as_T()
        } else {
            (0.95).as_T()
        }
    }

    fn apply_step(&mut self, alpha_p: T, alpha_d: T) {
        self.x.axpby(alpha_p, &self.dx, T::one());
        self.y.axpby(alpha_p, &self.dy, T::one());
        self.lam.axpby(alpha_d, &self.dlam, T::one());

        // residual recurrences; no matrix products unless the step lengths
        // differ
        self.rp.scale(T::one() - alpha_p);
        self.rd.scale(T::one() - alpha_d);
        if alpha_p != alpha_d {
            multiply_g(&self.big_mat, self.n, &self.dx, &mut self.vectn);
            self.rd.axpby(alpha_p - alpha_d, &self.vectn, T::one());
        }
        self.mu = self.y.dot(&self.lam) / self.m.as_T();

        self.info.step_primal = alpha_p;
        self.info.step_dual = alpha_d;
    }

    // ------------------------------------------------------------------
    // KKT assembly-refresh, factor and solve

    fn kkt_factor(&mut self) -> Result<(), SolverError> {
        let strategy = self.strategy.as_ref().unwrap();
        let e_diag = if self.e_diag.is_empty() {
            None
        } else {
            Some(self.e_diag.as_slice())
        };
        strategy.refresh_stripes(&mut self.big_mat, &self.y, &self.lam, e_diag, self.at_flipped);

        let engine = self.engine.as_mut().unwrap();
        engine.set_matrix(&self.big_mat);
        let job = if self.analyzed {
            Job::Factorize
        } else {
            Job::AnalyzeFactorize
        };
        engine.call(job, &mut self.rhs_sol)?;
        self.analyzed = true;
        Ok(())
    }

    fn kkt_solve(&mut self, sigma_mu: T) -> Result<(), SolverError> {
        let strategy = self.strategy.as_ref().unwrap();
        strategy.fill_rhs(
            &mut self.rhs_sol,
            &self.rd,
            &self.rp,
            &self.rpd,
            &self.y,
            &self.lam,
            sigma_mu,
        );
        self.engine
            .as_mut()
            .unwrap()
            .call(Job::Solve, &mut self.rhs_sol)?;
        let strategy = self.strategy.as_ref().unwrap();
        strategy.extract_steps(&self.rhs_sol, &mut self.dx, &mut self.dlam, self.at_flipped);

        // dy = A dx + rp (+ E dlam with compliance)
        multiply_a(&self.big_mat, self.n, self.m, &self.dx, &mut self.dy);
        self.dy.axpby(T::one(), &self.rp, T::one());
        if let Some(e_mat) = &self.e_mat {
            e_mat.mat_multiply(&self.dlam, &mut self.vectm);
            self.dy.axpby(T::one(), &self.vectm, T::one());
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // residuals, termination, solution

    /// rp = Ax - y - b,  rd = Gx - Aᵀλ + c,  mu = yᵀλ/m
    fn full_residual_update(&mut self) {
        multiply_a(&self.big_mat, self.n, self.m, &self.x, &mut self.rp);
        self.rp.axpby(-T::one(), &self.y, T::one());
        self.rp.axpby(-T::one(), &self.b, T::one());

        multiply_g(&self.big_mat, self.n, &self.x, &mut self.rd);
        self.rd.axpby(T::one(), &self.c, T::one());
        let at_col = self.strategy.as_ref().unwrap().at_col();
        multiply_neg_at(
            &self.big_mat,
            self.n,
            self.m,
            at_col,
            self.at_flipped,
            &self.lam,
            &mut self.vectn,
        );
        self.rd.axpby(T::one(), &self.vectn, T::one());

        self.mu = self.y.dot(&self.lam) / self.m.as_T();
    }

    fn check_exit_conditions(&mut self) -> bool {
        self.info.mu = self.mu;
        self.info.rp_nnorm = self.rp.norm() / self.m.as_T();
        self.info.rd_nnorm = self.rd.norm() / self.n.as_T();

        self.mu < self.settings.mu_tol
            && self.info.rp_nnorm < self.settings.rp_tol
            && self.info.rd_nnorm < self.settings.rd_tol
    }

    fn objective_value(&mut self) -> T {
        multiply_g(&self.big_mat, self.n, &self.x, &mut self.vectn);
        <f64 as AsFloatT<T>>::as_T(&0.5) * self.x.dot(&self.vectn) + self.c.dot(&self.x)
    }

    /// Copy `[x; -λ]` into the descriptor-layout solution vector, with the
    /// multipliers expanded to `[-λᵢ, 0, 0]` triplets when the tangent rows
    /// were skipped.
    fn generate_solution(&mut self) {
        let (n, m) = (self.n, self.m);
        self.sol[0..n].copy_from(&self.x);
        if self.settings.skip_contacts_uv {
            for i in 0..m {
                self.sol[n + 3 * i] = -self.lam[i];
                self.sol[n + 3 * i + 1] = T::zero();
                self.sol[n + 3 * i + 2] = T::zero();
            }
        } else {
            for i in 0..m {
                self.sol[n + i] = -self.lam[i];
            }
        }
    }
}

// ----------------------------------------------------------------------
// block products against the stacked matrix

/// vect_out = G * vect_in
fn multiply_g<T: FloatT>(mat: &CsrMatrix<T>, n: usize, vect_in: &[T], vect_out: &mut [T]) {
    mat.mat_multiply_clipped(vect_in, vect_out, 0..n, 0..n, 0, 0);
}

/// vect_out = A * vect_in
fn multiply_a<T: FloatT>(
    mat: &CsrMatrix<T>,
    n: usize,
    m: usize,
    vect_in: &[T],
    vect_out: &mut [T],
) {
    mat.mat_multiply_clipped(vect_in, vect_out, n..n + m, 0..n, 0, 0);
}

/// vect_out = -Aᵀ * vect_in, regardless of whether the block is stored
/// flipped
fn multiply_neg_at<T: FloatT>(
    mat: &CsrMatrix<T>,
    n: usize,
    m: usize,
    at_col: usize,
    at_flipped: bool,
    vect_in: &[T],
    vect_out: &mut [T],
) {
    mat.mat_multiply_clipped(vect_in, vect_out, 0..n, at_col..at_col + m, 0, 0);
    if at_flipped {
        vect_out.negate();
    }
}

/// The largest step in `(0, 1]` keeping `v + alpha * dv` nonnegative, damped
/// by `eta` on the binding components.
fn newton_step_length<T: FloatT>(v: &[T], dv: &[T], eta: T) -> T {
    let mut alpha = T::one();
    for (&vi, &dvi) in std::iter::zip(v, dv) {
        if dvi < T::zero() {
            let candidate = -eta * vi / dvi;
            if candidate < alpha {
                alpha = candidate;
            }
        }
    }
    T::max(alpha, T::zero())
}

#[cfg(test)]
mod tests {
    use super::newton_step_length;

    #[test]
    fn test_newton_step_length() {
        // no descent components: full step
        assert_eq!(newton_step_length(&[1., 2.], &[0., 1.], 1.0), 1.0);
        // binding component at -v/dv = 0.5
        assert_eq!(newton_step_length(&[1., 1.], &[1., -2.], 1.0), 0.5);
        // damped by eta
        assert_eq!(newton_step_length(&[1., 1.], &[1., -2.], 0.9), 0.45);
        // already at the boundary
        assert_eq!(newton_step_length(&[0., 1.], &[-1., 0.], 1.0), 0.0);
    }
}
