//! <h1 align="center" margin=0px>contact-qp</h1>
//!
//! An interior-point solver for the convex quadratic programs arising from
//! multibody-dynamics contact problems,
//!
//! ```text
//! minimize   ½ xᵀGx + cᵀx
//! subject to  Ax ≥ b,
//! ```
//!
//! solved with a Mehrotra-style primal-dual predictor-corrector method.
//!
//! The crate is organised as three layers:
//!
//! - [`algebra`](crate::algebra) : vector math and the [`CsrMatrix`](crate::algebra::CsrMatrix)
//!   sparse engine.  The matrix supports incremental in-place construction with a
//!   learned sparsity pattern, which lets a multibody integrator reassemble the
//!   same KKT structure every time step without reallocation.
//! - [`ldl`](crate::ldl) : an elimination-tree LDLᵀ factorisation for symmetric
//!   quasidefinite systems, used by the default linear engine.
//! - [`solver`](crate::solver) : the [`IpSolver`](crate::solver::IpSolver) itself,
//!   its settings, the [`LinearEngine`](crate::solver::LinearEngine) plug point for
//!   direct solvers, and the [`SystemDescriptor`](crate::solver::SystemDescriptor)
//!   seam through which a multibody system hands over its matrices.
//!
//! Problems are passed either through a custom `SystemDescriptor` or through the
//! ready-made [`QpProblem`](crate::solver::QpProblem):
//!
//! ```no_run
//! use contact_qp::algebra::CsrMatrix;
//! use contact_qp::solver::{IpSettings, IpSolver, QpProblem};
//!
//! // minimize 0.5*(x1^2 + x2^2) - x1 - x2  subject to x >= 0
//! let g = CsrMatrix::identity(2);
//! let a = CsrMatrix::identity(2);
//! let mut problem = QpProblem::new(g, vec![-1., -1.], a, vec![0., 0.]);
//!
//! let mut solver = IpSolver::new(IpSettings::default());
//! let objective = solver.solve(&mut problem).unwrap();
//!
//! println!("x = {:?}, objective = {}", problem.x, objective);
//! ```

pub mod algebra;
pub mod ldl;
pub mod solver;
