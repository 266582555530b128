//! contact-qp solver module.
//!
//! The central type is [`IpSolver`](crate::solver::IpSolver), a primal-dual
//! predictor-corrector interior-point method for inequality-constrained convex
//! QPs.  Problems reach the solver through the
//! [`SystemDescriptor`](crate::solver::SystemDescriptor) trait; direct linear
//! solvers plug in through [`LinearEngine`](crate::solver::LinearEngine).

pub(crate) mod core;

mod descriptor;
mod info;
mod ipsolver;
mod qp;
mod settings;

pub use self::core::engines::ldl::LdlEngine;
pub use self::core::engines::lu::DenseLuEngine;
pub use self::core::engines::{EngineError, Job, LinearEngine};
pub use self::core::SolverError;
pub use descriptor::*;
pub use info::*;
pub use ipsolver::*;
pub use qp::*;
pub use settings::*;
