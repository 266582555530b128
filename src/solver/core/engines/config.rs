use super::ldl::LdlEngine;
use super::lu::DenseLuEngine;
use super::LinearEngine;
use crate::algebra::FloatT;
use crate::ldl::LdlSettingsBuilder;
use crate::solver::core::SolverError;
use crate::solver::{IpSettings, KktMethod};

/// Build the linear engine selected by the settings for a KKT system of
/// `sys_size` rows whose primal block spans the first `n`.
pub(crate) fn make_engine<T: FloatT>(
    settings: &IpSettings<T>,
    sys_size: usize,
    n: usize,
) -> Result<Box<dyn LinearEngine<T>>, SolverError> {
    // the standard three-block layout is structurally unsymmetric whenever
    // constraints are present
    let symmetric_form = settings.kkt_method != KktMethod::Standard || sys_size == n;

    match settings.linear_engine.as_str() {
        "auto" => {
            if symmetric_form {
                Ok(Box::new(ldl_engine(settings, sys_size, n)))
            } else {
                Ok(Box::new(DenseLuEngine::new()))
            }
        }
        "ldl" => {
            if !symmetric_form {
                return Err(SolverError::Config(
                    "the ldl engine cannot factor the unsymmetric standard KKT form".into(),
                ));
            }
            Ok(Box::new(ldl_engine(settings, sys_size, n)))
        }
        "lu" => Ok(Box::new(DenseLuEngine::new())),
        other => Err(SolverError::Config(format!(
            "unknown linear engine {:?}",
            other
        ))),
    }
}

fn ldl_engine<T: FloatT>(settings: &IpSettings<T>, sys_size: usize, n: usize) -> LdlEngine<T> {
    // expected inertia: positive pivots on the primal block, negative on the
    // slack block of the quasidefinite form
    let mut dsigns = vec![1_i8; sys_size];
    dsigns[n..].fill(-1);

    let opts = LdlSettingsBuilder::default()
        .dsigns(dsigns)
        .regularize_enable(true)
        .regularize_eps(settings.regularize_eps)
        .regularize_delta(settings.regularize_delta)
        .build()
        .unwrap();

    LdlEngine::new(opts)
}

pub(crate) fn validate_linear_engine(linear_engine: &str) -> Result<(), String> {
    match linear_engine {
        "auto" | "ldl" | "lu" => Ok(()),
        _ => Err(format!("Invalid linear_engine: {:?}", linear_engine)),
    }
}
