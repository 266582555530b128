use crate::algebra::*;
use crate::solver::core::engines::config::validate_linear_engine;
use derive_builder::Builder;

/// Which perturbed KKT system is factored at each iteration.
///
/// The choice is fixed for the lifetime of a solver; it decides the size and
/// structure of the assembled matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KktMethod {
    /// Full `(n+2m)` primal-dual-complementarity system.  Unsymmetric.
    Standard,
    /// Condensed `(n+m)` saddle system with the slack block eliminated.
    #[default]
    Augmented,
    /// Normal equations reduced to the primal block.  Not implemented.
    Normal,
}

/// Solver settings, built through [`IpSettingsBuilder`].
///
/// ```
/// use contact_qp::solver::IpSettingsBuilder;
///
/// let settings = IpSettingsBuilder::<f64>::default()
///     .max_iter(100u32)
///     .verbose(true)
///     .build()
///     .unwrap();
/// assert_eq!(settings.max_iter, 100);
/// ```
#[derive(Builder, Debug, Clone)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct IpSettings<T: FloatT> {
    ///KKT formulation solved inside each iteration
    #[builder(default = "KktMethod::Augmented")]
    pub kkt_method: KktMethod,

    ///hard cap on interior-point iterations
    #[builder(default = "50")]
    pub max_iter: u32,

    ///primal feasibility tolerance, tested against ‖rp‖₂/m
    #[builder(default = "(1e-7).as_T()")]
    pub rp_tol: T,

    ///dual feasibility tolerance, tested against ‖rd‖₂/n
    #[builder(default = "(1e-8).as_T()")]
    pub rd_tol: T,

    ///complementarity tolerance, tested against μ = yᵀλ/m
    #[builder(default = "(1e-8).as_T()")]
    pub mu_tol: T,

    ///force a common primal/dual step length (the smaller of the two)
    #[builder(default = "false")]
    pub equal_step_length: bool,

    ///grow the step-length damping toward 1 as μ shrinks, instead of a
    ///fixed 0.95
    #[builder(default = "true")]
    pub adaptive_eta: bool,

    ///take the affine step only, skipping the corrector
    #[builder(default = "false")]
    pub only_predict: bool,

    ///seed the starting point from the previous solution when the problem
    ///sizes are unchanged
    #[builder(default = "false")]
    pub warm_start: bool,

    ///include the compliance block in the slack diagonal and step recovery
    #[builder(default = "false")]
    pub add_compliance: bool,

    ///assemble only the contact-normal constraint rows; the emitted
    ///multipliers are re-expanded to friction triplets
    #[builder(default = "false")]
    pub skip_contacts_uv: bool,

    ///direct linear solver: "auto", "ldl" or "lu"
    #[builder(default = r#""auto".to_string()"#)]
    pub linear_engine: String,

    ///per-iteration progress printing
    #[builder(default = "false")]
    pub verbose: bool,

    ///forward search distance, in rows, of the matrix insertion algorithm
    #[builder(default = "usize::MAX")]
    pub max_shifts: usize,

    ///dynamic regularization threshold of the LDL engine
    #[builder(default = "(1e-13).as_T()")]
    pub regularize_eps: T,

    ///dynamic regularization shift of the LDL engine
    #[builder(default = "(2e-7).as_T()")]
    pub regularize_delta: T,
}

impl<T> Default for IpSettings<T>
where
    T: FloatT,
{
    fn default() -> IpSettings<T> {
        IpSettingsBuilder::<T>::default().build().unwrap()
    }
}

// pre build checker (for auto-validation when using the builder)

/// Automatic pre-build settings validation
impl<T> IpSettingsBuilder<T>
where
    T: FloatT,
{
    fn validate(&self) -> Result<(), String> {
        if let Some(ref linear_engine) = self.linear_engine {
            validate_linear_engine(linear_engine.as_str())?;
        }
        Ok(())
    }
}

// post build checker, for settings assembled by hand

/// Manual post-build settings validation
impl<T> IpSettings<T>
where
    T: FloatT,
{
    pub fn validate(&self) -> Result<(), String> {
        validate_linear_engine(&self.linear_engine)?;
        Ok(())
    }
}

#[test]
fn test_settings_validate() {
    // all standard settings
    IpSettingsBuilder::<f64>::default().build().unwrap();

    // fail on unknown linear engine
    assert!(IpSettingsBuilder::<f64>::default()
        .linear_engine("foo".to_string())
        .build()
        .is_err());
}
