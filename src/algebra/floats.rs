use num_traits::{Float, FromPrimitive, NumAssign};

/// Trait for floating point types used throughout the solver.
///
/// All floating point calculations are performed on values implementing the
/// `FloatT` trait, with implementations provided for the native f32 and f64
/// types.  The constituent bounds come from [num_traits](num_traits), plus the
/// formatting and construction traits the solver itself leans on: `Debug` and
/// `LowerExp` for derived diagnostics and progress rows, `Default` for derived
/// workspace construction, and `'static` so solver components stay usable as
/// trait objects.

pub trait FloatT:
    'static + Float + NumAssign + Default + FromPrimitive + std::fmt::LowerExp + std::fmt::Debug
{
}
impl FloatT for f32 {}
impl FloatT for f64 {}

/// Trait for converting Rust primitives to [`FloatT`](crate::algebra::FloatT).
///
/// Used internally so that numeric constants can be written `(0.95).as_T()`
/// rather than through the noisier `T::from_f64(0.95).unwrap()`.  Only the two
/// source types the solver actually converts from are covered: `f64` for
/// tolerance and damping constants, and `usize` for dimension-scaled
/// quantities such as `yᵀλ/m`.

#[allow(non_snake_case)]
pub trait AsFloatT<T>: 'static {
    fn as_T(&self) -> T;
}

impl<T> AsFloatT<T> for f64
where
    T: FromPrimitive + 'static,
{
    #[inline]
    fn as_T(&self) -> T {
        T::from_f64(*self).unwrap()
    }
}

impl<T> AsFloatT<T> for usize
where
    T: FromPrimitive + 'static,
{
    #[inline]
    fn as_T(&self) -> T {
        T::from_usize(*self).unwrap()
    }
}
