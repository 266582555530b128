//! Sparse LDLᵀ factorisation of symmetric quasidefinite matrices.
//!
//! The factorisation is up-looking over the elimination tree, with an AMD
//! fill-reducing ordering and optional dynamic regularization of pivots whose
//! sign disagrees with the expected inertia.  It is the workhorse behind the
//! default KKT linear engine, but is usable on its own for any quasidefinite
//! system given in upper-triangular compressed-sparse-column form.

mod ldl;
pub use ldl::*;
