use crate::algebra::{FloatT, SparseWrite};

/// The seam between a multibody system and the solver.
///
/// A descriptor knows the current set of active variables and constraints and
/// can assemble the blocks
///
/// ```text
/// [ G   -Aᵀ ]      f = -c      b' = -b
/// [ A   -E  ]
/// ```
///
/// into whatever the solver hands it.  Sign conventions follow the multibody
/// side: the vectors delivered by [`write_vectors`](Self::write_vectors) are
/// the negations of the `c` and `b` of the QP
/// `min ½xᵀGx + cᵀx  s.t.  Ax ≥ b`, and the multiplier block handed back
/// through [`from_vector_to_unknowns`](Self::from_vector_to_unknowns) carries
/// `-λ`.
pub trait SystemDescriptor<T: FloatT> {
    /// Number of active variables, `n`.
    fn count_active_variables(&self) -> usize;

    /// Number of active constraint rows, `m`.
    ///
    /// With `skip_contacts_uv` the two friction-tangent rows of each contact
    /// are omitted; they are re-expanded when the solution is written back.
    fn count_active_constraints(&self, include_bilateral: bool, skip_contacts_uv: bool) -> usize;

    /// Assemble `G` at `(0, 0)`, `A` at rows `n..n+m`, and `-Aᵀ` at columns
    /// `at_col..at_col+m` of `out`.
    ///
    /// `out` may be a sparsity learner (pattern pass) or the real matrix
    /// (value pass); the same calls must be issued in both cases.
    fn write_system_blocks(
        &self,
        out: &mut dyn SparseWrite<T>,
        at_col: usize,
        skip_contacts_uv: bool,
    );

    /// Assemble the `m x m` compliance block as it appears in the system
    /// matrix, i.e. `-E`.  Descriptors without compliance leave this alone.
    fn write_compliance(&self, out: &mut dyn SparseWrite<T>, skip_contacts_uv: bool) {
        let _ = (out, skip_contacts_uv);
    }

    /// Fill the force vector `f = -c` (length `n`) and constraint vector
    /// `-b` (length `m`).
    fn write_vectors(&self, f: &mut [T], b: &mut [T], skip_contacts_uv: bool);

    /// Receive the solution `[x; -λ]`.  With `skip_contacts_uv` the
    /// multiplier block arrives as `[-λᵢ, 0, 0]` triplets, one per contact.
    fn from_vector_to_unknowns(&mut self, sol: &[T], skip_contacts_uv: bool);
}
