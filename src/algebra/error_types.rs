use thiserror::Error;

/// Error type returned by the [`verify`](crate::algebra::CsrMatrix::verify) utility.
#[derive(Error, Debug)]
pub enum SparseFormatError {
    #[error("Matrix dimension fields and/or array lengths are incompatible")]
    IncompatibleDimension,
    #[error("Leading index array is not monotonically non-decreasing")]
    BadLeadIndex,
    #[error("Initialized entries are not sorted or not unique within a row")]
    BadTrailOrdering,
    #[error("Trailing index value exceeds the matrix trailing dimension")]
    BadTrailIndex,
}
