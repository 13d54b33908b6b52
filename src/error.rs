//! Typed errors for distributed matrix operations.
use std::error::Error;
use std::fmt;
use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatrixError {
    /// The shapes of two operands do not agree.
    DimensionMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
    /// Two distributed operands are not partitioned identically across ranks.
    PartitionMismatch,
}

impl Display for MatrixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatrixError::DimensionMismatch { expected, actual } => write!(
                f,
                "Dimension mismatch: expected {}x{} matrix, got {}x{}.",
                expected.0, expected.1, actual.0, actual.1
            ),
            MatrixError::PartitionMismatch => write!(f, "Matrices are partitioned differently across ranks."),
        }
    }
}

impl Error for MatrixError {}
