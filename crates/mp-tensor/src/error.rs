use thiserror::Error;

use crate::device::Placement;

#[derive(Error, Debug)]
pub enum TensorError {
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },
    #[error("expected a 2D matrix, got a tensor with {ndim} dimensions")]
    NotAMatrix { ndim: usize },
    #[error("matmul dimension mismatch: [{m}x{k}] @ [{k2}x{n}]")]
    MatmulMismatch {
        m: usize,
        k: usize,
        k2: usize,
        n: usize,
    },
    #[error("operands live on different devices: {lhs} and {rhs}")]
    DeviceMismatch { lhs: Placement, rhs: Placement },
    #[error("no accelerator device available: {0}")]
    DeviceUnavailable(String),
    #[error("{backend} backend error: {message}")]
    Backend { backend: String, message: String },
}

impl TensorError {
    #[cfg(any(feature = "metal", feature = "cuda", test))]
    pub(crate) fn backend(backend: &str, message: impl Into<String>) -> Self {
        TensorError::Backend {
            backend: backend.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TensorError>;
