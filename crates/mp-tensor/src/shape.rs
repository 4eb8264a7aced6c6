use crate::error::{Result, TensorError};
use std::fmt;

/// A tensor shape, wrapping a vector of dimension sizes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Create a new shape from a vector of dimensions.
    pub fn new(dims: Vec<usize>) -> Self {
        Shape { dims }
    }

    /// Shape of a `rows x cols` matrix.
    pub fn matrix(rows: usize, cols: usize) -> Self {
        Shape {
            dims: vec![rows, cols],
        }
    }

    /// Number of dimensions (rank).
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements (product of all dimension sizes).
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    /// Returns the size of dimension `i`.
    ///
    /// # Panics
    /// Panics if `i >= ndim()`.
    pub fn dim(&self, i: usize) -> usize {
        self.dims[i]
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Returns `(rows, cols)` if this is a 2D shape.
    pub fn as_matrix(&self) -> Result<(usize, usize)> {
        match self.dims.as_slice() {
            &[rows, cols] => Ok((rows, cols)),
            _ => Err(TensorError::NotAMatrix { ndim: self.ndim() }),
        }
    }

    /// Validates a matrix product `lhs @ rhs` and returns `(m, k, n)`.
    ///
    /// Both shapes must be 2D and `lhs` columns must equal `rhs` rows.
    pub fn matmul_dims(lhs: &Shape, rhs: &Shape) -> Result<(usize, usize, usize)> {
        let (m, k) = lhs.as_matrix()?;
        let (k2, n) = rhs.as_matrix()?;
        if k != k2 {
            return Err(TensorError::MatmulMismatch { m, k, k2, n });
        }
        Ok((m, k, n))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "]")
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape::new(dims)
    }
}

impl From<(usize, usize)> for Shape {
    fn from((rows, cols): (usize, usize)) -> Self {
        Shape::matrix(rows, cols)
    }
}
