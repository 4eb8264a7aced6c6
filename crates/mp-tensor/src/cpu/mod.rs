pub mod matmul;

use crate::backend::ComputeBackend;
use crate::device::Placement;
use crate::error::{Result, TensorError};
use crate::storage::{CpuStorage, Storage};

/// Pure-Rust CPU compute backend.
///
/// Implements all operations with straightforward loops optimized for
/// correctness rather than peak performance. Serves as the reference
/// implementation and as the host fallback.
#[derive(Debug, Clone)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        CpuBackend
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Borrow host data out of `storage`, rejecting accelerator buffers.
fn host_slice(storage: &Storage) -> Result<&[f32]> {
    match storage {
        Storage::Cpu(s) => Ok(s.as_f32_slice()),
        #[cfg(any(feature = "metal", feature = "cuda"))]
        other => Err(TensorError::DeviceMismatch {
            lhs: Placement::Host,
            rhs: other.placement(),
        }),
    }
}

impl ComputeBackend for CpuBackend {
    fn name(&self) -> &str {
        "cpu"
    }

    fn placement(&self) -> Placement {
        Placement::Host
    }

    fn upload(&self, data: &[f32]) -> Result<Storage> {
        Ok(Storage::Cpu(CpuStorage::from_f32_vec(data.to_vec())))
    }

    fn download(&self, storage: &Storage) -> Result<Vec<f32>> {
        Ok(host_slice(storage)?.to_vec())
    }

    fn matmul(&self, a: &Storage, b: &Storage, m: usize, k: usize, n: usize) -> Result<Storage> {
        let a = host_slice(a)?;
        let b = host_slice(b)?;
        if a.len() != m * k {
            return Err(TensorError::ShapeMismatch {
                expected: vec![m, k],
                got: vec![a.len()],
            });
        }
        if b.len() != k * n {
            return Err(TensorError::ShapeMismatch {
                expected: vec![k, n],
                got: vec![b.len()],
            });
        }

        let c = matmul::matmul_f32(a, b, m, k, n);
        Ok(Storage::Cpu(CpuStorage::from_f32_vec(c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> CpuBackend {
        CpuBackend::new()
    }

    fn run(b: &CpuBackend, a: &[f32], x: &[f32], m: usize, k: usize, n: usize) -> Vec<f32> {
        let a = b.upload(a).unwrap();
        let x = b.upload(x).unwrap();
        let c = b.matmul(&a, &x, m, k, n).unwrap();
        b.download(&c).unwrap()
    }

    #[test]
    fn test_matmul_identity() {
        let b = backend();
        // 2x2 identity @ [1,2;3,4]
        let c = run(&b, &[1.0, 0.0, 0.0, 1.0], &[1.0, 2.0, 3.0, 4.0], 2, 2, 2);
        assert_eq!(c, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_matmul_basic() {
        let b = backend();
        // [1,2;3,4] @ [5,6;7,8] = [19,22;43,50]
        let c = run(&b, &[1.0, 2.0, 3.0, 4.0], &[5.0, 6.0, 7.0, 8.0], 2, 2, 2);
        assert_eq!(c, vec![19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_upload_download() {
        let b = backend();
        let s = b.upload(&[1.5, -2.0]).unwrap();
        assert_eq!(s.placement(), Placement::Host);
        assert_eq!(b.download(&s).unwrap(), vec![1.5, -2.0]);
    }

    #[test]
    fn test_matmul_length_mismatch() {
        let b = backend();
        let a = b.upload(&[1.0, 2.0, 3.0]).unwrap();
        let x = b.upload(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!(matches!(
            b.matmul(&a, &x, 2, 2, 2),
            Err(TensorError::ShapeMismatch { .. })
        ));
    }
}
