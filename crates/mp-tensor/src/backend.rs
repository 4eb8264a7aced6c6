use std::fmt::Debug;

use crate::device::Placement;
use crate::error::Result;
use crate::storage::Storage;

/// Trait for pluggable compute backends (host CPU, Metal, ...).
///
/// A backend owns one memory space. Host data enters through `upload` and
/// leaves through `download`; everything in between stays in the backend's
/// own `Storage` variant.
pub trait ComputeBackend: Send + Sync + Debug {
    /// Returns the name of this backend (e.g., "cpu", "metal").
    fn name(&self) -> &str;

    /// Memory space this backend computes in.
    fn placement(&self) -> Placement;

    /// Copy row-major host data into storage owned by this backend.
    fn upload(&self, data: &[f32]) -> Result<Storage>;

    /// Copy storage owned by this backend back into host memory.
    fn download(&self, storage: &Storage) -> Result<Vec<f32>>;

    /// Matrix multiplication: C = A @ B.
    ///
    /// - `a`: row-major data of shape [m, k]
    /// - `b`: row-major data of shape [k, n]
    /// - Returns: row-major storage of shape [m, n], owned by this backend
    fn matmul(&self, a: &Storage, b: &Storage, m: usize, k: usize, n: usize) -> Result<Storage>;
}

/// Narrow a matrix dimension to the `u32` accelerator kernels take.
#[cfg(any(feature = "metal", feature = "cuda", test))]
pub(crate) fn kernel_dim(backend: &str, name: &str, value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        crate::error::TensorError::backend(
            backend,
            format!("dimension {}={} exceeds the kernel's u32 range", name, value),
        )
    })
}

/// Accelerator-placed backend that keeps data on the host but whose reads
/// fail. Lets tests exercise transfer and error paths without hardware.
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct BrokenAccelerator(pub &'static str);

#[cfg(test)]
impl ComputeBackend for BrokenAccelerator {
    fn name(&self) -> &str {
        self.0
    }

    fn placement(&self) -> Placement {
        Placement::Accelerator
    }

    fn upload(&self, data: &[f32]) -> Result<Storage> {
        Ok(Storage::Cpu(crate::storage::CpuStorage::from_f32_vec(data.to_vec())))
    }

    fn download(&self, _storage: &Storage) -> Result<Vec<f32>> {
        Err(crate::error::TensorError::backend(self.0, "device lost"))
    }

    fn matmul(&self, _a: &Storage, _b: &Storage, _m: usize, _k: usize, _n: usize) -> Result<Storage> {
        Err(crate::error::TensorError::backend(self.0, "device lost"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TensorError;

    #[test]
    fn test_kernel_dim_in_range() {
        assert_eq!(kernel_dim("cuda", "m", 3).unwrap(), 3);
        assert_eq!(kernel_dim("cuda", "m", u32::MAX as usize).unwrap(), u32::MAX);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_kernel_dim_rejects_truncation() {
        let err = kernel_dim("metal", "n", u32::MAX as usize + 1).unwrap_err();
        assert!(matches!(err, TensorError::Backend { .. }));
        assert!(err.to_string().contains("n=4294967296"));
    }
}
