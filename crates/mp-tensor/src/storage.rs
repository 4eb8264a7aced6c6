use crate::device::Placement;
#[cfg(feature = "cuda")]
use crate::cuda::CudaStorage;
#[cfg(feature = "metal")]
use crate::metal::MetalStorage;

/// Host-resident f32 buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct CpuStorage {
    data: Vec<f32>,
}

impl CpuStorage {
    /// Create storage from an f32 vector.
    pub fn from_f32_vec(data: Vec<f32>) -> Self {
        CpuStorage { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_f32_slice(&self) -> &[f32] {
        &self.data
    }
}

/// Backing memory of a tensor, tagged by where it lives.
///
/// A backend only accepts the variant matching its own placement; moving data
/// between variants goes through `ComputeBackend::upload`/`download`.
#[derive(Debug, Clone)]
pub enum Storage {
    /// Host memory.
    Cpu(CpuStorage),
    /// Shared-mode Metal buffer owned by a `MetalBackend`.
    #[cfg(feature = "metal")]
    Metal(MetalStorage),
    /// Device memory owned by a `CudaBackend`.
    #[cfg(feature = "cuda")]
    Cuda(CudaStorage),
}

impl Storage {
    /// Number of f32 elements held.
    pub fn len(&self) -> usize {
        match self {
            Storage::Cpu(s) => s.len(),
            #[cfg(feature = "metal")]
            Storage::Metal(s) => s.len(),
            #[cfg(feature = "cuda")]
            Storage::Cuda(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Memory space this storage resides in.
    pub fn placement(&self) -> Placement {
        match self {
            Storage::Cpu(_) => Placement::Host,
            #[cfg(feature = "metal")]
            Storage::Metal(_) => Placement::Accelerator,
            #[cfg(feature = "cuda")]
            Storage::Cuda(_) => Placement::Accelerator,
        }
    }
}

impl From<CpuStorage> for Storage {
    fn from(s: CpuStorage) -> Self {
        Storage::Cpu(s)
    }
}
