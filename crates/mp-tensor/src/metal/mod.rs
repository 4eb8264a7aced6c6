// Metal GPU compute backend (macOS only).

use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;

use log::debug;
use objc2::rc::Retained;
use objc2::runtime::ProtocolObject;
use objc2_foundation::NSString;
use objc2_metal::{
    MTLBuffer, MTLCommandBuffer, MTLCommandEncoder, MTLCommandQueue, MTLComputeCommandEncoder,
    MTLComputePipelineState, MTLCreateSystemDefaultDevice, MTLDevice, MTLLibrary,
    MTLResourceOptions, MTLSize,
};

use crate::backend::{kernel_dim, ComputeBackend};
use crate::device::Placement;
use crate::error::{Result, TensorError};
use crate::storage::Storage;

const MATMUL_SOURCE: &str = r#"
#include <metal_stdlib>
using namespace metal;

kernel void matmul_f32(
    device const float* a [[buffer(0)]],
    device const float* b [[buffer(1)]],
    device float* c [[buffer(2)]],
    constant uint4& dims [[buffer(3)]],
    uint2 gid [[thread_position_in_grid]])
{
    uint m = dims.x;
    uint k = dims.y;
    uint n = dims.z;
    if (gid.y >= m || gid.x >= n) {
        return;
    }
    float sum = 0.0f;
    for (uint p = 0; p < k; ++p) {
        sum += a[gid.y * k + p] * b[p * n + gid.x];
    }
    c[gid.y * n + gid.x] = sum;
}
"#;

const MATMUL_KERNEL: &str = "matmul_f32";

/// f32 data resident in a shared-mode Metal buffer.
#[derive(Clone)]
pub struct MetalStorage {
    buffer: Retained<ProtocolObject<dyn MTLBuffer>>,
    len: usize,
}

impl MetalStorage {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn buffer(&self) -> &ProtocolObject<dyn MTLBuffer> {
        &self.buffer
    }
}

impl fmt::Debug for MetalStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetalStorage").field("len", &self.len).finish()
    }
}

/// Metal backend: system default device, one command queue and a matmul
/// pipeline compiled at construction.
pub struct MetalBackend {
    device: Retained<ProtocolObject<dyn MTLDevice>>,
    queue: Retained<ProtocolObject<dyn MTLCommandQueue>>,
    matmul: Retained<ProtocolObject<dyn MTLComputePipelineState>>,
}

// SAFETY: MTLDevice, MTLCommandQueue and MTLComputePipelineState are
// documented as thread-safe; command buffers are created per call.
unsafe impl Send for MetalBackend {}
unsafe impl Sync for MetalBackend {}

impl fmt::Debug for MetalBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetalBackend")
            .field("device", &self.device.name().to_string())
            .finish()
    }
}

impl MetalBackend {
    /// Acquire the system default Metal device and compile the kernels.
    ///
    /// Returns `TensorError::DeviceUnavailable` when the system has no Metal
    /// device.
    pub fn new() -> Result<Self> {
        let device = MTLCreateSystemDefaultDevice().ok_or_else(|| {
            TensorError::DeviceUnavailable("no Metal device found".to_string())
        })?;
        debug!("using Metal device '{}'", device.name());

        let queue = device
            .newCommandQueue()
            .ok_or_else(|| TensorError::backend("metal", "failed to create command queue"))?;

        let source = NSString::from_str(MATMUL_SOURCE);
        let library = device
            .newLibraryWithSource_options_error(&source, None)
            .map_err(|e| {
                TensorError::backend(
                    "metal",
                    format!("shader compilation failed: {}", e.localizedDescription()),
                )
            })?;
        let function = library
            .newFunctionWithName(&NSString::from_str(MATMUL_KERNEL))
            .ok_or_else(|| {
                TensorError::backend("metal", format!("kernel '{}' not found", MATMUL_KERNEL))
            })?;
        let matmul = device
            .newComputePipelineStateWithFunction_error(&function)
            .map_err(|e| {
                TensorError::backend(
                    "metal",
                    format!("pipeline creation failed: {}", e.localizedDescription()),
                )
            })?;

        Ok(MetalBackend {
            device,
            queue,
            matmul,
        })
    }

    fn metal_storage<'a>(&self, storage: &'a Storage) -> Result<&'a MetalStorage> {
        match storage {
            Storage::Metal(s) => Ok(s),
            other => Err(TensorError::DeviceMismatch {
                lhs: Placement::Accelerator,
                rhs: other.placement(),
            }),
        }
    }

    fn new_buffer(&self, len: usize) -> Result<MetalStorage> {
        // Metal rejects zero-length buffers.
        let bytes = (len * std::mem::size_of::<f32>()).max(std::mem::size_of::<f32>());
        let buffer = self
            .device
            .newBufferWithLength_options(bytes, MTLResourceOptions::StorageModeShared)
            .ok_or_else(|| {
                TensorError::backend("metal", format!("failed to allocate {} bytes", bytes))
            })?;
        Ok(MetalStorage { buffer, len })
    }
}

impl ComputeBackend for MetalBackend {
    fn name(&self) -> &str {
        "metal"
    }

    fn placement(&self) -> Placement {
        Placement::Accelerator
    }

    fn upload(&self, data: &[f32]) -> Result<Storage> {
        let storage = self.new_buffer(data.len())?;
        // SAFETY: the buffer is shared-mode, at least `data.len()` f32s long,
        // and not yet visible to any command buffer.
        unsafe {
            let dst = storage.buffer().contents().as_ptr() as *mut f32;
            std::ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len());
        }
        Ok(Storage::Metal(storage))
    }

    fn download(&self, storage: &Storage) -> Result<Vec<f32>> {
        let storage = self.metal_storage(storage)?;
        let mut out = vec![0.0f32; storage.len()];
        // SAFETY: every command buffer writing this buffer has completed
        // (`matmul` waits), and the buffer holds `len` f32s.
        unsafe {
            let src = storage.buffer().contents().as_ptr() as *const f32;
            std::ptr::copy_nonoverlapping(src, out.as_mut_ptr(), storage.len());
        }
        Ok(out)
    }

    fn matmul(&self, a: &Storage, b: &Storage, m: usize, k: usize, n: usize) -> Result<Storage> {
        let a = self.metal_storage(a)?;
        let b = self.metal_storage(b)?;
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

        let mut dims = [
            kernel_dim("metal", "m", m)?,
            kernel_dim("metal", "k", k)?,
            kernel_dim("metal", "n", n)?,
            0u32,
        ];

        let c = self.new_buffer(m * n)?;
        if m * n == 0 {
            return Ok(Storage::Metal(c));
        }

        let command_buffer = self
            .queue
            .commandBuffer()
            .ok_or_else(|| TensorError::backend("metal", "failed to create command buffer"))?;
        let encoder = command_buffer
            .computeCommandEncoder()
            .ok_or_else(|| TensorError::backend("metal", "failed to create compute encoder"))?;

        encoder.setComputePipelineState(&self.matmul);
        // SAFETY: buffer indices match the kernel signature and `dims` outlives
        // the call (Metal copies inline bytes at encode time).
        unsafe {
            encoder.setBuffer_offset_atIndex(Some(a.buffer()), 0, 0);
            encoder.setBuffer_offset_atIndex(Some(b.buffer()), 0, 1);
            encoder.setBuffer_offset_atIndex(Some(c.buffer()), 0, 2);
            encoder.setBytes_length_atIndex(
                NonNull::new_unchecked(dims.as_mut_ptr() as *mut c_void),
                std::mem::size_of_val(&dims),
                3,
            );
        }

        let width = self.matmul.threadExecutionWidth().max(1);
        let height = (self.matmul.maxTotalThreadsPerThreadgroup() / width).max(1);
        encoder.dispatchThreads_threadsPerThreadgroup(
            MTLSize {
                width: n,
                height: m,
                depth: 1,
            },
            MTLSize {
                width: width.min(n),
                height: height.min(m),
                depth: 1,
            },
        );
        encoder.endEncoding();

        command_buffer.commit();
        command_buffer.waitUntilCompleted();
        if let Some(err) = command_buffer.error() {
            return Err(TensorError::backend(
                "metal",
                format!("matmul failed: {}", err.localizedDescription()),
            ));
        }

        Ok(Storage::Metal(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These only run on machines with a Metal device.
    fn backend() -> Option<MetalBackend> {
        MetalBackend::new().ok()
    }

    #[test]
    fn test_upload_download() {
        let Some(b) = backend() else { return };
        let s = b.upload(&[1.0, -2.5, 3.0]).unwrap();
        assert_eq!(s.placement(), Placement::Accelerator);
        assert_eq!(b.download(&s).unwrap(), vec![1.0, -2.5, 3.0]);
    }

    #[test]
    fn test_matmul() {
        let Some(b) = backend() else { return };
        let a = b.upload(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        let x = b.upload(&[5.0, 6.0, 7.0, 8.0]).unwrap();
        let c = b.matmul(&a, &x, 2, 2, 2).unwrap();
        assert_eq!(b.download(&c).unwrap(), vec![19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_rejects_host_storage() {
        let Some(b) = backend() else { return };
        let host = Storage::Cpu(crate::storage::CpuStorage::from_f32_vec(vec![1.0]));
        assert!(matches!(
            b.download(&host),
            Err(TensorError::DeviceMismatch { .. })
        ));
    }
}
