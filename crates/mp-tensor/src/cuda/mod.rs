// CUDA GPU compute backend (via the `cust` driver bindings).

use std::fmt;
use std::sync::Arc;

use cust::context::{Context, CurrentContext};
use cust::device::Device as CudaDevice;
use cust::error::CudaError;
use cust::launch;
use cust::memory::{CopyDestination, DeviceBuffer};
use cust::module::Module;
use cust::stream::{Stream, StreamFlags};
use cust::CudaFlags;
use log::debug;

use crate::backend::{kernel_dim, ComputeBackend};
use crate::device::Placement;
use crate::error::{Result, TensorError};
use crate::storage::Storage;

mod kernels;

const BLOCK: u32 = 16;

fn cuda_err(context: &str) -> impl FnOnce(CudaError) -> TensorError + '_ {
    move |e| TensorError::backend("cuda", format!("{}: {}", context, e))
}

/// f32 data resident in CUDA device memory.
#[derive(Clone)]
pub struct CudaStorage {
    buffer: Arc<DeviceBuffer<f32>>,
    len: usize,
}

impl CudaStorage {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for CudaStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CudaStorage").field("len", &self.len).finish()
    }
}

/// CUDA backend: device 0, its primary context, one stream and the matmul
/// module JIT-compiled from embedded PTX at construction.
pub struct CudaBackend {
    device_name: String,
    // Field order matters: the module and stream must drop before the context.
    module: Module,
    stream: Stream,
    context: Context,
}

// SAFETY: every entry point makes `context` current on the calling thread
// before touching the module, stream or buffers.
unsafe impl Send for CudaBackend {}
unsafe impl Sync for CudaBackend {}

impl fmt::Debug for CudaBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CudaBackend")
            .field("device", &self.device_name)
            .finish()
    }
}

impl CudaBackend {
    /// Initialize the driver, take the first CUDA device and load the kernels.
    ///
    /// Returns `TensorError::DeviceUnavailable` when no driver or no device is
    /// present.
    pub fn new() -> Result<Self> {
        cust::init(CudaFlags::empty()).map_err(|e| {
            TensorError::DeviceUnavailable(format!("CUDA driver unavailable: {}", e))
        })?;
        let count = CudaDevice::num_devices().map_err(|e| {
            TensorError::DeviceUnavailable(format!("cannot enumerate CUDA devices: {}", e))
        })?;
        if count == 0 {
            return Err(TensorError::DeviceUnavailable(
                "no CUDA device found".to_string(),
            ));
        }

        let device = CudaDevice::get_device(0).map_err(cuda_err("get device 0"))?;
        let device_name = device.name().map_err(cuda_err("query device name"))?;
        debug!("using CUDA device '{}' ({} present)", device_name, count);

        let context = Context::new(device).map_err(cuda_err("create context"))?;
        CurrentContext::set_current(&context).map_err(cuda_err("bind context"))?;
        let module = Module::from_ptx(kernels::MATMUL_PTX, &[])
            .map_err(cuda_err("load matmul module"))?;
        let stream =
            Stream::new(StreamFlags::NON_BLOCKING, None).map_err(cuda_err("create stream"))?;

        Ok(CudaBackend {
            device_name,
            module,
            stream,
            context,
        })
    }

    fn bind(&self) -> Result<()> {
        CurrentContext::set_current(&self.context).map_err(cuda_err("bind context"))
    }

    fn cuda_storage<'a>(&self, storage: &'a Storage) -> Result<&'a CudaStorage> {
        match storage {
            Storage::Cuda(s) => Ok(s),
            other => Err(TensorError::DeviceMismatch {
                lhs: Placement::Accelerator,
                rhs: other.placement(),
            }),
        }
    }
}

impl ComputeBackend for CudaBackend {
    fn name(&self) -> &str {
        "cuda"
    }

    fn placement(&self) -> Placement {
        Placement::Accelerator
    }

    fn upload(&self, data: &[f32]) -> Result<Storage> {
        self.bind()?;
        let buffer = DeviceBuffer::from_slice(data).map_err(cuda_err("upload"))?;
        Ok(Storage::Cuda(CudaStorage {
            buffer: Arc::new(buffer),
            len: data.len(),
        }))
    }

    fn download(&self, storage: &Storage) -> Result<Vec<f32>> {
        let storage = self.cuda_storage(storage)?;
        let mut out = vec![0.0f32; storage.len()];
        if storage.is_empty() {
            return Ok(out);
        }
        self.bind()?;
        storage
            .buffer
            .copy_to(&mut out[..])
            .map_err(cuda_err("download"))?;
        Ok(out)
    }

    fn matmul(&self, a: &Storage, b: &Storage, m: usize, k: usize, n: usize) -> Result<Storage> {
        let a = self.cuda_storage(a)?;
        let b = self.cuda_storage(b)?;
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
        let (m32, k32, n32) = (
            kernel_dim("cuda", "m", m)?,
            kernel_dim("cuda", "k", k)?,
            kernel_dim("cuda", "n", n)?,
        );

        self.bind()?;
        // SAFETY: the kernel writes every one of the m*n elements.
        let c = unsafe { DeviceBuffer::<f32>::uninitialized(m * n) }
            .map_err(cuda_err("allocate result"))?;
        if m * n != 0 {
            let function = self
                .module
                .get_function(kernels::MATMUL_KERNEL)
                .map_err(cuda_err("find matmul kernel"))?;
            let grid = (n32.div_ceil(BLOCK), m32.div_ceil(BLOCK), 1);
            let block = (BLOCK, BLOCK, 1);
            let stream = &self.stream;
            // SAFETY: argument order and types match the PTX entry, and every
            // buffer outlives the synchronize below.
            unsafe {
                launch!(function<<<grid, block, 0, stream>>>(
                    a.buffer.as_device_ptr(),
                    b.buffer.as_device_ptr(),
                    c.as_device_ptr(),
                    m32,
                    k32,
                    n32
                ))
                .map_err(cuda_err("launch matmul"))?;
            }
            stream.synchronize().map_err(cuda_err("matmul"))?;
        }

        Ok(Storage::Cuda(CudaStorage {
            buffer: Arc::new(c),
            len: m * n,
        }))
    }
}
