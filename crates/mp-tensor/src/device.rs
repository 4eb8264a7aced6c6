use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use log::{debug, warn};

use crate::backend::ComputeBackend;
use crate::cpu::CpuBackend;
use crate::error::{Result, TensorError};

/// Memory space a tensor's data resides in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placement {
    Host,
    Accelerator,
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::Host => write!(f, "host"),
            Placement::Accelerator => write!(f, "accelerator"),
        }
    }
}

/// What to do when choosing the device for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DevicePolicy {
    /// Use the accelerator or fail with `DeviceUnavailable`.
    #[default]
    RequireAccelerator,
    /// Use the accelerator if one is present, otherwise the host.
    PreferAccelerator,
    /// Always compute on the host.
    Host,
}

impl FromStr for DevicePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "accelerator" | "gpu" => Ok(DevicePolicy::RequireAccelerator),
            "auto" => Ok(DevicePolicy::PreferAccelerator),
            "host" | "cpu" => Ok(DevicePolicy::Host),
            other => Err(format!(
                "unknown device policy '{}': expected accelerator, auto or host",
                other
            )),
        }
    }
}

impl fmt::Display for DevicePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DevicePolicy::RequireAccelerator => write!(f, "accelerator"),
            DevicePolicy::PreferAccelerator => write!(f, "auto"),
            DevicePolicy::Host => write!(f, "host"),
        }
    }
}

/// Handle to a compute device.
///
/// Cloning is cheap; all clones share one backend (and, for accelerators, one
/// device context which is released when the last clone drops).
#[derive(Debug, Clone)]
pub struct Device {
    backend: Arc<dyn ComputeBackend>,
}

impl Device {
    /// The host CPU.
    pub fn host() -> Self {
        Device::from_backend(Arc::new(CpuBackend::new()))
    }

    /// The system's default accelerator: CUDA first, then Metal, among the
    /// backends compiled in.
    ///
    /// Never falls back to the host: without an accelerator this returns
    /// `TensorError::DeviceUnavailable` listing why each backend was skipped.
    pub fn accelerator() -> Result<Self> {
        #[allow(unused_mut)]
        let mut reasons: Vec<String> = Vec::new();

        #[cfg(feature = "cuda")]
        {
            if let Some(device) = acquire(crate::cuda::CudaBackend::new(), &mut reasons)? {
                return Ok(device);
            }
        }
        #[cfg(feature = "metal")]
        {
            if let Some(device) = acquire(crate::metal::MetalBackend::new(), &mut reasons)? {
                return Ok(device);
            }
        }

        if reasons.is_empty() {
            reasons.push(
                "built without an accelerator backend (enable the `cuda` or `metal` feature)"
                    .to_string(),
            );
        }
        Err(TensorError::DeviceUnavailable(reasons.join("; ")))
    }

    /// Resolve a device according to `policy`.
    pub fn select(policy: DevicePolicy) -> Result<Self> {
        debug!("selecting device with policy '{}'", policy);
        match policy {
            DevicePolicy::RequireAccelerator => Device::accelerator(),
            DevicePolicy::PreferAccelerator => match Device::accelerator() {
                Ok(device) => Ok(device),
                Err(TensorError::DeviceUnavailable(reason)) => {
                    warn!("{}; falling back to host", reason);
                    Ok(Device::host())
                }
                Err(e) => Err(e),
            },
            DevicePolicy::Host => Ok(Device::host()),
        }
    }

    /// Wrap an arbitrary backend.
    pub fn from_backend(backend: Arc<dyn ComputeBackend>) -> Self {
        Device { backend }
    }

    pub fn backend(&self) -> &dyn ComputeBackend {
        self.backend.as_ref()
    }

    pub fn placement(&self) -> Placement {
        self.backend.placement()
    }

    pub fn name(&self) -> &str {
        self.backend.name()
    }

    pub fn is_accelerator(&self) -> bool {
        self.placement() == Placement::Accelerator
    }
}

/// Wrap a freshly constructed backend, recording why it was unavailable
/// instead of failing outright.
#[cfg(any(feature = "cuda", feature = "metal"))]
fn acquire<B: ComputeBackend + 'static>(
    attempt: Result<B>,
    reasons: &mut Vec<String>,
) -> Result<Option<Device>> {
    match attempt {
        Ok(backend) => {
            debug!("acquired accelerator backend '{}'", backend.name());
            Ok(Some(Device::from_backend(Arc::new(backend))))
        }
        Err(TensorError::DeviceUnavailable(reason)) => {
            debug!("accelerator backend skipped: {}", reason);
            reasons.push(reason);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Two devices are the same when their storage is interchangeable: same
/// placement and same backend kind. Instances of one backend share the
/// system device, so they compare equal.
impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        self.placement() == other.placement() && self.name() == other.name()
    }
}

impl Eq for Device {}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
