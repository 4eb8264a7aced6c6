//! `mp-tensor` - Placement-aware matrices with pluggable compute backends for matprod.
//!
//! This crate provides:
//! - A `Tensor` type whose data lives on a specific `Device`
//! - A `ComputeBackend` trait for pluggable compute (CPU, CUDA, Metal)
//! - A reference `CpuBackend` implementation
//! - Device selection with an explicit `DevicePolicy`
//! - `matrix_product`, which moves operands to a device and multiplies there

pub mod backend;
pub mod cpu;
#[cfg(feature = "cuda")]
pub mod cuda;
pub mod device;
mod display;
pub mod error;
#[cfg(feature = "metal")]
pub mod metal;
pub mod product;
pub mod shape;
pub mod storage;
pub mod tensor;

// Re-export primary types at the crate root for convenience.
pub use backend::ComputeBackend;
pub use cpu::CpuBackend;
#[cfg(feature = "cuda")]
pub use cuda::CudaBackend;
pub use device::{Device, DevicePolicy, Placement};
pub use error::{Result, TensorError};
#[cfg(feature = "metal")]
pub use metal::MetalBackend;
pub use product::matrix_product;
pub use shape::Shape;
pub use storage::{CpuStorage, Storage};
pub use tensor::Tensor;
