use log::debug;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::device::{Device, Placement};
use crate::error::{Result, TensorError};
use crate::shape::Shape;
use crate::storage::{CpuStorage, Storage};

/// A dense, row-major f32 tensor living on a specific device.
///
/// Tensors are immutable; `to_device` produces a new tensor rather than
/// relocating this one. There is no autograd state.
#[derive(Debug, Clone)]
pub struct Tensor {
    storage: Storage,
    shape: Shape,
    device: Device,
}

impl Tensor {
    /// Create a host tensor from f32 data and a shape.
    pub fn from_vec(data: Vec<f32>, shape: impl Into<Shape>) -> Result<Self> {
        let shape = shape.into();
        if data.len() != shape.numel() {
            return Err(TensorError::ShapeMismatch {
                expected: shape.dims().to_vec(),
                got: vec![data.len()],
            });
        }
        let device = Device::host();
        let storage = device.backend().upload(&data)?;
        Ok(Tensor {
            storage,
            shape,
            device,
        })
    }

    /// Create a zero-filled host tensor with the given shape.
    pub fn zeros(shape: impl Into<Shape>) -> Self {
        let shape = shape.into();
        Tensor::host_unchecked(vec![0.0; shape.numel()], shape)
    }

    /// The `n x n` identity matrix on the host.
    pub fn eye(n: usize) -> Self {
        let mut data = vec![0.0f32; n * n];
        for i in 0..n {
            data[i * n + i] = 1.0;
        }
        Tensor::host_unchecked(data, Shape::matrix(n, n))
    }

    /// A host tensor of independent standard-normal samples drawn from `rng`.
    pub fn randn<R: Rng>(shape: impl Into<Shape>, rng: &mut R) -> Self {
        let shape = shape.into();
        let data: Vec<f32> = (0..shape.numel())
            .map(|_| rng.sample(StandardNormal))
            .collect();
        Tensor::host_unchecked(data, shape)
    }

    fn host_unchecked(data: Vec<f32>, shape: Shape) -> Self {
        debug_assert_eq!(data.len(), shape.numel());
        Tensor {
            storage: Storage::Cpu(CpuStorage::from_f32_vec(data)),
            shape,
            device: Device::host(),
        }
    }

    /// Returns a reference to the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// The device holding this tensor's data.
    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn placement(&self) -> Placement {
        self.device.placement()
    }

    /// Copy this tensor onto `device`.
    ///
    /// Returns a cheap clone when the tensor is already there.
    pub fn to_device(&self, device: &Device) -> Result<Tensor> {
        if self.device == *device {
            return Ok(self.clone());
        }
        debug!(
            "moving {} tensor from {} to {}",
            self.shape,
            self.device.name(),
            device.name()
        );
        let data = self.device.backend().download(&self.storage)?;
        let storage = device.backend().upload(&data)?;
        Ok(Tensor {
            storage,
            shape: self.shape.clone(),
            device: device.clone(),
        })
    }

    /// Copy the data back to host memory as a row-major vector.
    pub fn to_vec(&self) -> Result<Vec<f32>> {
        self.device.backend().download(&self.storage)
    }

    /// Matrix multiplication of two 2D tensors on their shared device.
    ///
    /// self is [m, k], other is [k, n], result is [m, n]. Both operands must
    /// already live on the same device; nothing is moved implicitly.
    pub fn matmul(&self, other: &Tensor) -> Result<Tensor> {
        if self.device != other.device {
            return Err(TensorError::DeviceMismatch {
                lhs: self.placement(),
                rhs: other.placement(),
            });
        }
        let (m, k, n) = Shape::matmul_dims(&self.shape, &other.shape)?;

        let storage = self
            .device
            .backend()
            .matmul(&self.storage, &other.storage, m, k, n)?;
        Ok(Tensor {
            storage,
            shape: Shape::matrix(m, n),
            device: self.device.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_from_vec() {
        let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], (2, 3)).unwrap();
        assert_eq!(t.shape().dims(), &[2, 3]);
        assert_eq!(t.placement(), Placement::Host);
        assert_eq!(t.to_vec().unwrap(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_from_vec_shape_mismatch() {
        assert!(matches!(
            Tensor::from_vec(vec![1.0, 2.0], (2, 2)),
            Err(TensorError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_zeros_eye() {
        let z = Tensor::zeros((2, 3));
        assert_eq!(z.to_vec().unwrap(), vec![0.0; 6]);

        let i = Tensor::eye(3);
        assert_eq!(
            i.to_vec().unwrap(),
            vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]
        );
    }

    #[test]
    fn test_randn_is_seeded_and_shaped() {
        let a = Tensor::randn((3, 3), &mut StdRng::seed_from_u64(7));
        let b = Tensor::randn((3, 3), &mut StdRng::seed_from_u64(7));
        assert_eq!(a.shape().dims(), &[3, 3]);
        assert_eq!(a.to_vec().unwrap(), b.to_vec().unwrap());
        assert!(a.to_vec().unwrap().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_randn_moments() {
        let t = Tensor::randn(vec![10_000], &mut StdRng::seed_from_u64(42));
        let v = t.to_vec().unwrap();
        let mean = v.iter().sum::<f32>() / v.len() as f32;
        let var = v.iter().map(|x| (x - mean) * (x - mean)).sum::<f32>() / v.len() as f32;
        assert!(mean.abs() < 0.05, "mean = {}", mean);
        assert!((var - 1.0).abs() < 0.1, "var = {}", var);
    }

    #[test]
    fn test_to_same_device_is_noop() {
        let t = Tensor::eye(2);
        let moved = t.to_device(&Device::host()).unwrap();
        assert_eq!(moved.placement(), Placement::Host);
        assert_eq!(moved.to_vec().unwrap(), t.to_vec().unwrap());
    }

    #[test]
    fn test_matmul() {
        let a = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], (2, 2)).unwrap();
        let b = Tensor::from_vec(vec![5.0, 6.0, 7.0, 8.0], (2, 2)).unwrap();
        let c = a.matmul(&b).unwrap();
        assert_eq!(c.shape().dims(), &[2, 2]);
        assert_eq!(c.to_vec().unwrap(), vec![19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_matmul_dimension_mismatch() {
        let a = Tensor::from_vec(vec![1.0, 2.0, 3.0], (1, 3)).unwrap();
        let b = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], (2, 2)).unwrap();
        assert!(matches!(
            a.matmul(&b),
            Err(TensorError::MatmulMismatch { .. })
        ));
    }

    #[test]
    fn test_matmul_requires_matrices() {
        let a = Tensor::from_vec(vec![1.0, 2.0, 3.0], vec![3]).unwrap();
        assert!(matches!(
            a.matmul(&a),
            Err(TensorError::NotAMatrix { ndim: 1 })
        ));
    }
}
