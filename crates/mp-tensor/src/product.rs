use log::debug;

use crate::device::Device;
use crate::error::Result;
use crate::shape::Shape;
use crate::tensor::Tensor;

/// Multiply `a @ b` on `device`.
///
/// Both operands are copied to `device` first; the result stays there. Shapes
/// are validated before any transfer so a mismatch never touches the device.
pub fn matrix_product(a: &Tensor, b: &Tensor, device: &Device) -> Result<Tensor> {
    let (m, k, n) = Shape::matmul_dims(a.shape(), b.shape())?;
    debug!("matrix product [{}x{}] @ [{}x{}] on {}", m, k, k, n, device.name());

    let a = a.to_device(device)?;
    let b = b.to_device(device)?;
    a.matmul(&b)
}
