use std::fmt;

use crate::error::Result;
use crate::tensor::Tensor;

const PRECISION: usize = 4;
const PREFIX: &str = "tensor(";

impl Tensor {
    /// Render in the familiar `tensor([[...], [...]])` layout: row-major,
    /// fixed precision, values right-aligned to a common width. Accelerator
    /// tensors are copied to the host first and tagged with the device.
    ///
    /// Fails if the copy back to the host fails.
    pub fn render(&self) -> Result<String> {
        let data = self.to_vec()?;
        Ok(Rendered {
            tensor: self,
            data: &data,
        }
        .to_string())
    }
}

/// `Display` for tensors. Prefer `Tensor::render` where a failed device read
/// must be reported: here it can only surface as `fmt::Error`.
impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.to_vec().map_err(|_| fmt::Error)?;
        let rendered = Rendered {
            tensor: self,
            data: &data,
        };
        fmt::Display::fmt(&rendered, f)
    }
}

/// A tensor paired with its host copy.
struct Rendered<'a> {
    tensor: &'a Tensor,
    data: &'a [f32],
}

impl fmt::Display for Rendered<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<String> = self
            .data
            .iter()
            .map(|v| format!("{:.*}", PRECISION, v))
            .collect();
        let width = cells.iter().map(|c| c.len()).max().unwrap_or(0);

        write!(f, "{}", PREFIX)?;
        write_block(f, &cells, self.tensor.shape().dims(), PREFIX.len(), width)?;
        if self.tensor.device().is_accelerator() {
            write!(f, ", device='{}'", self.tensor.device().name())?;
        }
        write!(f, ")")
    }
}

/// Write one bracketed level of nesting. `indent` is the column the opening
/// bracket sits at.
fn write_block(
    f: &mut fmt::Formatter<'_>,
    cells: &[String],
    dims: &[usize],
    indent: usize,
    width: usize,
) -> fmt::Result {
    match dims {
        [] => write!(f, "{:>width$}", cells.first().map(String::as_str).unwrap_or("")),
        [_] => {
            write!(f, "[")?;
            for (i, c) in cells.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{:>width$}", c)?;
            }
            write!(f, "]")
        }
        [outer, inner @ ..] => {
            let stride: usize = inner.iter().product();
            write!(f, "[")?;
            for i in 0..*outer {
                if i > 0 {
                    write!(f, ",")?;
                    // One blank line between blocks of rank 3 and above.
                    for _ in 1..inner.len() {
                        writeln!(f)?;
                    }
                    writeln!(f)?;
                    write!(f, "{:indent$}", "", indent = indent + 1)?;
                }
                let chunk = &cells[i * stride..(i + 1) * stride];
                write_block(f, chunk, inner, indent + 1, width)?;
            }
            write!(f, "]")
        }
    }
}
