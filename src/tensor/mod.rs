use rand::Rng;

use crate::shapes::{ShapeError, ShapeErrorKind};
use crate::types::DType;

/// A dense, row-major f32 tensor owned by the runtime.
///
/// Rank-0 tensors are scalars and hold exactly one element. The dtype field
/// is carried for job-spec reporting; every materialized tensor is f32.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    dtype: DType,
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Tensor {
    /// Build a tensor from an existing buffer. The buffer length must match
    /// the element count implied by the shape.
    pub fn from_vec(shape: Vec<usize>, data: Vec<f32>) -> Result<Self, ShapeError> {
        let numel: usize = shape.iter().product();
        if data.len() != numel {
            return Err(ShapeError {
                op: "from_vec".to_string(),
                kind: ShapeErrorKind::RankMismatch {
                    expected: format!("{numel} elements"),
                    actual_lhs: vec![data.len()],
                    actual_rhs: None,
                },
            });
        }
        Ok(Self::from_parts(shape, data))
    }

    pub(crate) fn from_parts(shape: Vec<usize>, data: Vec<f32>) -> Self {
        Self {
            dtype: DType::F32,
            shape,
            data,
        }
    }

    pub fn fill(shape: &[usize], value: f32) -> Self {
        let numel = shape.iter().product();
        Self::from_parts(shape.to_vec(), vec![value; numel])
    }

    pub fn zeros(shape: &[usize]) -> Self {
        Self::fill(shape, 0.0)
    }

    pub fn ones(shape: &[usize]) -> Self {
        Self::fill(shape, 1.0)
    }

    pub fn scalar(value: f32) -> Self {
        Self::from_parts(Vec::new(), vec![value])
    }

    /// Sample every element uniformly from `[0, 1)`.
    pub fn uniform<R: Rng + ?Sized>(shape: &[usize], rng: &mut R) -> Self {
        let numel: usize = shape.iter().product();
        let data = (0..numel).map(|_| rng.gen::<f32>()).collect();
        Self::from_parts(shape.to_vec(), data)
    }

    pub fn dtype(&self) -> &DType {
        &self.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub(crate) fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Materialize this tensor at a broadcast target shape.
    ///
    /// Dimensions are aligned from the right; each source dimension must be
    /// equal to the target dimension or 1. Broadcast dimensions repeat the
    /// source data, so the result owns `target.iter().product()` elements.
    pub fn broadcast_to(&self, target: &[usize]) -> Result<Tensor, ShapeError> {
        if self.shape == target {
            return Ok(self.clone());
        }

        let incompatible = || ShapeError {
            op: "broadcast".to_string(),
            kind: ShapeErrorKind::BroadcastError {
                lhs: self.shape.clone(),
                rhs: target.to_vec(),
            },
        };

        let rank = target.len();
        if self.shape.len() > rank {
            return Err(incompatible());
        }
        let offset = rank - self.shape.len();

        let mut self_strides = vec![0usize; self.shape.len()];
        let mut stride = 1usize;
        for i in (0..self.shape.len()).rev() {
            self_strides[i] = stride;
            stride *= self.shape[i];
        }

        // Per target dimension: the source stride, or 0 where the source
        // repeats along a broadcast dimension.
        let mut src_strides = vec![0usize; rank];
        for i in offset..rank {
            let dim = self.shape[i - offset];
            if dim == target[i] {
                src_strides[i] = self_strides[i - offset];
            } else if dim != 1 {
                return Err(incompatible());
            }
        }

        let numel: usize = target.iter().product();
        let mut data = Vec::with_capacity(numel);
        let mut index = vec![0usize; rank];
        let mut src_offset = 0usize;
        for _ in 0..numel {
            data.push(self.data[src_offset]);
            for d in (0..rank).rev() {
                index[d] += 1;
                src_offset += src_strides[d];
                if index[d] < target[d] {
                    break;
                }
                src_offset -= src_strides[d] * target[d];
                index[d] = 0;
            }
        }

        Ok(Tensor::from_parts(target.to_vec(), data))
    }
}

/// Render a tensor for CLI and log output: type, shape, and a bounded
/// prefix of the data.
pub fn format_tensor_human(t: &Tensor) -> String {
    const PREVIEW: usize = 8;
    let mut shape = String::from("(");
    for (i, d) in t.shape().iter().enumerate() {
        if i > 0 {
            shape.push(',');
        }
        shape.push_str(&d.to_string());
    }
    shape.push(')');

    let mut data = String::from("[");
    for (i, v) in t.data().iter().take(PREVIEW).enumerate() {
        if i > 0 {
            data.push_str(", ");
        }
        data.push_str(&trim_float(*v));
    }
    if t.numel() > PREVIEW {
        data.push_str(", ...");
    }
    data.push(']');

    format!(
        "Tensor[{dtype:?},{shape}] data={data}",
        dtype = t.dtype(),
        shape = shape,
        data = data
    )
}

fn trim_float(x: f32) -> String {
    let s = format!("{:.6}", x);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}
