//! Basic tensor type definitions.
//!
//! # Example
//! ```
//! use mind_runtime::types::{TensorType, DType};
//! let ty = TensorType::new(DType::F32, vec![2, 3]);
//! assert_eq!(ty.numel(), 6);
//! ```

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DType {
    I32,
    F32,
}

impl DType {
    /// Lowercase name used in job specs and CLI output.
    pub fn name(&self) -> &'static str {
        match self {
            DType::I32 => "i32",
            DType::F32 => "f32",
        }
    }
}

/// Declared type of a job input or output: element dtype plus a concrete,
/// row-major shape. Rank-0 shapes describe scalars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorType {
    pub dtype: DType,
    pub shape: Vec<usize>,
}

impl TensorType {
    pub fn new(dtype: DType, shape: Vec<usize>) -> Self {
        Self { dtype, shape }
    }

    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }
}

#[cfg(test)]
mod tests {
    use super::{DType, TensorType};

    #[test]
    fn tensor_type_new_covers_constructor() {
        let t = TensorType::new(DType::F32, vec![2, 3]);
        assert_eq!(t.dtype, DType::F32);
        assert_eq!(t.shape, vec![2, 3]);
    }

    #[test]
    fn scalar_type_has_one_element() {
        let t = TensorType::new(DType::F32, vec![]);
        assert_eq!(t.numel(), 1);
    }

    #[test]
    fn dtype_names_are_lowercase() {
        assert_eq!(DType::F32.name(), "f32");
        assert_eq!(DType::I32.name(), "i32");
    }
}
