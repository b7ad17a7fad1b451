use std::fmt;

/// A rank-N tensor shape represented as a list of extents.
///
/// The runtime treats shapes as ordered lists of non-negative extents. All
/// shapes are concrete; symbolic dimensions never reach the execution layer.
pub type Shape = Vec<usize>;

/// High-level shape rule categories for runtime operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeRuleKind {
    /// Unary elementwise op: output shape equals input shape.
    ElementwiseUnary,
    /// Binary elementwise op: broadcasting is applied to operands.
    ElementwiseBinary,
    /// Full reduction to a scalar (rank-0) value.
    ReduceAll,
    /// Inner product of two rank-1 tensors of equal length.
    Dot1D,
    /// Matrix multiplication of two rank-2 tensors.
    MatMul2D,
}

/// Error kinds produced by the shape engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeErrorKind {
    /// Operator is unknown to the runtime shape engine.
    UnknownOp,
    /// Rank or size mismatch for the given rule.
    RankMismatch {
        expected: String,
        actual_lhs: Vec<usize>,
        actual_rhs: Option<Vec<usize>>,
    },
    /// Broadcasting failed for the given input shapes.
    BroadcastError { lhs: Vec<usize>, rhs: Vec<usize> },
    /// A graph instruction referenced an input slot the job does not declare.
    MissingInput { index: usize },
    /// A graph instruction referenced a value with no inferred shape.
    UndefinedValue { value: usize },
}

/// Rich shape error containing the operator name and a structured kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeError {
    pub op: String,
    pub kind: ShapeErrorKind,
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ShapeErrorKind::UnknownOp => {
                write!(f, "shape rule not defined for op `{}`", self.op)
            }
            ShapeErrorKind::RankMismatch {
                expected,
                actual_lhs,
                actual_rhs,
            } => {
                if let Some(rhs) = actual_rhs {
                    write!(
                        f,
                        "rank mismatch for op `{}`: expected {}, got lhs={:?}, rhs={:?}",
                        self.op, expected, actual_lhs, rhs
                    )
                } else {
                    write!(
                        f,
                        "rank mismatch for op `{}`: expected {}, got lhs={:?}",
                        self.op, expected, actual_lhs
                    )
                }
            }
            ShapeErrorKind::BroadcastError { lhs, rhs } => write!(
                f,
                "cannot broadcast shapes {:?} and {:?} for op `{}`",
                lhs, rhs, self.op
            ),
            ShapeErrorKind::MissingInput { index } => write!(
                f,
                "op `{}` references input {} which the job does not declare",
                self.op, index
            ),
            ShapeErrorKind::UndefinedValue { value } => write!(
                f,
                "op `{}` references value %{} before it is defined",
                self.op, value
            ),
        }
    }
}

impl std::error::Error for ShapeError {}

/// Returns the coarse shape rule kind for a runtime operator name.
///
/// The mapping uses the same string identifiers as the operator registry and
/// the graph printer; keep the three in sync.
pub fn rule_for_op(op: &str) -> Option<ShapeRuleKind> {
    match op {
        // Unary elementwise.
        "neg" | "relu" | "exp" | "log" => Some(ShapeRuleKind::ElementwiseUnary),

        // Binary elementwise.
        "add" | "sub" | "mul" | "div" => Some(ShapeRuleKind::ElementwiseBinary),

        // Full reductions to scalar.
        "sum_all" | "mean_all" => Some(ShapeRuleKind::ReduceAll),

        // Linear algebra.
        "dot" => Some(ShapeRuleKind::Dot1D),
        "matmul" => Some(ShapeRuleKind::MatMul2D),

        _ => None,
    }
}

/// Convenience helper: true if the given op is treated as elementwise
/// (unary or binary).
pub fn is_elementwise(op: &str) -> bool {
    matches!(
        rule_for_op(op),
        Some(ShapeRuleKind::ElementwiseUnary | ShapeRuleKind::ElementwiseBinary)
    )
}

/// Compute the broadcasted shape for two input shapes following the
/// standard "numpy-style" broadcasting rules.
///
/// Shapes are aligned from the right; dimensions must be equal or 1,
/// otherwise broadcasting fails. A rank-0 operand broadcasts against any
/// shape.
pub fn broadcast_shapes(lhs: &[usize], rhs: &[usize]) -> Result<Shape, ShapeErrorKind> {
    let mut result = Vec::new();

    let max_rank = lhs.len().max(rhs.len());
    for i in 0..max_rank {
        let a = lhs
            .get(lhs.len().wrapping_sub(1).wrapping_sub(i))
            .copied()
            .unwrap_or(1);
        let b = rhs
            .get(rhs.len().wrapping_sub(1).wrapping_sub(i))
            .copied()
            .unwrap_or(1);

        let dim = if a == b || a == 1 {
            b
        } else if b == 1 {
            a
        } else {
            return Err(ShapeErrorKind::BroadcastError {
                lhs: lhs.to_vec(),
                rhs: rhs.to_vec(),
            });
        };

        result.push(dim);
    }

    result.reverse();
    Ok(result)
}

/// Output shape of a rank-1 inner product: a scalar, provided both operands
/// are rank-1 and of equal length.
pub fn dot_shape(lhs: &[usize], rhs: &[usize]) -> Result<Shape, ShapeErrorKind> {
    if lhs.len() != 1 || rhs.len() != 1 || lhs[0] != rhs[0] {
        return Err(ShapeErrorKind::RankMismatch {
            expected: "two rank-1 tensors of equal length".to_string(),
            actual_lhs: lhs.to_vec(),
            actual_rhs: Some(rhs.to_vec()),
        });
    }
    Ok(Vec::new())
}

/// Output shape of a rank-2 matrix product.
pub fn matmul_shape(lhs: &[usize], rhs: &[usize]) -> Result<Shape, ShapeErrorKind> {
    if lhs.len() != 2 || rhs.len() != 2 {
        return Err(ShapeErrorKind::RankMismatch {
            expected: "two rank-2 tensors".to_string(),
            actual_lhs: lhs.to_vec(),
            actual_rhs: Some(rhs.to_vec()),
        });
    }

    if lhs[1] != rhs[0] {
        return Err(ShapeErrorKind::RankMismatch {
            expected: "lhs.shape[1] == rhs.shape[0]".to_string(),
            actual_lhs: lhs.to_vec(),
            actual_rhs: Some(rhs.to_vec()),
        });
    }

    Ok(vec![lhs[0], rhs[1]])
}

/// Infer the output shape for a runtime operator given its input shapes.
///
/// This helper focuses on the fully-determined cases the job graph can
/// express; axis parameters and partial reductions are out of its scope.
pub fn infer_output_shape(op: &str, inputs: &[&[usize]]) -> Result<Shape, ShapeError> {
    let rule = match rule_for_op(op) {
        Some(rule) => rule,
        None => {
            return Err(ShapeError {
                op: op.to_string(),
                kind: ShapeErrorKind::UnknownOp,
            })
        }
    };

    let wrap = |kind: ShapeErrorKind| ShapeError {
        op: op.to_string(),
        kind,
    };

    match rule {
        ShapeRuleKind::ElementwiseUnary => {
            let lhs = inputs.first().ok_or_else(|| {
                wrap(ShapeErrorKind::RankMismatch {
                    expected: "one input tensor".to_string(),
                    actual_lhs: Vec::new(),
                    actual_rhs: None,
                })
            })?;
            Ok(lhs.to_vec())
        }
        ShapeRuleKind::ElementwiseBinary => {
            let lhs = inputs.first().copied().unwrap_or(&[]);
            let rhs = inputs.get(1).copied().unwrap_or(&[]);
            broadcast_shapes(lhs, rhs).map_err(wrap)
        }
        ShapeRuleKind::ReduceAll => Ok(Vec::new()),
        ShapeRuleKind::Dot1D => {
            let lhs = inputs.first().copied().unwrap_or(&[]);
            let rhs = inputs.get(1).copied().unwrap_or(&[]);
            dot_shape(lhs, rhs).map_err(wrap)
        }
        ShapeRuleKind::MatMul2D => {
            let lhs = inputs.first().copied().unwrap_or(&[]);
            let rhs = inputs.get(1).copied().unwrap_or(&[]);
            matmul_shape(lhs, rhs).map_err(wrap)
        }
    }
}
