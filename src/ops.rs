// Copyright 2025 STARGA Inc.
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at:
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Part of the MIND project (Machine Intelligence Native Design).

use crate::types::DType;

/// Fixed-function metadata for a runtime operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpSignature {
    /// Canonical operator name as it appears in printed job graphs.
    pub name: &'static str,
    /// Number of tensor inputs expected by the op.
    pub arity: usize,
    /// Dtypes accepted by the op.
    pub allowed_dtypes: &'static [DType],
    /// Short description of the op contract.
    pub summary: &'static str,
}

/// The curated, auditable list of ops this runtime executes.
///
/// The set intentionally mirrors the job graph instruction set. Keep the
/// ordering stable so CLI output and documentation stay deterministic.
pub const fn runtime_ops() -> &'static [OpSignature] {
    &[
        OpSignature {
            name: "add",
            arity: 2,
            allowed_dtypes: &[DType::F32],
            summary: "Elementwise addition with standard broadcasting.",
        },
        OpSignature {
            name: "sub",
            arity: 2,
            allowed_dtypes: &[DType::F32],
            summary: "Elementwise subtraction with standard broadcasting.",
        },
        OpSignature {
            name: "mul",
            arity: 2,
            allowed_dtypes: &[DType::F32],
            summary: "Elementwise multiplication with standard broadcasting.",
        },
        OpSignature {
            name: "div",
            arity: 2,
            allowed_dtypes: &[DType::F32],
            summary: "Elementwise division with standard broadcasting.",
        },
        OpSignature {
            name: "neg",
            arity: 1,
            allowed_dtypes: &[DType::F32],
            summary: "Elementwise negation.",
        },
        OpSignature {
            name: "relu",
            arity: 1,
            allowed_dtypes: &[DType::F32],
            summary: "Elementwise ReLU activation.",
        },
        OpSignature {
            name: "exp",
            arity: 1,
            allowed_dtypes: &[DType::F32],
            summary: "Elementwise natural exponential.",
        },
        OpSignature {
            name: "log",
            arity: 1,
            allowed_dtypes: &[DType::F32],
            summary: "Elementwise natural logarithm.",
        },
        OpSignature {
            name: "sum_all",
            arity: 1,
            allowed_dtypes: &[DType::F32],
            summary: "Full reduction to a rank-0 sum.",
        },
        OpSignature {
            name: "mean_all",
            arity: 1,
            allowed_dtypes: &[DType::F32],
            summary: "Full reduction to a rank-0 mean.",
        },
        OpSignature {
            name: "dot",
            arity: 2,
            allowed_dtypes: &[DType::F32],
            summary: "1D dot product.",
        },
        OpSignature {
            name: "matmul",
            arity: 2,
            allowed_dtypes: &[DType::F32],
            summary: "Matrix multiplication for rank-2 tensors.",
        },
    ]
}

/// Returns true if the provided name is a runtime op.
pub fn is_runtime_op(name: &str) -> bool {
    runtime_ops().iter().any(|op| op.name == name)
}

/// Looks up the runtime metadata for an op.
pub fn find_op(name: &str) -> Option<&'static OpSignature> {
    runtime_ops().iter().find(|op| op.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes;

    #[test]
    fn registry_contains_core_arithmetic() {
        for name in ["add", "sub", "mul", "div"] {
            let op = find_op(name).unwrap();
            assert_eq!(op.arity, 2);
            assert!(op.allowed_dtypes.contains(&DType::F32));
        }
        assert!(!is_runtime_op("conv2d"));
    }

    #[test]
    fn every_registry_op_has_a_shape_rule() {
        for op in runtime_ops() {
            assert!(
                shapes::rule_for_op(op.name).is_some(),
                "no shape rule for {}",
                op.name
            );
        }
    }

    #[test]
    fn registry_names_are_unique() {
        let ops = runtime_ops();
        for (i, a) in ops.iter().enumerate() {
            for b in &ops[i + 1..] {
                assert_ne!(a.name, b.name);
            }
        }
    }
}
