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

use std::collections::BTreeSet;

use crate::graph::{instruction_dst, Instr, JobGraph, ValueId};

/// Structured errors returned by the job graph verifier.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GraphVerifyError {
    /// Multiple instructions attempted to define the same SSA value.
    #[error("duplicate definition for value %{0}")]
    DuplicateDefinition(ValueId),
    /// A value was referenced before it had been defined.
    #[error("use of undefined value %{value} at instruction {instr_index}")]
    UseBeforeDefinition { value: ValueId, instr_index: usize },
    /// The graph contains no `Output` instruction.
    #[error("graph is missing an Output instruction")]
    MissingOutput,
    /// The graph contains more than one `Output` instruction; jobs return a
    /// single tensor.
    #[error("graph defines {found} outputs but jobs return exactly one tensor")]
    MultipleOutputs { found: usize },
    /// The graph's `next_id` counter does not match the SSA IDs in use.
    #[error("next_id {found} is smaller than required {expected}")]
    NextIdOutOfSync { found: usize, expected: usize },
    /// Operand validation failed (e.g., an out-of-range input slot).
    #[error("invalid operand in instruction {instr_index}: {message}")]
    InvalidOperand { instr_index: usize, message: String },
}

/// Verify that a [`JobGraph`] is well-formed and deterministic.
///
/// The verifier enforces SSA discipline (unique definitions, no
/// use-before-def), input slot sanity, the single-output contract, and
/// synchronization of the graph's `next_id` counter. It returns structured
/// errors instead of panicking on invalid input.
pub fn verify_graph(graph: &JobGraph) -> Result<(), GraphVerifyError> {
    let mut defined: BTreeSet<ValueId> = BTreeSet::new();
    let mut bound_inputs: BTreeSet<usize> = BTreeSet::new();
    let mut output_count = 0usize;
    let mut max_seen = 0usize;

    for (idx, instr) in graph.instrs.iter().enumerate() {
        validate_operands(idx, instr, graph.input_arity, &defined, &mut bound_inputs)?;

        if let Some(dst) = instruction_dst(instr) {
            if !defined.insert(dst) {
                return Err(GraphVerifyError::DuplicateDefinition(dst));
            }
            max_seen = max_seen.max(dst.0 + 1);
        }

        if matches!(instr, Instr::Output(_)) {
            output_count += 1;
        }
    }

    if output_count == 0 {
        return Err(GraphVerifyError::MissingOutput);
    }
    if output_count > 1 {
        return Err(GraphVerifyError::MultipleOutputs {
            found: output_count,
        });
    }

    if graph.next_id < max_seen {
        return Err(GraphVerifyError::NextIdOutOfSync {
            found: graph.next_id,
            expected: max_seen,
        });
    }

    Ok(())
}

fn validate_operands(
    instr_index: usize,
    instr: &Instr,
    input_arity: usize,
    defined: &BTreeSet<ValueId>,
    bound_inputs: &mut BTreeSet<usize>,
) -> Result<(), GraphVerifyError> {
    let check_defined = |value: ValueId| {
        if !defined.contains(&value) {
            Err(GraphVerifyError::UseBeforeDefinition { value, instr_index })
        } else {
            Ok(())
        }
    };

    match instr {
        Instr::Input { index, .. } => {
            if *index >= input_arity {
                return Err(GraphVerifyError::InvalidOperand {
                    instr_index,
                    message: format!("input index {index} out of range for arity {input_arity}"),
                });
            }
            if !bound_inputs.insert(*index) {
                return Err(GraphVerifyError::InvalidOperand {
                    instr_index,
                    message: format!("input {index} bound more than once"),
                });
            }
        }
        Instr::ConstFill { .. } => {}
        Instr::BinOp { lhs, rhs, .. } => {
            check_defined(*lhs)?;
            check_defined(*rhs)?;
        }
        Instr::ScalarOp { src, .. } | Instr::UnaryOp { src, .. } | Instr::Reduce { src, .. } => {
            check_defined(*src)?;
        }
        Instr::Dot { a, b, .. } | Instr::MatMul { a, b, .. } => {
            check_defined(*a)?;
            check_defined(*b)?;
        }
        Instr::Output(id) => {
            check_defined(*id)?;
        }
    }

    Ok(())
}
