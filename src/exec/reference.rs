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

//! Reference backend: direct interpretation of a job graph.

use std::collections::HashMap;

use crate::exec::{apply_binop, apply_reduce, apply_scalar_op, apply_unary, const_fill, ExecError};
use crate::graph::{Instr, JobGraph, ValueId};
use crate::tensor::Tensor;

/// Run a verified job graph against bound input tensors.
///
/// Instructions execute in program order with a value table keyed by SSA
/// id. The tensor named by the `Output` instruction is moved out of the
/// table and returned.
pub fn run_graph(graph: &JobGraph, inputs: &[Tensor]) -> Result<Tensor, ExecError> {
    let mut vals: HashMap<ValueId, Tensor> = HashMap::new();
    let mut output: Option<ValueId> = None;

    for instr in &graph.instrs {
        match instr {
            Instr::Input { dst, index } => {
                let tensor = inputs.get(*index).ok_or_else(|| {
                    ExecError::Shape(format!(
                        "input index {index} out of range for {} bound tensors",
                        inputs.len()
                    ))
                })?;
                vals.insert(*dst, tensor.clone());
            }
            Instr::ConstFill {
                dst,
                dtype,
                shape,
                value,
            } => {
                vals.insert(*dst, const_fill(dtype, shape, *value)?);
            }
            Instr::BinOp { dst, op, lhs, rhs } => {
                let out = apply_binop(*op, fetch(&vals, *lhs)?, fetch(&vals, *rhs)?)?;
                vals.insert(*dst, out);
            }
            Instr::ScalarOp {
                dst,
                op,
                src,
                scalar,
                tensor_on_left,
            } => {
                let out = apply_scalar_op(*op, fetch(&vals, *src)?, *scalar, *tensor_on_left)?;
                vals.insert(*dst, out);
            }
            Instr::UnaryOp { dst, op, src } => {
                let out = apply_unary(*op, fetch(&vals, *src)?)?;
                vals.insert(*dst, out);
            }
            Instr::Reduce { dst, kind, src } => {
                let out = apply_reduce(*kind, fetch(&vals, *src)?)?;
                vals.insert(*dst, out);
            }
            Instr::Dot { dst, a, b } => {
                let out = super::cpu::exec_dot(fetch(&vals, *a)?, fetch(&vals, *b)?)?;
                vals.insert(*dst, out);
            }
            Instr::MatMul { dst, a, b } => {
                let out = super::cpu::exec_matmul(fetch(&vals, *a)?, fetch(&vals, *b)?)?;
                vals.insert(*dst, out);
            }
            Instr::Output(id) => {
                output = Some(*id);
            }
        }
    }

    let id = output.ok_or_else(|| {
        ExecError::Unsupported("job graph has no Output instruction".to_string())
    })?;
    vals.remove(&id)
        .ok_or_else(|| ExecError::Unsupported(format!("undefined output value %{}", id.0)))
}

fn fetch(vals: &HashMap<ValueId, Tensor>, id: ValueId) -> Result<&Tensor, ExecError> {
    vals.get(&id)
        .ok_or_else(|| ExecError::Unsupported(format!("undefined value %{} in job graph", id.0)))
}
