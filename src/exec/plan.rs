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

//! Compiled backend: job graphs lowered to slot-allocated execution plans.
//!
//! Lowering happens once, at job-build time, after canonicalization. The
//! plan resolves every SSA id to a dense slot index so a run is a single
//! pass over the step list with no map lookups. Step order preserves the
//! canonical instruction order, which keeps results bit-identical to the
//! reference backend.

use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write;

use tracing::debug;

use crate::exec::{apply_binop, apply_reduce, apply_scalar_op, apply_unary, const_fill, ExecError};
use crate::graph::{BinOp, GraphVerifyError, Instr, JobGraph, ReduceKind, UnaryOp, ValueId};
use crate::graph::print::{format_binop, format_reduce, format_unary, paren_shape, trim_float};
use crate::tensor::Tensor;
use crate::types::DType;

#[derive(Debug, Clone)]
enum PlanStep {
    BindInput { slot: usize, index: usize },
    Fill { slot: usize, dtype: DType, shape: Vec<usize>, value: f32 },
    Binary { slot: usize, op: BinOp, lhs: usize, rhs: usize },
    Scalar { slot: usize, op: BinOp, src: usize, scalar: f32, tensor_on_left: bool },
    Unary { slot: usize, op: UnaryOp, src: usize },
    Reduce { slot: usize, kind: ReduceKind, src: usize },
    Dot { slot: usize, a: usize, b: usize },
    MatMul { slot: usize, a: usize, b: usize },
}

/// A lowered job graph ready for repeated synchronous execution.
#[derive(Debug, Clone)]
pub struct ExecPlan {
    steps: Vec<PlanStep>,
    slot_count: usize,
    output_slot: usize,
}

impl ExecPlan {
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }
}

impl fmt::Display for ExecPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        writeln!(&mut out, "plan {{").expect("write to string cannot fail");
        for step in &self.steps {
            format_step(step, &mut out);
        }
        writeln!(
            &mut out,
            "}}  // slots = {}, output = s{}",
            self.slot_count, self.output_slot
        )
        .expect("write to string cannot fail");
        write!(f, "{out}")
    }
}

fn format_step(step: &PlanStep, out: &mut String) {
    match step {
        PlanStep::BindInput { slot, index } => {
            writeln!(out, "  s{slot} = input {index}").unwrap();
        }
        PlanStep::Fill {
            slot, shape, value, ..
        } => {
            writeln!(
                out,
                "  s{slot} = const.fill {} value={}",
                paren_shape(shape),
                trim_float(*value)
            )
            .unwrap();
        }
        PlanStep::Binary { slot, op, lhs, rhs } => {
            writeln!(out, "  s{slot} = {} s{lhs}, s{rhs}", format_binop(*op)).unwrap();
        }
        PlanStep::Scalar {
            slot,
            op,
            src,
            scalar,
            tensor_on_left,
        } => {
            if *tensor_on_left {
                writeln!(
                    out,
                    "  s{slot} = {}_scalar s{src}, {}",
                    format_binop(*op),
                    trim_float(*scalar)
                )
                .unwrap();
            } else {
                writeln!(
                    out,
                    "  s{slot} = scalar_{} {}, s{src}",
                    format_binop(*op),
                    trim_float(*scalar)
                )
                .unwrap();
            }
        }
        PlanStep::Unary { slot, op, src } => {
            writeln!(out, "  s{slot} = {} s{src}", format_unary(*op)).unwrap();
        }
        PlanStep::Reduce { slot, kind, src } => {
            writeln!(out, "  s{slot} = {} s{src}", format_reduce(*kind)).unwrap();
        }
        PlanStep::Dot { slot, a, b } => {
            writeln!(out, "  s{slot} = dot s{a}, s{b}").unwrap();
        }
        PlanStep::MatMul { slot, a, b } => {
            writeln!(out, "  s{slot} = matmul s{a}, s{b}").unwrap();
        }
    }
}

/// Lower a verified, canonicalized graph into an [`ExecPlan`].
///
/// Malformed graphs surface the same structured errors as the verifier
/// rather than panicking.
pub fn compile_plan(graph: &JobGraph) -> Result<ExecPlan, GraphVerifyError> {
    let mut slots: BTreeMap<ValueId, usize> = BTreeMap::new();
    let mut steps = Vec::with_capacity(graph.instrs.len());
    let mut output_slot: Option<usize> = None;

    for (instr_index, instr) in graph.instrs.iter().enumerate() {
        let resolve = |slots: &BTreeMap<ValueId, usize>, id: ValueId| {
            slots
                .get(&id)
                .copied()
                .ok_or(GraphVerifyError::UseBeforeDefinition {
                    value: id,
                    instr_index,
                })
        };

        match instr {
            Instr::Input { dst, index } => {
                let slot = assign_slot(&mut slots, *dst)?;
                steps.push(PlanStep::BindInput {
                    slot,
                    index: *index,
                });
            }
            Instr::ConstFill {
                dst,
                dtype,
                shape,
                value,
            } => {
                let slot = assign_slot(&mut slots, *dst)?;
                steps.push(PlanStep::Fill {
                    slot,
                    dtype: dtype.clone(),
                    shape: shape.clone(),
                    value: *value,
                });
            }
            Instr::BinOp { dst, op, lhs, rhs } => {
                let lhs = resolve(&slots, *lhs)?;
                let rhs = resolve(&slots, *rhs)?;
                let slot = assign_slot(&mut slots, *dst)?;
                steps.push(PlanStep::Binary {
                    slot,
                    op: *op,
                    lhs,
                    rhs,
                });
            }
            Instr::ScalarOp {
                dst,
                op,
                src,
                scalar,
                tensor_on_left,
            } => {
                let src = resolve(&slots, *src)?;
                let slot = assign_slot(&mut slots, *dst)?;
                steps.push(PlanStep::Scalar {
                    slot,
                    op: *op,
                    src,
                    scalar: *scalar,
                    tensor_on_left: *tensor_on_left,
                });
            }
            Instr::UnaryOp { dst, op, src } => {
                let src = resolve(&slots, *src)?;
                let slot = assign_slot(&mut slots, *dst)?;
                steps.push(PlanStep::Unary { slot, op: *op, src });
            }
            Instr::Reduce { dst, kind, src } => {
                let src = resolve(&slots, *src)?;
                let slot = assign_slot(&mut slots, *dst)?;
                steps.push(PlanStep::Reduce {
                    slot,
                    kind: *kind,
                    src,
                });
            }
            Instr::Dot { dst, a, b } => {
                let a = resolve(&slots, *a)?;
                let b = resolve(&slots, *b)?;
                let slot = assign_slot(&mut slots, *dst)?;
                steps.push(PlanStep::Dot { slot, a, b });
            }
            Instr::MatMul { dst, a, b } => {
                let a = resolve(&slots, *a)?;
                let b = resolve(&slots, *b)?;
                let slot = assign_slot(&mut slots, *dst)?;
                steps.push(PlanStep::MatMul { slot, a, b });
            }
            Instr::Output(id) => {
                output_slot = Some(resolve(&slots, *id)?);
            }
        }
    }

    let output_slot = output_slot.ok_or(GraphVerifyError::MissingOutput)?;
    let plan = ExecPlan {
        steps,
        slot_count: slots.len(),
        output_slot,
    };
    debug!(
        steps = plan.step_count(),
        slots = plan.slot_count(),
        "job graph lowered to execution plan"
    );
    Ok(plan)
}

fn assign_slot(
    slots: &mut BTreeMap<ValueId, usize>,
    id: ValueId,
) -> Result<usize, GraphVerifyError> {
    if slots.contains_key(&id) {
        return Err(GraphVerifyError::DuplicateDefinition(id));
    }
    let slot = slots.len();
    slots.insert(id, slot);
    Ok(slot)
}

/// Execute a plan against bound input tensors.
pub fn run_plan(plan: &ExecPlan, inputs: &[Tensor]) -> Result<Tensor, ExecError> {
    let mut slots: Vec<Option<Tensor>> = vec![None; plan.slot_count];

    for step in &plan.steps {
        let (slot, value) = match step {
            PlanStep::BindInput { slot, index } => {
                let tensor = inputs.get(*index).ok_or_else(|| {
                    ExecError::Shape(format!(
                        "input index {index} out of range for {} bound tensors",
                        inputs.len()
                    ))
                })?;
                (*slot, tensor.clone())
            }
            PlanStep::Fill {
                slot,
                dtype,
                shape,
                value,
            } => (*slot, const_fill(dtype, shape, *value)?),
            PlanStep::Binary { slot, op, lhs, rhs } => {
                let l = slot_ref(&slots, *lhs)?;
                let r = slot_ref(&slots, *rhs)?;
                (*slot, apply_binop(*op, l, r)?)
            }
            PlanStep::Scalar {
                slot,
                op,
                src,
                scalar,
                tensor_on_left,
            } => {
                let t = slot_ref(&slots, *src)?;
                (*slot, apply_scalar_op(*op, t, *scalar, *tensor_on_left)?)
            }
            PlanStep::Unary { slot, op, src } => {
                let t = slot_ref(&slots, *src)?;
                (*slot, apply_unary(*op, t)?)
            }
            PlanStep::Reduce { slot, kind, src } => {
                let t = slot_ref(&slots, *src)?;
                (*slot, apply_reduce(*kind, t)?)
            }
            PlanStep::Dot { slot, a, b } => {
                let l = slot_ref(&slots, *a)?;
                let r = slot_ref(&slots, *b)?;
                (*slot, super::cpu::exec_dot(l, r)?)
            }
            PlanStep::MatMul { slot, a, b } => {
                let l = slot_ref(&slots, *a)?;
                let r = slot_ref(&slots, *b)?;
                (*slot, super::cpu::exec_matmul(l, r)?)
            }
        };
        slots[slot] = Some(value);
    }

    slots[plan.output_slot]
        .take()
        .ok_or_else(|| ExecError::Unsupported("plan produced no output tensor".to_string()))
}

fn slot_ref(slots: &[Option<Tensor>], index: usize) -> Result<&Tensor, ExecError> {
    slots
        .get(index)
        .and_then(Option::as_ref)
        .ok_or_else(|| ExecError::Unsupported(format!("slot s{index} is empty")))
}
