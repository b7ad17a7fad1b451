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

use std::collections::{BTreeMap, BTreeSet};

use crate::graph::{instruction_dst, instruction_operands, BinOp, Instr, JobGraph, UnaryOp, ValueId};
use crate::shapes;
use crate::types::DType;

/// Canonicalize a job graph in-place.
///
/// The pass is intentionally conservative: it keeps the existing SSA IDs,
/// performs deterministic cleanups (operand ordering, trivial fill folding),
/// and prunes provably dead instructions. Running the pass repeatedly is
/// idempotent. Folded arithmetic uses the same f32 expressions as the CPU
/// kernels, so a canonicalized graph computes bit-identical results.
pub fn canonicalize_graph(graph: &mut JobGraph) {
    let mut instrs = prune_dead(&graph.instrs);
    reorder_commutative_ops(&mut instrs);
    constant_fold(&mut instrs);
    instrs = prune_dead(&instrs);

    graph.instrs = instrs;
    graph.next_id = next_sequential_id(graph);
}

fn prune_dead(instrs: &[Instr]) -> Vec<Instr> {
    let mut used: BTreeSet<ValueId> = BTreeSet::new();
    for instr in instrs.iter().rev() {
        match instr {
            Instr::Output(id) => {
                used.insert(*id);
            }
            other => {
                let dst = instruction_dst(other);
                if dst.map_or(true, |id| used.contains(&id)) {
                    for operand in instruction_operands(other) {
                        used.insert(operand);
                    }
                }
            }
        }
    }

    let mut pruned = Vec::with_capacity(instrs.len());
    for instr in instrs {
        if let Some(dst) = instruction_dst(instr) {
            if !used.contains(&dst) {
                continue;
            }
        }
        pruned.push(instr.clone());
    }
    pruned
}

fn reorder_commutative_ops(instrs: &mut [Instr]) {
    for instr in instrs.iter_mut() {
        if let Instr::BinOp { op, lhs, rhs, .. } = instr {
            if matches!(op, BinOp::Add | BinOp::Mul) && rhs < lhs {
                std::mem::swap(lhs, rhs);
            }
        }
    }
}

#[derive(Debug, Clone)]
struct FillInfo {
    shape: Vec<usize>,
    value: f32,
}

fn constant_fold(instrs: &mut Vec<Instr>) {
    let mut fills: BTreeMap<ValueId, FillInfo> = BTreeMap::new();
    for instr in instrs.iter_mut() {
        match instr {
            Instr::ConstFill {
                dst, shape, value, ..
            } => {
                fills.insert(
                    *dst,
                    FillInfo {
                        shape: shape.clone(),
                        value: *value,
                    },
                );
            }
            Instr::BinOp { dst, op, lhs, rhs } => {
                let dst_id = *dst;
                let op_kind = *op;

                if let (Some(l), Some(r)) = (fills.get(lhs).cloned(), fills.get(rhs).cloned()) {
                    // Uniform fills stay uniform under elementwise ops, so
                    // the fold only needs the broadcast output shape.
                    if let Ok(shape) = shapes::broadcast_shapes(&l.shape, &r.shape) {
                        let folded = fold_binop(op_kind, l.value, r.value);
                        *instr = Instr::ConstFill {
                            dst: dst_id,
                            dtype: DType::F32,
                            shape: shape.clone(),
                            value: folded,
                        };
                        fills.insert(
                            dst_id,
                            FillInfo {
                                shape,
                                value: folded,
                            },
                        );
                        continue;
                    }
                }

                fills.remove(&dst_id);
            }
            Instr::ScalarOp {
                dst,
                op,
                src,
                scalar,
                tensor_on_left,
            } => {
                let dst_id = *dst;
                if let Some(fill) = fills.get(src).cloned() {
                    let folded = if *tensor_on_left {
                        fold_binop(*op, fill.value, *scalar)
                    } else {
                        fold_binop(*op, *scalar, fill.value)
                    };
                    *instr = Instr::ConstFill {
                        dst: dst_id,
                        dtype: DType::F32,
                        shape: fill.shape.clone(),
                        value: folded,
                    };
                    fills.insert(
                        dst_id,
                        FillInfo {
                            shape: fill.shape,
                            value: folded,
                        },
                    );
                    continue;
                }
                fills.remove(&dst_id);
            }
            Instr::UnaryOp { dst, op, src } => {
                let dst_id = *dst;
                if let Some(fill) = fills.get(src).cloned() {
                    let folded = fold_unary(*op, fill.value);
                    *instr = Instr::ConstFill {
                        dst: dst_id,
                        dtype: DType::F32,
                        shape: fill.shape.clone(),
                        value: folded,
                    };
                    fills.insert(
                        dst_id,
                        FillInfo {
                            shape: fill.shape,
                            value: folded,
                        },
                    );
                    continue;
                }
                fills.remove(&dst_id);
            }
            _ => {
                if let Some(dst) = instruction_dst(instr) {
                    fills.remove(&dst);
                }
            }
        }
    }
}

// Must stay expression-for-expression identical to the CPU kernels.
fn fold_binop(op: BinOp, l: f32, r: f32) -> f32 {
    match op {
        BinOp::Add => l + r,
        BinOp::Sub => l - r,
        BinOp::Mul => l * r,
        BinOp::Div => l / r,
    }
}

fn fold_unary(op: UnaryOp, v: f32) -> f32 {
    match op {
        UnaryOp::Neg => -v,
        UnaryOp::Relu => {
            if v > 0.0 {
                v
            } else {
                0.0
            }
        }
        UnaryOp::Exp => v.exp(),
        UnaryOp::Log => v.ln(),
    }
}

fn next_sequential_id(graph: &JobGraph) -> usize {
    graph
        .instrs
        .iter()
        .filter_map(instruction_dst)
        .map(|id| id.0 + 1)
        .max()
        .unwrap_or(0)
}
