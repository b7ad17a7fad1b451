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

//! Execution backends for MIND job graphs.
//!
//! # Architecture
//!
//! Two backends share one CPU kernel layer (`cpu.rs`):
//!
//! | Backend     | Module         | Strategy                                      |
//! |-------------|----------------|-----------------------------------------------|
//! | `Reference` | `reference.rs` | Walks the graph instruction by instruction    |
//! | `Compiled`  | `plan.rs`      | Pre-verified, slot-allocated execution plan   |
//!
//! Because both backends dispatch into the same kernels in the same order,
//! their results agree bit-for-bit; the parity suite in
//! [`conformance`](crate::conformance) checks this against the documented
//! tolerances. Invocation is synchronous on the caller's thread. With the
//! `parallel` feature, elementwise kernels split large buffers across the
//! rayon pool; reductions always accumulate sequentially so the summation
//! order stays fixed.

use std::fmt;

use crate::graph::{BinOp, ReduceKind, UnaryOp};
use crate::tensor::Tensor;
use crate::types::DType;

pub mod cpu;
pub mod plan;
pub mod reference;

pub use plan::{compile_plan, run_plan, ExecPlan};
pub use reference::run_graph;

/// Execution strategy selected per job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Stable, default execution path: direct graph interpretation.
    #[default]
    Reference,
    /// Canonicalized graph lowered to a slot-allocated plan before any run.
    Compiled,
}

impl BackendKind {
    /// Map the job-configuration flag onto a backend.
    pub fn from_flag(use_compiled: bool) -> Self {
        if use_compiled {
            BackendKind::Compiled
        } else {
            BackendKind::Reference
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Reference => write!(f, "reference"),
            BackendKind::Compiled => write!(f, "compiled"),
        }
    }
}

/// Structured errors surfaced by kernels and backend drivers.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("unsupported operation: {0}")]
    Unsupported(String),
    #[error("shape error: {0}")]
    Shape(String),
    #[error("type error: {0}")]
    Type(String),
    #[error("math error: {0}")]
    Math(String),
}

pub(crate) const CHUNK: usize = 1024;

// Splitting below this length costs more than it saves.
#[cfg(feature = "parallel")]
pub(crate) const PAR_MIN_LEN: usize = 1 << 15;

pub fn simd_chunks_mut(data: &mut [f32]) -> impl Iterator<Item = &mut [f32]> + '_ {
    data.chunks_mut(CHUNK)
}

pub(crate) fn apply_binop(op: BinOp, lhs: &Tensor, rhs: &Tensor) -> Result<Tensor, ExecError> {
    match op {
        BinOp::Add => cpu::exec_add(lhs, rhs),
        BinOp::Sub => cpu::exec_sub(lhs, rhs),
        BinOp::Mul => cpu::exec_mul(lhs, rhs),
        BinOp::Div => cpu::exec_div(lhs, rhs),
    }
}

pub(crate) fn apply_scalar_op(
    op: BinOp,
    t: &Tensor,
    scalar: f32,
    tensor_on_left: bool,
) -> Result<Tensor, ExecError> {
    match op {
        BinOp::Add => cpu::exec_add_scalar(t, scalar),
        BinOp::Mul => cpu::exec_mul_scalar(t, scalar),
        BinOp::Sub => {
            if tensor_on_left {
                cpu::exec_sub_scalar(t, scalar)
            } else {
                cpu::exec_scalar_sub(scalar, t)
            }
        }
        BinOp::Div => cpu::exec_div_scalar(t, scalar, tensor_on_left),
    }
}

pub(crate) fn apply_unary(op: UnaryOp, t: &Tensor) -> Result<Tensor, ExecError> {
    match op {
        UnaryOp::Neg => cpu::exec_neg(t),
        UnaryOp::Relu => cpu::exec_relu(t),
        UnaryOp::Exp => cpu::exec_exp(t),
        UnaryOp::Log => cpu::exec_log(t),
    }
}

pub(crate) fn apply_reduce(kind: ReduceKind, t: &Tensor) -> Result<Tensor, ExecError> {
    match kind {
        ReduceKind::SumAll => cpu::exec_sum_all(t),
        ReduceKind::MeanAll => cpu::exec_mean_all(t),
    }
}

pub(crate) fn const_fill(dtype: &DType, shape: &[usize], value: f32) -> Result<Tensor, ExecError> {
    if *dtype != DType::F32 {
        return Err(ExecError::Type(format!(
            "const fill dtype {dtype:?} is not materializable; the runtime executes f32 only"
        )));
    }
    Ok(Tensor::fill(shape, value))
}
