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

use std::fmt::Write;

use crate::graph::{BinOp, Instr, JobGraph, ReduceKind, UnaryOp, ValueId};
use crate::types::DType;

/// Format a [`JobGraph`] into a stable, human-readable string.
///
/// The textual form is part of the job spec and feeds the job digest, so
/// changes here are wire-visible.
pub fn format_graph(graph: &JobGraph) -> String {
    let mut out = String::new();
    writeln!(&mut out, "graph {{").expect("write to string cannot fail");
    for instr in &graph.instrs {
        format_instr(instr, &mut out);
    }
    writeln!(&mut out, "}}  // next_id = {}", graph.next_id).expect("write to string cannot fail");
    out
}

fn format_instr(instr: &Instr, out: &mut String) {
    match instr {
        Instr::Input { dst, index } => {
            writeln!(out, "  {} = input {}", value_name(*dst), index).unwrap();
        }
        Instr::ConstFill {
            dst,
            dtype,
            shape,
            value,
        } => {
            writeln!(
                out,
                "  {} = const.fill {} {} value={}",
                value_name(*dst),
                format_dtype(dtype),
                paren_shape(shape),
                trim_float(*value)
            )
            .unwrap();
        }
        Instr::BinOp { dst, op, lhs, rhs } => {
            writeln!(
                out,
                "  {} = {} {}, {}",
                value_name(*dst),
                format_binop(*op),
                value_name(*lhs),
                value_name(*rhs)
            )
            .unwrap();
        }
        Instr::ScalarOp {
            dst,
            op,
            src,
            scalar,
            tensor_on_left,
        } => {
            if *tensor_on_left {
                writeln!(
                    out,
                    "  {} = {}_scalar {}, {}",
                    value_name(*dst),
                    format_binop(*op),
                    value_name(*src),
                    trim_float(*scalar)
                )
                .unwrap();
            } else {
                writeln!(
                    out,
                    "  {} = scalar_{} {}, {}",
                    value_name(*dst),
                    format_binop(*op),
                    trim_float(*scalar),
                    value_name(*src)
                )
                .unwrap();
            }
        }
        Instr::UnaryOp { dst, op, src } => {
            writeln!(
                out,
                "  {} = {} {}",
                value_name(*dst),
                format_unary(*op),
                value_name(*src)
            )
            .unwrap();
        }
        Instr::Reduce { dst, kind, src } => {
            writeln!(
                out,
                "  {} = {} {}",
                value_name(*dst),
                format_reduce(*kind),
                value_name(*src)
            )
            .unwrap();
        }
        Instr::Dot { dst, a, b } => {
            writeln!(
                out,
                "  {} = dot {}, {}",
                value_name(*dst),
                value_name(*a),
                value_name(*b)
            )
            .unwrap();
        }
        Instr::MatMul { dst, a, b } => {
            writeln!(
                out,
                "  {} = matmul {}, {}",
                value_name(*dst),
                value_name(*a),
                value_name(*b)
            )
            .unwrap();
        }
        Instr::Output(id) => {
            writeln!(out, "  output {}", value_name(*id)).unwrap();
        }
    }
}

fn value_name(id: ValueId) -> String {
    format!("%{}", id.0)
}

pub(crate) fn format_binop(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "add",
        BinOp::Sub => "sub",
        BinOp::Mul => "mul",
        BinOp::Div => "div",
    }
}

pub(crate) fn format_unary(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Neg => "neg",
        UnaryOp::Relu => "relu",
        UnaryOp::Exp => "exp",
        UnaryOp::Log => "log",
    }
}

pub(crate) fn format_reduce(kind: ReduceKind) -> &'static str {
    match kind {
        ReduceKind::SumAll => "sum_all",
        ReduceKind::MeanAll => "mean_all",
    }
}

fn format_dtype(dtype: &DType) -> String {
    format!("{:?}", dtype)
}

pub(crate) fn paren_shape(shape: &[usize]) -> String {
    let mut out = String::from("(");
    for (i, d) in shape.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&d.to_string());
    }
    out.push(')');
    out
}

pub(crate) fn trim_float(x: f32) -> String {
    let s = format!("{:.6}", x);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}
