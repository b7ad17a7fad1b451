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

//! Job construction and synchronous invocation.
//!
//! A job is built once from declared inputs and a graph of ops, then run
//! any number of times against concrete tensors. Building validates the
//! graph, infers the output type, lowers to an execution plan when the
//! compiled backend is selected, and registers the job in the default
//! session under its unique name.
//!
//! Running is synchronous: `run` returns the materialized output tensor
//! or a structured error. Both backends produce bit-identical results
//! because they share the same CPU kernels.

pub mod spec;

pub use spec::{InputSpec, JobSpec};

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::debug;

use crate::exec::{
    compile_plan, run_graph, run_plan, BackendKind, ExecError, ExecPlan,
};
use crate::graph::{
    canonicalize_graph, format_graph, infer_shapes, verify_graph, BinOp, GraphVerifyError, Instr,
    JobGraph, ReduceKind, UnaryOp, ValueId,
};
use crate::session::{with_default_session, SessionError};
use crate::shapes::{ShapeError, ShapeErrorKind};
use crate::tensor::Tensor;
use crate::types::{DType, TensorType};

#[derive(Debug, Error)]
pub enum JobError {
    #[error("duplicate input name '{name}'")]
    DuplicateInputName { name: String },
    #[error("input '{input}' has unsupported dtype {dtype}; kernels are f32 only")]
    UnsupportedDType { input: String, dtype: String },
    #[error("graph verification failed: {0}")]
    Verify(#[from] GraphVerifyError),
    #[error("shape inference failed: {0}")]
    Shape(#[from] ShapeError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("job expects {expected} input tensors but {found} were provided")]
    InputArity { expected: usize, found: usize },
    #[error("input '{name}' expects shape {expected:?} but the bound tensor has shape {found:?}")]
    InputShape {
        name: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    #[error("execution failed: {0}")]
    Exec(#[from] ExecError),
}

/// A declared job input: surface name plus static tensor type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDef {
    pub name: String,
    pub ty: TensorType,
}

/// Per-job execution configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobConfig {
    pub backend: BackendKind,
}

impl JobConfig {
    /// Map the boolean backend flag embedding hosts pass into a config.
    pub fn use_compiled_backend(use_compiled: bool) -> Self {
        Self {
            backend: BackendKind::from_flag(use_compiled),
        }
    }
}

/// Incrementally builds a job graph from declared inputs and ops.
///
/// Op methods return the [`ValueId`] of their result so expressions
/// compose naturally:
///
/// ```
/// use mind_runtime::job::{JobBuilder, JobConfig};
/// use mind_runtime::types::{DType, TensorType};
///
/// mind_runtime::session::reset_default_session();
/// let mut b = JobBuilder::new("doc_add").config(JobConfig::use_compiled_backend(true));
/// let x = b.input("x", TensorType::new(DType::F32, vec![1, 10]));
/// let y = b.input("y", TensorType::new(DType::F32, vec![1, 10]));
/// let sum = b.add(x, y);
/// b.output(sum);
/// let job = b.build().unwrap();
/// assert_eq!(job.output_type().shape, vec![1, 10]);
/// ```
#[derive(Debug)]
pub struct JobBuilder {
    name: String,
    config: JobConfig,
    inputs: Vec<InputDef>,
    graph: JobGraph,
}

impl JobBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            config: JobConfig::default(),
            inputs: Vec::new(),
            graph: JobGraph::new(0),
        }
    }

    pub fn config(mut self, config: JobConfig) -> Self {
        self.config = config;
        self
    }

    /// Declare an input tensor. Binding order at run time follows
    /// declaration order.
    pub fn input(&mut self, name: &str, ty: TensorType) -> ValueId {
        let index = self.inputs.len();
        self.inputs.push(InputDef {
            name: name.to_string(),
            ty,
        });
        self.graph.input_arity += 1;
        let dst = self.graph.fresh();
        self.graph.instrs.push(Instr::Input { dst, index });
        dst
    }

    /// Materialize a constant tensor filled with `value`.
    pub fn constant(&mut self, shape: &[usize], value: f32) -> ValueId {
        let dst = self.graph.fresh();
        self.graph.instrs.push(Instr::ConstFill {
            dst,
            dtype: DType::F32,
            shape: shape.to_vec(),
            value,
        });
        dst
    }

    pub fn add(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.push_binop(BinOp::Add, lhs, rhs)
    }

    pub fn sub(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.push_binop(BinOp::Sub, lhs, rhs)
    }

    pub fn mul(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.push_binop(BinOp::Mul, lhs, rhs)
    }

    pub fn div(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.push_binop(BinOp::Div, lhs, rhs)
    }

    pub fn add_scalar(&mut self, src: ValueId, scalar: f32) -> ValueId {
        self.push_scalar_op(BinOp::Add, src, scalar, true)
    }

    pub fn sub_scalar(&mut self, src: ValueId, scalar: f32) -> ValueId {
        self.push_scalar_op(BinOp::Sub, src, scalar, true)
    }

    /// `scalar - tensor`, elementwise.
    pub fn scalar_sub(&mut self, scalar: f32, src: ValueId) -> ValueId {
        self.push_scalar_op(BinOp::Sub, src, scalar, false)
    }

    pub fn mul_scalar(&mut self, src: ValueId, scalar: f32) -> ValueId {
        self.push_scalar_op(BinOp::Mul, src, scalar, true)
    }

    pub fn div_scalar(&mut self, src: ValueId, scalar: f32) -> ValueId {
        self.push_scalar_op(BinOp::Div, src, scalar, true)
    }

    /// `scalar / tensor`, elementwise.
    pub fn scalar_div(&mut self, scalar: f32, src: ValueId) -> ValueId {
        self.push_scalar_op(BinOp::Div, src, scalar, false)
    }

    pub fn neg(&mut self, src: ValueId) -> ValueId {
        self.push_unary(UnaryOp::Neg, src)
    }

    pub fn relu(&mut self, src: ValueId) -> ValueId {
        self.push_unary(UnaryOp::Relu, src)
    }

    pub fn exp(&mut self, src: ValueId) -> ValueId {
        self.push_unary(UnaryOp::Exp, src)
    }

    pub fn log(&mut self, src: ValueId) -> ValueId {
        self.push_unary(UnaryOp::Log, src)
    }

    pub fn sum_all(&mut self, src: ValueId) -> ValueId {
        self.push_reduce(ReduceKind::SumAll, src)
    }

    pub fn mean_all(&mut self, src: ValueId) -> ValueId {
        self.push_reduce(ReduceKind::MeanAll, src)
    }

    pub fn dot(&mut self, a: ValueId, b: ValueId) -> ValueId {
        let dst = self.graph.fresh();
        self.graph.instrs.push(Instr::Dot { dst, a, b });
        dst
    }

    pub fn matmul(&mut self, a: ValueId, b: ValueId) -> ValueId {
        let dst = self.graph.fresh();
        self.graph.instrs.push(Instr::MatMul { dst, a, b });
        dst
    }

    /// Mark `value` as the job result. Exactly one output is required.
    pub fn output(&mut self, value: ValueId) {
        self.graph.instrs.push(Instr::Output(value));
    }

    fn push_binop(&mut self, op: BinOp, lhs: ValueId, rhs: ValueId) -> ValueId {
        let dst = self.graph.fresh();
        self.graph.instrs.push(Instr::BinOp { dst, op, lhs, rhs });
        dst
    }

    fn push_scalar_op(
        &mut self,
        op: BinOp,
        src: ValueId,
        scalar: f32,
        tensor_on_left: bool,
    ) -> ValueId {
        let dst = self.graph.fresh();
        self.graph.instrs.push(Instr::ScalarOp {
            dst,
            op,
            src,
            scalar,
            tensor_on_left,
        });
        dst
    }

    fn push_unary(&mut self, op: UnaryOp, src: ValueId) -> ValueId {
        let dst = self.graph.fresh();
        self.graph.instrs.push(Instr::UnaryOp { dst, op, src });
        dst
    }

    fn push_reduce(&mut self, kind: ReduceKind, src: ValueId) -> ValueId {
        let dst = self.graph.fresh();
        self.graph.instrs.push(Instr::Reduce { dst, kind, src });
        dst
    }

    /// Validate, lower, and register the job.
    ///
    /// The compiled backend canonicalizes the graph and lowers it to an
    /// execution plan here, so `run` does no per-call compilation. The
    /// job digest covers the graph as it will actually execute.
    pub fn build(mut self) -> Result<Job, JobError> {
        let mut seen = BTreeSet::new();
        for def in &self.inputs {
            if !seen.insert(def.name.as_str()) {
                return Err(JobError::DuplicateInputName {
                    name: def.name.clone(),
                });
            }
            if def.ty.dtype != DType::F32 {
                return Err(JobError::UnsupportedDType {
                    input: def.name.clone(),
                    dtype: def.ty.dtype.name().to_string(),
                });
            }
        }

        verify_graph(&self.graph)?;

        let input_types: Vec<TensorType> = self.inputs.iter().map(|d| d.ty.clone()).collect();
        let shape_table = infer_shapes(&self.graph, &input_types)?;
        let output_id = self
            .graph
            .output_value()
            .ok_or(GraphVerifyError::MissingOutput)?;
        let output_shape = shape_table.get(&output_id).cloned().ok_or(ShapeError {
            op: "output".to_string(),
            kind: ShapeErrorKind::UndefinedValue {
                value: output_id.0,
            },
        })?;
        let output_ty = TensorType::new(DType::F32, output_shape);

        let exec = match self.config.backend {
            BackendKind::Reference => BackendImpl::Reference,
            BackendKind::Compiled => {
                canonicalize_graph(&mut self.graph);
                verify_graph(&self.graph)?;
                BackendImpl::Compiled(compile_plan(&self.graph)?)
            }
        };

        let spec = JobSpec {
            name: self.name.clone(),
            backend: self.config.backend.to_string(),
            inputs: self
                .inputs
                .iter()
                .map(|d| InputSpec {
                    name: d.name.clone(),
                    dtype: d.ty.dtype.name().to_string(),
                    shape: d.ty.shape.clone(),
                })
                .collect(),
            graph: format_graph(&self.graph),
        };
        let digest = spec.digest();

        let id = with_default_session(|session| {
            session.register_job(&self.name, &digest, self.config.backend)
        })?;

        debug!(
            job = %self.name,
            backend = %self.config.backend,
            digest = %digest,
            "job built"
        );

        Ok(Job {
            name: self.name,
            id,
            inputs: self.inputs,
            graph: self.graph,
            config: self.config,
            exec,
            output_ty,
            spec,
        })
    }
}

#[derive(Debug)]
enum BackendImpl {
    Reference,
    Compiled(ExecPlan),
}

/// A built, registered job ready for synchronous invocation.
#[derive(Debug)]
pub struct Job {
    name: String,
    id: u64,
    inputs: Vec<InputDef>,
    graph: JobGraph,
    config: JobConfig,
    exec: BackendImpl,
    output_ty: TensorType,
    spec: JobSpec,
}

impl Job {
    /// Run the job against `inputs`, bound in declaration order, and
    /// return the materialized output tensor.
    pub fn run(&self, inputs: &[Tensor]) -> Result<Tensor, JobError> {
        if inputs.len() != self.inputs.len() {
            return Err(JobError::InputArity {
                expected: self.inputs.len(),
                found: inputs.len(),
            });
        }
        // Dtype agreement is enforced at build time: declared inputs and
        // runtime tensors are both f32-only.
        for (def, tensor) in self.inputs.iter().zip(inputs) {
            if tensor.shape() != def.ty.shape.as_slice() {
                return Err(JobError::InputShape {
                    name: def.name.clone(),
                    expected: def.ty.shape.clone(),
                    found: tensor.shape().to_vec(),
                });
            }
        }

        let out = match &self.exec {
            BackendImpl::Reference => run_graph(&self.graph, inputs)?,
            BackendImpl::Compiled(plan) => run_plan(plan, inputs)?,
        };
        Ok(out)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Session-assigned id.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn backend(&self) -> BackendKind {
        self.config.backend
    }

    pub fn inputs(&self) -> &[InputDef] {
        &self.inputs
    }

    pub fn output_type(&self) -> &TensorType {
        &self.output_ty
    }

    pub fn graph(&self) -> &JobGraph {
        &self.graph
    }

    /// The lowered plan, when the compiled backend was selected.
    pub fn plan(&self) -> Option<&ExecPlan> {
        match &self.exec {
            BackendImpl::Compiled(plan) => Some(plan),
            BackendImpl::Reference => None,
        }
    }

    pub fn spec(&self) -> &JobSpec {
        &self.spec
    }
}
