use std::fmt;

use crate::types::DType;

pub mod canonical;
pub mod infer;
pub mod print;
pub mod verify;

pub use canonical::canonicalize_graph;
pub use infer::infer_shapes;
pub use print::format_graph;
pub use verify::{verify_graph, GraphVerifyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ValueId(pub usize);

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub enum Instr {
    Input { dst: ValueId, index: usize },
    ConstFill { dst: ValueId, dtype: DType, shape: Vec<usize>, value: f32 },
    BinOp { dst: ValueId, op: BinOp, lhs: ValueId, rhs: ValueId },
    ScalarOp { dst: ValueId, op: BinOp, src: ValueId, scalar: f32, tensor_on_left: bool },
    UnaryOp { dst: ValueId, op: UnaryOp, src: ValueId },
    Reduce { dst: ValueId, kind: ReduceKind, src: ValueId },
    Dot { dst: ValueId, a: ValueId, b: ValueId },
    MatMul { dst: ValueId, a: ValueId, b: ValueId },
    Output(ValueId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Relu,
    Exp,
    Log,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceKind {
    SumAll,
    MeanAll,
}

/// SSA instruction list for one job, together with the number of input
/// slots the owning job declares.
#[derive(Debug, Clone)]
pub struct JobGraph {
    pub instrs: Vec<Instr>,
    pub next_id: usize,
    pub input_arity: usize,
}

impl JobGraph {
    pub fn new(input_arity: usize) -> Self {
        Self {
            instrs: Vec::new(),
            next_id: 0,
            input_arity,
        }
    }

    pub fn fresh(&mut self) -> ValueId {
        let id = self.next_id;
        self.next_id += 1;
        ValueId(id)
    }

    /// The value returned by the graph, if an `Output` instruction exists.
    pub fn output_value(&self) -> Option<ValueId> {
        self.instrs.iter().find_map(|instr| match instr {
            Instr::Output(id) => Some(*id),
            _ => None,
        })
    }
}

impl Default for JobGraph {
    fn default() -> Self {
        Self::new(0)
    }
}

impl fmt::Display for JobGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_graph(self))
    }
}

pub fn instruction_dst(instr: &Instr) -> Option<ValueId> {
    match instr {
        Instr::Input { dst, .. }
        | Instr::ConstFill { dst, .. }
        | Instr::BinOp { dst, .. }
        | Instr::ScalarOp { dst, .. }
        | Instr::UnaryOp { dst, .. }
        | Instr::Reduce { dst, .. }
        | Instr::Dot { dst, .. }
        | Instr::MatMul { dst, .. } => Some(*dst),
        Instr::Output(_) => None,
    }
}

pub fn instruction_operands(instr: &Instr) -> Vec<ValueId> {
    match instr {
        Instr::Input { .. } | Instr::ConstFill { .. } => Vec::new(),
        Instr::BinOp { lhs, rhs, .. } => vec![*lhs, *rhs],
        Instr::ScalarOp { src, .. } | Instr::UnaryOp { src, .. } | Instr::Reduce { src, .. } => {
            vec![*src]
        }
        Instr::Dot { a, b, .. } | Instr::MatMul { a, b, .. } => vec![*a, *b],
        Instr::Output(id) => vec![*id],
    }
}
