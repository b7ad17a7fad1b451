//! Static shape inference over a verified job graph.

use std::collections::BTreeMap;

use crate::graph::{print, Instr, JobGraph, ValueId};
use crate::shapes::{self, Shape, ShapeError, ShapeErrorKind};
use crate::types::TensorType;

/// Infer the shape of every SSA value in the graph from the declared input
/// types.
///
/// The graph is expected to have passed [`verify_graph`](crate::graph::verify_graph)
/// first; malformed references are still reported as structured errors
/// rather than panics.
pub fn infer_shapes(
    graph: &JobGraph,
    inputs: &[TensorType],
) -> Result<BTreeMap<ValueId, Shape>, ShapeError> {
    let mut table: BTreeMap<ValueId, Shape> = BTreeMap::new();

    for instr in &graph.instrs {
        match instr {
            Instr::Input { dst, index } => {
                let ty = inputs.get(*index).ok_or(ShapeError {
                    op: "input".to_string(),
                    kind: ShapeErrorKind::MissingInput { index: *index },
                })?;
                table.insert(*dst, ty.shape.clone());
            }
            Instr::ConstFill { dst, shape, .. } => {
                table.insert(*dst, shape.clone());
            }
            Instr::BinOp { dst, op, lhs, rhs } => {
                let op_name = print::format_binop(*op);
                let l = shape_of(&table, *lhs, op_name)?;
                let r = shape_of(&table, *rhs, op_name)?;
                let out = shapes::infer_output_shape(op_name, &[l, r])?;
                table.insert(*dst, out);
            }
            Instr::ScalarOp { dst, src, op, .. } => {
                let op_name = print::format_binop(*op);
                let out = shape_of(&table, *src, op_name)?.to_vec();
                table.insert(*dst, out);
            }
            Instr::UnaryOp { dst, op, src } => {
                let op_name = print::format_unary(*op);
                let out = shape_of(&table, *src, op_name)?.to_vec();
                table.insert(*dst, out);
            }
            Instr::Reduce { dst, kind, src } => {
                let op_name = print::format_reduce(*kind);
                shape_of(&table, *src, op_name)?;
                table.insert(*dst, Vec::new());
            }
            Instr::Dot { dst, a, b } => {
                let l = shape_of(&table, *a, "dot")?;
                let r = shape_of(&table, *b, "dot")?;
                let out = shapes::infer_output_shape("dot", &[l, r])?;
                table.insert(*dst, out);
            }
            Instr::MatMul { dst, a, b } => {
                let l = shape_of(&table, *a, "matmul")?;
                let r = shape_of(&table, *b, "matmul")?;
                let out = shapes::infer_output_shape("matmul", &[l, r])?;
                table.insert(*dst, out);
            }
            Instr::Output(id) => {
                shape_of(&table, *id, "output")?;
            }
        }
    }

    Ok(table)
}

fn shape_of<'a>(
    table: &'a BTreeMap<ValueId, Shape>,
    id: ValueId,
    op: &str,
) -> Result<&'a [usize], ShapeError> {
    table.get(&id).map(Vec::as_slice).ok_or(ShapeError {
        op: op.to_string(),
        kind: ShapeErrorKind::UndefinedValue { value: id.0 },
    })
}
