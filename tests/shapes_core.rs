use mind_runtime::shapes::{
    broadcast_shapes, dot_shape, infer_output_shape, is_elementwise, rule_for_op, ShapeErrorKind,
    ShapeRuleKind,
};

#[test]
fn rule_for_known_ops() {
    assert_eq!(rule_for_op("relu"), Some(ShapeRuleKind::ElementwiseUnary));
    assert_eq!(rule_for_op("add"), Some(ShapeRuleKind::ElementwiseBinary));
    assert_eq!(rule_for_op("sum_all"), Some(ShapeRuleKind::ReduceAll));
    assert_eq!(rule_for_op("dot"), Some(ShapeRuleKind::Dot1D));
    assert_eq!(rule_for_op("matmul"), Some(ShapeRuleKind::MatMul2D));
    assert!(rule_for_op("conv2d").is_none());
}

#[test]
fn elementwise_flag_matches_rules() {
    assert!(is_elementwise("add"));
    assert!(is_elementwise("relu"));
    assert!(!is_elementwise("matmul"));
    assert!(!is_elementwise("sum_all"));
}

#[test]
fn broadcast_shapes_simple() {
    let out = broadcast_shapes(&[2, 3], &[1, 3]).expect("broadcast should succeed");
    assert_eq!(out, vec![2, 3]);
}

#[test]
fn broadcast_aligns_mixed_ranks() {
    let out = broadcast_shapes(&[2, 10, 2], &[2]).expect("trailing dim should broadcast");
    assert_eq!(out, vec![2, 10, 2]);

    let out = broadcast_shapes(&[], &[4, 5]).expect("rank-0 should broadcast");
    assert_eq!(out, vec![4, 5]);
}

#[test]
fn broadcast_shapes_error() {
    let err = broadcast_shapes(&[2, 3], &[4, 3]).unwrap_err();
    match err {
        ShapeErrorKind::BroadcastError { lhs, rhs } => {
            assert_eq!(lhs, vec![2, 3]);
            assert_eq!(rhs, vec![4, 3]);
        }
        _ => panic!("expected BroadcastError"),
    }
}

#[test]
fn dot_requires_equal_rank1_operands() {
    assert_eq!(dot_shape(&[7], &[7]).unwrap(), Vec::<usize>::new());
    assert!(dot_shape(&[7], &[8]).is_err());
    assert!(dot_shape(&[2, 2], &[4]).is_err());
}

#[test]
fn infer_elementwise_binary_broadcast() {
    let out = infer_output_shape("add", &[&[2, 3][..], &[1, 3][..]])
        .expect("elementwise add should broadcast");
    assert_eq!(out, vec![2, 3]);
}

#[test]
fn infer_elementwise_unary_identity() {
    let out = infer_output_shape("relu", &[&[4, 5, 6][..]]).expect("relu should preserve shape");
    assert_eq!(out, vec![4, 5, 6]);
}

#[test]
fn infer_matmul_2d_ok() {
    let out = infer_output_shape("matmul", &[&[2, 3][..], &[3, 4][..]]).expect("matmul should work");
    assert_eq!(out, vec![2, 4]);
}

#[test]
fn infer_matmul_mismatched_inner_dim() {
    let err = infer_output_shape("matmul", &[&[2, 3][..], &[4, 5][..]]).unwrap_err();
    match err.kind {
        ShapeErrorKind::RankMismatch { .. } => {}
        _ => panic!("expected RankMismatch for mismatched inner dims"),
    }
}

#[test]
fn infer_reduce_all_to_scalar() {
    let out = infer_output_shape("sum_all", &[&[2, 2][..]]).expect("sum_all reduces to scalar");
    // Rank-0 scalar represented as an empty shape.
    assert_eq!(out, Vec::<usize>::new());
}

#[test]
fn infer_unknown_op_reports_error() {
    let err = infer_output_shape("conv2d", &[&[1, 2][..]]).unwrap_err();
    match err.kind {
        ShapeErrorKind::UnknownOp => {}
        _ => panic!("expected UnknownOp error"),
    }
    assert_eq!(err.op, "conv2d");
}
