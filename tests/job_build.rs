use mind_runtime::session::{reset_default_session, SessionError};
use mind_runtime::{BackendKind, DType, JobBuilder, JobConfig, JobError, Tensor, TensorType};

fn f32_ty(shape: &[usize]) -> TensorType {
    TensorType::new(DType::F32, shape.to_vec())
}

#[test]
fn build_reports_output_type() {
    let mut builder = JobBuilder::new("build_output_type_job");
    let x = builder.input("x", f32_ty(&[2, 1]));
    let y = builder.input("y", f32_ty(&[1, 4]));
    let sum = builder.add(x, y);
    builder.output(sum);

    let job = builder.build().expect("job builds");
    assert_eq!(job.output_type().dtype, DType::F32);
    assert_eq!(job.output_type().shape, vec![2, 4]);
    assert_eq!(job.backend(), BackendKind::Reference);
    assert_eq!(job.graph().input_arity, 2);
    assert!(job.plan().is_none());
}

#[test]
fn compiled_build_carries_a_plan() {
    let mut builder =
        JobBuilder::new("compiled_plan_job").config(JobConfig::use_compiled_backend(true));
    let x = builder.input("x", f32_ty(&[4]));
    let doubled = builder.mul_scalar(x, 2.0);
    builder.output(doubled);

    let job = builder.build().expect("job builds");
    assert_eq!(job.backend(), BackendKind::Compiled);
    let plan = job.plan().expect("compiled job has a plan");
    assert_eq!(plan.step_count(), 2);
    assert_eq!(plan.slot_count(), 2);
}

#[test]
fn duplicate_input_names_are_rejected() {
    let mut builder = JobBuilder::new("dup_input_job");
    let x = builder.input("x", f32_ty(&[3]));
    let y = builder.input("x", f32_ty(&[3]));
    let sum = builder.add(x, y);
    builder.output(sum);

    let err = builder.build().unwrap_err();
    assert!(matches!(err, JobError::DuplicateInputName { name } if name == "x"));
}

#[test]
fn i32_inputs_are_rejected() {
    let mut builder = JobBuilder::new("i32_input_job");
    let x = builder.input("x", TensorType::new(DType::I32, vec![3]));
    builder.output(x);

    let err = builder.build().unwrap_err();
    match err {
        JobError::UnsupportedDType { input, dtype } => {
            assert_eq!(input, "x");
            assert_eq!(dtype, "i32");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn missing_output_is_rejected() {
    let mut builder = JobBuilder::new("no_output_job");
    let x = builder.input("x", f32_ty(&[3]));
    let _ = builder.relu(x);

    let err = builder.build().unwrap_err();
    assert!(matches!(err, JobError::Verify(_)));
}

#[test]
fn mismatched_matmul_is_rejected_at_build() {
    let mut builder = JobBuilder::new("bad_matmul_job");
    let a = builder.input("a", f32_ty(&[2, 3]));
    let b = builder.input("b", f32_ty(&[4, 5]));
    let prod = builder.matmul(a, b);
    builder.output(prod);

    let err = builder.build().unwrap_err();
    match err {
        JobError::Shape(shape_err) => assert_eq!(shape_err.op, "matmul"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn run_validates_bound_tensors() {
    let mut builder = JobBuilder::new("bind_check_job");
    let x = builder.input("x", f32_ty(&[2, 2]));
    let y = builder.input("y", f32_ty(&[2, 2]));
    let sum = builder.add(x, y);
    builder.output(sum);
    let job = builder.build().expect("job builds");

    let one = Tensor::ones(&[2, 2]);
    let err = job.run(&[one.clone()]).unwrap_err();
    assert!(matches!(
        err,
        JobError::InputArity {
            expected: 2,
            found: 1
        }
    ));

    let wrong = Tensor::ones(&[2, 3]);
    let err = job.run(&[one.clone(), wrong]).unwrap_err();
    match err {
        JobError::InputShape {
            name,
            expected,
            found,
        } => {
            assert_eq!(name, "y");
            assert_eq!(expected, vec![2, 2]);
            assert_eq!(found, vec![2, 3]);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let out = job.run(&[one.clone(), one]).expect("valid run succeeds");
    assert_eq!(out.data(), &[2.0, 2.0, 2.0, 2.0]);
}

#[test]
fn unused_inputs_pass_through_both_backends() {
    for (name, use_compiled) in [
        ("unused_input_ref_job", false),
        ("unused_input_jit_job", true),
    ] {
        let mut builder =
            JobBuilder::new(name).config(JobConfig::use_compiled_backend(use_compiled));
        let x = builder.input("x", f32_ty(&[3]));
        let _ignored = builder.input("ignored", f32_ty(&[5]));
        builder.output(x);
        let job = builder.build().expect("job builds");

        let out = job
            .run(&[Tensor::fill(&[3], 4.5), Tensor::zeros(&[5])])
            .expect("run succeeds");
        assert_eq!(out.shape(), &[3]);
        assert_eq!(out.data(), &[4.5, 4.5, 4.5]);
    }
}

#[test]
fn rebuilding_a_name_requires_session_reset() {
    let build = || {
        let mut builder = JobBuilder::new("rebuild_demo_job");
        let x = builder.input("x", f32_ty(&[2]));
        let doubled = builder.add(x, x);
        builder.output(doubled);
        builder.build()
    };

    let first = build().expect("first build succeeds");
    let err = build().unwrap_err();
    assert!(matches!(
        err,
        JobError::Session(SessionError::DuplicateJob { .. })
    ));

    // The existing handle keeps working while the name is taken.
    let out = first.run(&[Tensor::ones(&[2])]).expect("run succeeds");
    assert_eq!(out.data(), &[2.0, 2.0]);

    reset_default_session();
    let second = build().expect("rebuild after reset succeeds");
    let out = second.run(&[Tensor::fill(&[2], 3.0)]).expect("run succeeds");
    assert_eq!(out.data(), &[6.0, 6.0]);
}
