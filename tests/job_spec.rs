use std::fs;

use mind_runtime::job::JobSpec;
use mind_runtime::session::reset_default_session;
use mind_runtime::{DType, Job, JobBuilder, JobConfig, JobError, TensorType};

fn build_add(name: &str, use_compiled: bool) -> Result<Job, JobError> {
    let mut builder = JobBuilder::new(name).config(JobConfig::use_compiled_backend(use_compiled));
    let x = builder.input("x", TensorType::new(DType::F32, vec![2, 10, 2]));
    let y = builder.input("y", TensorType::new(DType::F32, vec![2, 10, 2]));
    let sum = builder.add(x, y);
    builder.output(sum);
    builder.build()
}

#[test]
fn spec_describes_the_built_job() {
    let job = build_add("spec_fields_job", true).expect("job builds");
    let spec = job.spec();

    assert_eq!(spec.name, "spec_fields_job");
    assert_eq!(spec.backend, "compiled");
    assert_eq!(spec.inputs.len(), 2);
    assert_eq!(spec.inputs[0].name, "x");
    assert_eq!(spec.inputs[0].dtype, "f32");
    assert_eq!(spec.inputs[0].shape, vec![2, 10, 2]);
    assert!(spec.graph.contains("add"), "graph text: {}", spec.graph);
    assert!(spec.graph.contains("output"), "graph text: {}", spec.graph);
}

#[test]
fn spec_survives_a_file_round_trip() {
    let job = build_add("spec_file_job", false).expect("job builds");

    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("job_spec.json");
    fs::write(&path, job.spec().to_json().expect("serializes")).expect("writes");

    let text = fs::read_to_string(&path).expect("reads");
    let parsed = JobSpec::from_json(&text).expect("parses");
    assert_eq!(&parsed, job.spec());
    assert_eq!(parsed.digest(), job.spec().digest());
}

#[test]
fn digest_is_stable_across_rebuilds() {
    let first = build_add("digest_stable_job", true).expect("first build");
    let digest = first.spec().digest();

    reset_default_session();
    let second = build_add("digest_stable_job", true).expect("rebuild after reset");
    assert_eq!(second.spec().digest(), digest);
}

#[test]
fn digest_distinguishes_backends() {
    let reference = build_add("digest_backend_job", false).expect("reference build");
    let reference_digest = reference.spec().digest();

    reset_default_session();
    let compiled = build_add("digest_backend_job", true).expect("compiled build");
    assert_ne!(compiled.spec().digest(), reference_digest);
}
