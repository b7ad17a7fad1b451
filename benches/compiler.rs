use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};

use mind_runtime::exec::compile_plan;
use mind_runtime::graph::{canonicalize_graph, BinOp, Instr, JobGraph};
use mind_runtime::{reset_default_session, DType, Job, JobBuilder, JobConfig, TensorType};

fn f32_ty(shape: &[usize]) -> TensorType {
    TensorType::new(DType::F32, shape.to_vec())
}

/// Two inputs and a single add.
fn build_small_add(name: &str, use_compiled: bool) -> Job {
    let mut builder =
        JobBuilder::new(name).config(JobConfig::use_compiled_backend(use_compiled));
    let x = builder.input("x", f32_ty(&[2, 10, 2]));
    let y = builder.input("y", f32_ty(&[2, 10, 2]));
    let sum = builder.add(x, y);
    builder.output(sum);
    builder.build().expect("job build failed")
}

/// One dense layer with a bias add and relu.
fn build_mlp_layer(name: &str, use_compiled: bool) -> Job {
    let mut builder =
        JobBuilder::new(name).config(JobConfig::use_compiled_backend(use_compiled));
    let input = builder.input("input", f32_ty(&[128, 256]));
    let weight = builder.input("weight", f32_ty(&[256, 128]));
    let bias = builder.input("bias", f32_ty(&[128]));
    let product = builder.matmul(input, weight);
    let biased = builder.add(product, bias);
    let activated = builder.relu(biased);
    builder.output(activated);
    builder.build().expect("job build failed")
}

/// Three dense layers chained through relu activations.
fn build_deep_network(name: &str, use_compiled: bool) -> Job {
    let mut builder =
        JobBuilder::new(name).config(JobConfig::use_compiled_backend(use_compiled));
    let input = builder.input("input", f32_ty(&[128, 784]));
    let w1 = builder.input("w1", f32_ty(&[784, 512]));
    let b1 = builder.input("b1", f32_ty(&[512]));
    let w2 = builder.input("w2", f32_ty(&[512, 256]));
    let b2 = builder.input("b2", f32_ty(&[256]));
    let w3 = builder.input("w3", f32_ty(&[256, 10]));
    let b3 = builder.input("b3", f32_ty(&[10]));

    let m1 = builder.matmul(input, w1);
    let a1 = builder.add(m1, b1);
    let h1 = builder.relu(a1);

    let m2 = builder.matmul(h1, w2);
    let a2 = builder.add(m2, b2);
    let h2 = builder.relu(a2);

    let m3 = builder.matmul(h2, w3);
    let out = builder.add(m3, b3);
    builder.output(out);
    builder.build().expect("job build failed")
}

fn bench_job_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("job_build");

    let cases: &[(&str, fn(&str, bool) -> Job)] = &[
        ("small_add", build_small_add),
        ("mlp_layer", build_mlp_layer),
        ("deep_network", build_deep_network),
    ];

    for &(name, build) in cases {
        for use_compiled in [false, true] {
            let backend = if use_compiled { "compiled" } else { "reference" };
            group.bench_with_input(BenchmarkId::new(backend, name), &use_compiled, |b, &flag| {
                // Builds register the job name in the default session, so each
                // iteration needs a fresh registry before it runs.
                b.iter_batched(
                    reset_default_session,
                    |_| build(black_box(name), flag),
                    BatchSize::PerIteration,
                );
            });
        }
    }

    group.finish();
}

fn scalar_chain(len: usize) -> JobGraph {
    let mut graph = JobGraph::new(1);
    let mut cur = graph.fresh();
    graph.instrs.push(Instr::Input { dst: cur, index: 0 });
    for i in 0..len {
        let next = graph.fresh();
        graph.instrs.push(Instr::ScalarOp {
            dst: next,
            op: BinOp::Add,
            src: cur,
            scalar: i as f32,
            tensor_on_left: true,
        });
        cur = next;
    }
    graph.instrs.push(Instr::Output(cur));
    graph
}

fn bench_plan_lowering(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_lowering");

    let cases: &[(&str, usize)] = &[
        ("chain_16", 16),
        ("chain_128", 128),
        ("chain_1024", 1024),
    ];

    for &(name, len) in cases {
        let graph = scalar_chain(len);
        group.bench_with_input(BenchmarkId::new("canonicalize_and_plan", name), &len, |b, _| {
            b.iter_batched(
                || graph.clone(),
                |mut g| {
                    canonicalize_graph(&mut g);
                    compile_plan(&g).expect("plan lowering failed")
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_job_build, bench_plan_lowering);
criterion_main!(benches);
