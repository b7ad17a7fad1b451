//! Backend parity suite.
//!
//! Runs the same elementwise-add jobs through the compiled and reference
//! backends and checks the outputs agree within [`Tolerance::PARITY`].
//! The case grid mirrors the embedding-host acceptance tests: three
//! shapes, each driven with all-ones and with seeded uniform inputs.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::job::{Job, JobBuilder, JobConfig, JobError};
use crate::session::reset_default_session;
use crate::tensor::Tensor;
use crate::types::{DType, TensorType};

/// Elementwise comparison tolerance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerance {
    pub rtol: f32,
    pub atol: f32,
}

impl Tolerance {
    /// The tolerance the parity suite holds both backends to.
    pub const PARITY: Tolerance = Tolerance {
        rtol: 1e-3,
        atol: 1e-5,
    };
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::PARITY
    }
}

/// True when `a` and `b` have the same shape and every element satisfies
/// `|a - b| <= atol + rtol * |b|`. Any NaN fails the comparison.
pub fn allclose(a: &Tensor, b: &Tensor, tol: Tolerance) -> bool {
    a.shape() == b.shape() && first_mismatch(a, b, tol).is_none()
}

/// Flat index of the first element pair violating `tol`, if any.
pub fn first_mismatch(a: &Tensor, b: &Tensor, tol: Tolerance) -> Option<usize> {
    a.data()
        .iter()
        .zip(b.data())
        .position(|(&x, &y)| !((x - y).abs() <= tol.atol + tol.rtol * y.abs()))
}

/// Largest elementwise absolute difference, for failure reporting.
pub fn max_abs_diff(a: &Tensor, b: &Tensor) -> f32 {
    a.data()
        .iter()
        .zip(b.data())
        .map(|(&x, &y)| (x - y).abs())
        .fold(0.0, f32::max)
}

#[derive(Debug, thiserror::Error)]
#[error("parity failures: {0:?}")]
pub struct ParityFailure(pub Vec<String>);

#[derive(Debug)]
struct ParityCase {
    name: &'static str,
    shape: &'static [usize],
    input: InputClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputClass {
    Ones,
    Uniform,
}

/// Build the standard two-input add job used by the suite and the CLI.
pub fn make_add_job(name: &str, shape: &[usize], use_compiled: bool) -> Result<Job, JobError> {
    let mut builder =
        JobBuilder::new(name).config(JobConfig::use_compiled_backend(use_compiled));
    let x = builder.input("x", TensorType::new(DType::F32, shape.to_vec()));
    let y = builder.input("y", TensorType::new(DType::F32, shape.to_vec()));
    let sum = builder.add(x, y);
    builder.output(sum);
    builder.build()
}

/// Run every parity case, resetting the default session between cases.
///
/// `seed` drives the uniform inputs; each case offsets it so no two
/// cases see identical data.
pub fn run_parity_suite(seed: u64) -> Result<(), ParityFailure> {
    let mut failures = Vec::new();

    for (index, case) in cases().iter().enumerate() {
        if let Err(msg) = run_case(case, seed.wrapping_add(index as u64)) {
            failures.push(format!("{} => {msg}", case.name));
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(ParityFailure(failures))
    }
}

fn run_case(case: &ParityCase, seed: u64) -> Result<(), String> {
    reset_default_session();

    let (x, y) = match case.input {
        InputClass::Ones => (Tensor::ones(case.shape), Tensor::ones(case.shape)),
        InputClass::Uniform => {
            let mut rng = StdRng::seed_from_u64(seed);
            let x = Tensor::uniform(case.shape, &mut rng);
            let y = Tensor::uniform(case.shape, &mut rng);
            (x, y)
        }
    };

    let compiled = make_add_job("compiled_add_job", case.shape, true)
        .map_err(|err| format!("compiled job build failed: {err}"))?;
    let reference = make_add_job("add_job", case.shape, false)
        .map_err(|err| format!("reference job build failed: {err}"))?;

    let got = compiled
        .run(&[x.clone(), y.clone()])
        .map_err(|err| format!("compiled run failed: {err}"))?;
    let want = reference
        .run(&[x, y])
        .map_err(|err| format!("reference run failed: {err}"))?;

    if got.shape() != case.shape {
        return Err(format!(
            "output shape {:?} does not match input shape {:?}",
            got.shape(),
            case.shape
        ));
    }

    if got.shape() != want.shape() {
        return Err(format!(
            "backend output shapes diverge: {:?} vs {:?}",
            got.shape(),
            want.shape()
        ));
    }

    if let Some(index) = first_mismatch(&got, &want, Tolerance::PARITY) {
        return Err(format!(
            "backend outputs diverge at flat index {index}; max |diff| = {}",
            max_abs_diff(&got, &want)
        ));
    }

    Ok(())
}

fn cases() -> Vec<ParityCase> {
    vec![
        ParityCase {
            name: "ones_1x10",
            shape: &[1, 10],
            input: InputClass::Ones,
        },
        ParityCase {
            name: "uniform_1x10",
            shape: &[1, 10],
            input: InputClass::Uniform,
        },
        ParityCase {
            name: "ones_2x10x2",
            shape: &[2, 10, 2],
            input: InputClass::Ones,
        },
        ParityCase {
            name: "uniform_2x10x2",
            shape: &[2, 10, 2],
            input: InputClass::Uniform,
        },
        ParityCase {
            name: "ones_2x5x2x2",
            shape: &[2, 5, 2, 2],
            input: InputClass::Ones,
        },
        ParityCase {
            name: "uniform_2x5x2x2",
            shape: &[2, 5, 2, 2],
            input: InputClass::Uniform,
        },
    ]
}
