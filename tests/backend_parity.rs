// Copyright 2025 STARGA Inc.
// Licensed under the Apache License, Version 2.0 (the “License”);
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at:
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an “AS IS” BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Part of the MIND project (Machine Intelligence Native Design).

//! Compiled-vs-reference parity over the standard add job, on the same
//! shape grid embedding hosts test against.

use rand::rngs::StdRng;
use rand::SeedableRng;

use mind_runtime::conformance::{allclose, make_add_job, max_abs_diff, Tolerance};
use mind_runtime::Tensor;

fn check_ones(prefix: &str, shape: &[usize]) {
    let compiled = make_add_job(&format!("{prefix}_ones_jit"), shape, true)
        .expect("compiled job builds");
    let reference = make_add_job(&format!("{prefix}_ones_ref"), shape, false)
        .expect("reference job builds");

    let x = Tensor::ones(shape);
    let y = Tensor::ones(shape);

    let got = compiled.run(&[x.clone(), y.clone()]).expect("compiled run");
    let want = reference.run(&[x, y]).expect("reference run");

    assert_eq!(got.shape(), shape);
    assert!(got.data().iter().all(|&v| v == 2.0), "ones + ones must be 2");
    assert!(
        allclose(&got, &want, Tolerance::PARITY),
        "backends diverge on ones, max |diff| = {}",
        max_abs_diff(&got, &want)
    );
}

fn check_uniform(prefix: &str, shape: &[usize], seed: u64) {
    let compiled = make_add_job(&format!("{prefix}_uniform_jit"), shape, true)
        .expect("compiled job builds");
    let reference = make_add_job(&format!("{prefix}_uniform_ref"), shape, false)
        .expect("reference job builds");

    let mut rng = StdRng::seed_from_u64(seed);
    let x = Tensor::uniform(shape, &mut rng);
    let y = Tensor::uniform(shape, &mut rng);

    let got = compiled.run(&[x.clone(), y.clone()]).expect("compiled run");
    let want = reference.run(&[x.clone(), y.clone()]).expect("reference run");

    assert_eq!(got.shape(), shape);
    assert!(
        allclose(&got, &want, Tolerance::PARITY),
        "backends diverge on uniform input, max |diff| = {}",
        max_abs_diff(&got, &want)
    );

    // Spot-check correctness against a locally computed sum.
    for ((&g, &a), &b) in got.data().iter().zip(x.data()).zip(y.data()) {
        assert_eq!(g, a + b);
    }
}

#[test]
fn add_parity_1x10() {
    check_ones("parity_1x10", &[1, 10]);
    check_uniform("parity_1x10", &[1, 10], 3);
}

#[test]
fn add_parity_2x10x2() {
    check_ones("parity_2x10x2", &[2, 10, 2]);
    check_uniform("parity_2x10x2", &[2, 10, 2], 5);
}

#[test]
fn add_parity_2x5x2x2() {
    check_ones("parity_2x5x2x2", &[2, 5, 2, 2]);
    check_uniform("parity_2x5x2x2", &[2, 5, 2, 2], 7);
}

#[test]
fn tolerance_flags_real_divergence() {
    let a = Tensor::fill(&[4], 1.0);
    let b = Tensor::fill(&[4], 1.01);
    assert!(!allclose(&a, &b, Tolerance::PARITY));

    let close = Tensor::fill(&[4], 1.0 + 1e-6);
    assert!(allclose(&a, &close, Tolerance::PARITY));

    let other_shape = Tensor::fill(&[2, 2], 1.0);
    assert!(!allclose(&a, &other_shape, Tolerance::PARITY));

    let with_nan = Tensor::from_vec(vec![4], vec![1.0, f32::NAN, 1.0, 1.0]).unwrap();
    assert!(!allclose(&a, &with_nan, Tolerance::PARITY));
}
