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

//! CPU kernels shared by both execution backends.
//!
//! Binary kernels apply numpy-style broadcasting before the elementwise
//! loop. Reductions accumulate in f64, walking the buffer in row-major
//! order, and narrow to f32 at the end; the accumulation order never
//! changes, so repeated runs are bit-identical. Division follows IEEE 754
//! (a zero divisor yields an infinity or NaN, not an error).

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::exec::{simd_chunks_mut, ExecError, CHUNK};
#[cfg(feature = "parallel")]
use crate::exec::PAR_MIN_LEN;
use crate::shapes;
use crate::tensor::Tensor;
use crate::types::DType;

type R<T> = Result<T, ExecError>;

pub fn exec_add(lhs: &Tensor, rhs: &Tensor) -> R<Tensor> {
    binary_elementwise(lhs, rhs, |a, b| a + b)
}

pub fn exec_sub(lhs: &Tensor, rhs: &Tensor) -> R<Tensor> {
    binary_elementwise(lhs, rhs, |a, b| a - b)
}

pub fn exec_mul(lhs: &Tensor, rhs: &Tensor) -> R<Tensor> {
    binary_elementwise(lhs, rhs, |a, b| a * b)
}

pub fn exec_div(lhs: &Tensor, rhs: &Tensor) -> R<Tensor> {
    binary_elementwise(lhs, rhs, |a, b| a / b)
}

pub fn exec_add_scalar(t: &Tensor, scalar: f32) -> R<Tensor> {
    check_f32(t)?;
    Ok(Tensor::from_parts(
        t.shape().to_vec(),
        map1(t.data(), move |v| v + scalar),
    ))
}

pub fn exec_sub_scalar(t: &Tensor, scalar: f32) -> R<Tensor> {
    check_f32(t)?;
    Ok(Tensor::from_parts(
        t.shape().to_vec(),
        map1(t.data(), move |v| v - scalar),
    ))
}

pub fn exec_scalar_sub(scalar: f32, t: &Tensor) -> R<Tensor> {
    check_f32(t)?;
    Ok(Tensor::from_parts(
        t.shape().to_vec(),
        map1(t.data(), move |v| scalar - v),
    ))
}

pub fn exec_mul_scalar(t: &Tensor, scalar: f32) -> R<Tensor> {
    check_f32(t)?;
    Ok(Tensor::from_parts(
        t.shape().to_vec(),
        map1(t.data(), move |v| v * scalar),
    ))
}

pub fn exec_div_scalar(t: &Tensor, scalar: f32, tensor_on_left: bool) -> R<Tensor> {
    check_f32(t)?;
    let data = if tensor_on_left {
        map1(t.data(), move |v| v / scalar)
    } else {
        map1(t.data(), move |v| scalar / v)
    };
    Ok(Tensor::from_parts(t.shape().to_vec(), data))
}

pub fn exec_neg(t: &Tensor) -> R<Tensor> {
    check_f32(t)?;
    Ok(Tensor::from_parts(t.shape().to_vec(), map1(t.data(), |v| -v)))
}

pub fn exec_exp(t: &Tensor) -> R<Tensor> {
    check_f32(t)?;
    Ok(Tensor::from_parts(
        t.shape().to_vec(),
        map1(t.data(), |v| v.exp()),
    ))
}

pub fn exec_log(t: &Tensor) -> R<Tensor> {
    check_f32(t)?;
    Ok(Tensor::from_parts(
        t.shape().to_vec(),
        map1(t.data(), |v| v.ln()),
    ))
}

pub fn relu_inplace(buf: &mut [f32]) {
    for chunk in simd_chunks_mut(buf) {
        for v in chunk {
            // NaN clamps to 0, matching the fill-folding rule.
            *v = if *v > 0.0 { *v } else { 0.0 };
        }
    }
}

pub fn exec_relu(t: &Tensor) -> R<Tensor> {
    check_f32(t)?;
    let mut data = t.data().to_vec();
    relu_inplace(&mut data);
    Ok(Tensor::from_parts(t.shape().to_vec(), data))
}

/// Full reduction to a rank-0 scalar. An empty tensor sums to 0.
pub fn exec_sum_all(t: &Tensor) -> R<Tensor> {
    check_f32(t)?;
    Ok(Tensor::scalar(sum_f64(t.data()) as f32))
}

/// Mean over all elements. Empty tensors have no mean.
pub fn exec_mean_all(t: &Tensor) -> R<Tensor> {
    check_f32(t)?;
    if t.numel() == 0 {
        return Err(ExecError::Math(
            "mean of a zero-element tensor is undefined".into(),
        ));
    }
    let mean = sum_f64(t.data()) / t.numel() as f64;
    Ok(Tensor::scalar(mean as f32))
}

pub fn exec_matmul(lhs: &Tensor, rhs: &Tensor) -> R<Tensor> {
    check_f32(lhs)?;
    check_f32(rhs)?;
    let out_shape = shapes::matmul_shape(lhs.shape(), rhs.shape()).map_err(|kind| {
        ExecError::Shape(
            shapes::ShapeError {
                op: "matmul".to_string(),
                kind,
            }
            .to_string(),
        )
    })?;

    let (m, k) = (lhs.shape()[0], lhs.shape()[1]);
    let n = rhs.shape()[1];
    let a = lhs.data();
    let b = rhs.data();
    let mut out = vec![0.0f32; m * n];
    for i in 0..m {
        for j in 0..n {
            let mut acc = 0.0f64;
            for p in 0..k {
                acc += a[i * k + p] as f64 * b[p * n + j] as f64;
            }
            out[i * n + j] = acc as f32;
        }
    }
    Ok(Tensor::from_parts(out_shape, out))
}

pub fn exec_dot(lhs: &Tensor, rhs: &Tensor) -> R<Tensor> {
    check_f32(lhs)?;
    check_f32(rhs)?;
    shapes::dot_shape(lhs.shape(), rhs.shape()).map_err(|kind| {
        ExecError::Shape(
            shapes::ShapeError {
                op: "dot".to_string(),
                kind,
            }
            .to_string(),
        )
    })?;

    let mut acc = 0.0f64;
    for (a, b) in lhs.data().iter().zip(rhs.data()) {
        acc += *a as f64 * *b as f64;
    }
    Ok(Tensor::scalar(acc as f32))
}

fn check_f32(t: &Tensor) -> R<()> {
    if *t.dtype() != DType::F32 {
        return Err(ExecError::Type(format!(
            "kernel expects f32 input, got {:?}",
            t.dtype()
        )));
    }
    Ok(())
}

fn binary_elementwise(lhs: &Tensor, rhs: &Tensor, f: fn(f32, f32) -> f32) -> R<Tensor> {
    check_f32(lhs)?;
    check_f32(rhs)?;

    if lhs.shape() == rhs.shape() {
        let data = map2(lhs.data(), rhs.data(), f);
        return Ok(Tensor::from_parts(lhs.shape().to_vec(), data));
    }

    let target = shapes::broadcast_shapes(lhs.shape(), rhs.shape()).map_err(|_| {
        ExecError::Shape(format!(
            "cannot broadcast shapes {:?} and {:?}",
            lhs.shape(),
            rhs.shape()
        ))
    })?;
    let l = lhs
        .broadcast_to(&target)
        .map_err(|err| ExecError::Shape(err.to_string()))?;
    let r = rhs
        .broadcast_to(&target)
        .map_err(|err| ExecError::Shape(err.to_string()))?;
    let data = map2(l.data(), r.data(), f);
    Ok(Tensor::from_parts(target, data))
}

fn sum_f64(data: &[f32]) -> f64 {
    let mut acc = 0.0f64;
    for v in data {
        acc += *v as f64;
    }
    acc
}

fn map2(lhs: &[f32], rhs: &[f32], f: fn(f32, f32) -> f32) -> Vec<f32> {
    let mut out = vec![0.0f32; lhs.len()];

    #[cfg(feature = "parallel")]
    if out.len() >= PAR_MIN_LEN {
        out.par_chunks_mut(CHUNK)
            .zip(lhs.par_chunks(CHUNK).zip(rhs.par_chunks(CHUNK)))
            .for_each(|(o, (l, r))| {
                for i in 0..o.len() {
                    o[i] = f(l[i], r[i]);
                }
            });
        return out;
    }

    for ((o, l), r) in out
        .chunks_mut(CHUNK)
        .zip(lhs.chunks(CHUNK))
        .zip(rhs.chunks(CHUNK))
    {
        for i in 0..o.len() {
            o[i] = f(l[i], r[i]);
        }
    }
    out
}

fn map1<F>(src: &[f32], f: F) -> Vec<f32>
where
    F: Fn(f32) -> f32 + Sync + Send,
{
    let mut out = vec![0.0f32; src.len()];

    #[cfg(feature = "parallel")]
    if out.len() >= PAR_MIN_LEN {
        out.par_chunks_mut(CHUNK)
            .zip(src.par_chunks(CHUNK))
            .for_each(|(o, s)| {
                for i in 0..o.len() {
                    o[i] = f(s[i]);
                }
            });
        return out;
    }

    for (o, s) in out.chunks_mut(CHUNK).zip(src.chunks(CHUNK)) {
        for i in 0..o.len() {
            o[i] = f(s[i]);
        }
    }
    out
}
