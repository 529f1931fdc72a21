// This code is part of csvqe.
//
// (C) Copyright the csvqe developers 2026
//
// This code is licensed under the Apache License, Version 2.0. You may
// obtain a copy of this license in the LICENSE.txt file in the root directory
// of this source tree or at http://www.apache.org/licenses/LICENSE-2.0.
//
// Any modifications or derivative works of this code must retain this
// copyright notice, and modified files need to carry a notice indicating
// that they have been altered from the originals.

//! Expectation values of single Pauli strings in a statevector.
//!
//! The statevector is given as a plain slice of length `2 ** num_qubits`, and the Pauli string as
//! its symplectic masks in the bit convention of [crate::pauli_op::PauliwordOp].  Callers are
//! responsible for the lengths matching.

use num_complex::Complex64;
use pulp::Simd;
use rayon::prelude::*;

use crate::getenv_use_multiple_threads;
use crate::util::mul_i_pow;

/// Statevector length (as a power of two) from which the sums run on the thread pool.
const PARALLEL_THRESHOLD: u32 = 19;

#[pulp::with_simd(fast_sum = pulp::Arch::new())]
#[inline(always)]
pub fn fast_sum_with_simd<S: Simd>(simd: S, values: &[f64]) -> f64 {
    let (head, tail) = S::as_simd_f64s(values);
    let sum: f64 = head
        .iter()
        .fold(0., |acc, chunk| acc + simd.reduce_sum_f64s(*chunk));
    sum + tail.iter().sum::<f64>()
}

#[inline]
fn sum_terms<F>(size: usize, map_fn: F) -> f64
where
    F: Fn(usize) -> f64 + Sync + Send,
{
    if size < (1 << PARALLEL_THRESHOLD) || !getenv_use_multiple_threads() {
        fast_sum(&(0..size).map(map_fn).collect::<Vec<f64>>())
    } else {
        (0..size).into_par_iter().map(map_fn).sum()
    }
}

/// `<ψ| P |ψ>` for a Pauli string `P` with no `X` component.
pub fn expval_pauli_no_x(data: &[Complex64], z_mask: u64) -> f64 {
    sum_terms(data.len(), |i| {
        let val = data[i].norm_sqr();
        if (i as u64 & z_mask).count_ones() & 1 != 0 {
            -val
        } else {
            val
        }
    })
}

/// `<ψ| P |ψ>` for a general Pauli string `P` given by its `x` and `z` masks.
///
/// Row `i` of `P` has its single nonzero entry in column `i ^ x_mask`, with value
/// `(-i) ** |x & z| · (-1) ** |i & z|`.
pub fn expval_pauli_with_x(data: &[Complex64], x_mask: u64, z_mask: u64) -> f64 {
    if x_mask == 0 {
        return expval_pauli_no_x(data, z_mask);
    }
    let y_power = 3 * (x_mask & z_mask).count_ones();
    sum_terms(data.len(), |i| {
        let flipped = i ^ x_mask as usize;
        let mut val = mul_i_pow(data[i].conj() * data[flipped], y_power).re;
        if (i as u64 & z_mask).count_ones() & 1 != 0 {
            val = -val;
        }
        val
    })
}
