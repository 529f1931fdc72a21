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

use nalgebra::DMatrix;
use num_complex::Complex64;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::pauli_op::{PauliError, PauliwordOp};
use crate::quantum_state::StateError;
use crate::util::{c64, C_ZERO};

/// Tolerance on the norm of a state passed to [gram_schmidt_from_quantum_state].
const NORM_TOLERANCE: f64 = 1e-8;

/// Tensor a list of operators together, left to right.  The empty list gives the zero-qubit
/// identity.
pub fn tensor_list(factors: &[PauliwordOp]) -> Result<PauliwordOp, PauliError> {
    factors
        .iter()
        .try_fold(PauliwordOp::identity(0), |acc, factor| acc.tensor(factor))
}

/// A sum of `2 * n_qubits + 1` pairwise-anticommuting Pauli strings (the largest such set on
/// `n_qubits` qubits) with normally distributed coefficients.
///
/// The strings are `XX...X` and, for each qubit `i`, `X^i Z I...` and `X^i Y I...`.  The set is
/// structured rather than uniformly random.
pub fn random_anticommuting_op<R: Rng + ?Sized>(
    n_qubits: u32,
    complex_coeff: bool,
    rng: &mut R,
) -> Result<PauliwordOp, PauliError> {
    if n_qubits > u64::BITS {
        return Err(PauliError::TooManyQubits(n_qubits));
    }
    let n = n_qubits as usize;
    let base = "X".repeat(n);
    let mut labels = vec![base.clone()];
    for qubit in 0..n {
        for letter in ["Z", "Y"] {
            labels.push(format!("{}{}{}", &base[..qubit], letter, "I".repeat(n - qubit - 1)));
        }
    }
    let terms = labels
        .into_iter()
        .map(|label| {
            let re: f64 = rng.sample(StandardNormal);
            let im: f64 = if complex_coeff {
                rng.sample(StandardNormal)
            } else {
                0.0
            };
            (label, c64(re, im))
        })
        .collect::<Vec<_>>();
    let operator = PauliwordOp::from_dictionary(terms)?;

    let adjacency = operator.adjacency_matrix();
    for ((i, j), &commutes) in adjacency.indexed_iter() {
        if i != j && commutes {
            return Err(PauliError::NotAnticommuting(i, j));
        }
    }
    Ok(operator)
}

/// A unitary matrix whose first column is `state`, so that it prepares `state` from `|0...0>`.
///
/// `state` is zero-padded to the next power of two and must be normalized.  The remaining columns
/// are completed from the identity by Gram-Schmidt; if the state has no weight on `|0...0>`, the
/// identity column of its largest amplitude is swapped out first so the columns stay independent.
pub fn gram_schmidt_from_quantum_state(
    state: &[Complex64],
) -> Result<DMatrix<Complex64>, StateError> {
    if state.is_empty() {
        return Err(StateError::NotPowerOfTwo(0));
    }
    let dim = state.len().next_power_of_two();
    let norm = state.iter().map(|c| c.norm_sqr()).sum::<f64>().sqrt();
    if (norm - 1.0).abs() > NORM_TOLERANCE {
        return Err(StateError::NotNormalized(norm));
    }
    let mut padded = state.to_vec();
    padded.resize(dim, C_ZERO);

    let mut out = DMatrix::<Complex64>::identity(dim, dim);
    if padded[0].norm() < NORM_TOLERANCE {
        let max_index = padded
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.norm().total_cmp(&b.norm()))
            .map(|(index, _)| index)
            .unwrap_or(0);
        out.swap_columns(0, max_index);
    }
    out.set_column(0, &nalgebra::DVector::from_vec(padded));

    for a in 0..dim {
        for b in 0..a {
            let projection = out.column(b).dotc(&out.column(a));
            let basis = out.column(b).clone_owned();
            let mut column = out.column_mut(a);
            column.axpy(-projection, &basis, Complex64::new(1.0, 0.0));
        }
        let column_norm = out.column(a).norm();
        out.column_mut(a).unscale_mut(column_norm);
    }
    Ok(out)
}
