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

use nalgebra::DVector;
use ndarray::Array2;
use num_complex::Complex64;
use thiserror::Error;

use crate::pauli_exp_val::{expval_pauli_no_x, expval_pauli_with_x};
use crate::pauli_op::PauliwordOp;
use crate::util::{C_ONE, C_ZERO};
use crate::MAX_MATRIX_QUBITS;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
    #[error("a statevector must have a power-of-two length, not {0}")]
    NotPowerOfTwo(usize),
    #[error("cannot normalize a statevector with zero norm")]
    ZeroNorm,
    #[error("basis-state bits must be 0 or 1, not {0}")]
    BadBit(u8),
    #[error("basis-state character must be '0' or '1', not '{0}'")]
    BadBitChar(char),
    #[error("basis index {index} is out of range for {num_qubits} qubits")]
    IndexOutOfRange { index: usize, num_qubits: u32 },
    #[error("the operator acts on {operator} qubits, but the state has {state}")]
    QubitMismatch { operator: u32, state: u32 },
    #[error("the operator has off-diagonal terms")]
    NotDiagonal,
    #[error("{0} is too many qubits for an explicit statevector")]
    TooManyQubits(u32),
    #[error("the state has norm {0}, but a normalized state is required")]
    NotNormalized(f64),
}

/// A dense statevector on `num_qubits` qubits.
///
/// Amplitude `i` belongs to the computational-basis state whose bit array is the binary
/// expansion of `i`, most significant bit first; bit `q` of that array is qubit `q`.
#[derive(Clone, Debug, PartialEq)]
pub struct QuantumState {
    num_qubits: u32,
    amplitudes: Vec<Complex64>,
}

impl QuantumState {
    /// Build a state from a vector of amplitudes, normalizing it.
    pub fn from_array(amplitudes: Vec<Complex64>) -> Result<Self, StateError> {
        let num_qubits = num_qubits_for(amplitudes.len())?;
        let norm = amplitudes.iter().map(|c| c.norm_sqr()).sum::<f64>().sqrt();
        if norm == 0.0 {
            return Err(StateError::ZeroNorm);
        }
        Ok(Self {
            num_qubits,
            amplitudes: amplitudes.into_iter().map(|c| c / norm).collect(),
        })
    }

    /// Wrap amplitudes as given, without normalizing.
    pub fn from_array_unnormalized(amplitudes: Vec<Complex64>) -> Result<Self, StateError> {
        let num_qubits = num_qubits_for(amplitudes.len())?;
        Ok(Self {
            num_qubits,
            amplitudes,
        })
    }

    /// The computational-basis state `|index>`.
    pub fn basis_state(num_qubits: u32, index: usize) -> Result<Self, StateError> {
        if num_qubits > MAX_MATRIX_QUBITS {
            return Err(StateError::TooManyQubits(num_qubits));
        }
        let dim = 1usize << num_qubits;
        if index >= dim {
            return Err(StateError::IndexOutOfRange { index, num_qubits });
        }
        let mut amplitudes = vec![C_ZERO; dim];
        amplitudes[index] = C_ONE;
        Ok(Self {
            num_qubits,
            amplitudes,
        })
    }

    /// The computational-basis state with the given bit array, for example a Hartree-Fock
    /// occupation `[1, 1, 0, 0]`.
    pub fn from_bits(bits: &[u8]) -> Result<Self, StateError> {
        let num_qubits = bits.len() as u32;
        if num_qubits > MAX_MATRIX_QUBITS {
            return Err(StateError::TooManyQubits(num_qubits));
        }
        let mut index = 0usize;
        for &bit in bits {
            if bit > 1 {
                return Err(StateError::BadBit(bit));
            }
            index = (index << 1) | bit as usize;
        }
        Self::basis_state(num_qubits, index)
    }

    /// The computational-basis state with the given bitstring, for example `"1100"`.
    pub fn from_bitstring(bits: &str) -> Result<Self, StateError> {
        let bits = bits
            .chars()
            .map(|c| match c {
                '0' => Ok(0),
                '1' => Ok(1),
                other => Err(StateError::BadBitChar(other)),
            })
            .collect::<Result<Vec<u8>, _>>()?;
        Self::from_bits(&bits)
    }

    #[inline]
    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.amplitudes.len()
    }

    #[inline]
    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    pub fn into_amplitudes(self) -> Vec<Complex64> {
        self.amplitudes
    }

    pub fn norm(&self) -> f64 {
        self.amplitudes
            .iter()
            .map(|c| c.norm_sqr())
            .sum::<f64>()
            .sqrt()
    }

    /// Zero every amplitude with magnitude below `threshold` and renormalize what is left.
    pub fn cleanup(&self, threshold: f64) -> Result<Self, StateError> {
        Self::from_array(
            self.amplitudes
                .iter()
                .map(|&c| if c.norm() < threshold { C_ZERO } else { c })
                .collect(),
        )
    }

    /// The bit arrays of the basis states with nonzero amplitude, one per row, in index order.
    /// Pairs with [QuantumState::coeff_vec].
    pub fn state_matrix(&self) -> Array2<u8> {
        let support = self.support();
        let n = self.num_qubits as usize;
        Array2::from_shape_fn((support.len(), n), |(row, qubit)| {
            ((support[row] >> (n - 1 - qubit)) & 1) as u8
        })
    }

    /// The nonzero amplitudes, in the row order of [QuantumState::state_matrix].
    pub fn coeff_vec(&self) -> Vec<Complex64> {
        self.support()
            .into_iter()
            .map(|index| self.amplitudes[index])
            .collect()
    }

    fn support(&self) -> Vec<usize> {
        self.amplitudes
            .iter()
            .enumerate()
            .filter_map(|(index, c)| (*c != C_ZERO).then_some(index))
            .collect()
    }

    /// `<ψ| O |ψ>` for an operator `O` that is diagonal in the computational basis.  Only the real
    /// parts of the coefficients contribute.
    pub fn expectation_diagonal(&self, operator: &PauliwordOp) -> Result<f64, StateError> {
        self.check_qubits(operator)?;
        if !operator.is_diagonal() {
            return Err(StateError::NotDiagonal);
        }
        Ok(operator
            .iter()
            .map(|(_, z, coeff)| coeff.re * expval_pauli_no_x(&self.amplitudes, z))
            .sum())
    }

    /// `<ψ| O |ψ>` for a general operator.
    pub fn expectation(&self, operator: &PauliwordOp) -> Result<Complex64, StateError> {
        self.check_qubits(operator)?;
        Ok(operator
            .iter()
            .map(|(x, z, coeff)| coeff * expval_pauli_with_x(&self.amplitudes, x, z))
            .sum())
    }

    /// `<self|other>`.
    pub fn overlap(&self, other: &QuantumState) -> Result<Complex64, StateError> {
        if self.num_qubits != other.num_qubits {
            return Err(StateError::QubitMismatch {
                operator: other.num_qubits,
                state: self.num_qubits,
            });
        }
        Ok(self
            .amplitudes
            .iter()
            .zip(other.amplitudes.iter())
            .map(|(a, b)| a.conj() * b)
            .sum())
    }

    pub fn to_dvector(&self) -> DVector<Complex64> {
        DVector::from_column_slice(&self.amplitudes)
    }

    fn check_qubits(&self, operator: &PauliwordOp) -> Result<(), StateError> {
        if operator.num_qubits() != self.num_qubits {
            return Err(StateError::QubitMismatch {
                operator: operator.num_qubits(),
                state: self.num_qubits,
            });
        }
        Ok(())
    }
}

fn num_qubits_for(len: usize) -> Result<u32, StateError> {
    if !len.is_power_of_two() {
        return Err(StateError::NotPowerOfTwo(len));
    }
    Ok(len.trailing_zeros())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{c64, IM};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    /// `Σ_q (1 - Z_q) / 2`, the occupation-number operator under Jordan-Wigner.
    fn number_operator(num_qubits: u32) -> PauliwordOp {
        let n = num_qubits as usize;
        let mut terms = vec![("I".repeat(n), c64(num_qubits as f64 / 2.0, 0))];
        for qubit in 0..n {
            let mut label = "I".repeat(n);
            label.replace_range(qubit..qubit + 1, "Z");
            terms.push((label, c64(-0.5, 0)));
        }
        PauliwordOp::from_dictionary(terms).unwrap()
    }

    #[test]
    fn arrays_are_normalized() {
        let state = QuantumState::from_array(vec![c64(3, 0), c64(0, 4)]).unwrap();
        assert_eq!(state.num_qubits(), 1);
        assert_abs_diff_eq!(state.norm(), 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(state.amplitudes()[1].im, 0.8, epsilon = 1e-15);
        assert_eq!(
            QuantumState::from_array(vec![C_ZERO; 4]),
            Err(StateError::ZeroNorm)
        );
        assert_eq!(
            QuantumState::from_array(vec![C_ONE; 3]),
            Err(StateError::NotPowerOfTwo(3))
        );
    }

    #[test]
    fn bits_map_to_the_most_significant_bit_first() {
        let state = QuantumState::from_bits(&[1, 1, 0, 0]).unwrap();
        assert_eq!(state.amplitudes()[0b1100], C_ONE);
        assert_eq!(state.state_matrix(), array![[1u8, 1, 0, 0]]);
        assert_eq!(QuantumState::from_bitstring("1100").unwrap(), state);
        assert_eq!(
            QuantumState::from_bits(&[1, 2]),
            Err(StateError::BadBit(2))
        );
    }

    #[test]
    fn number_operator_counts_the_hamming_weight() {
        let op = number_operator(4);
        for index in 0..16usize {
            let state = QuantumState::basis_state(4, index).unwrap();
            let expected = index.count_ones() as f64;
            assert_abs_diff_eq!(
                state.expectation_diagonal(&op).unwrap(),
                expected,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn diagonal_expectation_rejects_bad_operators() {
        let state = QuantumState::basis_state(2, 1).unwrap();
        let flip = PauliwordOp::from_label("XI", C_ONE).unwrap();
        assert_eq!(
            state.expectation_diagonal(&flip),
            Err(StateError::NotDiagonal)
        );
        let wide = PauliwordOp::from_label("ZZZ", C_ONE).unwrap();
        assert_eq!(
            state.expectation_diagonal(&wide),
            Err(StateError::QubitMismatch {
                operator: 3,
                state: 2
            })
        );
    }

    #[test]
    fn cleanup_drops_small_amplitudes_and_renormalizes() {
        let state =
            QuantumState::from_array(vec![c64(1.0, 0), c64(1e-7, 0), C_ZERO, c64(0, 1.0)])
                .unwrap();
        let clean = state.cleanup(1e-5).unwrap();
        assert_eq!(clean.amplitudes()[1], C_ZERO);
        assert_abs_diff_eq!(clean.norm(), 1.0, epsilon = 1e-15);
        assert_eq!(clean.state_matrix(), array![[0u8, 0], [1, 1]]);
        let coeffs = clean.coeff_vec();
        assert_eq!(coeffs.len(), 2);
        assert_abs_diff_eq!(coeffs[1].im, std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-15);
    }

    #[test]
    fn general_expectation_of_a_bell_state() {
        let bell = QuantumState::from_array(vec![C_ONE, C_ZERO, C_ZERO, C_ONE]).unwrap();
        let op = PauliwordOp::from_dictionary([
            ("XX", c64(1, 0)),
            ("YY", c64(1, 0)),
            ("ZZ", c64(1, 0)),
        ])
        .unwrap();
        // <XX> = 1, <YY> = -1, <ZZ> = 1.
        let value = bell.expectation(&op).unwrap();
        assert_abs_diff_eq!(value.re, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(value.im, 0.0, epsilon = 1e-12);
        let phased = QuantumState::from_array(vec![C_ONE, IM]).unwrap();
        let y = PauliwordOp::from_label("Y", C_ONE).unwrap();
        assert_abs_diff_eq!(phased.expectation(&y).unwrap().re, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn overlap_is_conjugate_linear_on_the_left() {
        let plus = QuantumState::from_array(vec![C_ONE, C_ONE]).unwrap();
        let phased = QuantumState::from_array(vec![C_ONE, IM]).unwrap();
        let value = plus.overlap(&phased).unwrap();
        assert_abs_diff_eq!(value.re, 0.5, epsilon = 1e-15);
        assert_abs_diff_eq!(value.im, 0.5, epsilon = 1e-15);
    }
}
