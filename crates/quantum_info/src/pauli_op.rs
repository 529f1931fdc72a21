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

use std::fmt;
use std::ops;

use ahash::RandomState;
use indexmap::IndexMap;
use ndarray::Array2;
use num_complex::Complex64;
use thiserror::Error;

use crate::sparse_matrix::{CsrMatrix, MatrixCompressedPaulis};
use crate::util::{mul_i_pow, C_ONE, C_ZERO};
use crate::MAX_MATRIX_QUBITS;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PauliError {
    #[error("cannot infer the number of qubits from an empty term dictionary")]
    EmptyDictionary,
    #[error("label '{label}' has length {len}, but the operator acts on {num_qubits} qubits")]
    LabelLength {
        label: String,
        len: usize,
        num_qubits: u32,
    },
    #[error("labels must only contain letters from the alphabet 'IXYZ', not '{0}'")]
    BadLetter(char),
    #[error("mismatched numbers of qubits: {left}, {right}")]
    MismatchedQubits { left: u32, right: u32 },
    #[error("`x` ({x}), `z` ({z}) and `coeffs` ({coeffs}) must all be the same length")]
    MismatchedLengths { x: usize, z: usize, coeffs: usize },
    #[error("symplectic mask {mask:#b} has bits set beyond {num_qubits} qubits")]
    MaskOutOfRange { mask: u64, num_qubits: u32 },
    #[error("{0} is too many qubits for a 64-bit symplectic representation")]
    TooManyQubits(u32),
    #[error("{0} is too many qubits to convert to a matrix")]
    TooManyQubitsForMatrix(u32),
    #[error("terms {0} and {1} commute, so the operator is not pairwise anticommuting")]
    NotAnticommuting(usize, usize),
}

/// A single-qubit Pauli letter.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Pauli {
    I,
    X,
    Y,
    Z,
}

impl Pauli {
    /// The symplectic `(x, z)` components of the letter.
    #[inline]
    pub fn symplectic(self) -> (bool, bool) {
        match self {
            Pauli::I => (false, false),
            Pauli::X => (true, false),
            Pauli::Y => (true, true),
            Pauli::Z => (false, true),
        }
    }

    #[inline]
    pub fn from_symplectic(x: bool, z: bool) -> Self {
        match (x, z) {
            (false, false) => Pauli::I,
            (true, false) => Pauli::X,
            (true, true) => Pauli::Y,
            (false, true) => Pauli::Z,
        }
    }

    pub fn label(self) -> char {
        match self {
            Pauli::I => 'I',
            Pauli::X => 'X',
            Pauli::Y => 'Y',
            Pauli::Z => 'Z',
        }
    }
}

impl TryFrom<char> for Pauli {
    type Error = PauliError;

    fn try_from(value: char) -> Result<Self, Self::Error> {
        match value {
            'I' => Ok(Pauli::I),
            'X' => Ok(Pauli::X),
            'Y' => Ok(Pauli::Y),
            'Z' => Ok(Pauli::Z),
            other => Err(PauliError::BadLetter(other)),
        }
    }
}

/// A linear combination of Pauli strings on a fixed number of qubits, stored in the symplectic
/// representation.
///
/// Each term is a pair of bit masks `(x, z)` and a complex coefficient.  A set bit in `x` marks an
/// `X` component and a set bit in `z` marks a `Z` component; both together mark a `Y` (and not
/// `XZ`, so there are no hidden phases: the coefficient multiplies the Hermitian Pauli string
/// exactly as written in its label).
///
/// Qubit `q` of a label `P_0 P_1 ... P_{n-1}` is stored in bit `n - 1 - q` of the masks, so the
/// leftmost letter acts on the most significant bit of a computational-basis index.  With this
/// convention `(index & z).count_ones()` is directly the parity a `Z`-type string measures on
/// the basis state `|index>`, and `index ^ x` is the basis state it is flipped to.
#[derive(Clone, Debug, PartialEq)]
pub struct PauliwordOp {
    num_qubits: u32,
    x: Vec<u64>,
    z: Vec<u64>,
    coeffs: Vec<Complex64>,
}

impl PauliwordOp {
    /// Create a new operator from its raw symplectic components, checking that the data is
    /// coherent.
    pub fn new(
        num_qubits: u32,
        x: Vec<u64>,
        z: Vec<u64>,
        coeffs: Vec<Complex64>,
    ) -> Result<Self, PauliError> {
        if num_qubits > u64::BITS {
            return Err(PauliError::TooManyQubits(num_qubits));
        }
        if x.len() != coeffs.len() || z.len() != coeffs.len() {
            return Err(PauliError::MismatchedLengths {
                x: x.len(),
                z: z.len(),
                coeffs: coeffs.len(),
            });
        }
        let valid = valid_mask(num_qubits);
        if let Some(&mask) = x.iter().chain(z.iter()).find(|&&mask| mask & !valid != 0) {
            return Err(PauliError::MaskOutOfRange { mask, num_qubits });
        }
        Ok(Self {
            num_qubits,
            x,
            z,
            coeffs,
        })
    }

    /// An operator with no terms.
    pub fn zero(num_qubits: u32) -> Self {
        Self {
            num_qubits,
            x: Vec::new(),
            z: Vec::new(),
            coeffs: Vec::new(),
        }
    }

    /// The identity operator on `num_qubits` qubits.
    pub fn identity(num_qubits: u32) -> Self {
        Self {
            num_qubits,
            x: vec![0],
            z: vec![0],
            coeffs: vec![C_ONE],
        }
    }

    /// A single Pauli string with the given coefficient, for example `("XIZY", 0.5)`.
    pub fn from_label(label: &str, coeff: Complex64) -> Result<Self, PauliError> {
        let num_qubits = label.chars().count() as u32;
        if num_qubits > u64::BITS {
            return Err(PauliError::TooManyQubits(num_qubits));
        }
        let (x, z) = parse_label(label, num_qubits)?;
        Ok(Self {
            num_qubits,
            x: vec![x],
            z: vec![z],
            coeffs: vec![coeff],
        })
    }

    /// Build an operator from a mapping of Pauli labels to coefficients.
    ///
    /// All labels must have the same length.  Repeated labels are summed, and terms whose
    /// coefficients cancel exactly are dropped; otherwise the order of first appearance is kept.
    pub fn from_dictionary<I, S>(terms: I) -> Result<Self, PauliError>
    where
        I: IntoIterator<Item = (S, Complex64)>,
        S: AsRef<str>,
    {
        let mut terms = terms.into_iter().peekable();
        let num_qubits = match terms.peek() {
            Some((label, _)) => label.as_ref().chars().count() as u32,
            None => return Err(PauliError::EmptyDictionary),
        };
        if num_qubits > u64::BITS {
            return Err(PauliError::TooManyQubits(num_qubits));
        }
        let mut out = Self::zero(num_qubits);
        for (label, coeff) in terms {
            let (x, z) = parse_label(label.as_ref(), num_qubits)?;
            out.x.push(x);
            out.z.push(z);
            out.coeffs.push(coeff);
        }
        Ok(out.simplify(0.0))
    }

    /// The number of qubits this operator acts on.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    /// The number of explicitly stored terms.
    #[inline]
    pub fn num_terms(&self) -> usize {
        self.coeffs.len()
    }

    #[inline]
    pub fn coeffs(&self) -> &[Complex64] {
        &self.coeffs
    }

    /// The `X` components of each term as bit masks.
    #[inline]
    pub fn x_block(&self) -> &[u64] {
        &self.x
    }

    /// The `Z` components of each term as bit masks.
    #[inline]
    pub fn z_block(&self) -> &[u64] {
        &self.z
    }

    /// Iterate over the terms as `(x, z, coeff)` triples.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (u64, u64, Complex64)> + '_ {
        self.x
            .iter()
            .zip(self.z.iter())
            .zip(self.coeffs.iter())
            .map(|((&x, &z), &coeff)| (x, z, coeff))
    }

    /// The Pauli letter term `index` has on `qubit`.
    pub fn pauli(&self, index: usize, qubit: u32) -> Pauli {
        let bit = qubit_bit(self.num_qubits, qubit);
        Pauli::from_symplectic(self.x[index] & bit != 0, self.z[index] & bit != 0)
    }

    /// The dense label of term `index`, for example `"XIZY"`.
    pub fn label(&self, index: usize) -> String {
        (0..self.num_qubits)
            .map(|qubit| self.pauli(index, qubit).label())
            .collect()
    }

    /// Convert back to a mapping of labels to coefficients, in term order.
    pub fn to_dictionary(&self) -> IndexMap<String, Complex64> {
        (0..self.num_terms())
            .map(|index| (self.label(index), self.coeffs[index]))
            .collect()
    }

    /// Whether every term is diagonal in the computational basis, i.e. the `X` block is empty.
    pub fn is_diagonal(&self) -> bool {
        self.x.iter().all(|&x| x == 0)
    }

    /// Whether the operator is Hermitian.  Pauli strings are Hermitian themselves, so this holds
    /// exactly when every coefficient of the simplified operator is real.
    pub fn is_hermitian(&self, tol: f64) -> bool {
        self.simplify(tol)
            .coeffs
            .iter()
            .all(|coeff| coeff.im.abs() <= tol)
    }

    /// Sum coefficients that correspond to the same Pauli string, and drop any resulting term
    /// whose coefficient has magnitude at most `tol`.
    pub fn simplify(&self, tol: f64) -> Self {
        let mut table = IndexMap::<(u64, u64), Complex64, RandomState>::with_capacity_and_hasher(
            self.coeffs.len(),
            RandomState::new(),
        );
        for (x, z, coeff) in self.iter() {
            *table.entry((x, z)).or_insert(C_ZERO) += coeff;
        }
        let mut out = Self::zero(self.num_qubits);
        for ((x, z), coeff) in table {
            if coeff.norm() <= tol {
                continue;
            }
            out.x.push(x);
            out.z.push(z);
            out.coeffs.push(coeff);
        }
        out
    }

    /// The Hermitian conjugate.  Every Pauli string is self-adjoint, so only the coefficients
    /// change.
    pub fn dagger(&self) -> Self {
        Self {
            num_qubits: self.num_qubits,
            x: self.x.clone(),
            z: self.z.clone(),
            coeffs: self.coeffs.iter().map(|c| c.conj()).collect(),
        }
    }

    /// The tensor product `self ⊗ other`.  The qubits of `self` come first (leftmost) in the
    /// labels of the output.
    pub fn tensor(&self, other: &PauliwordOp) -> Result<Self, PauliError> {
        let num_qubits = self.num_qubits + other.num_qubits;
        if num_qubits > u64::BITS {
            return Err(PauliError::TooManyQubits(num_qubits));
        }
        let shift = other.num_qubits;
        let num_terms = self.num_terms() * other.num_terms();
        let mut out = Self {
            num_qubits,
            x: Vec::with_capacity(num_terms),
            z: Vec::with_capacity(num_terms),
            coeffs: Vec::with_capacity(num_terms),
        };
        for (left_x, left_z, left_coeff) in self.iter() {
            for (right_x, right_z, right_coeff) in other.iter() {
                // `checked_shl` guards the zero-qubit `self` case, where a shift by 64 would
                // overflow; the shifted value is zero then anyway.
                out.x.push(left_x.checked_shl(shift).unwrap_or(0) | right_x);
                out.z.push(left_z.checked_shl(shift).unwrap_or(0) | right_z);
                out.coeffs.push(left_coeff * right_coeff);
            }
        }
        Ok(out)
    }

    /// The operator product `self · other` (so `other` acts first on a state).
    pub fn compose(&self, other: &PauliwordOp) -> Result<Self, PauliError> {
        self.check_equal_qubits(other)?;
        let num_terms = self.num_terms() * other.num_terms();
        let mut out = Self {
            num_qubits: self.num_qubits,
            x: Vec::with_capacity(num_terms),
            z: Vec::with_capacity(num_terms),
            coeffs: Vec::with_capacity(num_terms),
        };
        for (left_x, left_z, left_coeff) in self.iter() {
            for (right_x, right_z, right_coeff) in other.iter() {
                let (x, z, phase) = multiply_strings(left_x, left_z, right_x, right_z);
                out.x.push(x);
                out.z.push(z);
                out.coeffs.push(mul_i_pow(left_coeff * right_coeff, phase));
            }
        }
        Ok(out.simplify(0.0))
    }

    /// The sum of two operators on the same number of qubits.
    pub fn try_add(&self, other: &PauliwordOp) -> Result<Self, PauliError> {
        self.check_equal_qubits(other)?;
        let mut out = self.clone();
        out.x.extend_from_slice(&other.x);
        out.z.extend_from_slice(&other.z);
        out.coeffs.extend_from_slice(&other.coeffs);
        Ok(out.simplify(0.0))
    }

    pub fn check_equal_qubits(&self, other: &PauliwordOp) -> Result<(), PauliError> {
        if self.num_qubits != other.num_qubits {
            return Err(PauliError::MismatchedQubits {
                left: self.num_qubits,
                right: other.num_qubits,
            });
        }
        Ok(())
    }

    /// Whether terms `left` and `right` commute as Pauli strings.
    #[inline]
    pub fn terms_commute(&self, left: usize, right: usize) -> bool {
        let anticommuting = (self.x[left] & self.z[right]).count_ones()
            + (self.z[left] & self.x[right]).count_ones();
        anticommuting % 2 == 0
    }

    /// The symmetric commutation adjacency matrix of the terms: entry `(i, j)` is `true` when
    /// terms `i` and `j` commute.
    pub fn adjacency_matrix(&self) -> Array2<bool> {
        let n = self.num_terms();
        Array2::from_shape_fn((n, n), |(i, j)| self.terms_commute(i, j))
    }

    /// Pack the operator into the matrix-oriented representation, with the `Y` phases absorbed
    /// into the coefficients.
    pub(crate) fn matrix_compress(&self) -> Result<MatrixCompressedPaulis, PauliError> {
        if self.num_qubits > MAX_MATRIX_QUBITS {
            return Err(PauliError::TooManyQubitsForMatrix(self.num_qubits));
        }
        // `Y = i X Z` in our convention, so `<r| P |r ^ x>` picks up `(-i) ** num_ys` and a sign
        // from the `Z` parity of the row.
        let coeffs = self
            .iter()
            .map(|(x, z, coeff)| mul_i_pow(coeff, 3 * (x & z).count_ones()))
            .collect();
        let mut compressed =
            MatrixCompressedPaulis::new(self.num_qubits, self.x.clone(), self.z.clone(), coeffs);
        compressed.combine();
        Ok(compressed)
    }

    /// Build the explicit sparse matrix of the operator in the computational basis.
    pub fn to_sparse_matrix(&self) -> Result<CsrMatrix, PauliError> {
        Ok(self.matrix_compress()?.to_csr())
    }
}

impl ops::Mul<Complex64> for &PauliwordOp {
    type Output = PauliwordOp;

    fn mul(self, rhs: Complex64) -> PauliwordOp {
        PauliwordOp {
            num_qubits: self.num_qubits,
            x: self.x.clone(),
            z: self.z.clone(),
            coeffs: self.coeffs.iter().map(|c| c * rhs).collect(),
        }
    }
}

impl fmt::Display for PauliwordOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.num_terms() == 0 {
            return write!(f, "0");
        }
        for index in 0..self.num_terms() {
            let coeff = self.coeffs[index];
            if index > 0 {
                writeln!(f, " +")?;
            }
            write!(
                f,
                "{:.10}{:+.10}i {}",
                coeff.re,
                coeff.im,
                self.label(index)
            )?;
        }
        Ok(())
    }
}

/// All bits that belong to a qubit of an `num_qubits`-qubit operator.
#[inline]
fn valid_mask(num_qubits: u32) -> u64 {
    if num_qubits == u64::BITS {
        u64::MAX
    } else {
        (1u64 << num_qubits) - 1
    }
}

#[inline]
fn qubit_bit(num_qubits: u32, qubit: u32) -> u64 {
    1u64 << (num_qubits - 1 - qubit)
}

fn parse_label(label: &str, num_qubits: u32) -> Result<(u64, u64), PauliError> {
    let len = label.chars().count();
    if len != num_qubits as usize {
        return Err(PauliError::LabelLength {
            label: label.to_owned(),
            len,
            num_qubits,
        });
    }
    let mut x = 0u64;
    let mut z = 0u64;
    for (qubit, letter) in label.chars().enumerate() {
        let (has_x, has_z) = Pauli::try_from(letter)?.symplectic();
        let bit = qubit_bit(num_qubits, qubit as u32);
        if has_x {
            x |= bit;
        }
        if has_z {
            z |= bit;
        }
    }
    Ok((x, z))
}

/// Multiply two Pauli strings given in symplectic form, returning the symplectic form of the
/// product and the power of `i` that multiplies it.
///
/// Writing each string as `i ** y · X^x Z^z` (with `y` its number of `Y` letters), moving the
/// `Z^z1` of the left factor past the `X^x2` of the right factor costs `(-1) ** |z1 & x2|`.
#[inline]
fn multiply_strings(x1: u64, z1: u64, x2: u64, z2: u64) -> (u64, u64, u32) {
    let x = x1 ^ x2;
    let z = z1 ^ z2;
    let y1 = (x1 & z1).count_ones() as i64;
    let y2 = (x2 & z2).count_ones() as i64;
    let y = (x & z).count_ones() as i64;
    let swaps = (z1 & x2).count_ones() as i64;
    let phase = (y1 + y2 + 2 * swaps - y).rem_euclid(4) as u32;
    (x, z, phase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{c64, IM};
    use approx::assert_abs_diff_eq;

    fn op(terms: &[(&str, f64)]) -> PauliwordOp {
        PauliwordOp::from_dictionary(terms.iter().map(|&(label, c)| (label, c64(c, 0))))
            .unwrap()
    }

    #[test]
    fn labels_round_trip_through_the_dictionary() {
        let terms = [("XIZY", 0.5), ("IIII", -1.25), ("ZZII", 0.125)];
        let operator = op(&terms);
        assert_eq!(operator.num_qubits(), 4);
        assert_eq!(operator.num_terms(), 3);
        let dict = operator.to_dictionary();
        for (label, coeff) in terms {
            assert_eq!(dict[label], c64(coeff, 0));
        }
    }

    #[test]
    fn leftmost_letter_is_the_most_significant_bit() {
        let operator = PauliwordOp::from_label("XIZ", C_ONE).unwrap();
        assert_eq!(operator.x_block(), &[0b100]);
        assert_eq!(operator.z_block(), &[0b001]);
        assert_eq!(operator.pauli(0, 0), Pauli::X);
        assert_eq!(operator.pauli(0, 1), Pauli::I);
        assert_eq!(operator.pauli(0, 2), Pauli::Z);
    }

    #[test]
    fn duplicate_labels_are_summed() {
        let operator = op(&[("XZ", 0.5), ("ZZ", 1.0), ("XZ", 0.25), ("ZZ", -1.0)]);
        assert_eq!(operator.num_terms(), 1);
        assert_eq!(operator.label(0), "XZ");
        assert_eq!(operator.coeffs()[0], c64(0.75, 0));
    }

    #[test]
    fn bad_dictionaries_are_rejected() {
        let empty: Vec<(&str, Complex64)> = vec![];
        assert_eq!(
            PauliwordOp::from_dictionary(empty),
            Err(PauliError::EmptyDictionary)
        );
        assert_eq!(
            PauliwordOp::from_dictionary([("XZ", C_ONE), ("XZI", C_ONE)]),
            Err(PauliError::LabelLength {
                label: "XZI".to_owned(),
                len: 3,
                num_qubits: 2
            })
        );
        assert_eq!(
            PauliwordOp::from_dictionary([("XA", C_ONE)]),
            Err(PauliError::BadLetter('A'))
        );
    }

    #[test]
    fn raw_masks_must_fit_the_qubit_count() {
        assert!(matches!(
            PauliwordOp::new(2, vec![0b100], vec![0], vec![C_ONE]),
            Err(PauliError::MaskOutOfRange { .. })
        ));
        assert!(matches!(
            PauliwordOp::new(2, vec![0b10], vec![0], vec![]),
            Err(PauliError::MismatchedLengths { .. })
        ));
    }

    #[test]
    fn tensor_puts_self_on_the_left() {
        let left = op(&[("X", 2.0), ("Z", 1.0)]);
        let right = op(&[("IY", 0.5)]);
        let product = left.tensor(&right).unwrap();
        assert_eq!(product.num_qubits(), 3);
        let dict = product.to_dictionary();
        assert_eq!(dict["XIY"], c64(1.0, 0));
        assert_eq!(dict["ZIY"], c64(0.5, 0));
    }

    #[test]
    fn tensor_with_the_empty_identity_is_a_no_op() {
        let operator = op(&[("XY", 2.0), ("ZI", 1.0)]);
        let unit = PauliwordOp::identity(0);
        assert_eq!(unit.tensor(&operator).unwrap(), operator);
        assert_eq!(operator.tensor(&unit).unwrap(), operator);
    }

    #[test]
    fn dagger_conjugates_coefficients() {
        let operator = PauliwordOp::from_dictionary([("XY", c64(1.0, 2.0)), ("ZZ", c64(0, -1))])
            .unwrap();
        let dagger = operator.dagger();
        assert_eq!(dagger.coeffs(), &[c64(1.0, -2.0), c64(0, 1)]);
        assert!(!operator.is_hermitian(1e-12));
        assert!(operator.try_add(&dagger).unwrap().is_hermitian(1e-12));
    }

    #[test]
    fn single_qubit_products_follow_the_pauli_algebra() {
        let x = PauliwordOp::from_label("X", C_ONE).unwrap();
        let y = PauliwordOp::from_label("Y", C_ONE).unwrap();
        let z = PauliwordOp::from_label("Z", C_ONE).unwrap();

        let xy = x.compose(&y).unwrap();
        assert_eq!(xy.label(0), "Z");
        assert_eq!(xy.coeffs()[0], IM);

        let yx = y.compose(&x).unwrap();
        assert_eq!(yx.label(0), "Z");
        assert_eq!(yx.coeffs()[0], -IM);

        let zx = z.compose(&x).unwrap();
        assert_eq!(zx.label(0), "Y");
        assert_eq!(zx.coeffs()[0], IM);

        let yy = y.compose(&y).unwrap();
        assert_eq!(yy.label(0), "I");
        assert_eq!(yy.coeffs()[0], C_ONE);
    }

    #[test]
    fn composition_matches_matrix_multiplication() {
        let left = op(&[("XY", 0.5), ("ZI", -1.0), ("YZ", 0.25)]);
        let right = op(&[("YY", 1.5), ("IX", 0.75)]);
        let expected = left.to_sparse_matrix().unwrap().to_dense()
            * right.to_sparse_matrix().unwrap().to_dense();
        let actual = left.compose(&right).unwrap().to_sparse_matrix().unwrap().to_dense();
        for (a, b) in actual.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-12);
            assert_abs_diff_eq!(a.im, b.im, epsilon = 1e-12);
        }
    }

    #[test]
    fn adjacency_marks_commuting_pairs() {
        let operator = op(&[("XX", 1.0), ("ZZ", 1.0), ("ZI", 1.0)]);
        let adjacency = operator.adjacency_matrix();
        assert!(adjacency[[0, 0]]);
        assert!(adjacency[[0, 1]]);
        assert!(!adjacency[[0, 2]]);
        assert!(adjacency[[1, 2]]);
        assert_eq!(adjacency, adjacency.t());
    }

    #[test]
    fn diagonal_operators_have_no_x_block() {
        assert!(op(&[("ZIZ", 1.0), ("III", 2.0)]).is_diagonal());
        assert!(!op(&[("ZIZ", 1.0), ("IYI", 2.0)]).is_diagonal());
    }

    #[test]
    fn display_lists_every_term() {
        let operator = op(&[("XZ", 0.5), ("II", -1.0)]);
        let shown = operator.to_string();
        assert!(shown.contains("XZ"));
        assert!(shown.contains("II"));
        assert_eq!(PauliwordOp::zero(3).to_string(), "0");
    }
}
