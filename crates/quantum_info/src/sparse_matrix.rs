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

use ahash::RandomState;
use indexmap::IndexMap;
use nalgebra::DMatrix;
use num_complex::Complex64;
use rayon::prelude::*;
use thiserror::Error;

use crate::getenv_use_multiple_threads;
use crate::util::C_ZERO;

/// Number of qubits (equivalently, `log2` of the matrix dimension) from which the row-wise loops
/// are spread over the thread pool.
const PARALLEL_THRESHOLD: u32 = 14;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatrixError {
    #[error("`indptr` must have {expected} entries for a {dim}x{dim} matrix, not {actual}")]
    BadIndptrLength {
        dim: usize,
        expected: usize,
        actual: usize,
    },
    #[error("`indptr` must start at 0, end at the number of stored entries and never decrease")]
    BadIndptr,
    #[error("`indices` ({indices}) and `data` ({data}) must be the same length")]
    MismatchedLengths { indices: usize, data: usize },
    #[error("column index {index} is out of range for a {dim}x{dim} matrix")]
    IndexOutOfRange { index: usize, dim: usize },
    #[error("column indices within row {0} must be strictly increasing")]
    UnsortedRow(usize),
    #[error("only square matrices are supported, not {0}x{1}")]
    NotSquare(usize, usize),
}

/// A square complex matrix in compressed-sparse-row format.
///
/// The column indices of each row are kept sorted and unique, which lets [CsrMatrix::get] use a
/// binary search and makes the output of the constructors canonical.
#[derive(Clone, Debug, PartialEq)]
pub struct CsrMatrix {
    dim: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<Complex64>,
}

impl CsrMatrix {
    /// Create a matrix from raw CSR components, validating them.
    pub fn new(
        dim: usize,
        indptr: Vec<usize>,
        indices: Vec<usize>,
        data: Vec<Complex64>,
    ) -> Result<Self, MatrixError> {
        if indptr.len() != dim + 1 {
            return Err(MatrixError::BadIndptrLength {
                dim,
                expected: dim + 1,
                actual: indptr.len(),
            });
        }
        if indices.len() != data.len() {
            return Err(MatrixError::MismatchedLengths {
                indices: indices.len(),
                data: data.len(),
            });
        }
        if indptr[0] != 0
            || indptr[dim] != indices.len()
            || indptr.windows(2).any(|pair| pair[0] > pair[1])
        {
            return Err(MatrixError::BadIndptr);
        }
        for row in 0..dim {
            let cols = &indices[indptr[row]..indptr[row + 1]];
            if let Some(&index) = cols.iter().find(|&&col| col >= dim) {
                return Err(MatrixError::IndexOutOfRange { index, dim });
            }
            if cols.windows(2).any(|pair| pair[0] >= pair[1]) {
                return Err(MatrixError::UnsortedRow(row));
            }
        }
        Ok(Self {
            dim,
            indptr,
            indices,
            data,
        })
    }

    /// Build a matrix from `(row, col, value)` triplets.  Duplicate positions are summed, and
    /// entries that end up exactly zero are not stored.
    pub fn from_triplets<I>(dim: usize, triplets: I) -> Result<Self, MatrixError>
    where
        I: IntoIterator<Item = (usize, usize, Complex64)>,
    {
        let mut rows: Vec<Vec<(usize, Complex64)>> = vec![Vec::new(); dim];
        for (row, col, value) in triplets {
            if row >= dim {
                return Err(MatrixError::IndexOutOfRange { index: row, dim });
            }
            if col >= dim {
                return Err(MatrixError::IndexOutOfRange { index: col, dim });
            }
            rows[row].push((col, value));
        }
        Ok(Self::from_rows(dim, rows))
    }

    /// Build a matrix from a dense one, dropping entries with magnitude at most `tol`.
    pub fn from_dense(matrix: &DMatrix<Complex64>, tol: f64) -> Result<Self, MatrixError> {
        let (nrows, ncols) = matrix.shape();
        if nrows != ncols {
            return Err(MatrixError::NotSquare(nrows, ncols));
        }
        let rows = (0..nrows)
            .map(|row| {
                (0..ncols)
                    .filter_map(|col| {
                        let value = matrix[(row, col)];
                        (value.norm() > tol).then_some((col, value))
                    })
                    .collect()
            })
            .collect();
        Ok(Self::from_rows(nrows, rows))
    }

    /// Assemble the CSR arrays from per-row entry lists, sorting each row by column and merging
    /// duplicates.
    fn from_rows(dim: usize, mut rows: Vec<Vec<(usize, Complex64)>>) -> Self {
        let mut indptr = Vec::with_capacity(dim + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);
        for row in rows.iter_mut() {
            merge_row(row);
            for &(col, value) in row.iter() {
                indices.push(col);
                data.push(value);
            }
            indptr.push(indices.len());
        }
        Self {
            dim,
            indptr,
            indices,
            data,
        }
    }

    /// Side length of the matrix.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of explicitly stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn indptr(&self) -> &[usize] {
        &self.indptr
    }

    #[inline]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    #[inline]
    pub fn data(&self) -> &[Complex64] {
        &self.data
    }

    /// The stored entries of `row` as `(col, value)` pairs.
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, Complex64)> + '_ {
        let range = self.indptr[row]..self.indptr[row + 1];
        self.indices[range.clone()]
            .iter()
            .copied()
            .zip(self.data[range].iter().copied())
    }

    /// The entry at `(row, col)`, or zero if it is not stored.
    pub fn get(&self, row: usize, col: usize) -> Complex64 {
        let start = self.indptr[row];
        let end = self.indptr[row + 1];
        match self.indices[start..end].binary_search(&col) {
            Ok(offset) => self.data[start + offset],
            Err(_) => C_ZERO,
        }
    }

    /// Compute `y = A x`.
    ///
    /// # Panics
    ///
    /// If `x` does not have length [CsrMatrix::dim].
    pub fn matvec(&self, x: &[Complex64]) -> Vec<Complex64> {
        assert_eq!(
            x.len(),
            self.dim,
            "vector length does not match the matrix dimension"
        );
        let row_fn = |row: usize| -> Complex64 {
            let mut sum = C_ZERO;
            for idx in self.indptr[row]..self.indptr[row + 1] {
                sum += self.data[idx] * x[self.indices[idx]];
            }
            sum
        };
        if self.dim < (1 << PARALLEL_THRESHOLD) || !getenv_use_multiple_threads() {
            (0..self.dim).map(row_fn).collect()
        } else {
            (0..self.dim).into_par_iter().map(row_fn).collect()
        }
    }

    /// Expand into a dense matrix.
    pub fn to_dense(&self) -> DMatrix<Complex64> {
        let mut out = DMatrix::zeros(self.dim, self.dim);
        for row in 0..self.dim {
            for (col, value) in self.row(row) {
                out[(row, col)] = value;
            }
        }
        out
    }

    /// Whether the matrix equals its conjugate transpose to within `tol` in every entry.
    pub fn is_hermitian(&self, tol: f64) -> bool {
        (0..self.dim).all(|row| {
            self.row(row)
                .all(|(col, value)| (value - self.get(col, row).conj()).norm() <= tol)
        })
    }
}

/// Sort a row's `(col, value)` entries by column, sum duplicates and drop exact zeros.
fn merge_row(row: &mut Vec<(usize, Complex64)>) {
    row.sort_by_key(|&(col, _)| col);
    let mut merged: Vec<(usize, Complex64)> = Vec::with_capacity(row.len());
    for &(col, value) in row.iter() {
        if let Some(last) = merged.last_mut() {
            if last.0 == col {
                last.1 += value;
                continue;
            }
        }
        merged.push((col, value));
    }
    merged.retain(|&(_, value)| value != C_ZERO);
    *row = merged;
}

/// A Pauli sum repacked for matrix construction, with the `(-i) ** num_ys` phase of every term
/// already multiplied into its coefficient.
///
/// Row `r` of a term's matrix has one entry, in column `r ^ x_like`, equal to the coefficient
/// times `(-1) ** (r & z_like).count_ones()`.
pub(crate) struct MatrixCompressedPaulis {
    num_qubits: u32,
    x_like: Vec<u64>,
    z_like: Vec<u64>,
    coeffs: Vec<Complex64>,
}

impl MatrixCompressedPaulis {
    pub(crate) fn new(
        num_qubits: u32,
        x_like: Vec<u64>,
        z_like: Vec<u64>,
        coeffs: Vec<Complex64>,
    ) -> Self {
        Self {
            num_qubits,
            x_like,
            z_like,
            coeffs,
        }
    }

    /// Merge terms with identical masks and drop those that cancel to exactly zero.
    pub(crate) fn combine(&mut self) {
        let mut hash_table =
            IndexMap::<(u64, u64), Complex64, RandomState>::with_capacity_and_hasher(
                self.coeffs.len(),
                RandomState::new(),
            );
        for (key, coeff) in self
            .x_like
            .drain(..)
            .zip(self.z_like.drain(..))
            .zip(self.coeffs.drain(..))
        {
            *hash_table.entry(key).or_insert(C_ZERO) += coeff;
        }
        for ((x, z), coeff) in hash_table {
            if coeff == C_ZERO {
                continue;
            }
            self.x_like.push(x);
            self.z_like.push(z);
            self.coeffs.push(coeff);
        }
    }

    /// Build the CSR matrix.  Every row has at most one entry per stored Pauli term, at column
    /// `row ^ x_like`.
    pub(crate) fn to_csr(&self) -> CsrMatrix {
        let dim = 1usize << self.num_qubits;
        let row_fn = |row: usize| -> Vec<(usize, Complex64)> {
            let row_bits = row as u64;
            let mut entries = self
                .x_like
                .iter()
                .zip(self.z_like.iter())
                .zip(self.coeffs.iter())
                .map(|((&x, &z), &coeff)| {
                    let value = if (row_bits & z).count_ones() % 2 == 1 {
                        -coeff
                    } else {
                        coeff
                    };
                    ((row_bits ^ x) as usize, value)
                })
                .collect::<Vec<_>>();
            merge_row(&mut entries);
            entries
        };
        let rows = if self.num_qubits < PARALLEL_THRESHOLD || !getenv_use_multiple_threads() {
            (0..dim).map(row_fn).collect::<Vec<_>>()
        } else {
            (0..dim).into_par_iter().map(row_fn).collect::<Vec<_>>()
        };
        // Rows are already merged, so `from_rows` only concatenates them.
        CsrMatrix::from_rows(dim, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pauli_op::PauliwordOp;
    use crate::util::{c64, C_ONE, IM};

    #[test]
    fn single_qubit_paulis_have_their_textbook_matrices() {
        let x = PauliwordOp::from_label("X", C_ONE).unwrap().to_sparse_matrix().unwrap();
        assert_eq!(x.get(0, 1), C_ONE);
        assert_eq!(x.get(1, 0), C_ONE);
        assert_eq!(x.nnz(), 2);

        let y = PauliwordOp::from_label("Y", C_ONE).unwrap().to_sparse_matrix().unwrap();
        assert_eq!(y.get(0, 1), -IM);
        assert_eq!(y.get(1, 0), IM);

        let z = PauliwordOp::from_label("Z", C_ONE).unwrap().to_sparse_matrix().unwrap();
        assert_eq!(z.get(0, 0), C_ONE);
        assert_eq!(z.get(1, 1), -C_ONE);
        assert_eq!(z.get(0, 1), C_ZERO);
    }

    #[test]
    fn leftmost_qubit_acts_on_the_high_bit() {
        // Z on qubit 0 of two: diag(1, 1, -1, -1).
        let zi = PauliwordOp::from_label("ZI", C_ONE).unwrap().to_sparse_matrix().unwrap();
        let diag = (0..4).map(|i| zi.get(i, i).re).collect::<Vec<_>>();
        assert_eq!(diag, vec![1.0, 1.0, -1.0, -1.0]);
        // X on qubit 1 of two flips the low bit.
        let ix = PauliwordOp::from_label("IX", C_ONE).unwrap().to_sparse_matrix().unwrap();
        assert_eq!(ix.get(0, 1), C_ONE);
        assert_eq!(ix.get(2, 3), C_ONE);
        assert_eq!(ix.get(0, 2), C_ZERO);
    }

    #[test]
    fn cancelling_terms_are_not_stored() {
        let op = PauliwordOp::from_dictionary([("XX", C_ONE), ("YY", C_ONE)]).unwrap();
        let matrix = op.to_sparse_matrix().unwrap();
        // XX + YY only couples |01> and |10>.
        assert_eq!(matrix.nnz(), 2);
        assert_eq!(matrix.get(1, 2), c64(2, 0));
        assert_eq!(matrix.get(2, 1), c64(2, 0));
        assert!(matrix.is_hermitian(1e-12));
    }

    #[test]
    fn triplets_are_merged_and_sorted() {
        let matrix = CsrMatrix::from_triplets(
            3,
            [
                (0, 2, C_ONE),
                (0, 0, C_ONE),
                (0, 2, C_ONE),
                (2, 1, IM),
                (1, 1, C_ONE),
                (1, 1, -C_ONE),
            ],
        )
        .unwrap();
        assert_eq!(matrix.indptr(), &[0, 2, 2, 3]);
        assert_eq!(matrix.indices(), &[0, 2, 1]);
        assert_eq!(matrix.get(0, 2), c64(2, 0));
        assert!(!matrix.is_hermitian(1e-12));
        assert_eq!(
            CsrMatrix::from_triplets(2, [(0, 2, C_ONE)]),
            Err(MatrixError::IndexOutOfRange { index: 2, dim: 2 })
        );
    }

    #[test]
    fn raw_components_are_validated() {
        assert!(CsrMatrix::new(2, vec![0, 1, 2], vec![0, 1], vec![C_ONE, C_ONE]).is_ok());
        assert_eq!(
            CsrMatrix::new(2, vec![0, 2], vec![0, 1], vec![C_ONE, C_ONE]),
            Err(MatrixError::BadIndptrLength {
                dim: 2,
                expected: 3,
                actual: 2
            })
        );
        assert_eq!(
            CsrMatrix::new(2, vec![0, 2, 2], vec![1, 0], vec![C_ONE, C_ONE]),
            Err(MatrixError::UnsortedRow(0))
        );
        assert_eq!(
            CsrMatrix::new(2, vec![0, 1, 1], vec![0, 1], vec![C_ONE, C_ONE]),
            Err(MatrixError::BadIndptr)
        );
    }

    #[test]
    fn matvec_agrees_with_the_dense_product() {
        let op = PauliwordOp::from_dictionary([
            ("XYZ", c64(0.5, 0)),
            ("ZZI", c64(-1.0, 0)),
            ("IYY", c64(0.25, 0)),
            ("III", c64(2.0, 0)),
        ])
        .unwrap();
        let sparse = op.to_sparse_matrix().unwrap();
        let dense = sparse.to_dense();
        let x = (0..8)
            .map(|i| c64(((i as f64 + 1.0) * 0.618).fract() - 0.5, 0.1 * i as f64))
            .collect::<Vec<_>>();
        let y_sparse = sparse.matvec(&x);
        let y_dense = &dense * nalgebra::DVector::from_vec(x);
        for (a, b) in y_sparse.iter().zip(y_dense.iter()) {
            assert!((a - b).norm() < 1e-12);
        }
        assert!(sparse.is_hermitian(1e-12));
        assert_eq!(CsrMatrix::from_dense(&dense, 0.0).unwrap(), sparse);
    }
}
