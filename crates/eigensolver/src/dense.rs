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

use itertools::Itertools;
use nalgebra::DMatrix;
use num_complex::Complex64;

use crate::Spectrum;

/// Full eigendecomposition of a Hermitian matrix.  Only the lower triangle is read.
///
/// Eigenpairs come back sorted by ascending eigenvalue; the sort is stable, so degenerate levels
/// keep the order the decomposition produced them in.
pub fn eigh(matrix: &DMatrix<Complex64>) -> Spectrum {
    let eig = matrix.clone().symmetric_eigen();
    let (energies, states) = eig
        .eigenvalues
        .iter()
        .copied()
        .enumerate()
        .sorted_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(index, energy)| (energy, eig.eigenvectors.column(index).clone_owned()))
        .unzip();
    Spectrum { energies, states }
}
