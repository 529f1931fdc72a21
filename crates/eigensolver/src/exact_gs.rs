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
use log::debug;
use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

use csvqe_quantum_info::{CsrMatrix, PauliwordOp, QuantumState};

use crate::dense::eigh;
use crate::lanczos::{lanczos, lanczos_on_support};
use crate::{
    EigenError, Spectrum, CLEANUP_THRESHOLD, DEGENERACY_TOLERANCE, DENSE_DIMENSION_LIMIT,
    LANCZOS_TOLERANCE, MAX_LANCZOS_ITERATIONS,
};

/// Matrix entries at most this large do not count as coupling two particle-number sectors.
const SECTOR_COUPLING_TOLERANCE: f64 = 1e-12;

/// How a matrix of a given dimension is diagonalized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverStrategy {
    /// Full dense eigendecomposition; every eigenpair is computed exactly.
    Dense,
    /// Lanczos iteration for a window of the lowest eigenpairs.
    Lanczos,
}

impl SolverStrategy {
    pub fn for_dimension(dim: usize) -> Self {
        if dim <= DENSE_DIMENSION_LIMIT {
            SolverStrategy::Dense
        } else {
            SolverStrategy::Lanczos
        }
    }
}

/// Restrict [exact_gs_energy] to eigenvectors with a given particle count, as measured by a
/// number operator that is diagonal in the computational basis.
#[derive(Clone, Copy, Debug)]
pub struct ParticleNumber<'a> {
    pub n_particles: usize,
    pub number_operator: &'a PauliwordOp,
}

/// The lowest eigenpair of a Hermitian qubit matrix, optionally within a particle-number sector.
///
/// Only the lowest `n_eigs` eigenpairs (counting multiplicity) are searched for a particle-number
/// match.  A degenerate level straddling the end of that window is kept whole.  The pairs are
/// tried in ascending order and the first eigenvector whose (cleaned) number expectation rounds
/// to `n_particles` wins; halves round to the even neighbour.  The returned state is the
/// eigenvector as computed, not the cleaned copy.
///
/// When the matrix never couples basis states of different (rounded) particle number, each
/// sector is diagonalized on its own, so every eigenvector inspected lies in a single sector even
/// where levels of different sectors are degenerate.  Otherwise the whole matrix is diagonalized
/// at once.
///
/// `initial_guess` seeds the Lanczos iteration and is ignored by the dense path.
///
/// # Panics
///
/// If the number operator has any off-diagonal term.
pub fn exact_gs_energy(
    matrix: &CsrMatrix,
    initial_guess: Option<&[Complex64]>,
    particle_number: Option<ParticleNumber>,
    n_eigs: usize,
) -> Result<(f64, QuantumState), EigenError> {
    let dim = matrix.dim();
    if dim == 0 {
        return Err(EigenError::EmptyMatrix);
    }
    if !dim.is_power_of_two() {
        return Err(EigenError::NotPowerOfTwo(dim));
    }
    if let Some(filter) = &particle_number {
        assert!(
            filter.number_operator.is_diagonal(),
            "the number operator must be diagonal in the computational basis"
        );
        let num_qubits = dim.trailing_zeros();
        if filter.number_operator.num_qubits() != num_qubits {
            return Err(EigenError::QubitMismatch {
                operator: filter.number_operator.num_qubits(),
                matrix: num_qubits,
            });
        }
    }
    if let Some(guess) = initial_guess {
        check_guess(guess, dim)?;
    }

    let strategy = SolverStrategy::for_dimension(dim);
    debug!("diagonalizing a {dim}x{dim} matrix with strategy {strategy:?}");
    let Some(filter) = particle_number else {
        let spectrum = solve(matrix, strategy, None, 1, initial_guess)?;
        return into_pair(spectrum, 0);
    };

    let window = n_eigs.clamp(1, dim);
    let mut spectrum = match particle_sectors(matrix, filter.number_operator) {
        Some(sectors) => {
            debug!("matrix conserves particle number; solving sectors separately");
            let mut pairs = Vec::new();
            for sector in sectors.iter().copied().sorted_unstable().dedup() {
                let support = sectors.iter().map(|&s| s == sector).collect::<Vec<_>>();
                let part = solve(matrix, strategy, Some(&support), window, initial_guess)?;
                pairs.extend(part.energies.into_iter().zip(part.states));
            }
            let (energies, states) = pairs
                .into_iter()
                .sorted_by(|a, b| a.0.total_cmp(&b.0))
                .unzip();
            Spectrum { energies, states }
        }
        None => solve(matrix, strategy, None, window, initial_guess)?,
    };
    let end = window_end(&spectrum.energies, window);
    spectrum.truncate(end);
    if spectrum.is_empty() {
        return Err(EigenError::EmptyMatrix);
    }

    for index in 0..spectrum.len() {
        let count = measured_particles(&spectrum.states[index], filter.number_operator)?;
        if count == filter.n_particles as f64 {
            debug!(
                "eigenpair {index} (energy {}) has {} particles",
                spectrum.energies[index], filter.n_particles
            );
            return into_pair(spectrum, index);
        }
    }
    Err(EigenError::ParticleNumberNotFound {
        n_particles: filter.n_particles,
        n_eigs,
    })
}

/// The `k` lowest eigenpairs of `matrix`, or of its block on `support`.
fn solve(
    matrix: &CsrMatrix,
    strategy: SolverStrategy,
    support: Option<&[bool]>,
    k: usize,
    initial_guess: Option<&[Complex64]>,
) -> Result<Spectrum, EigenError> {
    let dim = matrix.dim();
    match (strategy, support) {
        (SolverStrategy::Dense, None) => Ok(eigh(&matrix.to_dense())),
        (SolverStrategy::Dense, Some(support)) => {
            let indices = (0..dim).filter(|&i| support[i]).collect::<Vec<_>>();
            let block = DMatrix::from_fn(indices.len(), indices.len(), |r, c| {
                matrix.get(indices[r], indices[c])
            });
            let mut spectrum = eigh(&block);
            spectrum.states = spectrum
                .states
                .iter()
                .map(|local| {
                    let mut state = DVector::zeros(dim);
                    for (&index, &amplitude) in indices.iter().zip(local.iter()) {
                        state[index] = amplitude;
                    }
                    state
                })
                .collect();
            Ok(spectrum)
        }
        (SolverStrategy::Lanczos, None) => lanczos(
            |v| matrix.matvec(v),
            dim,
            k,
            initial_guess,
            MAX_LANCZOS_ITERATIONS,
            LANCZOS_TOLERANCE,
        ),
        (SolverStrategy::Lanczos, Some(support)) => lanczos_on_support(
            |v| matrix.matvec(v),
            support,
            k,
            initial_guess,
            MAX_LANCZOS_ITERATIONS,
            LANCZOS_TOLERANCE,
        ),
    }
}

/// The rounded particle number of every basis state, or `None` if `matrix` couples two states
/// with different counts.
fn particle_sectors(matrix: &CsrMatrix, number_operator: &PauliwordOp) -> Option<Vec<i64>> {
    let sectors = (0..matrix.dim())
        .map(|index| {
            number_operator
                .iter()
                .map(|(_, z, coeff)| {
                    if (index as u64 & z).count_ones() % 2 == 0 {
                        coeff.re
                    } else {
                        -coeff.re
                    }
                })
                .sum::<f64>()
                .round_ties_even() as i64
        })
        .collect::<Vec<_>>();
    for row in 0..matrix.dim() {
        let coupled = matrix.row(row).any(|(col, value)| {
            sectors[row] != sectors[col] && value.norm() > SECTOR_COUPLING_TOLERANCE
        });
        if coupled {
            return None;
        }
    }
    Some(sectors)
}

/// Where a window of `window` pairs ends once a degenerate level at its edge is kept whole.
fn window_end(energies: &[f64], window: usize) -> usize {
    let mut end = window.min(energies.len());
    while end > 0 && end < energies.len() {
        let last = energies[end - 1];
        if (energies[end] - last).abs() > DEGENERACY_TOLERANCE * last.abs().max(1.0) {
            break;
        }
        end += 1;
    }
    end
}

/// The particle number of `state` after cleanup, rounded half to even.
fn measured_particles(
    state: &DVector<Complex64>,
    number_operator: &PauliwordOp,
) -> Result<f64, EigenError> {
    let cleaned = QuantumState::from_array_unnormalized(state.as_slice().to_vec())?
        .cleanup(CLEANUP_THRESHOLD)?;
    Ok(cleaned
        .expectation_diagonal(number_operator)?
        .round_ties_even())
}

fn check_guess(guess: &[Complex64], dim: usize) -> Result<(), EigenError> {
    let norm = guess.iter().map(|c| c.norm_sqr()).sum::<f64>().sqrt();
    if guess.len() != dim || !(norm.is_finite() && norm > 0.0) {
        return Err(EigenError::BadInitialGuess {
            len: guess.len(),
            norm,
            dim,
        });
    }
    Ok(())
}

fn into_pair(mut spectrum: Spectrum, index: usize) -> Result<(f64, QuantumState), EigenError> {
    if index >= spectrum.len() {
        return Err(EigenError::EmptyMatrix);
    }
    let energy = spectrum.energies[index];
    let state = spectrum.states.swap_remove(index);
    Ok((
        energy,
        QuantumState::from_array_unnormalized(state.as_slice().to_vec())?,
    ))
}
