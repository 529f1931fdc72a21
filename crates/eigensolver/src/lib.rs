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

//! Exact ground states of qubit Hamiltonians.
//!
//! Small matrices are diagonalized densely ([dense::eigh]); larger ones go through a
//! reorthogonalized complex Lanczos iteration ([lanczos::lanczos]).  [exact_gs_energy] picks
//! between the two and optionally restricts the answer to a particle-number sector.

use nalgebra::DVector;
use num_complex::Complex64;
use thiserror::Error;

use csvqe_quantum_info::StateError;

pub mod dense;
mod exact_gs;
pub mod lanczos;

pub use exact_gs::{exact_gs_energy, ParticleNumber, SolverStrategy};

/// Matrices up to this dimension are diagonalized densely.
pub const DENSE_DIMENSION_LIMIT: usize = 32;

/// Amplitudes with magnitude below this are dropped before measuring an eigenvector's particle
/// number.
pub const CLEANUP_THRESHOLD: f64 = 1e-5;

/// Default size of the low-energy window searched for a particle-number match.
pub const DEFAULT_N_EIGS: usize = 6;

/// Eigenvalues this close (relative to their magnitude, above one) count as one degenerate level
/// when deciding where the low-energy window ends.
pub const DEGENERACY_TOLERANCE: f64 = 1e-8;

/// Iteration cap for the Lanczos solver.  This is effectively unbounded; the Krylov space size is
/// limited by the matrix dimension long before.
pub const MAX_LANCZOS_ITERATIONS: usize = 10_000_000;

/// Lanczos stops once none of the wanted Ritz values move by more than this between checks.
pub const LANCZOS_TOLERANCE: f64 = 1e-10;

/// Chemical accuracy, in Hartree.
pub const CHEMICAL_ACCURACY: f64 = 0.0016;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EigenError {
    #[error(
        "no eigenvector with {n_particles} particles among the lowest {n_eigs} eigenpairs; \
         try increasing `n_eigs`"
    )]
    ParticleNumberNotFound { n_particles: usize, n_eigs: usize },
    #[error("cannot diagonalize an empty matrix")]
    EmptyMatrix,
    #[error("matrix dimension {0} is not a power of two")]
    NotPowerOfTwo(usize),
    #[error("initial guess has length {len} and norm {norm}, but a nonzero vector of length {dim} is required")]
    BadInitialGuess { len: usize, norm: f64, dim: usize },
    #[error("the number operator acts on {operator} qubits, but the matrix on {matrix}")]
    QubitMismatch { operator: u32, matrix: u32 },
    #[error(transparent)]
    State(#[from] StateError),
}

/// Eigenpairs sorted by ascending eigenvalue.
#[derive(Clone, Debug)]
pub struct Spectrum {
    pub energies: Vec<f64>,
    /// Normalized eigenvectors, in the order of `energies`.
    pub states: Vec<DVector<Complex64>>,
}

impl Spectrum {
    pub fn len(&self) -> usize {
        self.energies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energies.is_empty()
    }

    /// The lowest eigenvalue, if any pair is known.
    pub fn ground_energy(&self) -> Option<f64> {
        self.energies.first().copied()
    }

    pub fn ground_state(&self) -> Option<&DVector<Complex64>> {
        self.states.first()
    }

    /// `E_1 - E_0`, or zero if only one level is known.
    pub fn gap(&self) -> f64 {
        if self.energies.len() < 2 {
            return 0.0;
        }
        self.energies[1] - self.energies[0]
    }

    /// Keep only the `n` lowest pairs.
    pub fn truncate(&mut self, n: usize) {
        self.energies.truncate(n);
        self.states.truncate(n);
    }
}
