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

use hashbrown::HashMap;
use log::trace;
use thiserror::Error;

use csvqe_quantum_info::{PauliError, PauliwordOp, QuantumState};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("no contextual subspace of {0} qubits is available")]
    InvalidSize(u32),
    #[error("no stabilizers have been chosen yet")]
    NoStabilizers,
    #[error(transparent)]
    Operator(#[from] PauliError),
    #[error("{0}")]
    Failed(String),
}

/// How the stabilizers that fix the noncontextual qubits are chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum StabilizerStrategy {
    /// Keep the stabilizers that best preserve the auxiliary operator.
    #[default]
    AuxPreserving,
    /// Seed the stabilizer choice from the auxiliary operator's support.
    AuxStarting,
    /// Pick stabilizers greedily by their effect on the energy.
    Greedy,
    Random,
}

impl StabilizerStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            StabilizerStrategy::AuxPreserving => "aux_preserving",
            StabilizerStrategy::AuxStarting => "aux_starting",
            StabilizerStrategy::Greedy => "greedy",
            StabilizerStrategy::Random => "random",
        }
    }

    /// Whether the strategy consults the auxiliary operator.
    pub fn uses_auxiliary(&self) -> bool {
        matches!(
            self,
            StabilizerStrategy::AuxPreserving | StabilizerStrategy::AuxStarting
        )
    }
}

impl fmt::Display for StabilizerStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contextual-subspace projection of one (already tapered) Hamiltonian.
///
/// Implementors hold the Hamiltonian and its noncontextual decomposition; the search loop only
/// asks for a subspace size and then for the projected operator.
pub trait SubspaceService {
    /// Choose stabilizers that leave `n_qubits` qubits in the contextual subspace.
    fn update_stabilizers(
        &mut self,
        n_qubits: u32,
        strategy: StabilizerStrategy,
        auxiliary: Option<&PauliwordOp>,
    ) -> Result<(), ServiceError>;

    /// The Hamiltonian projected onto the subspace fixed by the last
    /// [SubspaceService::update_stabilizers] call.
    fn project_onto_subspace(&self) -> Result<PauliwordOp, ServiceError>;
}

/// Symmetry-based qubit tapering of a Hamiltonian.
pub trait TaperingService {
    /// Number of qubits tapering removes.
    fn n_taper(&self) -> usize;

    /// Taper `operator`.  The Hamiltonian is tapered with its reference state, which fixes the
    /// symmetry sector; auxiliary operators are tapered in the same sector without one.
    fn taper(
        &mut self,
        operator: &PauliwordOp,
        reference_state: Option<&QuantumState>,
    ) -> Result<PauliwordOp, ServiceError>;
}

/// A [SubspaceService] that replays precomputed projections, one per subspace size.
///
/// No projection algebra happens here: the strategy and auxiliary operator are accepted and
/// ignored, and sizes without a stored projection are reported as [ServiceError::InvalidSize].
#[derive(Clone, Debug, Default)]
pub struct TabulatedSubspace {
    projections: HashMap<u32, PauliwordOp>,
    current: Option<u32>,
}

impl TabulatedSubspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the projection for `n_qubits`, returning any previous one.
    pub fn insert(&mut self, n_qubits: u32, projection: PauliwordOp) -> Option<PauliwordOp> {
        self.projections.insert(n_qubits, projection)
    }

    /// The subspace sizes with a stored projection, ascending.
    pub fn sizes(&self) -> Vec<u32> {
        let mut sizes = self.projections.keys().copied().collect::<Vec<_>>();
        sizes.sort_unstable();
        sizes
    }

    /// The size chosen by the last successful [SubspaceService::update_stabilizers].
    pub fn current(&self) -> Option<u32> {
        self.current
    }
}

impl FromIterator<(u32, PauliwordOp)> for TabulatedSubspace {
    fn from_iter<T: IntoIterator<Item = (u32, PauliwordOp)>>(iter: T) -> Self {
        Self {
            projections: iter.into_iter().collect(),
            current: None,
        }
    }
}

impl SubspaceService for TabulatedSubspace {
    fn update_stabilizers(
        &mut self,
        n_qubits: u32,
        strategy: StabilizerStrategy,
        _auxiliary: Option<&PauliwordOp>,
    ) -> Result<(), ServiceError> {
        trace!("selecting tabulated subspace n={n_qubits} (strategy {strategy})");
        if !self.projections.contains_key(&n_qubits) {
            self.current = None;
            return Err(ServiceError::InvalidSize(n_qubits));
        }
        self.current = Some(n_qubits);
        Ok(())
    }

    fn project_onto_subspace(&self) -> Result<PauliwordOp, ServiceError> {
        let n_qubits = self.current.ok_or(ServiceError::NoStabilizers)?;
        self.projections
            .get(&n_qubits)
            .cloned()
            .ok_or(ServiceError::InvalidSize(n_qubits))
    }
}
