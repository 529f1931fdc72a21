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

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use csvqe_quantum_info::{PauliwordOp, QuantumState};

use crate::error::Result;
use crate::{from_operator, to_operator, TermDictionary};

/// The result of one contextual-subspace reduction of a molecule.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SubspaceRecord {
    /// The full Hamiltonian.
    #[serde(rename = "H")]
    pub hamiltonian: TermDictionary,
    /// The Hamiltonian after qubit tapering.
    #[serde(rename = "H_taper")]
    pub tapered_hamiltonian: TermDictionary,
    /// The contextual-subspace Hamiltonian the search settled on.
    #[serde(rename = "H_cs")]
    pub subspace_hamiltonian: TermDictionary,
    /// Ground state of `H_cs`, as `[re, im]` amplitude pairs.
    pub cs_state: Vec<[f64; 2]>,
    pub n_qubits: u32,
    pub n_taper: usize,
    pub n_cs: u32,
    pub fci_energy: f64,
    pub cs_energy: f64,
    pub converged: bool,
}

impl SubspaceRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        hamiltonian: &PauliwordOp,
        tapered_hamiltonian: &PauliwordOp,
        subspace_hamiltonian: &PauliwordOp,
        cs_state: &QuantumState,
        n_taper: usize,
        fci_energy: f64,
        cs_energy: f64,
        converged: bool,
    ) -> Self {
        Self {
            hamiltonian: from_operator(hamiltonian),
            tapered_hamiltonian: from_operator(tapered_hamiltonian),
            subspace_hamiltonian: from_operator(subspace_hamiltonian),
            cs_state: cs_state
                .amplitudes()
                .iter()
                .map(|c| [c.re, c.im])
                .collect(),
            n_qubits: hamiltonian.num_qubits(),
            n_taper,
            n_cs: subspace_hamiltonian.num_qubits(),
            fci_energy,
            cs_energy,
            converged,
        }
    }

    /// Write the record as JSON, replacing any existing file.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(fs::File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        info!("wrote contextual-subspace record to {}", path.display());
        Ok(())
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn subspace_hamiltonian(&self) -> Result<PauliwordOp> {
        to_operator(&self.subspace_hamiltonian)
    }

    /// The stored ground state, renormalized.
    pub fn cs_state(&self) -> Result<QuantumState> {
        Ok(QuantumState::from_array(
            self.cs_state
                .iter()
                .map(|&[re, im]| Complex64::new(re, im))
                .collect(),
        )?)
    }
}
