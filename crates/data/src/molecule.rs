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
use std::path::Path;

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use csvqe_quantum_info::{PauliwordOp, QuantumState};

use crate::error::{DataError, Result};
use crate::{to_operator, TermDictionary};

/// One entry of `calculated_properties`.  Only the energy is interpreted; anything else the
/// generator stored is carried through untouched.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct CalculatedProperty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<f64>,
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct MoleculeData {
    /// Hartree-Fock occupation, one bit per qubit.
    pub hf_array: Vec<u8>,
    #[serde(default)]
    pub calculated_properties: IndexMap<String, CalculatedProperty>,
    #[serde(default)]
    pub auxiliary_operators: IndexMap<String, TermDictionary>,
}

/// A molecular qubit Hamiltonian and the data needed to reduce it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MoleculeRecord {
    pub hamiltonian: TermDictionary,
    pub data: MoleculeData,
}

impl MoleculeRecord {
    /// The file stem used for a molecule, for example `H2O_STO-3G_SINGLET_JW`.
    pub fn file_stem(molecule: &str) -> String {
        format!("{molecule}_STO-3G_SINGLET_JW")
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("loading molecule record from {}", path.display());
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn hamiltonian(&self) -> Result<PauliwordOp> {
        to_operator(&self.hamiltonian)
    }

    pub fn hf_state(&self) -> Result<QuantumState> {
        Ok(QuantumState::from_bits(&self.data.hf_array)?)
    }

    /// The energy stored under `calculated_properties[name]`.
    pub fn energy(&self, name: &str) -> Result<f64> {
        self.data
            .calculated_properties
            .get(name)
            .and_then(|property| property.energy)
            .ok_or_else(|| DataError::MissingField(format!("calculated_properties.{name}.energy")))
    }

    pub fn fci_energy(&self) -> Result<f64> {
        self.energy("FCI")
    }

    pub fn hf_energy(&self) -> Result<f64> {
        self.energy("HF")
    }

    pub fn auxiliary_operator(&self, name: &str) -> Result<PauliwordOp> {
        let terms = self
            .data
            .auxiliary_operators
            .get(name)
            .ok_or_else(|| DataError::MissingField(format!("auxiliary_operators.{name}")))?;
        to_operator(terms)
    }
}
