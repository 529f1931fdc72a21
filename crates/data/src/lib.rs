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

//! JSON records read and written by the contextual-subspace pipeline.
//!
//! [MoleculeRecord] is the input: a qubit Hamiltonian with its Hartree-Fock state, reference
//! energies and auxiliary operators.  [SubspaceRecord] is the output of one reduction run.

use indexmap::IndexMap;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use csvqe_quantum_info::PauliwordOp;

pub mod error;
pub mod molecule;
pub mod record;

pub use error::{DataError, Result};
pub use molecule::{CalculatedProperty, MoleculeData, MoleculeRecord};
pub use record::SubspaceRecord;

/// A Pauli coefficient as stored on disk: either a plain real number or an `[re, im]` pair.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(untagged)]
pub enum Coefficient {
    Real(f64),
    Complex([f64; 2]),
}

impl From<Coefficient> for Complex64 {
    fn from(value: Coefficient) -> Self {
        match value {
            Coefficient::Real(re) => Complex64::new(re, 0.0),
            Coefficient::Complex([re, im]) => Complex64::new(re, im),
        }
    }
}

impl From<Complex64> for Coefficient {
    fn from(value: Complex64) -> Self {
        if value.im == 0.0 {
            Coefficient::Real(value.re)
        } else {
            Coefficient::Complex([value.re, value.im])
        }
    }
}

/// Pauli labels mapped to coefficients, in file order.
pub type TermDictionary = IndexMap<String, Coefficient>;

/// Build an operator from a stored dictionary.
pub fn to_operator(terms: &TermDictionary) -> Result<PauliwordOp> {
    Ok(PauliwordOp::from_dictionary(
        terms
            .iter()
            .map(|(label, &coeff)| (label.as_str(), Complex64::from(coeff))),
    )?)
}

/// The stored form of an operator.
pub fn from_operator(operator: &PauliwordOp) -> TermDictionary {
    operator
        .to_dictionary()
        .into_iter()
        .map(|(label, coeff)| (label, Coefficient::from(coeff)))
        .collect()
}
