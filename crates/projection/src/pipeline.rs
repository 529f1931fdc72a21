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

//! Molecule in, contextual-subspace record out.

use std::path::{Path, PathBuf};

use log::info;
use thiserror::Error;

use csvqe_data::{DataError, MoleculeRecord, SubspaceRecord};
use csvqe_quantum_info::PauliwordOp;

use crate::search::{search_contextual_subspace, SearchBound, SearchConfig, SearchOutcome};
use crate::service::{ServiceError, SubspaceService, TaperingService};

/// Name of the auxiliary operator that guides the stabilizer choice.
pub const UCCSD_OPERATOR: &str = "UCCSD_operator";

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("none of the {attempts} contextual subspaces tried could be solved")]
    NoSolution { attempts: usize },
}

/// Taper a molecule's Hamiltonian, then search for the smallest contextual subspace that reaches
/// the FCI energy.
///
/// `make_subspace` builds the projection service from the tapered Hamiltonian.  The search runs
/// over every size up to the tapered qubit count.  The record holds the converged subspace, or
/// the last one solved if none converged.
pub fn run_contextual_subspace<T, S, F>(
    molecule: &MoleculeRecord,
    tapering: &mut T,
    make_subspace: F,
    config: &SearchConfig,
) -> Result<(SubspaceRecord, SearchOutcome), PipelineError>
where
    T: TaperingService + ?Sized,
    S: SubspaceService,
    F: FnOnce(&PauliwordOp) -> Result<S, ServiceError>,
{
    let hamiltonian = molecule.hamiltonian()?;
    let hf_state = molecule.hf_state()?;
    let fci_energy = molecule.fci_energy()?;
    if let Ok(hf_energy) = molecule.hf_energy() {
        info!("HF energy {hf_energy:.8}, FCI energy {fci_energy:.8}");
    }

    let n_qubits = hamiltonian.num_qubits();
    let n_taper = tapering.n_taper();
    info!(
        "Qubit tapering permits a reduction of {n_qubits} -> {} qubits",
        n_qubits as usize - n_taper.min(n_qubits as usize)
    );
    let tapered = tapering.taper(&hamiltonian, Some(&hf_state))?;
    let auxiliary = molecule.auxiliary_operator(UCCSD_OPERATOR)?;
    let tapered_auxiliary = tapering.taper(&auxiliary, None)?;

    let mut subspace = make_subspace(&tapered)?;
    let outcome = search_contextual_subspace(
        &mut subspace,
        Some(&tapered_auxiliary),
        fci_energy,
        SearchBound::RemainingQubits {
            total: n_qubits,
            tapered: n_taper,
        },
        config,
    );
    let solution = outcome.solution().ok_or(PipelineError::NoSolution {
        attempts: outcome.history().len(),
    })?;
    let record = SubspaceRecord::new(
        &hamiltonian,
        &tapered,
        &solution.hamiltonian,
        &solution.state,
        n_taper,
        fci_energy,
        solution.energy,
        outcome.is_converged(),
    );
    Ok((record, outcome))
}

/// Read `{molecule}_STO-3G_SINGLET_JW.json` from `input_dir`, run the reduction, and write the
/// record under the same name into `output_dir`.  Returns the path written.
pub fn run_and_persist<T, S, F>(
    input_dir: &Path,
    output_dir: &Path,
    molecule: &str,
    tapering: &mut T,
    make_subspace: F,
    config: &SearchConfig,
) -> Result<(PathBuf, SearchOutcome), PipelineError>
where
    T: TaperingService + ?Sized,
    S: SubspaceService,
    F: FnOnce(&PauliwordOp) -> Result<S, ServiceError>,
{
    let file_name = format!("{}.json", MoleculeRecord::file_stem(molecule));
    let record = MoleculeRecord::from_path(input_dir.join(&file_name))?;
    let (result, outcome) = run_contextual_subspace(&record, tapering, make_subspace, config)?;
    let output = output_dir.join(&file_name);
    result.write(&output)?;
    Ok((output, outcome))
}
