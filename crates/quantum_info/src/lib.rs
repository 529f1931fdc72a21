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

//! Operator and state representations used by the contextual-subspace pipeline.
//!
//! - [`pauli_op`]: sums of Pauli strings in the symplectic representation.
//! - [`sparse_matrix`]: compressed-sparse-row complex matrices built from Pauli sums.
//! - [`quantum_state`]: dense statevectors with computational-basis bit labels.
//! - [`pauli_exp_val`]: statevector expectation-value kernels.
//! - [`util`]: complex-number helpers shared by the kernels.
//! - [`constructions`]: tensor products, random anticommuting sets and state-preparation unitaries.

use std::env;

pub mod constructions;
pub mod pauli_exp_val;
pub mod pauli_op;
pub mod quantum_state;
pub mod sparse_matrix;
pub mod util;

pub use pauli_op::{PauliError, PauliwordOp};
pub use quantum_state::{QuantumState, StateError};
pub use sparse_matrix::CsrMatrix;

/// The largest number of qubits we will ever build an explicit matrix or statevector for.  The
/// basis index has to fit in a `u64` with the symplectic masks, and anything close to this is far
/// beyond addressable memory anyway.
pub const MAX_MATRIX_QUBITS: u32 = 63;

/// Whether the numerical kernels are allowed to spread work over the Rayon thread pool.
///
/// Callers that are themselves running inside a parallel context (for example a batch of
/// molecules driven from an outer pool) set `CSVQE_IN_PARALLEL=TRUE` to keep the kernels serial,
/// unless `CSVQE_FORCE_THREADS=TRUE` overrides that.
#[inline]
pub fn getenv_use_multiple_threads() -> bool {
    let parallel_context = env::var("CSVQE_IN_PARALLEL")
        .unwrap_or_else(|_| "FALSE".to_string())
        .to_uppercase()
        == "TRUE";
    let force_threads = env::var("CSVQE_FORCE_THREADS")
        .unwrap_or_else(|_| "FALSE".to_string())
        .to_uppercase()
        == "TRUE";
    !parallel_context || force_threads
}
