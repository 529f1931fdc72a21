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

use thiserror::Error;

use csvqe_quantum_info::{PauliError, StateError};

#[derive(Debug, Error)]
pub enum DataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid operator: {0}")]
    Operator(#[from] PauliError),

    #[error("invalid state: {0}")]
    State(#[from] StateError),
}

pub type Result<T> = std::result::Result<T, DataError>;
