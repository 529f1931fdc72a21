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

pub mod pipeline;
pub mod search;
pub mod service;

pub use pipeline::{run_and_persist, run_contextual_subspace, PipelineError, UCCSD_OPERATOR};
pub use search::{
    run_iteration, search_contextual_subspace, IterationError, IterationOutcome, IterationRecord,
    SearchBound, SearchConfig, SearchOutcome, SearchState, SubspaceSolution,
};
pub use service::{
    ServiceError, StabilizerStrategy, SubspaceService, TabulatedSubspace, TaperingService,
};
