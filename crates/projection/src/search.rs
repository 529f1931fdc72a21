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

//! The outer loop of contextual-subspace reduction: grow the subspace one qubit at a time until
//! its ground energy is within a tolerance of a reference energy.

use std::ops::ControlFlow;

use log::{info, warn};
use thiserror::Error;

use csvqe_eigensolver::{exact_gs_energy, EigenError, CHEMICAL_ACCURACY, DEFAULT_N_EIGS};
use csvqe_quantum_info::{PauliError, PauliwordOp, QuantumState};

use crate::service::{ServiceError, StabilizerStrategy, SubspaceService};

/// The largest subspace size the search tries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchBound {
    /// At most this many qubits.
    TaperedQubits(usize),
    /// Every size up to the qubit count left after tapering.
    RemainingQubits { total: u32, tapered: usize },
}

impl SearchBound {
    pub fn max_n(&self) -> u32 {
        match *self {
            SearchBound::TaperedQubits(n) => u32::try_from(n).unwrap_or(u32::MAX),
            SearchBound::RemainingQubits { total, tapered } => {
                total.saturating_sub(u32::try_from(tapered).unwrap_or(u32::MAX))
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchConfig {
    pub strategy: StabilizerStrategy,
    /// Eigenpair window handed to the eigensolver.
    pub n_eigs: usize,
    /// Accept a subspace once its energy is at most `reference + tolerance`.
    pub tolerance: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            strategy: StabilizerStrategy::AuxPreserving,
            n_eigs: DEFAULT_N_EIGS,
            tolerance: CHEMICAL_ACCURACY,
        }
    }
}

/// Why a single subspace size could not be solved.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IterationError {
    #[error("subspace service: {0}")]
    Service(#[from] ServiceError),
    #[error("matrix construction: {0}")]
    Operator(#[from] PauliError),
    #[error("eigensolver: {0}")]
    Eigen(#[from] EigenError),
}

/// The ground state of one contextual subspace.
#[derive(Clone, Debug, PartialEq)]
pub struct SubspaceSolution {
    pub n_qubits: u32,
    pub energy: f64,
    pub state: QuantumState,
    /// The projected Hamiltonian the energy belongs to.
    pub hamiltonian: PauliwordOp,
}

#[derive(Clone, Debug, PartialEq)]
pub enum IterationOutcome {
    Solved(SubspaceSolution),
    Failed { n_qubits: u32, error: IterationError },
}

/// What happened at one subspace size, kept for auditing a finished search.
#[derive(Clone, Debug, PartialEq)]
pub enum IterationRecord {
    Solved { n_qubits: u32, energy: f64 },
    Failed { n_qubits: u32, reason: String },
}

impl IterationRecord {
    pub fn n_qubits(&self) -> u32 {
        match self {
            IterationRecord::Solved { n_qubits, .. } | IterationRecord::Failed { n_qubits, .. } => {
                *n_qubits
            }
        }
    }
}

/// The search between iterations.  Each step consumes the state and hands back the next one.
#[derive(Clone, Debug, Default)]
pub struct SearchState {
    /// The last subspace size attempted.
    pub n: u32,
    /// The most recent solved subspace.  It owns the current reduced Hamiltonian.
    pub best: Option<SubspaceSolution>,
    pub history: Vec<IterationRecord>,
}

impl SearchState {
    fn advance(
        mut self,
        outcome: IterationOutcome,
        threshold: f64,
    ) -> ControlFlow<SearchOutcome, SearchState> {
        match outcome {
            IterationOutcome::Failed { n_qubits, error } => {
                warn!("contextual subspace with n={n_qubits} failed, skipping: {error}");
                self.n = n_qubits;
                self.history.push(IterationRecord::Failed {
                    n_qubits,
                    reason: error.to_string(),
                });
                ControlFlow::Continue(self)
            }
            IterationOutcome::Solved(solution) => {
                self.n = solution.n_qubits;
                self.history.push(IterationRecord::Solved {
                    n_qubits: solution.n_qubits,
                    energy: solution.energy,
                });
                if solution.energy <= threshold {
                    ControlFlow::Break(SearchOutcome::Converged {
                        solution,
                        history: self.history,
                    })
                } else {
                    self.best = Some(solution);
                    ControlFlow::Continue(self)
                }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SearchOutcome {
    /// A subspace reached the target energy; no larger size was tried.
    Converged {
        solution: SubspaceSolution,
        history: Vec<IterationRecord>,
    },
    /// Every size up to the bound was tried without reaching the target.  `best` is the last
    /// subspace that was solved at all.
    Exhausted {
        best: Option<SubspaceSolution>,
        history: Vec<IterationRecord>,
    },
}

impl SearchOutcome {
    pub fn is_converged(&self) -> bool {
        matches!(self, SearchOutcome::Converged { .. })
    }

    /// The converged solution, or the last solved one if the search ran out of sizes.
    pub fn solution(&self) -> Option<&SubspaceSolution> {
        match self {
            SearchOutcome::Converged { solution, .. } => Some(solution),
            SearchOutcome::Exhausted { best, .. } => best.as_ref(),
        }
    }

    pub fn history(&self) -> &[IterationRecord] {
        match self {
            SearchOutcome::Converged { history, .. } | SearchOutcome::Exhausted { history, .. } => {
                history
            }
        }
    }
}

fn solve_subspace<S: SubspaceService + ?Sized>(
    service: &mut S,
    n_qubits: u32,
    auxiliary: Option<&PauliwordOp>,
    config: &SearchConfig,
) -> Result<SubspaceSolution, IterationError> {
    service.update_stabilizers(n_qubits, config.strategy, auxiliary)?;
    let hamiltonian = service.project_onto_subspace()?;
    let matrix = hamiltonian.to_sparse_matrix()?;
    let (energy, state) = exact_gs_energy(&matrix, None, None, config.n_eigs)?;
    Ok(SubspaceSolution {
        n_qubits,
        energy,
        state,
        hamiltonian,
    })
}

/// Run one grow/project/solve step.  Errors never escape; they become
/// [IterationOutcome::Failed].
pub fn run_iteration<S: SubspaceService + ?Sized>(
    service: &mut S,
    n_qubits: u32,
    auxiliary: Option<&PauliwordOp>,
    config: &SearchConfig,
) -> IterationOutcome {
    match solve_subspace(service, n_qubits, auxiliary, config) {
        Ok(solution) => IterationOutcome::Solved(solution),
        Err(error) => IterationOutcome::Failed { n_qubits, error },
    }
}

/// Find the smallest contextual subspace whose ground energy is within `config.tolerance` of
/// `reference_energy`.
///
/// Sizes `1..=bound.max_n()` are tried in order, and the search stops at the first that is
/// accurate enough.  A size that fails (the service rejects it, or its matrix cannot be solved) is
/// logged and skipped.
pub fn search_contextual_subspace<S: SubspaceService + ?Sized>(
    service: &mut S,
    auxiliary: Option<&PauliwordOp>,
    reference_energy: f64,
    bound: SearchBound,
    config: &SearchConfig,
) -> SearchOutcome {
    let threshold = reference_energy + config.tolerance;
    let max_n = bound.max_n();
    info!(
        "searching contextual subspaces of 1..={max_n} qubits (strategy {}, target {threshold:.6})",
        config.strategy
    );
    let mut state = SearchState::default();
    for n_qubits in 1..=max_n {
        let outcome = run_iteration(service, n_qubits, auxiliary, config);
        if let IterationOutcome::Solved(solution) = &outcome {
            info!(
                "n={n_qubits}: energy {:.8} (error {:.2e})",
                solution.energy,
                solution.energy - reference_energy
            );
        }
        state = match state.advance(outcome, threshold) {
            ControlFlow::Continue(next) => next,
            ControlFlow::Break(done) => {
                info!("converged with a {n_qubits}-qubit contextual subspace");
                return done;
            }
        };
    }
    warn!("no contextual subspace up to {max_n} qubits reached the target energy");
    SearchOutcome::Exhausted {
        best: state.best,
        history: state.history,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::TabulatedSubspace;
    use approx::assert_abs_diff_eq;
    use csvqe_quantum_info::util::c64;

    fn z_on_first(num_qubits: u32, coeff: f64) -> PauliwordOp {
        let label = format!("Z{}", "I".repeat(num_qubits as usize - 1));
        PauliwordOp::from_label(&label, c64(coeff, 0)).unwrap()
    }

    /// A service that reports each requested size and then answers from a table.
    struct Recording {
        inner: TabulatedSubspace,
        requested: Vec<u32>,
    }

    impl SubspaceService for Recording {
        fn update_stabilizers(
            &mut self,
            n_qubits: u32,
            strategy: StabilizerStrategy,
            auxiliary: Option<&PauliwordOp>,
        ) -> Result<(), ServiceError> {
            self.requested.push(n_qubits);
            self.inner.update_stabilizers(n_qubits, strategy, auxiliary)
        }

        fn project_onto_subspace(&self) -> Result<PauliwordOp, ServiceError> {
            self.inner.project_onto_subspace()
        }
    }

    #[test]
    fn bounds() {
        assert_eq!(SearchBound::TaperedQubits(3).max_n(), 3);
        assert_eq!(
            SearchBound::RemainingQubits {
                total: 12,
                tapered: 4
            }
            .max_n(),
            8
        );
        assert_eq!(
            SearchBound::RemainingQubits {
                total: 2,
                tapered: 4
            }
            .max_n(),
            0
        );
    }

    #[test]
    fn four_qubit_problem_converges_at_the_smallest_size() {
        let mut service: TabulatedSubspace =
            (1..=4).map(|n| (n, z_on_first(n, -1.0))).collect();
        let outcome = search_contextual_subspace(
            &mut service,
            None,
            -1.0,
            SearchBound::RemainingQubits {
                total: 4,
                tapered: 0,
            },
            &SearchConfig::default(),
        );
        assert!(outcome.is_converged());
        let solution = outcome.solution().unwrap();
        assert_eq!(solution.n_qubits, 1);
        assert!((solution.energy + 1.0).abs() <= CHEMICAL_ACCURACY);
        assert_eq!(outcome.history().len(), 1);
    }

    #[test]
    fn no_larger_size_is_tried_after_convergence() {
        let mut service = Recording {
            inner: [
                (1, z_on_first(1, -0.5)),
                (2, z_on_first(2, -0.999)),
                (3, z_on_first(3, -1.0)),
                (4, z_on_first(4, -1.0)),
            ]
            .into_iter()
            .collect(),
            requested: Vec::new(),
        };
        let outcome = search_contextual_subspace(
            &mut service,
            None,
            -1.0,
            SearchBound::TaperedQubits(4),
            &SearchConfig::default(),
        );
        assert_eq!(service.requested, vec![1, 2]);
        let solution = outcome.solution().unwrap();
        assert_eq!(solution.n_qubits, 2);
        assert_abs_diff_eq!(solution.energy, -0.999, epsilon = 1e-12);
    }

    #[test]
    fn failed_sizes_are_skipped() {
        let mut service: TabulatedSubspace = [(2, z_on_first(2, -1.0))].into_iter().collect();
        let outcome = search_contextual_subspace(
            &mut service,
            None,
            -1.0,
            SearchBound::TaperedQubits(3),
            &SearchConfig::default(),
        );
        assert!(outcome.is_converged());
        assert_eq!(outcome.solution().unwrap().n_qubits, 2);
        let history = outcome.history();
        assert_eq!(history.len(), 2);
        assert!(matches!(
            &history[0],
            IterationRecord::Failed { n_qubits: 1, reason } if reason.contains("1 qubits")
        ));
        assert_eq!(history[1].n_qubits(), 2);
    }

    #[test]
    fn exhaustion_keeps_the_last_solved_subspace() {
        let mut service: TabulatedSubspace = [
            (1, z_on_first(1, -0.2)),
            (2, z_on_first(2, -0.6)),
        ]
        .into_iter()
        .collect();
        let outcome = search_contextual_subspace(
            &mut service,
            Some(&z_on_first(3, 1.0)),
            -1.0,
            SearchBound::TaperedQubits(3),
            &SearchConfig::default(),
        );
        match &outcome {
            SearchOutcome::Exhausted { best, history } => {
                let best = best.as_ref().unwrap();
                assert_eq!(best.n_qubits, 2);
                assert_abs_diff_eq!(best.energy, -0.6, epsilon = 1e-12);
                assert_eq!(
                    history.iter().map(IterationRecord::n_qubits).collect::<Vec<_>>(),
                    vec![1, 2, 3]
                );
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[test]
    fn run_iteration_reports_failures_as_values() {
        let mut service: TabulatedSubspace = [(1, z_on_first(1, -1.0))].into_iter().collect();
        let config = SearchConfig {
            n_eigs: 0,
            ..SearchConfig::default()
        };
        // A zero window is widened to one eigenpair, so this still solves.
        let outcome = run_iteration(&mut service, 1, None, &config);
        assert!(matches!(outcome, IterationOutcome::Solved(_)));
        let outcome = run_iteration(&mut service, 5, None, &config);
        assert_eq!(
            outcome,
            IterationOutcome::Failed {
                n_qubits: 5,
                error: IterationError::Service(ServiceError::InvalidSize(5))
            }
        );
    }
}
