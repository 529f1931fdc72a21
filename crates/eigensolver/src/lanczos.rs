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

//! Lanczos iteration with full reorthogonalization for the low end of a Hermitian spectrum.
//!
//! The matrix is only touched through a matrix-vector product, so it never has to be densified.
//! The Krylov vectors are complex, but the projected tridiagonal matrix of a Hermitian operator
//! is real symmetric, and is diagonalized as such.
//!
//! A single Krylov space holds only one direction of each degenerate eigenspace.  Converged Ritz
//! pairs are therefore locked, and the iteration restarts from a fresh vector orthogonal to
//! everything locked so far, until the wanted number of pairs is found counting multiplicity.

use itertools::Itertools;
use log::{debug, warn};
use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

use csvqe_quantum_info::util::{c64, C_ONE, C_ZERO};

use crate::{EigenError, Spectrum};

/// Residual norm below which the Krylov space is taken to be invariant.
const BREAKDOWN_TOLERANCE: f64 = 1e-12;

/// Ritz values are compared for convergence every this many iterations.
const CHECK_INTERVAL: usize = 10;

/// A Ritz pair is locked once `|A v - theta v|` is at most this, relative to `max(|theta|, 1)`.
/// A pass also keeps going until its estimated residuals are this small.
const RESIDUAL_TOLERANCE: f64 = 1e-6;

/// A restart vector keeping less than this fraction of its norm after projecting out the locked
/// vectors means the reachable space is used up.
const EXHAUSTION_TOLERANCE: f64 = 1e-8;

/// Restarts in a row that lock nothing before the lowest Ritz pair is locked as it stands.
const MAX_STALLED_RESTARTS: usize = 3;

/// Find the `n_eigenvalues` algebraically smallest eigenpairs of the Hermitian operator behind
/// `matvec`, counting multiplicity.
///
/// The first Krylov space is built from `v0` if given (it is normalized first), or else from a
/// fixed quasi-random vector; restarts draw from a seeded generator, so repeated calls give
/// identical results.  Each Krylov pass stops once the wanted Ritz values have settled to within
/// `tol` (relative to their magnitude, for magnitudes above one) with small residuals, once the
/// space becomes invariant, or after `min(max_iter, dim)` steps.
///
/// Fewer than `n_eigenvalues` pairs are returned only if the whole space is exhausted first.
pub fn lanczos<F>(
    matvec: F,
    dim: usize,
    n_eigenvalues: usize,
    v0: Option<&[Complex64]>,
    max_iter: usize,
    tol: f64,
) -> Result<Spectrum, EigenError>
where
    F: Fn(&[Complex64]) -> Vec<Complex64>,
{
    locked_lanczos(matvec, dim, None, n_eigenvalues, v0, max_iter, tol)
}

/// As [lanczos], but confined to the basis states flagged in `support`.
///
/// Vectors are zeroed outside the support after every product, so this computes eigenpairs of
/// the corresponding diagonal block.  That block's eigenpairs are eigenpairs of the whole
/// operator when the operator never couples the support to the rest of the space.  If `v0`
/// has no weight on the support the fixed quasi-random start is used instead.
pub fn lanczos_on_support<F>(
    matvec: F,
    support: &[bool],
    n_eigenvalues: usize,
    v0: Option<&[Complex64]>,
    max_iter: usize,
    tol: f64,
) -> Result<Spectrum, EigenError>
where
    F: Fn(&[Complex64]) -> Vec<Complex64>,
{
    locked_lanczos(
        matvec,
        support.len(),
        Some(support),
        n_eigenvalues,
        v0,
        max_iter,
        tol,
    )
}

fn locked_lanczos<F>(
    matvec: F,
    dim: usize,
    support: Option<&[bool]>,
    n_eigenvalues: usize,
    v0: Option<&[Complex64]>,
    max_iter: usize,
    tol: f64,
) -> Result<Spectrum, EigenError>
where
    F: Fn(&[Complex64]) -> Vec<Complex64>,
{
    if dim == 0 {
        return Err(EigenError::EmptyMatrix);
    }
    let first = match v0 {
        Some(v0) => {
            let start = DVector::from_column_slice(v0);
            let norm = start.norm();
            if start.len() != dim || !(norm.is_finite() && norm > 0.0) {
                return Err(EigenError::BadInitialGuess {
                    len: start.len(),
                    norm,
                    dim,
                });
            }
            let mut start = start.unscale(norm);
            restrict(&mut start, support);
            if start.norm() > EXHAUSTION_TOLERANCE {
                start
            } else {
                debug!("initial guess has no weight on the support; using the default start");
                default_start(dim)
            }
        }
        None => default_start(dim),
    };
    let support_dim = support.map_or(dim, |s| s.iter().filter(|&&kept| kept).count());
    let k = n_eigenvalues.min(support_dim);
    if k == 0 {
        return Ok(Spectrum {
            energies: Vec::new(),
            states: Vec::new(),
        });
    }
    let apply = |v: &DVector<Complex64>| {
        let mut w = DVector::from_vec(matvec(v.as_slice()));
        restrict(&mut w, support);
        w
    };

    let mut locked: Vec<(f64, DVector<Complex64>)> = Vec::with_capacity(k);
    let mut carry: Option<DVector<Complex64>> = None;
    let mut stalled = 0;
    let mut restart: u64 = 0;
    let mut fresh = Some(first);
    while locked.len() < support_dim {
        let mut start = match fresh.take() {
            Some(start) => start,
            None => random_start(dim, restart),
        };
        restrict(&mut start, support);
        let norm = start.norm();
        if norm > 0.0 {
            start.unscale_mut(norm);
        }
        if let Some(previous) = carry.take() {
            start += previous;
        }
        let before = start.norm();
        let locked_states = locked.iter().map(|(_, v)| v).collect::<Vec<_>>();
        orthogonalize(&mut start, &locked_states);
        orthogonalize(&mut start, &locked_states);
        let after = start.norm();
        if after <= EXHAUSTION_TOLERANCE * before {
            debug!(
                "Lanczos restart {restart} found no direction outside the {} locked vectors",
                locked.len()
            );
            break;
        }
        start.unscale_mut(after);

        let remaining = support_dim - locked.len();
        let m = max_iter.min(remaining).max(1);
        let pass = krylov_pass(&apply, start, &locked_states, m, k, tol);
        if pass.capped && m < remaining {
            warn!("Lanczos reached its iteration cap ({m}) before converging (dim={dim})");
        }
        let pass = pass.ritz;
        let Some(&lowest) = pass.energies.first() else {
            break;
        };
        if locked.len() >= k {
            let threshold = kth_energy(&locked, k);
            if lowest >= threshold - tol * threshold.abs().max(1.0) {
                debug!("Lanczos verified {k} locked eigenpairs after {restart} restarts (dim={dim})");
                break;
            }
        }

        let mut newly_locked = 0;
        let mut unconverged = Vec::new();
        for (energy, state) in pass.energies.into_iter().zip(pass.states) {
            let residual = (apply(&state) - &state * c64(energy, 0)).norm();
            if residual <= RESIDUAL_TOLERANCE * energy.abs().max(1.0) {
                locked.push((energy, state));
                newly_locked += 1;
            } else {
                unconverged.push((energy, state, residual));
            }
        }
        if newly_locked == 0 {
            stalled += 1;
            if stalled > MAX_STALLED_RESTARTS && !unconverged.is_empty() {
                let (energy, state, residual) = unconverged.remove(0);
                warn!(
                    "Lanczos locked an eigenpair at {energy} with residual {residual:.3e} after \
                     {stalled} stalled restarts"
                );
                locked.push((energy, state));
                stalled = 0;
            }
        } else {
            stalled = 0;
        }
        carry = unconverged.into_iter().next().map(|(_, state, _)| state);
        restart += 1;
    }

    let (energies, states) = locked
        .into_iter()
        .sorted_by(|a, b| a.0.total_cmp(&b.0))
        .take(k)
        .unzip();
    Ok(Spectrum { energies, states })
}

struct KrylovPass {
    /// The `k` lowest Ritz pairs.
    ritz: Spectrum,
    /// The pass ran out of iterations before its Ritz values settled.
    capped: bool,
}

/// One Krylov pass, orthogonal to `locked`.
fn krylov_pass<A>(
    apply: &A,
    start: DVector<Complex64>,
    locked: &[&DVector<Complex64>],
    m: usize,
    k: usize,
    tol: f64,
) -> KrylovPass
where
    A: Fn(&DVector<Complex64>) -> DVector<Complex64>,
{
    let dim = start.len();
    let k = k.min(m);
    let mut basis: Vec<DVector<Complex64>> = Vec::with_capacity(m.min(1024));
    basis.push(start);
    let mut alpha: Vec<f64> = Vec::with_capacity(m.min(1024));
    let mut beta: Vec<f64> = Vec::with_capacity(m.min(1024));
    let mut previous: Option<Vec<f64>> = None;

    for j in 0..m {
        let mut w = apply(&basis[j]);

        let a = basis[j].dotc(&w).re;
        alpha.push(a);
        w.axpy(c64(-a, 0), &basis[j], C_ONE);
        if j > 0 {
            w.axpy(c64(-beta[j - 1], 0), &basis[j - 1], C_ONE);
        }
        orthogonalize(&mut w, locked);
        for q in &basis {
            let overlap = q.dotc(&w);
            w.axpy(-overlap, q, C_ONE);
        }
        let b = w.norm();
        let breakdown = b < BREAKDOWN_TOLERANCE;

        if (j + 1) % CHECK_INTERVAL == 0 || j + 1 == m || breakdown {
            let (ritz, residuals) = ritz_estimates(&alpha, &beta, b, k);
            let small_residuals = ritz
                .iter()
                .zip(&residuals)
                .all(|(theta, r)| *r <= RESIDUAL_TOLERANCE * theta.abs().max(1.0));
            if let Some(previous) = &previous {
                if small_residuals && has_converged(previous, &ritz, tol) {
                    debug!(
                        "Lanczos pass converged after {} iterations (dim={dim}, k={k})",
                        j + 1
                    );
                    return KrylovPass {
                        ritz: recover_eigenvectors(&alpha, &beta, &basis, k),
                        capped: false,
                    };
                }
            }
            previous = Some(ritz);
        }
        if breakdown {
            debug!(
                "Lanczos found an invariant subspace after {} iterations (dim={dim})",
                j + 1
            );
            return KrylovPass {
                ritz: recover_eigenvectors(&alpha, &beta, &basis, k),
                capped: false,
            };
        }
        if j + 1 == m {
            break;
        }
        beta.push(b);
        basis.push(w.unscale(b));
    }

    KrylovPass {
        ritz: recover_eigenvectors(&alpha, &beta, &basis, k),
        capped: true,
    }
}

/// Zero every amplitude outside `support`.
fn restrict(v: &mut DVector<Complex64>, support: Option<&[bool]>) {
    if let Some(support) = support {
        for (amplitude, &kept) in v.iter_mut().zip(support) {
            if !kept {
                *amplitude = C_ZERO;
            }
        }
    }
}

fn orthogonalize(w: &mut DVector<Complex64>, against: &[&DVector<Complex64>]) {
    for q in against {
        let overlap = q.dotc(w);
        w.axpy(-overlap, q, C_ONE);
    }
}

/// The `k`-th smallest locked eigenvalue.
fn kth_energy(locked: &[(f64, DVector<Complex64>)], k: usize) -> f64 {
    locked
        .iter()
        .map(|(energy, _)| *energy)
        .sorted_by(f64::total_cmp)
        .nth(k - 1)
        .unwrap_or(f64::INFINITY)
}

/// A deterministic, dense, complex starting vector.
fn default_start(dim: usize) -> DVector<Complex64> {
    DVector::from_fn(dim, |i, _| {
        let t = i as f64 + 1.0;
        c64(
            (t * 0.618033988749895).fract() - 0.5,
            (t * 0.414213562373095).fract() - 0.5,
        )
    })
}

fn random_start(dim: usize, seed: u64) -> DVector<Complex64> {
    let mut rng = Pcg64Mcg::seed_from_u64(seed);
    DVector::from_fn(dim, |_, _| c64(rng.gen::<f64>() - 0.5, rng.gen::<f64>() - 0.5))
}

fn has_converged(previous: &[f64], current: &[f64], tol: f64) -> bool {
    previous.len() == current.len()
        && previous
            .iter()
            .zip(current)
            .all(|(a, b)| (a - b).abs() <= tol * b.abs().max(1.0))
}

fn tridiagonal(alpha: &[f64], beta: &[f64]) -> DMatrix<f64> {
    let m = alpha.len();
    let mut t = DMatrix::zeros(m, m);
    for i in 0..m {
        t[(i, i)] = alpha[i];
        if i > 0 {
            t[(i, i - 1)] = beta[i - 1];
            t[(i - 1, i)] = beta[i - 1];
        }
    }
    t
}

/// The `k` smallest Ritz values, ascending, with their residual estimates `|b * s_last|`.
fn ritz_estimates(alpha: &[f64], beta: &[f64], b: f64, k: usize) -> (Vec<f64>, Vec<f64>) {
    let eig = tridiagonal(alpha, beta).symmetric_eigen();
    let last = alpha.len() - 1;
    eig.eigenvalues
        .iter()
        .enumerate()
        .sorted_by(|x, y| x.1.total_cmp(y.1))
        .take(k)
        .map(|(index, &theta)| (theta, b * eig.eigenvectors[(last, index)].abs()))
        .unzip()
}

/// Lift the `k` lowest Ritz vectors back into the full space.
fn recover_eigenvectors(
    alpha: &[f64],
    beta: &[f64],
    basis: &[DVector<Complex64>],
    k: usize,
) -> Spectrum {
    let eig = tridiagonal(alpha, beta).symmetric_eigen();
    let order = eig
        .eigenvalues
        .iter()
        .enumerate()
        .sorted_by(|a, b| a.1.total_cmp(b.1))
        .map(|(index, _)| index)
        .take(k)
        .collect::<Vec<_>>();

    let dim = basis[0].len();
    let mut energies = Vec::with_capacity(order.len());
    let mut states = Vec::with_capacity(order.len());
    for index in order {
        energies.push(eig.eigenvalues[index]);
        let mut v = DVector::<Complex64>::zeros(dim);
        for (j, q) in basis.iter().take(alpha.len()).enumerate() {
            v.axpy(c64(eig.eigenvectors[(j, index)], 0), q, C_ONE);
        }
        let norm = v.norm();
        if norm > 0.0 {
            v.unscale_mut(norm);
        }
        states.push(v);
    }
    Spectrum { energies, states }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dense::eigh;
    use approx::assert_relative_eq;
    use csvqe_quantum_info::{CsrMatrix, PauliwordOp};

    fn random_hermitian(dim: usize, seed: u64) -> DMatrix<Complex64> {
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        let raw = DMatrix::from_fn(dim, dim, |_, _| {
            c64(rng.gen::<f64>() - 0.5, rng.gen::<f64>() - 0.5)
        });
        (&raw + raw.adjoint()).unscale(2.0)
    }

    fn run(matrix: &CsrMatrix, k: usize, v0: Option<&[Complex64]>) -> Spectrum {
        lanczos(
            |v| matrix.matvec(v),
            matrix.dim(),
            k,
            v0,
            crate::MAX_LANCZOS_ITERATIONS,
            crate::LANCZOS_TOLERANCE,
        )
        .unwrap()
    }

    #[test]
    fn agrees_with_dense_on_small_random_matrices() {
        for (dim, seed) in [(2, 1), (8, 2), (16, 3), (32, 4)] {
            let dense = random_hermitian(dim, seed);
            let sparse = CsrMatrix::from_dense(&dense, 0.0).unwrap();
            let exact = eigh(&dense);
            let approx = run(&sparse, 1, None);
            assert_relative_eq!(
                approx.ground_energy().unwrap(),
                exact.ground_energy().unwrap(),
                max_relative = 1e-8
            );
        }
    }

    #[test]
    fn finds_the_low_end_of_a_qubit_hamiltonian() {
        let op = PauliwordOp::from_dictionary([
            ("ZZIIII", c64(1.0, 0)),
            ("IZZIII", c64(0.9, 0)),
            ("IIZZII", c64(1.1, 0)),
            ("IIIZZI", c64(0.8, 0)),
            ("IIIIZZ", c64(1.2, 0)),
            ("XIIIII", c64(0.7, 0)),
            ("IXIIII", c64(0.6, 0)),
            ("IIXIII", c64(0.5, 0)),
            ("IIIYII", c64(0.4, 0)),
            ("IIIIXI", c64(0.3, 0)),
            ("IIIIIX", c64(0.2, 0)),
        ])
        .unwrap();
        let sparse = op.to_sparse_matrix().unwrap();
        let exact = eigh(&sparse.to_dense());
        let approx = run(&sparse, 3, None);
        assert_eq!(approx.len(), 3);
        assert_relative_eq!(approx.energies[0], exact.energies[0], max_relative = 1e-8);
        for i in 1..3 {
            assert_relative_eq!(approx.energies[i], exact.energies[i], max_relative = 1e-6);
        }
        let ground = approx.ground_state().unwrap();
        let image = DVector::from_vec(sparse.matvec(ground.as_slice()));
        let residual = image - ground * c64(approx.ground_energy().unwrap(), 0);
        assert!(residual.norm() < 1e-6);
    }

    #[test]
    fn degenerate_levels_come_back_with_their_multiplicity() {
        let dim = 48;
        let levels = DVector::from_fn(dim, |i, _| match i {
            0..=2 => c64(-2.0, 0),
            _ => c64(i as f64 - 4.0, 0),
        });
        let rotation = random_hermitian(dim, 21).qr().q();
        let dense = &rotation * DMatrix::from_diagonal(&levels) * rotation.adjoint();
        let sparse = CsrMatrix::from_dense(&dense, 0.0).unwrap();

        let spectrum = run(&sparse, 4, None);
        assert_eq!(spectrum.len(), 4);
        for (actual, expected) in spectrum.energies.iter().zip([-2.0, -2.0, -2.0, -1.0]) {
            assert_relative_eq!(*actual, expected, max_relative = 1e-8);
        }
        for (i, state) in spectrum.states.iter().enumerate() {
            let image = DVector::from_vec(sparse.matvec(state.as_slice()));
            let residual = image - state * c64(spectrum.energies[i], 0);
            assert!(residual.norm() < 1e-6);
            for other in &spectrum.states[..i] {
                assert!(other.dotc(state).norm() < 1e-8);
            }
        }
    }

    #[test]
    fn support_restricts_to_a_diagonal_block() {
        // Hopping conserves the number of set bits, so the three-particle states form a block.
        let op = PauliwordOp::from_dictionary([
            ("XXIIII", c64(0.5, 0)),
            ("YYIIII", c64(0.5, 0)),
            ("IXXIII", c64(0.4, 0)),
            ("IYYIII", c64(0.4, 0)),
            ("IIXXII", c64(0.3, 0)),
            ("IIYYII", c64(0.3, 0)),
            ("IIIXXI", c64(0.6, 0)),
            ("IIIYYI", c64(0.6, 0)),
            ("IIIIXX", c64(0.2, 0)),
            ("IIIIYY", c64(0.2, 0)),
            ("ZIIIII", c64(0.1, 0)),
            ("IIZIII", c64(-0.3, 0)),
            ("IIIIIZ", c64(0.25, 0)),
        ])
        .unwrap();
        let sparse = op.to_sparse_matrix().unwrap();
        let support = (0..64usize).map(|i| i.count_ones() == 3).collect::<Vec<_>>();
        let spectrum = lanczos_on_support(
            |v| sparse.matvec(v),
            &support,
            3,
            None,
            crate::MAX_LANCZOS_ITERATIONS,
            crate::LANCZOS_TOLERANCE,
        )
        .unwrap();

        let indices = (0..64).filter(|&i| support[i]).collect::<Vec<_>>();
        let block = DMatrix::from_fn(indices.len(), indices.len(), |r, c| {
            sparse.get(indices[r], indices[c])
        });
        let exact = eigh(&block);
        assert_eq!(spectrum.len(), 3);
        for i in 0..3 {
            assert_relative_eq!(spectrum.energies[i], exact.energies[i], max_relative = 1e-8);
        }
        for state in &spectrum.states {
            assert!(state
                .iter()
                .zip(&support)
                .all(|(amplitude, &kept)| kept || *amplitude == C_ZERO));
        }
    }

    #[test]
    fn small_supports_are_exhausted() {
        let sparse = CsrMatrix::from_dense(&random_hermitian(8, 9), 0.0).unwrap();
        let mut support = vec![false; 8];
        support[2] = true;
        support[5] = true;
        let spectrum =
            lanczos_on_support(|v| sparse.matvec(v), &support, 6, None, 100, 1e-10).unwrap();
        assert_eq!(spectrum.len(), 2);
    }

    #[test]
    fn fixed_start_is_reproducible() {
        let sparse = CsrMatrix::from_dense(&random_hermitian(64, 11), 0.0).unwrap();
        let guess = (0..64).map(|i| c64(1.0, i as f64 * 0.01)).collect::<Vec<_>>();
        let first = run(&sparse, 2, Some(&guess));
        let second = run(&sparse, 2, Some(&guess));
        assert_eq!(first.energies, second.energies);
    }

    #[test]
    fn rejects_bad_starting_vectors() {
        let sparse = CsrMatrix::from_dense(&random_hermitian(4, 5), 0.0).unwrap();
        let short = vec![C_ONE; 3];
        assert!(matches!(
            lanczos(|v| sparse.matvec(v), 4, 1, Some(&short), 100, 1e-10),
            Err(EigenError::BadInitialGuess { len: 3, dim: 4, .. })
        ));
        let zero = vec![c64(0, 0); 4];
        assert!(matches!(
            lanczos(|v| sparse.matvec(v), 4, 1, Some(&zero), 100, 1e-10),
            Err(EigenError::BadInitialGuess { len: 4, .. })
        ));
    }
}
