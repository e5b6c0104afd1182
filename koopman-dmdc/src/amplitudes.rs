use faer::Mat;

use crate::types::{DmdcError, C64};
use crate::utils::{complex_pinv, complex_solve};

/// Compute mode amplitudes b.
///
/// With `opt = false` the amplitudes fit the first snapshot only,
/// b = Φ⁺ x₀. With `opt = true` they minimize the reconstruction error over
/// every snapshot (Jovanović et al., 2014):
///
/// P = (Φᴴ Φ) ∘ conj(V Vᴴ),  q = conj(diag(V Xᴴ Φ)),  b = P⁻¹ q
///
/// where V is the Vandermonde matrix of the eigenvalues, V[i][k] = λᵢᵏ.
pub fn compute_amplitudes(
    modes: &[Vec<C64>],
    eigenvalues: &[C64],
    snapshots: &Mat<f64>,
    opt: bool,
) -> Result<Vec<C64>, DmdcError> {
    let n_vars = snapshots.nrows();
    let rank = eigenvalues.len();
    if modes.len() != n_vars || modes.iter().any(|row| row.len() != rank) {
        return Err(DmdcError::ShapeMismatch(format!(
            "modes must be {n_vars}×{rank} to match the snapshots and eigenvalues"
        )));
    }
    if snapshots.ncols() == 0 {
        return Err(DmdcError::InvalidInput("no snapshots to fit".into()));
    }

    if opt {
        optimal_amplitudes(modes, eigenvalues, snapshots)
    } else {
        direct_amplitudes(modes, snapshots)
    }
}

fn direct_amplitudes(modes: &[Vec<C64>], snapshots: &Mat<f64>) -> Result<Vec<C64>, DmdcError> {
    let phi_pinv = complex_pinv(modes)?;
    let n_vars = snapshots.nrows();
    let amplitudes = phi_pinv
        .iter()
        .map(|row| {
            let mut acc = C64::zero();
            for k in 0..n_vars {
                acc += row[k] * C64::from(snapshots[(k, 0)]);
            }
            acc
        })
        .collect();
    Ok(amplitudes)
}

fn optimal_amplitudes(
    modes: &[Vec<C64>],
    eigenvalues: &[C64],
    snapshots: &Mat<f64>,
) -> Result<Vec<C64>, DmdcError> {
    let n_vars = snapshots.nrows();
    let n_time = snapshots.ncols();
    let rank = eigenvalues.len();

    let vander = vandermonde(eigenvalues, n_time);

    let mut p = vec![vec![C64::zero(); rank]; rank];
    for i in 0..rank {
        for j in 0..rank {
            let mut gram = C64::zero();
            for k in 0..n_vars {
                gram += modes[k][i].conj() * modes[k][j];
            }
            let mut vv = C64::zero();
            for t in 0..n_time {
                vv += vander[i][t] * vander[j][t].conj();
            }
            p[i][j] = gram * vv.conj();
        }
    }

    // Xᵀ Φ column i, then contracted with row i of V.
    let mut q = vec![C64::zero(); rank];
    for i in 0..rank {
        let mut acc = C64::zero();
        for t in 0..n_time {
            let mut proj = C64::zero();
            for k in 0..n_vars {
                proj += modes[k][i] * C64::from(snapshots[(k, t)]);
            }
            acc += vander[i][t] * proj;
        }
        q[i] = acc.conj();
    }

    complex_solve(&p, &q)
}

/// Rows of powers λᵢ⁰, λᵢ¹, ..., λᵢⁿ⁻¹.
pub(crate) fn vandermonde(eigenvalues: &[C64], n: usize) -> Vec<Vec<C64>> {
    eigenvalues
        .iter()
        .map(|&lambda| {
            let mut row = Vec::with_capacity(n);
            let mut power = C64::one();
            for _ in 0..n {
                row.push(power);
                power = power * lambda;
            }
            row
        })
        .collect()
}
