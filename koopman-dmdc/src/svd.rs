use faer::Mat;

use crate::types::{DmdcError, SvdComponents, SvdRank};
use crate::utils::vstack;

/// Determine truncation rank from singular values of an `m × n` matrix.
pub fn determine_rank(
    singular_values: &[f64],
    rank: &SvdRank,
    shape: (usize, usize),
) -> Result<usize, DmdcError> {
    let n = singular_values.len();
    if n == 0 {
        return Ok(0);
    }

    let r = match *rank {
        SvdRank::Full => n,
        SvdRank::Rank(r) => r.min(n).max(1),
        SvdRank::Energy(threshold) => {
            if !(threshold > 0.0 && threshold < 1.0) {
                return Err(DmdcError::InvalidInput(format!(
                    "energy threshold must lie in (0, 1), got {threshold}"
                )));
            }
            let total: f64 = singular_values.iter().map(|s| s * s).sum();
            if total == 0.0 {
                return Ok(1);
            }
            let mut cumulative = 0.0;
            let mut chosen = n;
            for (i, &s) in singular_values.iter().enumerate() {
                cumulative += s * s;
                if cumulative / total >= threshold {
                    chosen = i + 1;
                    break;
                }
            }
            chosen
        }
        SvdRank::Optimal => optimal_rank(singular_values, shape),
    };
    Ok(r)
}

/// Optimal hard threshold for singular values with unknown noise level
/// (Gavish & Donoho, 2014).
fn optimal_rank(singular_values: &[f64], shape: (usize, usize)) -> usize {
    let (small, large) = if shape.0 <= shape.1 {
        (shape.0, shape.1)
    } else {
        (shape.1, shape.0)
    };
    let beta = small as f64 / large as f64;
    let omega = 0.56 * beta.powi(3) - 0.95 * beta.powi(2) + 1.82 * beta + 1.43;
    let tau = median(singular_values) * omega;
    let rank = singular_values.iter().filter(|&&s| s > tau).count();
    if rank == 0 {
        log::warn!("optimal threshold {tau:.3e} discards every singular value, keeping rank 1");
        return 1;
    }
    rank
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}

/// Compute the truncated SVD of `x`.
///
/// The rank is first chosen by `rank`; singular values at or below the
/// tolerance are then dropped, so every retained value can be safely
/// inverted. The default tolerance is `σ_max · max(m, n) · ε`.
pub fn compute_svd(
    x: &Mat<f64>,
    rank: &SvdRank,
    sv_tolerance: Option<f64>,
) -> Result<SvdComponents, DmdcError> {
    let svd = x.svd().map_err(|e| DmdcError::SvdFailed(format!("{e:?}")))?;
    let u_full = svd.U();
    let v_full = svd.V();
    let s_col = svd.S().column_vector();

    let n_sv = s_col.nrows();
    let s_vals: Vec<f64> = (0..n_sv).map(|i| s_col[i]).collect();

    let requested = determine_rank(&s_vals, rank, (x.nrows(), x.ncols()))?;

    let max_sv = s_vals.first().copied().unwrap_or(0.0);
    let tol = sv_tolerance.unwrap_or_else(|| {
        let max_dim = x.nrows().max(x.ncols()) as f64;
        max_sv * max_dim * f64::EPSILON
    });
    let usable = s_vals.iter().take_while(|&&s| s > tol).count();
    if usable == 0 {
        return Err(DmdcError::InvalidInput(
            "matrix is numerically zero, no singular value above tolerance".into(),
        ));
    }
    if usable < requested {
        log::warn!(
            "dropping {} singular value(s) at or below {tol:.3e}, rank {requested} -> {usable}",
            requested - usable
        );
    }
    let r = requested.min(usable);

    log::trace!(
        "svd of {}×{}: rank {r} of {n_sv}",
        x.nrows(),
        x.ncols()
    );

    Ok(SvdComponents {
        u: u_full.subcols(0, r).to_owned(),
        s: s_vals[..r].to_vec(),
        v: v_full.subcols(0, r).to_owned(),
    })
}

/// Total least squares projection of a snapshot pair.
///
/// Both matrices are projected onto the leading `tlsq_rank` right singular
/// vectors of [X; Y]. A rank of 0 returns the inputs unchanged.
pub fn compute_tlsq(
    x: &Mat<f64>,
    y: &Mat<f64>,
    tlsq_rank: usize,
) -> Result<(Mat<f64>, Mat<f64>), DmdcError> {
    if tlsq_rank == 0 {
        return Ok((x.clone(), y.clone()));
    }

    let stacked = vstack(x, y)?;
    let svd = stacked
        .svd()
        .map_err(|e| DmdcError::SvdFailed(format!("{e:?}")))?;
    let n_sv = svd.S().column_vector().nrows();
    let rank = tlsq_rank.min(n_sv);

    let vk = svd.V().subcols(0, rank).to_owned();
    let vv = &vk * vk.transpose();

    log::debug!("tlsq projection onto {rank} right singular vectors");
    Ok((x * &vv, y * &vv))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_near(a: f64, b: f64, eps: f64) {
        assert!(
            (a - b).abs() < eps,
            "expected {a} ≈ {b} (diff = {})",
            (a - b).abs()
        );
    }

    fn rank_two_matrix() -> Mat<f64> {
        // Outer products of two independent patterns.
        let mut m = Mat::<f64>::zeros(4, 6);
        for i in 0..4 {
            for j in 0..6 {
                m[(i, j)] = (i as f64 + 1.0) * (j as f64 * 0.3).sin()
                    + ((i * i) as f64 - 1.0) * (j as f64 * 0.7).cos();
            }
        }
        m
    }

    #[test]
    fn test_determine_rank_explicit() {
        let s = vec![10.0, 5.0, 1.0, 0.1];
        assert_eq!(determine_rank(&s, &SvdRank::Rank(2), (4, 4)).unwrap(), 2);
        assert_eq!(determine_rank(&s, &SvdRank::Rank(10), (4, 4)).unwrap(), 4);
        assert_eq!(determine_rank(&s, &SvdRank::Rank(0), (4, 4)).unwrap(), 1);
        assert_eq!(determine_rank(&s, &SvdRank::Full, (4, 4)).unwrap(), 4);
    }

    #[test]
    fn test_determine_rank_energy() {
        let s = vec![10.0, 5.0, 1.0, 0.1];
        let total: f64 = s.iter().map(|x| x * x).sum();
        let r = determine_rank(&s, &SvdRank::Energy(0.99), (4, 4)).unwrap();
        let captured: f64 = s.iter().take(r).map(|x| x * x).sum();
        assert!(captured / total >= 0.99);
        let captured_less: f64 = s.iter().take(r - 1).map(|x| x * x).sum();
        assert!(captured_less / total < 0.99);
    }

    #[test]
    fn test_determine_rank_energy_out_of_range() {
        let s = vec![1.0];
        assert!(determine_rank(&s, &SvdRank::Energy(1.5), (1, 1)).is_err());
        assert!(determine_rank(&s, &SvdRank::Energy(0.0), (1, 1)).is_err());
    }

    #[test]
    fn test_determine_rank_optimal_separates_gap() {
        let s = vec![100.0, 80.0, 1e-3, 1e-3, 1e-3, 1e-3];
        assert_eq!(determine_rank(&s, &SvdRank::Optimal, (6, 20)).unwrap(), 2);
    }

    #[test]
    fn test_compute_svd_drops_null_directions() {
        let m = rank_two_matrix();
        let svd = compute_svd(&m, &SvdRank::Full, Some(1e-8)).unwrap();
        assert_eq!(svd.rank(), 2);
        assert_eq!(svd.u.nrows(), 4);
        assert_eq!(svd.v.nrows(), 6);
    }

    #[test]
    fn test_compute_svd_orthonormal_basis() {
        let m = rank_two_matrix();
        let svd = compute_svd(&m, &SvdRank::Rank(2), None).unwrap();
        let gram = svd.u.transpose() * &svd.u;
        for i in 0..2 {
            for j in 0..2 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_near(gram[(i, j)], expected, 1e-10);
            }
        }
        assert!(svd.s[0] >= svd.s[1]);
    }

    #[test]
    fn test_compute_svd_zero_matrix() {
        let m = Mat::<f64>::zeros(3, 3);
        assert!(compute_svd(&m, &SvdRank::Full, None).is_err());
    }

    #[test]
    fn test_tlsq_disabled_is_identity() {
        let x = rank_two_matrix();
        let y = rank_two_matrix();
        let (xp, yp) = compute_tlsq(&x, &y, 0).unwrap();
        assert_eq!(xp, x);
        assert_eq!(yp, y);
    }

    #[test]
    fn test_tlsq_preserves_low_rank_pair() {
        // X and Y already live in a 2-dimensional row space.
        let x = rank_two_matrix();
        let y = rank_two_matrix();
        let (xp, yp) = compute_tlsq(&x, &y, 2).unwrap();
        for i in 0..4 {
            for j in 0..6 {
                assert_near(xp[(i, j)], x[(i, j)], 1e-9);
                assert_near(yp[(i, j)], y[(i, j)], 1e-9);
            }
        }
    }
}
