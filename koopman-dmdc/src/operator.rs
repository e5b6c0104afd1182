use faer::Mat;

use crate::svd::compute_svd;
use crate::types::{DmdcError, EigSort, SvdComponents, SvdRank, C64};
use crate::utils::real_times_complex;

/// Eigenpairs of a real reduced operator.
///
/// Eigenvectors are kept split into real and imaginary parts so they can be
/// multiplied by real projection matrices directly.
#[derive(Debug, Clone)]
pub struct Eigenquantities {
    /// Eigenvalues λ (r).
    pub eigenvalues: Vec<C64>,
    /// Real part of the eigenvector matrix W (r × r).
    pub w_re: Mat<f64>,
    /// Imaginary part of the eigenvector matrix W (r × r).
    pub w_im: Mat<f64>,
}

impl Eigenquantities {
    /// Eigenvectors packed row-major, columns are eigenvectors.
    pub fn eigenvectors(&self) -> Vec<Vec<C64>> {
        let r = self.eigenvalues.len();
        let mut w = vec![vec![C64::zero(); r]; r];
        for i in 0..r {
            for j in 0..r {
                w[i][j] = C64::new(self.w_re[(i, j)], self.w_im[(i, j)]);
            }
        }
        w
    }
}

/// Eigendecomposition Ã W = W Λ of a square real operator.
pub fn compute_eigenquantities(
    a_tilde: &Mat<f64>,
    sorted_eigs: Option<EigSort>,
) -> Result<Eigenquantities, DmdcError> {
    let rank = a_tilde.nrows();
    if a_tilde.ncols() != rank {
        return Err(DmdcError::ShapeMismatch(format!(
            "reduced operator must be square, got {}×{}",
            rank,
            a_tilde.ncols()
        )));
    }

    let eigen = a_tilde
        .as_ref()
        .eigen()
        .map_err(|e| DmdcError::EigenFailed(format!("{e:?}")))?;

    let eigenvalues_diag = eigen.S().column_vector();
    let eigenvectors = eigen.U();

    let mut order: Vec<usize> = (0..rank).collect();
    let values: Vec<C64> = (0..rank)
        .map(|j| C64::new(eigenvalues_diag[j].re, eigenvalues_diag[j].im))
        .collect();
    match sorted_eigs {
        Some(EigSort::Abs) => {
            order.sort_by(|&a, &b| values[a].norm().total_cmp(&values[b].norm()));
        }
        Some(EigSort::Real) => {
            order.sort_by(|&a, &b| {
                values[a]
                    .re
                    .total_cmp(&values[b].re)
                    .then(values[a].im.total_cmp(&values[b].im))
            });
        }
        None => {}
    }

    let mut eigenvalues = Vec::with_capacity(rank);
    let mut w_re = Mat::<f64>::zeros(rank, rank);
    let mut w_im = Mat::<f64>::zeros(rank, rank);

    for (dst, &src) in order.iter().enumerate() {
        eigenvalues.push(values[src]);
        for i in 0..rank {
            let v = eigenvectors[(i, src)];
            w_re[(i, dst)] = v.re;
            w_im[(i, dst)] = v.im;
        }
    }

    Ok(Eigenquantities {
        eigenvalues,
        w_re,
        w_im,
    })
}

/// Scale column j of `m` by 1/s[j].
pub(crate) fn scale_cols_inv(m: &Mat<f64>, s: &[f64]) -> Mat<f64> {
    let mut out = m.clone();
    for j in 0..m.ncols() {
        for i in 0..m.nrows() {
            out[(i, j)] /= s[j];
        }
    }
    out
}

/// Output of the plain (no-control) operator construction.
#[derive(Debug, Clone)]
pub struct OperatorResult {
    /// Truncated SVD of X; `svd.u` is the basis of the reduced space.
    pub svd: SvdComponents,
    /// Reduced operator Ã (r × r).
    pub a_tilde: Mat<f64>,
    /// Eigenpairs of Ã.
    pub eigen: Eigenquantities,
    /// Modes Φ (n × r), row-major, columns are modes.
    pub modes: Vec<Vec<C64>>,
}

/// Plain DMD operator construction on a pair of snapshot matrices.
#[derive(Debug, Clone)]
pub struct DmdOperator {
    pub svd_rank: SvdRank,
    pub exact: bool,
    pub sorted_eigs: Option<EigSort>,
    pub sv_tolerance: Option<f64>,
}

impl DmdOperator {
    /// Build the reduced operator mapping X onto Y.
    ///
    /// # Algorithm
    /// 1. Truncated SVD: X ≈ U Σ Vᵀ
    /// 2. Reduced operator: Ã = Uᵀ Y V Σ⁻¹
    /// 3. Eigendecomposition: Ã W = W Λ
    /// 4. Modes: Φ = U W (projected) or Φ = Y V Σ⁻¹ W (exact)
    pub fn compute_operator(&self, x: &Mat<f64>, y: &Mat<f64>) -> Result<OperatorResult, DmdcError> {
        if x.nrows() != y.nrows() || x.ncols() != y.ncols() {
            return Err(DmdcError::ShapeMismatch(format!(
                "snapshot pair differs in shape: {}×{} vs {}×{}",
                x.nrows(),
                x.ncols(),
                y.nrows(),
                y.ncols()
            )));
        }

        let svd = compute_svd(x, &self.svd_rank, self.sv_tolerance)?;

        let y_v_sinv = scale_cols_inv(&(y * &svd.v), &svd.s); // (n × r)
        let a_tilde = svd.u.transpose() * &y_v_sinv; // (r × r)

        let eigen = compute_eigenquantities(&a_tilde, self.sorted_eigs)?;
        log::debug!(
            "reduced operator: rank {}, exact modes {}",
            svd.rank(),
            self.exact
        );

        let modes = if self.exact {
            real_times_complex(&y_v_sinv, &eigen.w_re, &eigen.w_im)
        } else {
            real_times_complex(&svd.u, &eigen.w_re, &eigen.w_im)
        };

        Ok(OperatorResult {
            svd,
            a_tilde,
            eigen,
            modes,
        })
    }
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

    fn rotation(theta: f64, radius: f64) -> Mat<f64> {
        let mut a = Mat::<f64>::zeros(2, 2);
        a[(0, 0)] = radius * theta.cos();
        a[(0, 1)] = -radius * theta.sin();
        a[(1, 0)] = radius * theta.sin();
        a[(1, 1)] = radius * theta.cos();
        a
    }

    fn trajectory(a: &Mat<f64>, x0: &[f64], n: usize) -> Mat<f64> {
        let dim = x0.len();
        let mut x = Mat::<f64>::zeros(dim, n);
        for i in 0..dim {
            x[(i, 0)] = x0[i];
        }
        for k in 1..n {
            for i in 0..dim {
                let mut acc = 0.0;
                for j in 0..dim {
                    acc += a[(i, j)] * x[(j, k - 1)];
                }
                x[(i, k)] = acc;
            }
        }
        x
    }

    #[test]
    fn test_eigenquantities_complex_pair() {
        let a = rotation(0.3, 0.95);
        let eq = compute_eigenquantities(&a, Some(EigSort::Real)).unwrap();
        assert_eq!(eq.eigenvalues.len(), 2);
        for ev in &eq.eigenvalues {
            assert_near(ev.norm(), 0.95, 1e-10);
            assert_near(ev.arg().abs(), 0.3, 1e-10);
        }
        // Conjugate pair.
        assert!(eq.eigenvalues[0].im * eq.eigenvalues[1].im < 0.0);
    }

    #[test]
    fn test_eigenquantities_sorted_abs() {
        let mut a = Mat::<f64>::zeros(3, 3);
        a[(0, 0)] = 0.9;
        a[(1, 1)] = -0.2;
        a[(2, 2)] = 0.5;
        let eq = compute_eigenquantities(&a, Some(EigSort::Abs)).unwrap();
        let mags: Vec<f64> = eq.eigenvalues.iter().map(|e| e.norm()).collect();
        assert_near(mags[0], 0.2, 1e-12);
        assert_near(mags[1], 0.5, 1e-12);
        assert_near(mags[2], 0.9, 1e-12);

        // Eigenvectors follow their eigenvalues.
        let w = eq.eigenvectors();
        for j in 0..3 {
            for i in 0..3 {
                let mut av = C64::zero();
                for k in 0..3 {
                    av += C64::from(a[(i, k)]) * w[k][j];
                }
                let lv = eq.eigenvalues[j] * w[i][j];
                assert_near(av.re, lv.re, 1e-10);
                assert_near(av.im, lv.im, 1e-10);
            }
        }
    }

    #[test]
    fn test_eigenquantities_not_square() {
        let a = Mat::<f64>::zeros(2, 3);
        assert!(matches!(
            compute_eigenquantities(&a, None),
            Err(DmdcError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_compute_operator_recovers_rotation() {
        let a = rotation(0.2, 0.97);
        let data = trajectory(&a, &[1.0, 0.5], 20);
        let x = data.subcols(0, 19).to_owned();
        let y = data.subcols(1, 19).to_owned();

        let op = DmdOperator {
            svd_rank: SvdRank::Full,
            exact: false,
            sorted_eigs: None,
            sv_tolerance: None,
        };
        let res = op.compute_operator(&x, &y).unwrap();
        assert_eq!(res.svd.rank(), 2);
        for ev in &res.eigen.eigenvalues {
            assert_near(ev.norm(), 0.97, 1e-8);
            assert_near(ev.arg().abs(), 0.2, 1e-8);
        }
        assert_eq!(res.modes.len(), 2);
        assert_eq!(res.modes[0].len(), 2);
    }

    #[test]
    fn test_exact_and_projected_modes_span_same_space() {
        let a = rotation(0.4, 0.9);
        let data = trajectory(&a, &[0.3, -1.0], 15);
        let x = data.subcols(0, 14).to_owned();
        let y = data.subcols(1, 14).to_owned();

        let mut op = DmdOperator {
            svd_rank: SvdRank::Full,
            exact: false,
            sorted_eigs: Some(EigSort::Real),
            sv_tolerance: None,
        };
        let projected = op.compute_operator(&x, &y).unwrap();
        op.exact = true;
        let exact = op.compute_operator(&x, &y).unwrap();

        // For a full-rank linear system exact modes are λ-scaled projected modes.
        for j in 0..2 {
            let lambda = projected.eigen.eigenvalues[j];
            for i in 0..2 {
                let scaled = projected.modes[i][j] * lambda;
                assert_near(exact.modes[i][j].re, scaled.re, 1e-8);
                assert_near(exact.modes[i][j].im, scaled.im, 1e-8);
            }
        }
    }

    #[test]
    fn test_compute_operator_shape_mismatch() {
        let x = Mat::<f64>::zeros(2, 4);
        let y = Mat::<f64>::zeros(2, 3);
        let op = DmdOperator {
            svd_rank: SvdRank::Full,
            exact: false,
            sorted_eigs: None,
            sv_tolerance: None,
        };
        assert!(matches!(
            op.compute_operator(&x, &y),
            Err(DmdcError::ShapeMismatch(_))
        ));
    }
}
