use faer::Mat;

use crate::types::{DmdcError, C64};

/// Validate that a matrix meets minimum dimension requirements and contains no NaN/Inf.
pub fn validate_matrix(x: &Mat<f64>, min_rows: usize, min_cols: usize) -> Result<(), DmdcError> {
    let (rows, cols) = (x.nrows(), x.ncols());
    if rows < min_rows {
        return Err(DmdcError::InvalidInput(format!(
            "matrix has {rows} rows, need at least {min_rows}"
        )));
    }
    if cols < min_cols {
        return Err(DmdcError::InvalidInput(format!(
            "matrix has {cols} columns, need at least {min_cols}"
        )));
    }
    for j in 0..cols {
        for i in 0..rows {
            if !x[(i, j)].is_finite() {
                return Err(DmdcError::InvalidInput(
                    "matrix contains NaN or Inf values".to_string(),
                ));
            }
        }
    }
    Ok(())
}

/// Fail with a shape error unless `x` is `rows × cols`.
pub fn expect_shape(x: &Mat<f64>, rows: usize, cols: usize, what: &str) -> Result<(), DmdcError> {
    if x.nrows() != rows || x.ncols() != cols {
        return Err(DmdcError::ShapeMismatch(format!(
            "{what} is {}×{}, expected {rows}×{cols}",
            x.nrows(),
            x.ncols()
        )));
    }
    Ok(())
}

/// Stack snapshot vectors as the columns of a matrix, in the given order.
///
/// Returns the matrix together with its shape (n_states, n_snapshots).
pub fn col_major_2d<S: AsRef<[f64]>>(
    snapshots: &[S],
) -> Result<(Mat<f64>, (usize, usize)), DmdcError> {
    let n_cols = snapshots.len();
    let n_rows = snapshots.first().map(|s| s.as_ref().len()).unwrap_or(0);
    if n_cols == 0 || n_rows == 0 {
        return Err(DmdcError::InvalidInput(
            "at least one non-empty snapshot is required".into(),
        ));
    }

    let mut m = Mat::<f64>::zeros(n_rows, n_cols);
    for (j, snap) in snapshots.iter().enumerate() {
        let snap = snap.as_ref();
        if snap.len() != n_rows {
            return Err(DmdcError::ShapeMismatch(format!(
                "snapshot {j} has {} entries, expected {n_rows}",
                snap.len()
            )));
        }
        for (i, &val) in snap.iter().enumerate() {
            m[(i, j)] = val;
        }
    }
    Ok((m, (n_rows, n_cols)))
}

/// Vertically stack two matrices with the same number of columns.
pub fn vstack(top: &Mat<f64>, bottom: &Mat<f64>) -> Result<Mat<f64>, DmdcError> {
    if top.ncols() != bottom.ncols() {
        return Err(DmdcError::ShapeMismatch(format!(
            "cannot stack {}×{} on top of {}×{}",
            top.nrows(),
            top.ncols(),
            bottom.nrows(),
            bottom.ncols()
        )));
    }
    let (n_top, n_cols) = (top.nrows(), top.ncols());
    let mut out = Mat::<f64>::zeros(n_top + bottom.nrows(), n_cols);
    for j in 0..n_cols {
        for i in 0..n_top {
            out[(i, j)] = top[(i, j)];
        }
        for i in 0..bottom.nrows() {
            out[(n_top + i, j)] = bottom[(i, j)];
        }
    }
    Ok(out)
}

/// Compute the Moore-Penrose pseudo-inverse via SVD.
pub fn pinv(a: &Mat<f64>, tol: Option<f64>) -> Result<Mat<f64>, DmdcError> {
    let svd = a.svd().map_err(|e| DmdcError::SvdFailed(format!("{e:?}")))?;
    let u = svd.U();
    let s_col = svd.S().column_vector();
    let v = svd.V();

    let k = s_col.nrows();
    let max_sv = (0..k).map(|i| s_col[i].abs()).fold(0.0_f64, f64::max);

    let tol = tol.unwrap_or_else(|| {
        let max_dim = a.nrows().max(a.ncols()) as f64;
        max_sv * max_dim * f64::EPSILON
    });

    // pinv(A) = V S_inv U^T
    let m = a.nrows();
    let n = a.ncols();
    let mut result = Mat::<f64>::zeros(n, m);

    for idx in 0..k {
        let si = s_col[idx];
        if si.abs() > tol {
            let si_inv = 1.0 / si;
            for j in 0..n {
                for i in 0..m {
                    result[(j, i)] += v[(j, idx)] * si_inv * u[(i, idx)];
                }
            }
        }
    }

    Ok(result)
}

/// Product of a real matrix with a complex one given as (re, im) parts,
/// packed row-major.
pub fn real_times_complex(a: &Mat<f64>, w_re: &Mat<f64>, w_im: &Mat<f64>) -> Vec<Vec<C64>> {
    let out_re = a * w_re;
    let out_im = a * w_im;
    let (rows, cols) = (out_re.nrows(), out_re.ncols());
    let mut out = vec![vec![C64::zero(); cols]; rows];
    for i in 0..rows {
        for j in 0..cols {
            out[i][j] = C64::new(out_re[(i, j)], out_im[(i, j)]);
        }
    }
    out
}

/// Pseudo-inverse of a complex row-major matrix.
///
/// M = A + iB is embedded as the real matrix [[A, -B], [B, A]], whose
/// pseudo-inverse has the same block structure [[C, -D], [D, C]] with
/// pinv(M) = C + iD.
pub fn complex_pinv(m: &[Vec<C64>]) -> Result<Vec<Vec<C64>>, DmdcError> {
    let rows = m.len();
    let cols = m.first().map(Vec::len).unwrap_or(0);
    if rows == 0 || cols == 0 {
        return Err(DmdcError::InvalidInput(
            "cannot pseudo-invert an empty matrix".into(),
        ));
    }

    let mut embed = Mat::<f64>::zeros(2 * rows, 2 * cols);
    for i in 0..rows {
        for j in 0..cols {
            let z = m[i][j];
            embed[(i, j)] = z.re;
            embed[(i, cols + j)] = -z.im;
            embed[(rows + i, j)] = z.im;
            embed[(rows + i, cols + j)] = z.re;
        }
    }

    let p = pinv(&embed, None)?;
    let mut out = vec![vec![C64::zero(); rows]; cols];
    for i in 0..cols {
        for j in 0..rows {
            out[i][j] = C64::new(p[(i, j)], p[(cols + i, j)]);
        }
    }
    Ok(out)
}

/// Solve a complex linear system Ax = b using Gaussian elimination.
pub fn complex_solve(a: &[Vec<C64>], b: &[C64]) -> Result<Vec<C64>, DmdcError> {
    let n = b.len();
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return Err(DmdcError::ShapeMismatch(format!(
            "complex_solve expects a {n} x {n} system matrix"
        )));
    }
    let mut aug: Vec<Vec<C64>> = a
        .iter()
        .zip(b)
        .map(|(row, &bi)| {
            let mut new_row = row.clone();
            new_row.push(bi);
            new_row
        })
        .collect();

    for col in 0..n {
        // Partial pivoting
        let mut max_norm = aug[col][col].norm();
        let mut max_row = col;
        for (row, aug_row) in aug.iter().enumerate().skip(col + 1) {
            let norm = aug_row[col].norm();
            if norm > max_norm {
                max_norm = norm;
                max_row = row;
            }
        }
        if max_norm < 1e-14 {
            return Err(DmdcError::SolveFailed("singular matrix".into()));
        }
        aug.swap(col, max_row);

        let pivot = aug[col][col];
        for row in (col + 1)..n {
            let factor = aug[row][col] / pivot;
            for j in col..=n {
                let sub = factor * aug[col][j];
                aug[row][j] = aug[row][j] - sub;
            }
        }
    }

    let mut x = vec![C64::zero(); n];
    for i in (0..n).rev() {
        let mut sum = aug[i][n];
        for j in (i + 1)..n {
            sum = sum - aug[i][j] * x[j];
        }
        x[i] = sum / aug[i][i];
    }

    Ok(x)
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

    #[test]
    fn test_validate_matrix_ok() {
        let m = Mat::<f64>::identity(3, 3);
        assert!(validate_matrix(&m, 1, 1).is_ok());
    }

    #[test]
    fn test_validate_matrix_too_small() {
        let m = Mat::<f64>::identity(2, 2);
        assert!(validate_matrix(&m, 3, 1).is_err());
    }

    #[test]
    fn test_validate_matrix_nan() {
        let mut m = Mat::<f64>::zeros(2, 2);
        m[(0, 0)] = 1.0;
        m[(0, 1)] = f64::NAN;
        assert!(validate_matrix(&m, 1, 1).is_err());
    }

    #[test]
    fn test_expect_shape() {
        let m = Mat::<f64>::zeros(2, 3);
        assert!(expect_shape(&m, 2, 3, "m").is_ok());
        assert!(matches!(
            expect_shape(&m, 3, 2, "m"),
            Err(DmdcError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_col_major_2d_keeps_order() {
        let snaps = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
        let (m, shape) = col_major_2d(&snaps).unwrap();
        assert_eq!(shape, (2, 3));
        assert_eq!(m[(0, 1)], 3.0);
        assert_eq!(m[(1, 2)], 6.0);
    }

    #[test]
    fn test_col_major_2d_ragged() {
        let snaps = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(matches!(
            col_major_2d(&snaps),
            Err(DmdcError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_vstack() {
        let top = Mat::<f64>::identity(2, 2);
        let mut bottom = Mat::<f64>::zeros(1, 2);
        bottom[(0, 1)] = 7.0;
        let s = vstack(&top, &bottom).unwrap();
        assert_eq!(s.nrows(), 3);
        assert_eq!(s[(1, 1)], 1.0);
        assert_eq!(s[(2, 1)], 7.0);

        let wrong = Mat::<f64>::zeros(1, 3);
        assert!(vstack(&top, &wrong).is_err());
    }

    #[test]
    fn test_pinv_rectangular() {
        let mut m = Mat::<f64>::zeros(3, 2);
        m[(0, 0)] = 1.0;
        m[(1, 1)] = 1.0;
        let m_inv = pinv(&m, None).unwrap();
        assert_eq!(m_inv.nrows(), 2);
        assert_eq!(m_inv.ncols(), 3);
        // A * pinv(A) * A should equal A
        let product = &m * &m_inv * &m;
        for i in 0..3 {
            for j in 0..2 {
                assert_near(product[(i, j)], m[(i, j)], 1e-10);
            }
        }
    }

    #[test]
    fn test_complex_pinv_inverts_square() {
        let m = vec![
            vec![C64::new(1.0, 1.0), C64::new(0.0, 2.0)],
            vec![C64::new(3.0, 0.0), C64::new(1.0, -1.0)],
        ];
        let inv = complex_pinv(&m).unwrap();
        for i in 0..2 {
            for j in 0..2 {
                let mut acc = C64::zero();
                for k in 0..2 {
                    acc += m[i][k] * inv[k][j];
                }
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_near(acc.re, expected, 1e-10);
                assert_near(acc.im, 0.0, 1e-10);
            }
        }
    }

    #[test]
    fn test_complex_pinv_tall_left_inverse() {
        let m = vec![
            vec![C64::new(1.0, 0.5)],
            vec![C64::new(-2.0, 0.0)],
            vec![C64::new(0.0, 1.0)],
        ];
        let p = complex_pinv(&m).unwrap();
        assert_eq!(p.len(), 1);
        assert_eq!(p[0].len(), 3);
        let mut acc = C64::zero();
        for k in 0..3 {
            acc += p[0][k] * m[k][0];
        }
        assert_near(acc.re, 1.0, 1e-10);
        assert_near(acc.im, 0.0, 1e-10);
    }

    #[test]
    fn test_complex_solve() {
        let a = vec![
            vec![C64::new(2.0, 0.0), C64::new(0.0, 1.0)],
            vec![C64::new(0.0, -1.0), C64::new(3.0, 0.0)],
        ];
        let x_true = vec![C64::new(1.0, -1.0), C64::new(0.5, 2.0)];
        let b: Vec<C64> = a
            .iter()
            .map(|row| row[0] * x_true[0] + row[1] * x_true[1])
            .collect();
        let x = complex_solve(&a, &b).unwrap();
        for k in 0..2 {
            assert_near(x[k].re, x_true[k].re, 1e-12);
            assert_near(x[k].im, x_true[k].im, 1e-12);
        }
    }

    #[test]
    fn test_complex_solve_singular() {
        let a = vec![vec![C64::zero(); 2]; 2];
        let b = vec![C64::one(); 2];
        assert!(matches!(
            complex_solve(&a, &b),
            Err(DmdcError::SolveFailed(_))
        ));
    }

    #[test]
    fn test_complex_solve_non_square() {
        let b = vec![C64::one(); 2];
        let short = vec![vec![C64::one(); 2]];
        assert!(matches!(
            complex_solve(&short, &b),
            Err(DmdcError::ShapeMismatch(_))
        ));
        let ragged = vec![vec![C64::one(); 2], vec![C64::one()]];
        assert!(matches!(
            complex_solve(&ragged, &b),
            Err(DmdcError::ShapeMismatch(_))
        ));
    }
}
