use faer::Mat;

use crate::operator::{compute_eigenquantities, scale_cols_inv, DmdOperator, Eigenquantities};
use crate::svd::compute_svd;
use crate::types::{DmdcError, EigSort, SvdRank, C64};
use crate::utils::{expect_shape, real_times_complex, vstack};

/// Everything a control operator construction produces.
#[derive(Debug, Clone)]
pub struct ControlOperatorOutput {
    /// Orthonormal basis U_r of the reduced space (n_states × r).
    pub basis: Mat<f64>,
    /// Reduced state operator Ã (r × r).
    pub reduced_operator: Mat<f64>,
    /// Eigenpairs of Ã.
    pub eigen: Eigenquantities,
    /// Modes Φ (n_states × r), row-major, columns are modes.
    pub modes: Vec<Vec<C64>>,
    /// Full-space control operator B (n_states × n_controls).
    pub control_operator: Mat<f64>,
}

/// Construction of the reduced operator from snapshot pairs and the control
/// applied between them.
///
/// [`BKnownOperator`] removes a caller-supplied control contribution and falls
/// back to plain DMD. [`BUnknownOperator`] identifies the state and control
/// operators jointly from the augmented matrix Ω = [X; U] (Proctor, Brunton &
/// Kutz, 2016).
pub trait ControlOperator {
    /// `x` and `y` are the current and next snapshots (n_states × m), `control`
    /// holds one input per transition (n_controls × m).
    fn compute_operator(
        &self,
        x: &Mat<f64>,
        y: &Mat<f64>,
        control: &Mat<f64>,
    ) -> Result<ControlOperatorOutput, DmdcError>;
}

/// Operator construction when B is known.
#[derive(Debug, Clone)]
pub struct BKnownOperator<'a> {
    pub b: &'a Mat<f64>,
    pub base: DmdOperator,
}

impl ControlOperator for BKnownOperator<'_> {
    fn compute_operator(
        &self,
        x: &Mat<f64>,
        y: &Mat<f64>,
        control: &Mat<f64>,
    ) -> Result<ControlOperatorOutput, DmdcError> {
        let (n_states, m) = (y.nrows(), y.ncols());
        expect_shape(self.b, n_states, control.nrows(), "B")?;
        expect_shape(control, self.b.ncols(), m, "control input")?;

        // Y' = Y - B U
        let bu = self.b * control;
        let mut y_free = y.clone();
        for j in 0..m {
            for i in 0..n_states {
                y_free[(i, j)] -= bu[(i, j)];
            }
        }

        let res = self.base.compute_operator(x, &y_free)?;
        log::debug!("known-B operator: rank {}", res.svd.rank());

        Ok(ControlOperatorOutput {
            basis: res.svd.u,
            reduced_operator: res.a_tilde,
            eigen: res.eigen,
            modes: res.modes,
            control_operator: self.b.clone(),
        })
    }
}

/// Operator construction when B is identified from the data.
#[derive(Debug, Clone)]
pub struct BUnknownOperator {
    /// Truncation of the SVD of Y, which defines the reduced basis.
    pub svd_rank: SvdRank,
    /// Truncation of the SVD of Ω = [X; U].
    pub svd_rank_omega: SvdRank,
    pub sorted_eigs: Option<EigSort>,
    pub sv_tolerance: Option<f64>,
}

impl ControlOperator for BUnknownOperator {
    fn compute_operator(
        &self,
        x: &Mat<f64>,
        y: &Mat<f64>,
        control: &Mat<f64>,
    ) -> Result<ControlOperatorOutput, DmdcError> {
        let n_states = x.nrows();
        let n_controls = control.nrows();
        if n_controls == 0 {
            return Err(DmdcError::InvalidInput(
                "control input has no rows, cannot identify B".into(),
            ));
        }
        expect_shape(y, n_states, x.ncols(), "next snapshots")?;

        let omega = vstack(x, control)?;
        let p = compute_svd(&omega, &self.svd_rank_omega, self.sv_tolerance)?;

        let up1 = p.u.subrows(0, n_states).to_owned();
        let up2 = p.u.subrows(n_states, n_controls).to_owned();

        let r = compute_svd(y, &self.svd_rank, self.sv_tolerance)?;
        if p.rank() < r.rank() {
            log::warn!(
                "svd_rank_omega keeps {} values but svd_rank keeps {}, the regression basis is starved",
                p.rank(),
                r.rank()
            );
        }
        log::debug!(
            "unknown-B operator: omega rank {}, state rank {}",
            p.rank(),
            r.rank()
        );

        // Y Vp Σp⁻¹, shared by Ã, Φ and B̃
        let y_vp_sinv = scale_cols_inv(&(y * &p.v), &p.s);

        // Ã = Urᵀ Y Vp Σp⁻¹ Up1ᵀ Ur
        let up1t_ur = up1.transpose() * &r.u;
        let projected = &y_vp_sinv * &up1t_ur; // (n_states × r)
        let reduced_operator = r.u.transpose() * &projected;

        let eigen = compute_eigenquantities(&reduced_operator, self.sorted_eigs)?;

        // Φ = Y Vp Σp⁻¹ Up1ᵀ Ur W
        let modes = real_times_complex(&projected, &eigen.w_re, &eigen.w_im);

        // B̃ = Urᵀ Y Vp Σp⁻¹ Up2ᵀ, lifted to B = Ur B̃
        let y_vp_sinv_up2t = &y_vp_sinv * up2.transpose();
        let b_tilde = r.u.transpose() * &y_vp_sinv_up2t;
        let control_operator = &r.u * &b_tilde;

        Ok(ControlOperatorOutput {
            basis: r.u,
            reduced_operator,
            eigen,
            modes,
            control_operator,
        })
    }
}
