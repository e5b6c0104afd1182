use faer::Mat;
use rayon::prelude::*;

use crate::dmdc::DmdcResult;
use crate::types::{DmdcError, C64};
use crate::utils::{complex_pinv, validate_matrix};

impl DmdcResult {
    /// Replay or forecast the state trajectory under a control sequence.
    ///
    /// x(0) = X[:, 0]
    /// x(k+1) = A x(k) + B u(k),  A = Φ Λ Φ⁺
    ///
    /// # Arguments
    /// * `control_input` - Control sequence (n_controls × k). If None, the
    ///   control inputs used for fitting are replayed. `k` must equal the
    ///   number of fitted transitions.
    ///
    /// # Returns
    /// Matrix (n_states × (k + 1)) of reconstructed states, real part.
    pub fn reconstructed_data(&self, control_input: Option<&Mat<f64>>) -> Result<Mat<f64>, DmdcError> {
        let control = control_input.unwrap_or(&self.control_input);

        let expected = self.dmd_timesteps().len() - 1;
        if control.ncols() != expected {
            return Err(DmdcError::ReconstructionSize {
                expected,
                got: control.ncols(),
            });
        }
        if control.nrows() != self.b.ncols() {
            return Err(DmdcError::ShapeMismatch(format!(
                "control input has {} rows, B expects {}",
                control.nrows(),
                self.b.ncols()
            )));
        }
        if control_input.is_some() {
            validate_matrix(control, 1, 1)?;
        }

        let a = self.full_operator()?;
        let n = self.n_states();
        let n_controls = control.nrows();

        let mut data = Mat::<f64>::zeros(n, expected + 1);
        let mut state: Vec<C64> = (0..n).map(|i| C64::from(self.snapshots[(i, 0)])).collect();
        for i in 0..n {
            data[(i, 0)] = state[i].re;
        }

        for k in 0..expected {
            let next: Vec<C64> = (0..n)
                .map(|i| {
                    let mut acc = C64::zero();
                    for j in 0..n {
                        acc += a[i][j] * state[j];
                    }
                    for c in 0..n_controls {
                        acc += C64::from(self.b[(i, c)] * control[(c, k)]);
                    }
                    acc
                })
                .collect();
            state = next;
            for i in 0..n {
                data[(i, k + 1)] = state[i].re;
            }
        }
        log::trace!("reconstructed {} steps", expected);

        Ok(data)
    }

    /// Full-space state operator A = Φ diag(λ^(dmd_dt / original_dt)) Φ⁺.
    fn full_operator(&self) -> Result<Vec<Vec<C64>>, DmdcError> {
        let exponent = self.dmd_time.dt / self.original_time.dt;
        let eigs: Vec<C64> = if exponent == 1.0 {
            self.eigenvalues.clone()
        } else {
            self.eigenvalues.iter().map(|l| l.powf(exponent)).collect()
        };

        let phi_pinv = complex_pinv(&self.modes)?;
        let n = self.n_states();

        let a: Vec<Vec<C64>> = self
            .modes
            .par_iter()
            .map(|phi_row| {
                (0..n)
                    .map(|j| {
                        let mut acc = C64::zero();
                        for (k, &lambda) in eigs.iter().enumerate() {
                            acc += phi_row[k] * lambda * phi_pinv[k][j];
                        }
                        acc
                    })
                    .collect::<Vec<C64>>()
            })
            .collect();
        Ok(a)
    }
}
