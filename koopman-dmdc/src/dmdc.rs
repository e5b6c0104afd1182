use faer::Mat;

use crate::amplitudes::{compute_amplitudes, vandermonde};
use crate::control::{BKnownOperator, BUnknownOperator, ControlOperator};
use crate::operator::DmdOperator;
use crate::svd::compute_tlsq;
use crate::types::{DmdcConfig, DmdcError, TimeDescriptor, C64};
use crate::utils::{expect_shape, validate_matrix};

/// Dynamic Mode Decomposition with control.
///
/// Holds the configuration; [`Dmdc::fit`] produces an immutable
/// [`DmdcResult`].
#[derive(Debug, Clone, Default)]
pub struct Dmdc {
    config: DmdcConfig,
}

impl Dmdc {
    pub fn new(config: DmdcConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DmdcConfig {
        &self.config
    }

    /// Fit a controlled linear model to snapshots and control inputs.
    ///
    /// # Arguments
    /// * `x` - Snapshot matrix (n_states × n_samples), columns are time-ordered.
    /// * `control` - Control inputs (n_controls × (n_samples - 1)); column k
    ///   drives the transition from snapshot k to snapshot k + 1.
    /// * `b` - Control operator (n_states × n_controls). When None, it is
    ///   identified together with the state dynamics.
    ///
    /// # Algorithm
    /// 1. Split X into X₁ = X[:, 0..n-1] and X₂ = X[:, 1..n]
    /// 2. Optional total least squares projection of (X₁, X₂)
    /// 3. Known B: plain DMD on (X₁, X₂ - B U). Unknown B: joint regression
    ///    on Ω = [X₁; U]
    /// 4. Amplitudes from Φ, λ and X
    pub fn fit(
        &self,
        x: &Mat<f64>,
        control: &Mat<f64>,
        b: Option<&Mat<f64>>,
    ) -> Result<DmdcResult, DmdcError> {
        validate_matrix(x, 1, 2)?;
        validate_matrix(control, 1, 1)?;

        let n_states = x.nrows();
        let n_samples = x.ncols();
        let n_controls = control.nrows();
        expect_shape(control, n_controls, n_samples - 1, "control input")?;
        if let Some(b) = b {
            validate_matrix(b, 1, 1)?;
            expect_shape(b, n_states, n_controls, "B")?;
        }

        log::debug!(
            "fitting DMDc: {n_states} states, {n_samples} snapshots, {n_controls} control(s), B {}",
            if b.is_some() { "known" } else { "unknown" }
        );

        let x_prev = x.subcols(0, n_samples - 1).to_owned();
        let y_next = x.subcols(1, n_samples - 1).to_owned();
        let (x_prev, y_next) = compute_tlsq(&x_prev, &y_next, self.config.tlsq_rank)?;

        let builder: Box<dyn ControlOperator + '_> = match b {
            Some(b) => Box::new(BKnownOperator {
                b,
                base: DmdOperator {
                    svd_rank: self.config.svd_rank,
                    exact: self.config.exact,
                    sorted_eigs: self.config.sorted_eigs,
                    sv_tolerance: self.config.sv_tolerance,
                },
            }),
            None => Box::new(BUnknownOperator {
                svd_rank: self.config.svd_rank,
                svd_rank_omega: self.config.svd_rank_omega,
                sorted_eigs: self.config.sorted_eigs,
                sv_tolerance: self.config.sv_tolerance,
            }),
        };
        let out = builder.compute_operator(&x_prev, &y_next, control)?;

        let amplitudes = compute_amplitudes(
            &out.modes,
            &out.eigen.eigenvalues,
            x,
            self.config.opt,
        )?;

        let time = TimeDescriptor::unit(n_samples);

        Ok(DmdcResult {
            snapshots: x.clone(),
            control_input: control.clone(),
            b: out.control_operator,
            b_known: b.is_some(),
            basis: out.basis,
            reduced_operator: out.reduced_operator,
            eigenvectors: out.eigen.eigenvectors(),
            eigenvalues: out.eigen.eigenvalues,
            modes: out.modes,
            amplitudes,
            original_time: time,
            dmd_time: time,
        })
    }
}

/// Fit DMD with control using `config`. See [`Dmdc::fit`].
pub fn dmdc(
    x: &Mat<f64>,
    control: &Mat<f64>,
    b: Option<&Mat<f64>>,
    config: &DmdcConfig,
) -> Result<DmdcResult, DmdcError> {
    Dmdc::new(config.clone()).fit(x, control, b)
}

/// A fitted DMDc model. Immutable; all quantities are read through accessors
/// so modes, eigenvalues and amplitudes always stay consistent.
#[derive(Debug, Clone)]
pub struct DmdcResult {
    pub(crate) snapshots: Mat<f64>,
    pub(crate) control_input: Mat<f64>,
    pub(crate) b: Mat<f64>,
    pub(crate) b_known: bool,
    pub(crate) basis: Mat<f64>,
    pub(crate) reduced_operator: Mat<f64>,
    pub(crate) eigenvalues: Vec<C64>,
    pub(crate) eigenvectors: Vec<Vec<C64>>,
    pub(crate) modes: Vec<Vec<C64>>,
    pub(crate) amplitudes: Vec<C64>,
    pub(crate) original_time: TimeDescriptor,
    pub(crate) dmd_time: TimeDescriptor,
}

impl DmdcResult {
    /// Control operator B (n_states × n_controls), supplied or identified.
    pub fn b(&self) -> &Mat<f64> {
        &self.b
    }

    /// Whether B was supplied to `fit`.
    pub fn is_b_known(&self) -> bool {
        self.b_known
    }

    /// Orthonormal basis of the reduced space (n_states × r). Not the modes.
    pub fn basis(&self) -> &Mat<f64> {
        &self.basis
    }

    /// Reduced state operator Ã (r × r).
    pub fn reduced_operator(&self) -> &Mat<f64> {
        &self.reduced_operator
    }

    /// Eigenvalues λ (r).
    pub fn eigenvalues(&self) -> &[C64] {
        &self.eigenvalues
    }

    /// Alias of [`DmdcResult::eigenvalues`].
    pub fn eigs(&self) -> &[C64] {
        &self.eigenvalues
    }

    /// Eigenvectors of Ã (r × r), row-major, columns are eigenvectors.
    pub fn eigenvectors(&self) -> &[Vec<C64>] {
        &self.eigenvectors
    }

    /// Modes Φ (n_states × r), row-major: `modes()[i][j]` is mode j at state i.
    pub fn modes(&self) -> &[Vec<C64>] {
        &self.modes
    }

    /// Mode column j.
    pub fn mode(&self, j: usize) -> Vec<C64> {
        self.modes.iter().map(|row| row[j]).collect()
    }

    /// Amplitudes b (r).
    pub fn amplitudes(&self) -> &[C64] {
        &self.amplitudes
    }

    /// Number of modes.
    pub fn rank(&self) -> usize {
        self.eigenvalues.len()
    }

    /// Number of state variables.
    pub fn n_states(&self) -> usize {
        self.snapshots.nrows()
    }

    /// Number of control inputs.
    pub fn n_controls(&self) -> usize {
        self.b.ncols()
    }

    /// Snapshots the model was fitted on.
    pub fn snapshots(&self) -> &Mat<f64> {
        &self.snapshots
    }

    /// Shape (n_states, n_samples) of the fitted snapshots.
    pub fn snapshots_shape(&self) -> (usize, usize) {
        (self.snapshots.nrows(), self.snapshots.ncols())
    }

    /// Control inputs the model was fitted on.
    pub fn control_input(&self) -> &Mat<f64> {
        &self.control_input
    }

    /// Shape (n_controls, n_samples - 1) of the fitted control inputs.
    pub fn control_shape(&self) -> (usize, usize) {
        (self.control_input.nrows(), self.control_input.ncols())
    }

    pub fn original_time(&self) -> TimeDescriptor {
        self.original_time
    }

    pub fn dmd_time(&self) -> TimeDescriptor {
        self.dmd_time
    }

    pub fn original_timesteps(&self) -> Vec<f64> {
        self.original_time.timesteps()
    }

    pub fn dmd_timesteps(&self) -> Vec<f64> {
        self.dmd_time.timesteps()
    }

    /// Time evolution of each mode on the dmd time grid (r × n_samples),
    /// `dynamics[i][k] = bᵢ λᵢᵏ`.
    pub fn dynamics(&self) -> Vec<Vec<C64>> {
        let n_time = self.dmd_timesteps().len();
        vandermonde(&self.eigenvalues, n_time)
            .into_iter()
            .zip(&self.amplitudes)
            .map(|(row, &b)| row.into_iter().map(|p| b * p).collect())
            .collect()
    }
}
