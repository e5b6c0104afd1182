/// Error types for DMDc operations.
#[derive(Debug, thiserror::Error)]
pub enum DmdcError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("SVD computation failed: {0}")]
    SvdFailed(String),

    #[error("eigendecomposition failed: {0}")]
    EigenFailed(String),

    #[error("linear solve failed: {0}")]
    SolveFailed(String),

    #[error(
        "the number of control inputs and the number of snapshots to reconstruct have to be the same: \
         got {got} control columns, expected {expected}"
    )]
    ReconstructionSize { expected: usize, got: usize },
}

/// Rank truncation policy for a singular value decomposition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SvdRank {
    /// Optimal hard threshold for singular values (Gavish & Donoho, 2014).
    Optimal,
    /// Keep exactly this many singular values (clamped to the available count).
    Rank(usize),
    /// Keep the smallest number of singular values whose cumulative energy
    /// reaches this fraction, in (0, 1).
    Energy(f64),
    /// No truncation.
    Full,
}

/// Ordering applied to the eigenpairs of the reduced operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EigSort {
    /// Ascending by |λ|.
    Abs,
    /// Ascending by real part, ties broken by imaginary part.
    Real,
}

/// Configuration for DMD with control.
#[derive(Debug, Clone)]
pub struct DmdcConfig {
    /// Truncation of the state SVD (X for known B, Y for unknown B).
    pub svd_rank: SvdRank,
    /// Truncation of the augmented [X; U] SVD. Only used when B is unknown,
    /// and should keep at least as many values as `svd_rank`.
    pub svd_rank_omega: SvdRank,
    /// Rank of the total least squares projection of X and Y. 0 disables it.
    /// Unlike the classic DMDc formulation, a nonzero value is applied here
    /// before operator construction. Control data is never projected.
    pub tlsq_rank: usize,
    /// Fit amplitudes against every snapshot instead of the first one only.
    pub opt: bool,
    /// Use exact modes (Y V Σ⁻¹ W) instead of projected modes (U W) when B is known.
    pub exact: bool,
    /// Optional ordering of the eigenpairs.
    pub sorted_eigs: Option<EigSort>,
    /// Singular values at or below this value are dropped before any reciprocal
    /// is taken. None for `σ_max · max(m, n) · ε`.
    pub sv_tolerance: Option<f64>,
}

impl Default for DmdcConfig {
    fn default() -> Self {
        Self {
            svd_rank: SvdRank::Optimal,
            svd_rank_omega: SvdRank::Full,
            tlsq_rank: 0,
            opt: false,
            exact: false,
            sorted_eigs: None,
            sv_tolerance: None,
        }
    }
}

/// Components of the truncated SVD.
#[derive(Debug, Clone)]
pub struct SvdComponents {
    /// Left singular vectors (m × r).
    pub u: faer::Mat<f64>,
    /// Singular values (r), descending.
    pub s: Vec<f64>,
    /// Right singular vectors (n × r), columns are right singular vectors.
    pub v: faer::Mat<f64>,
}

impl SvdComponents {
    /// Number of retained singular values.
    pub fn rank(&self) -> usize {
        self.s.len()
    }
}

/// Time window descriptor: first instant, last instant and step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeDescriptor {
    pub t0: f64,
    pub tend: f64,
    pub dt: f64,
}

impl TimeDescriptor {
    /// Unit-step window covering `n_samples` snapshots.
    pub fn unit(n_samples: usize) -> Self {
        Self {
            t0: 0.0,
            tend: n_samples.saturating_sub(1) as f64,
            dt: 1.0,
        }
    }

    /// Time instants t0, t0 + dt, ..., tend.
    pub fn timesteps(&self) -> Vec<f64> {
        let n = ((self.tend - self.t0) / self.dt).round() as usize + 1;
        (0..n).map(|k| self.t0 + k as f64 * self.dt).collect()
    }
}

/// Complex number type (re, im).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct C64 {
    pub re: f64,
    pub im: f64,
}

impl C64 {
    /// Create a new complex number.
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    /// Magnitude |z| = sqrt(re² + im²).
    pub fn norm(&self) -> f64 {
        self.re.hypot(self.im)
    }

    /// Squared magnitude re² + im².
    pub fn norm_sqr(&self) -> f64 {
        self.re * self.re + self.im * self.im
    }

    /// Phase angle atan2(im, re).
    pub fn arg(&self) -> f64 {
        self.im.atan2(self.re)
    }

    /// Complex conjugate (re, -im).
    pub fn conj(&self) -> Self {
        Self {
            re: self.re,
            im: -self.im,
        }
    }

    /// Raise to a real power: (r e^{iθ})^p = r^p e^{ipθ}.
    pub fn powf(&self, p: f64) -> Self {
        let r = self.norm();
        let theta = self.arg();
        let rp = r.powf(p);
        Self {
            re: rp * (p * theta).cos(),
            im: rp * (p * theta).sin(),
        }
    }

    /// The zero complex number (0 + 0i).
    pub fn zero() -> Self {
        Self { re: 0.0, im: 0.0 }
    }

    /// The unit complex number (1 + 0i).
    pub fn one() -> Self {
        Self { re: 1.0, im: 0.0 }
    }
}

impl From<f64> for C64 {
    fn from(re: f64) -> Self {
        Self { re, im: 0.0 }
    }
}

impl std::ops::Add for C64 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            re: self.re + rhs.re,
            im: self.im + rhs.im,
        }
    }
}

impl std::ops::AddAssign for C64 {
    fn add_assign(&mut self, rhs: Self) {
        self.re += rhs.re;
        self.im += rhs.im;
    }
}

impl std::ops::Sub for C64 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            re: self.re - rhs.re,
            im: self.im - rhs.im,
        }
    }
}

impl std::ops::Mul for C64 {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self {
            re: self.re * rhs.re - self.im * rhs.im,
            im: self.re * rhs.im + self.im * rhs.re,
        }
    }
}

impl std::ops::Div for C64 {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        let denom = rhs.norm_sqr();
        Self {
            re: (self.re * rhs.re + self.im * rhs.im) / denom,
            im: (self.im * rhs.re - self.re * rhs.im) / denom,
        }
    }
}
