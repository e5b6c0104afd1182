//! # koopman-dmdc
//!
//! Dynamic Mode Decomposition with control (DMDc).
//!
//! Identifies a reduced-order linear model x(k+1) ≈ A x(k) + B u(k) from
//! state snapshots and the control inputs applied between them:
//!
//! - **Known B** ([`BKnownOperator`]): the control contribution is removed
//!   and plain DMD is applied to the remaining dynamics
//! - **Unknown B** ([`BUnknownOperator`]): A and B are identified jointly
//!   from the augmented matrix [X; U]
//! - **Reconstruction** ([`DmdcResult::reconstructed_data`]): replay or
//!   forecast trajectories under any control sequence
//!
//! ## Quick Start
//!
//! ```rust
//! use koopman_dmdc::{Dmdc, DmdcConfig, SvdRank};
//!
//! // x(k+1) = 0.9 x(k) + u(k)
//! let n = 20;
//! let mut x = faer::Mat::<f64>::zeros(1, n);
//! let mut u = faer::Mat::<f64>::zeros(1, n - 1);
//! x[(0, 0)] = 1.0;
//! for k in 0..n - 1 {
//!     u[(0, k)] = (k as f64 * 0.7).sin();
//!     x[(0, k + 1)] = 0.9 * x[(0, k)] + u[(0, k)];
//! }
//!
//! let config = DmdcConfig {
//!     svd_rank: SvdRank::Full,
//!     ..Default::default()
//! };
//! let result = Dmdc::new(config).fit(&x, &u, None).unwrap();
//! let replay = result.reconstructed_data(None).unwrap();
//! assert_eq!(replay.ncols(), n);
//! ```
//!
//! ## References
//!
//! - Proctor, Brunton & Kutz (2016), *SIAM J. Appl. Dyn. Syst.*, 15(1), 142-161
//! - Schmid (2010), *J. Fluid Mech.*, 656, 5-28
//! - Gavish & Donoho (2014), *IEEE Trans. Inf. Theory*, 60(8), 5040-5053
//! - Jovanović, Schmid & Nichols (2014), *Phys. Fluids*, 26, 024103

pub mod types;

pub mod amplitudes;
pub mod control;
pub mod dmdc;
pub mod operator;
pub mod reconstruct;
pub mod svd;
pub mod utils;

pub use amplitudes::compute_amplitudes;
pub use control::{BKnownOperator, BUnknownOperator, ControlOperator, ControlOperatorOutput};
pub use dmdc::{dmdc, Dmdc, DmdcResult};
pub use operator::{compute_eigenquantities, DmdOperator, Eigenquantities, OperatorResult};
pub use svd::{compute_svd, compute_tlsq};
pub use types::{
    DmdcConfig, DmdcError, EigSort, SvdComponents, SvdRank, TimeDescriptor, C64,
};
pub use utils::col_major_2d;
