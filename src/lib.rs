//! Adaptive-order Taylor-series integration core.
//!
//! [`jet`] computes the Taylor coefficients of an ODE's solution order by
//! order from the right-hand side; [`step_size`] turns the trailing
//! coefficients into a step length; [`integrator`] drives the two to a
//! natural or prescribed time grid. [`lyapunov`] extends the core with a
//! variational equation and modified Gram-Schmidt renormalization to track
//! the Lyapunov spectrum of a trajectory. [`mpoly`] and [`ads`] extend it
//! again: state components become multivariate perturbation polynomials
//! (jet transport) organized into a tree of sub-domains that bisects
//! whenever a branch's truncation error grows too fast ("automatic domain
//! splitting").
//!
//! Every engine above [`jet`] is generic over [`scalar::Scalar`], so the same
//! stepping and step-size code runs unmodified whether `T` is a plain `f64`
//! or an `MPoly` coefficient.

pub mod ads;
pub mod errors;
pub mod integrator;
pub mod jet;
pub mod lyapunov;
pub mod mpoly;
pub mod options;
pub mod poly;
pub mod scalar;
pub mod step_size;
pub mod test_models;

pub use ads::{ads as run_ads, AdsNode, AdsOutput, AdsRhs, NodeRef};
pub use errors::{Result, TaylorError, TaylorWarning};
pub use integrator::{integrate, integrate_grid, Problem, RunOutput, Statistics, VectorRhs};
pub use jet::JetSolver;
pub use lyapunov::{
    lyapunov_ad, lyapunov_ad_grid, lyapunov_with_jacobian, lyapunov_with_jacobian_grid,
    GenericOdeRhs, JacobianFn, LyapOutput,
};
pub use mpoly::MPoly;
pub use options::Options;
pub use poly::Poly;
pub use scalar::{RealScalar, Scalar};
