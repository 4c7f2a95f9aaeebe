#![deny(missing_docs)]

//! Concurrent slice-sampling core for Bayesian isoform quantification.
//!
//! The crate provides the adaptive slice sampler ([`Shredder`]), the
//! log-density family it consumes, and the [`Analyze`] engine that
//! fans per-sample updates out across a fixed worker pool with a
//! strict per-round barrier.

/// Multi-sample engine: worker pool, round barrier, group reductions.
pub mod analyze;
/// Run configuration schema and defaults.
pub mod config;
/// Typed dispatch queue and worker loop.
pub mod dispatch;
/// Flat hyperparameter layout and the outer-model seam.
pub mod hyper;
/// Log-density and partial-derivative primitives.
pub mod logpdf;
/// Univariate adaptive slice sampler.
pub mod shredder;

pub use analyze::{compute_ts, compute_xs, Analyze, RunSummary};
pub use config::{EngineConfig, HyperPriors, SliceTuning};
pub use dispatch::{run_worker, Task, TaskQueue};
pub use hyper::{ensure_finite, FixedHyperModel, HyperModel, ParamLayout};
pub use shredder::{Shredder, SliceDirection, SliceTarget};
