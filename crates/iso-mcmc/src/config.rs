//! Run configuration schema and defaults.
//!
//! Every tunable the sampler consults lives in one of these structs and
//! is fixed at construction time; nothing here mutates after a run
//! starts.

use serde::{Deserialize, Serialize};

/// Parameters governing one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of initial rounds discarded before samples are collected.
    #[serde(default = "default_burnin")]
    pub burnin: usize,
    /// Number of post-burnin sampling rounds.
    #[serde(default = "default_num_samples")]
    pub num_samples: usize,
    /// Worker thread count. `None` uses available hardware concurrency.
    #[serde(default)]
    pub num_threads: Option<usize>,
    /// Master seed from which all substreams are derived.
    #[serde(default)]
    pub seed: u64,
    /// Hyper-prior constants for the transcription-group model.
    #[serde(default)]
    pub hyper: HyperPriors,
}

fn default_burnin() -> usize {
    500
}

fn default_num_samples() -> usize {
    250
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            burnin: default_burnin(),
            num_samples: default_num_samples(),
            num_threads: None,
            seed: 0,
            hyper: HyperPriors::default(),
        }
    }
}

impl EngineConfig {
    /// Resolves the worker thread count, falling back to the hardware
    /// parallelism reported by the OS.
    pub fn resolved_threads(&self) -> usize {
        match self.num_threads {
            Some(n) => n.max(1),
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

/// Hyper-prior constants for the per-group location/scale model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperPriors {
    /// Student's-t degrees of freedom shared by all groups.
    #[serde(default = "default_tgroup_nu")]
    pub tgroup_nu: f64,
    /// Shape hyper-prior on the per-group alpha parameters.
    #[serde(default = "default_alpha_alpha")]
    pub tgroup_alpha_alpha: f64,
    /// Rate hyper-prior on the per-group alpha parameters.
    #[serde(default = "default_beta_alpha")]
    pub tgroup_beta_alpha: f64,
    /// Shape hyper-prior on the per-group beta parameters.
    #[serde(default = "default_alpha_beta")]
    pub tgroup_alpha_beta: f64,
    /// Rate hyper-prior on the per-group beta parameters.
    #[serde(default = "default_beta_beta")]
    pub tgroup_beta_beta: f64,
    /// Initial per-group location.
    #[serde(default = "default_mu0")]
    pub tgroup_mu0: f64,
    /// Initial per-group scale; also used for the initial alpha block.
    #[serde(default = "default_sigma0")]
    pub tgroup_sigma0: f64,
    /// Initial per-group beta value.
    #[serde(default = "default_beta0")]
    pub tgroup_beta0: f64,
}

fn default_tgroup_nu() -> f64 {
    4.0
}

fn default_alpha_alpha() -> f64 {
    5.0
}

fn default_beta_alpha() -> f64 {
    2.5
}

fn default_alpha_beta() -> f64 {
    5.0
}

fn default_beta_beta() -> f64 {
    2.5
}

fn default_mu0() -> f64 {
    -10.0
}

fn default_sigma0() -> f64 {
    100.0
}

fn default_beta0() -> f64 {
    1.0
}

impl Default for HyperPriors {
    fn default() -> Self {
        Self {
            tgroup_nu: default_tgroup_nu(),
            tgroup_alpha_alpha: default_alpha_alpha(),
            tgroup_beta_alpha: default_beta_alpha(),
            tgroup_alpha_beta: default_alpha_beta(),
            tgroup_beta_beta: default_beta_beta(),
            tgroup_mu0: default_mu0(),
            tgroup_sigma0: default_sigma0(),
            tgroup_beta0: default_beta0(),
        }
    }
}

/// Numeric thresholds for slice-sampler edge finding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SliceTuning {
    /// Residual tolerance on `|f(x) - slice_height|` at a slice edge.
    #[serde(default = "default_lp_eps")]
    pub lp_eps: f64,
    /// Derivative magnitude below which a Newton step is not attempted.
    #[serde(default = "default_d_eps")]
    pub d_eps: f64,
    /// Bracket width at which searches and shrink loops terminate.
    #[serde(default = "default_x_eps")]
    pub x_eps: f64,
    /// Bound on the bisection recovery loop before the run aborts.
    #[serde(default = "default_max_bisections")]
    pub max_bisections: usize,
}

fn default_lp_eps() -> f64 {
    1e-2
}

fn default_d_eps() -> f64 {
    1e-3
}

fn default_x_eps() -> f64 {
    1e-8
}

fn default_max_bisections() -> usize {
    50
}

impl Default for SliceTuning {
    fn default() -> Self {
        Self {
            lp_eps: default_lp_eps(),
            d_eps: default_d_eps(),
            x_eps: default_x_eps(),
            max_bisections: default_max_bisections(),
        }
    }
}
