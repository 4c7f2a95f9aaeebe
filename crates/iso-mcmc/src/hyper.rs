//! Flat hyperparameter vector layout and the outer-model seam.
//!
//! The outer statistical model communicates with the engine through a
//! flat, positional vector of doubles: per-condition-per-group location
//! and scale blocks followed by per-group shape blocks. The layout is
//! not self-describing; the engine and the model must agree on it
//! exactly, which is why every offset computation lives here and
//! nowhere else.

use iso_core::{ErrorInfo, QuantError};

use crate::config::HyperPriors;

/// Positional layout of the flat hyperparameter vector for `C`
/// conditions and `T` transcription groups.
///
/// Order: `mu[c][j]` (C*T entries), `sigma[c][j]` (C*T entries),
/// `alpha[j]` (T entries), `beta[j]` (T entries).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamLayout {
    /// Number of experimental conditions.
    pub num_conditions: usize,
    /// Number of transcription groups.
    pub num_tgroups: usize,
}

impl ParamLayout {
    /// Total length of the flat vector.
    pub fn len(&self) -> usize {
        2 * self.num_conditions * self.num_tgroups + 2 * self.num_tgroups
    }

    /// Returns true when the layout describes an empty vector.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Offset of the location parameter for condition `c`, group `j`.
    pub fn mu_index(&self, c: usize, j: usize) -> usize {
        c * self.num_tgroups + j
    }

    /// Offset of the scale parameter for condition `c`, group `j`.
    pub fn sigma_index(&self, c: usize, j: usize) -> usize {
        self.num_conditions * self.num_tgroups + c * self.num_tgroups + j
    }

    /// Offset of the shape parameter alpha for group `j`.
    pub fn alpha_index(&self, j: usize) -> usize {
        2 * self.num_conditions * self.num_tgroups + j
    }

    /// Offset of the shape parameter beta for group `j`.
    pub fn beta_index(&self, j: usize) -> usize {
        2 * self.num_conditions * self.num_tgroups + self.num_tgroups + j
    }

    /// Builds the initial parameter vector from the configured priors.
    pub fn initial_values(&self, priors: &HyperPriors) -> Vec<f64> {
        let mut params = vec![0.0; self.len()];
        for c in 0..self.num_conditions {
            for j in 0..self.num_tgroups {
                params[self.mu_index(c, j)] = priors.tgroup_mu0;
                params[self.sigma_index(c, j)] = priors.tgroup_sigma0;
            }
        }
        for j in 0..self.num_tgroups {
            params[self.alpha_index(j)] = priors.tgroup_sigma0;
            params[self.beta_index(j)] = priors.tgroup_beta0;
        }
        params
    }
}

/// Validates that every hyperparameter is finite.
///
/// A non-finite entry indicates a model bug, not a transient condition;
/// the run must abort rather than continue with corrupted state.
pub fn ensure_finite(params: &[f64]) -> Result<(), QuantError> {
    for (index, &value) in params.iter().enumerate() {
        if !value.is_finite() {
            return Err(QuantError::Precondition(
                ErrorInfo::new(
                    "non-finite-hyperparameter",
                    format!("{value} found where finite value expected"),
                )
                .with_context("offset", index.to_string()),
            ));
        }
    }
    Ok(())
}

/// The outer statistical model driving the hyperparameter vector.
///
/// Invoked once per round, after the fan-in barrier confirms every
/// per-sample state is current: `ts` holds group-level log-expression
/// per sample and `xs` the within-group transcript proportions, both
/// read-only reductions over the quantification matrix. The
/// implementation rewrites `params` in place for the next round.
pub trait HyperModel {
    /// Advances the model by one round.
    fn transition(
        &mut self,
        ts: &[Vec<f64>],
        xs: &[Vec<f64>],
        params: &mut [f64],
    ) -> Result<(), QuantError>;
}

/// A model that keeps the hyperparameters fixed at their initial
/// values. Useful for tests and for conditioning runs on a known prior.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedHyperModel;

impl HyperModel for FixedHyperModel {
    fn transition(
        &mut self,
        _ts: &[Vec<f64>],
        _xs: &[Vec<f64>],
        _params: &mut [f64],
    ) -> Result<(), QuantError> {
        Ok(())
    }
}
