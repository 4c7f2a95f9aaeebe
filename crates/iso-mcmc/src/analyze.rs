//! Multi-sample analysis engine.
//!
//! Owns one [`QuantSampler`] per sequencing sample and a fixed pool of
//! worker threads, and drives synchronized rounds of per-sample
//! updates. Each round fans sample indices out over a tick queue and
//! blocks until every completion has been drained from a tock channel;
//! only then are the group-level reductions computed and the outer
//! model advanced. Workers never touch the shared quantification
//! matrix: they send `(row index, state vector)` back to the engine,
//! which gathers rows at drain time.

use std::path::PathBuf;
use std::sync::Mutex;
use std::thread;

use crossbeam_channel::{unbounded, Receiver};
use indexmap::IndexMap;
use iso_core::{
    derive_substream_seed, ErrorInfo, QuantError, QuantSampler, SampleLoader, SampleSpec,
    TranscriptSet,
};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::dispatch::{self, TaskQueue};
use crate::hyper::{self, HyperModel, ParamLayout};

type SamplerSlot = Mutex<Box<dyn QuantSampler>>;
type RowUpdate = Result<(usize, Vec<f64>), QuantError>;

/// Summary returned to callers after a run completes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// Condition names in first-seen registration order.
    pub conditions: Vec<String>,
    /// Condition index of each sample, in registration order.
    pub condition_ids: Vec<usize>,
    /// Burnin rounds executed.
    pub burnin: usize,
    /// Sampling rounds executed.
    pub num_samples: usize,
    /// Posterior mean of the quantification matrix over the sampling
    /// rounds, one row per sample, one column per transcript.
    pub mean_quant: Vec<Vec<f64>>,
}

/// The analysis engine: per-sample samplers, worker pool, and the
/// fan-out/fan-in round barrier.
pub struct Analyze {
    config: EngineConfig,
    transcripts: TranscriptSet,
    samples: Vec<SampleSpec>,
    condition_index: IndexMap<String, usize>,
    condition: Vec<usize>,
    started: bool,
}

impl Analyze {
    /// Creates an engine over the given transcript catalog.
    pub fn new(config: EngineConfig, transcripts: TranscriptSet) -> Self {
        log::info!(
            "{} transcripts across {} transcription groups",
            transcripts.len(),
            transcripts.num_tgroups()
        );
        Self {
            config,
            transcripts,
            samples: Vec::new(),
            condition_index: IndexMap::new(),
            condition: Vec::new(),
            started: false,
        }
    }

    /// Registers one sequencing sample under a condition name.
    ///
    /// Condition indices are assigned in first-seen order.
    pub fn add_sample(&mut self, condition_name: &str, path: impl Into<PathBuf>) {
        let next = self.condition_index.len();
        let c = *self
            .condition_index
            .entry(condition_name.to_string())
            .or_insert(next);
        self.condition.push(c);
        self.samples.push(SampleSpec {
            condition: condition_name.to_string(),
            path: path.into(),
        });
    }

    /// Number of registered samples.
    pub fn num_registered(&self) -> usize {
        self.samples.len()
    }

    /// Condition names in first-seen order.
    pub fn conditions(&self) -> Vec<String> {
        self.condition_index.keys().cloned().collect()
    }

    /// Condition index of each registered sample.
    pub fn condition_ids(&self) -> &[usize] {
        &self.condition
    }

    /// Runs the full analysis: parallel sampler construction, burnin
    /// rounds, sampling rounds, and worker shutdown.
    pub fn run(
        &mut self,
        loader: &dyn SampleLoader,
        model: &mut dyn HyperModel,
    ) -> Result<RunSummary, QuantError> {
        if self.started {
            return Err(QuantError::Lifecycle(ErrorInfo::new(
                "already-started",
                "this engine has already run; construct a new one per run",
            )));
        }
        self.started = true;

        let k = self.samples.len();
        if k == 0 {
            return Err(QuantError::Config(ErrorInfo::new(
                "no-samples",
                "at least one sample must be registered before run",
            )));
        }

        let n = self.transcripts.len();
        let t = self.transcripts.num_tgroups();
        let c = self.condition_index.len();
        let num_threads = self.config.resolved_threads().min(k);
        log::info!(
            "{k} samples in {c} conditions, {num_threads} worker threads"
        );

        let layout = ParamLayout {
            num_conditions: c,
            num_tgroups: t,
        };
        let mut params = layout.initial_values(&self.config.hyper);
        let scale = vec![1.0; k];

        let samplers = self.build_samplers(loader, num_threads)?;

        let mut q = vec![vec![0.0; n]; k];
        let mut mean_quant = vec![vec![0.0; n]; k];
        let mut ts = vec![vec![0.0; t]; k];
        let mut xs = vec![vec![0.0; n]; k];

        let burnin = self.config.burnin;
        let num_samples = self.config.num_samples;
        let total_rounds = burnin + num_samples;

        let (ticks, tick_rx) = TaskQueue::new();
        let (tock_tx, tock_rx) = unbounded::<RowUpdate>();

        thread::scope(|scope| -> Result<(), QuantError> {
            for _ in 0..num_threads {
                let worker_tasks = tick_rx.clone();
                let tock = tock_tx.clone();
                let samplers = &samplers;
                scope.spawn(move || {
                    dispatch::run_worker(&worker_tasks, |index| {
                        let update = advance_sample(&samplers[index], index);
                        let _ = tock.send(update);
                    });
                });
            }
            // The engine's copies of both channel ends must go away so a
            // dead pool surfaces as a disconnect instead of a hang.
            drop(tick_rx);
            drop(tock_tx);

            let rounds = (|| -> Result<(), QuantError> {
                for round in 0..total_rounds {
                    hyper::ensure_finite(&params)?;
                    self.push_hyperparameters(&samplers, &params, &scale, &layout)?;

                    ticks.dispatch_all(k)?;
                    drain_round(&tock_rx, k, &mut q)?;

                    compute_ts(&self.transcripts, &q, &mut ts)?;
                    compute_xs(&self.transcripts, &q, &mut xs)?;

                    model.transition(&ts, &xs, &mut params)?;

                    if round >= burnin {
                        for (mean_row, row) in mean_quant.iter_mut().zip(q.iter()) {
                            for (m, &v) in mean_row.iter_mut().zip(row.iter()) {
                                *m += v;
                            }
                        }
                    }
                    log::debug!("round {}/{total_rounds} complete", round + 1);
                }
                Ok(())
            })();

            let shutdown = ticks.shutdown_workers(num_threads);
            rounds.and(shutdown)
        })?;

        if num_samples > 0 {
            for row in mean_quant.iter_mut() {
                for value in row.iter_mut() {
                    *value /= num_samples as f64;
                }
            }
        }
        log::info!("collected {num_samples} posterior samples from {k} samples");

        Ok(RunSummary {
            conditions: self.conditions(),
            condition_ids: self.condition.clone(),
            burnin,
            num_samples,
            mean_quant,
        })
    }

    /// Constructs all per-sample samplers, fanning the blocking
    /// construction work out across the worker pool.
    fn build_samplers(
        &self,
        loader: &dyn SampleLoader,
        num_threads: usize,
    ) -> Result<Vec<SamplerSlot>, QuantError> {
        let k = self.samples.len();
        let (queue, queue_rx) = TaskQueue::new();
        let (done_tx, done_rx) = unbounded::<Result<(usize, Box<dyn QuantSampler>), QuantError>>();
        let samples = &self.samples;
        let master_seed = self.config.seed;

        let mut slots: Vec<Option<Box<dyn QuantSampler>>> = (0..k).map(|_| None).collect();

        thread::scope(|scope| -> Result<(), QuantError> {
            for _ in 0..num_threads {
                let tasks = queue_rx.clone();
                let done = done_tx.clone();
                scope.spawn(move || {
                    dispatch::run_worker(&tasks, |index| {
                        let seed = derive_substream_seed(master_seed, index as u64);
                        let loaded = loader
                            .load(index, seed, &samples[index])
                            .map(|sampler| (index, sampler));
                        let _ = done.send(loaded);
                    });
                });
            }
            drop(queue_rx);
            drop(done_tx);

            queue.dispatch_all(k)?;
            queue.shutdown_workers(num_threads)?;

            let mut first_err: Option<QuantError> = None;
            for _ in 0..k {
                match done_rx.recv() {
                    Ok(Ok((index, sampler))) => slots[index] = Some(sampler),
                    Ok(Err(err)) => {
                        first_err.get_or_insert(err);
                    }
                    Err(_) => {
                        first_err.get_or_insert(QuantError::Lifecycle(ErrorInfo::new(
                            "init-workers-lost",
                            "sampler construction workers exited before all samples were built",
                        )));
                        break;
                    }
                }
            }
            match first_err {
                Some(err) => Err(err),
                None => Ok(()),
            }
        })?;

        let samplers = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.map(Mutex::new).ok_or_else(|| {
                    QuantError::Lifecycle(
                        ErrorInfo::new("missing-sampler", "no sampler was constructed")
                            .with_context("sample", index.to_string()),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        log::info!("constructed {} per-sample samplers", samplers.len());
        Ok(samplers)
    }

    /// Pushes the current hyperparameters into every sampler.
    ///
    /// Runs on the engine thread between rounds; samplers are idle, so
    /// every lock is uncontended.
    fn push_hyperparameters(
        &self,
        samplers: &[SamplerSlot],
        params: &[f64],
        scale: &[f64],
        layout: &ParamLayout,
    ) -> Result<(), QuantError> {
        let t = layout.num_tgroups;
        for (i, slot) in samplers.iter().enumerate() {
            let mut sampler = lock_sampler(slot, i)?;
            let c = self.condition[i];
            let hp = sampler.hyperparams_mut();
            hp.ensure_tgroups(t);
            hp.scale = scale[i];
            hp.tgroup_nu = self.config.hyper.tgroup_nu;
            for j in 0..t {
                hp.tgroup_mu[j] = params[layout.mu_index(c, j)];
                hp.tgroup_sigma[j] = params[layout.sigma_index(c, j)];
            }
        }
        Ok(())
    }
}

fn lock_sampler<'a>(
    slot: &'a SamplerSlot,
    index: usize,
) -> Result<std::sync::MutexGuard<'a, Box<dyn QuantSampler>>, QuantError> {
    slot.lock().map_err(|_| {
        QuantError::Lifecycle(
            ErrorInfo::new("sampler-poisoned", "a worker panicked while holding this sampler")
                .with_context("sample", index.to_string()),
        )
    })
}

/// Advances one sampler and captures its state for the engine.
fn advance_sample(slot: &SamplerSlot, index: usize) -> RowUpdate {
    let mut sampler = lock_sampler(slot, index)?;
    sampler.transition()?;
    Ok((index, sampler.state().to_vec()))
}

/// Blocks until all `k` completions for the current round have been
/// drained, copying each returned state into its row of `q`.
fn drain_round(tocks: &Receiver<RowUpdate>, k: usize, q: &mut [Vec<f64>]) -> Result<(), QuantError> {
    let mut first_err: Option<QuantError> = None;
    for _ in 0..k {
        match tocks.recv() {
            Ok(Ok((index, state))) => {
                let row = &mut q[index];
                if state.len() == row.len() {
                    row.copy_from_slice(&state);
                } else {
                    first_err.get_or_insert(QuantError::Sample(
                        ErrorInfo::new(
                            "state-length",
                            "sampler state length does not match the transcript catalog",
                        )
                        .with_context("sample", index.to_string())
                        .with_context("state_len", state.len().to_string())
                        .with_context("expected", row.len().to_string()),
                    ));
                }
            }
            Ok(Err(err)) => {
                first_err.get_or_insert(err);
            }
            Err(_) => {
                first_err.get_or_insert(QuantError::Lifecycle(ErrorInfo::new(
                    "tick-workers-lost",
                    "tick workers exited before the round drained",
                )));
                break;
            }
        }
    }
    match first_err {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Aggregates the quantification matrix into per-sample group-level
/// log-expression.
///
/// `ts[i][g]` becomes the log of the summed expression of every
/// transcript in group `g` for sample `i`. Non-finite results are
/// fatal.
pub fn compute_ts(
    transcripts: &TranscriptSet,
    q: &[Vec<f64>],
    ts: &mut [Vec<f64>],
) -> Result<(), QuantError> {
    for (i, row) in q.iter().enumerate() {
        ts[i].iter_mut().for_each(|x| *x = 0.0);
        for transcript in transcripts.transcripts() {
            ts[i][transcript.tgroup.index()] += row[transcript.id.index()];
        }
        for (g, x) in ts[i].iter_mut().enumerate() {
            *x = x.ln();
            if !x.is_finite() {
                return Err(QuantError::Numeric(
                    ErrorInfo::new(
                        "non-finite-tgroup-expr",
                        format!("{x} found where finite value expected"),
                    )
                    .with_context("sample", i.to_string())
                    .with_context("tgroup", g.to_string()),
                ));
            }
        }
    }
    Ok(())
}

/// Computes per-transcript proportions within each transcription group.
///
/// `xs[i][t]` becomes `q[i][t]` divided by the summed expression of
/// transcript `t`'s group for sample `i`. Non-finite results are fatal.
pub fn compute_xs(
    transcripts: &TranscriptSet,
    q: &[Vec<f64>],
    xs: &mut [Vec<f64>],
) -> Result<(), QuantError> {
    let mut tgroup_expr = vec![0.0; transcripts.num_tgroups()];
    for (i, row) in q.iter().enumerate() {
        tgroup_expr.iter_mut().for_each(|x| *x = 0.0);
        for transcript in transcripts.transcripts() {
            tgroup_expr[transcript.tgroup.index()] += row[transcript.id.index()];
        }
        for transcript in transcripts.transcripts() {
            let value = row[transcript.id.index()] / tgroup_expr[transcript.tgroup.index()];
            if !value.is_finite() {
                return Err(QuantError::Numeric(
                    ErrorInfo::new(
                        "non-finite-proportion",
                        format!("{value} found where finite value expected"),
                    )
                    .with_context("sample", i.to_string())
                    .with_context("transcript", transcript.id.as_raw().to_string()),
                ));
            }
            xs[i][transcript.id.index()] = value;
        }
    }
    Ok(())
}
