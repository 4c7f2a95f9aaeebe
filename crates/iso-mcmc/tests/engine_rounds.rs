//! End-to-end engine behavior with instrumented fake samplers.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use iso_core::{
    derive_substream_seed, ErrorInfo, HyperParams, QuantError, QuantSampler, SampleLoader,
    SampleSpec, TranscriptSet,
};
use iso_mcmc::{
    compute_ts, compute_xs, Analyze, EngineConfig, FixedHyperModel, HyperModel, ParamLayout,
};

/// One observed hyperparameter push: which sampler saw it and the
/// values in effect for that round.
#[derive(Debug, Clone, PartialEq)]
struct PushRecord {
    sample: usize,
    scale: f64,
    nu: f64,
    mu: Vec<f64>,
}

/// Records every hyperparameter push it observes and reports the round
/// counter through its state vector.
struct FakeSampler {
    index: usize,
    round: usize,
    state: Vec<f64>,
    hp: HyperParams,
    push_log: Arc<Mutex<Vec<PushRecord>>>,
}

impl QuantSampler for FakeSampler {
    fn transition(&mut self) -> Result<(), QuantError> {
        // Desynchronize the workers; a missing round barrier would then
        // mix rows from different rounds.
        thread::sleep(Duration::from_millis(((self.index * 7 + self.round) % 3) as u64));
        self.round += 1;
        for value in &mut self.state {
            *value = self.round as f64;
        }
        self.push_log.lock().unwrap().push(PushRecord {
            sample: self.index,
            scale: self.hp.scale,
            nu: self.hp.tgroup_nu,
            mu: self.hp.tgroup_mu.clone(),
        });
        Ok(())
    }

    fn state(&self) -> &[f64] {
        &self.state
    }

    fn hyperparams_mut(&mut self) -> &mut HyperParams {
        &mut self.hp
    }
}

struct FakeLoader {
    num_transcripts: usize,
    calls: Mutex<Vec<(usize, u64)>>,
    push_log: Arc<Mutex<Vec<PushRecord>>>,
    fail_index: Option<usize>,
}

impl FakeLoader {
    fn new(num_transcripts: usize) -> Self {
        Self {
            num_transcripts,
            calls: Mutex::new(Vec::new()),
            push_log: Arc::new(Mutex::new(Vec::new())),
            fail_index: None,
        }
    }
}

impl SampleLoader for FakeLoader {
    fn load(
        &self,
        index: usize,
        seed: u64,
        _spec: &SampleSpec,
    ) -> Result<Box<dyn QuantSampler>, QuantError> {
        self.calls.lock().unwrap().push((index, seed));
        if self.fail_index == Some(index) {
            return Err(QuantError::Config(
                ErrorInfo::new("load-failed", "synthetic load failure")
                    .with_context("sample", index.to_string()),
            ));
        }
        Ok(Box::new(FakeSampler {
            index,
            round: 0,
            state: vec![0.0; self.num_transcripts],
            hp: HyperParams::sized(0),
            push_log: self.push_log.clone(),
        }))
    }
}

fn config(burnin: usize, num_samples: usize) -> EngineConfig {
    EngineConfig {
        burnin,
        num_samples,
        num_threads: Some(2),
        seed: 42,
        hyper: Default::default(),
    }
}

/// Three transcripts in two groups: group 0 holds two of them.
fn catalog() -> TranscriptSet {
    TranscriptSet::from_tgroups(&[0, 0, 1]).unwrap()
}

fn engine(burnin: usize, num_samples: usize) -> Analyze {
    let mut analyze = Analyze::new(config(burnin, num_samples), catalog());
    analyze.add_sample("A", "/data/a1.bam");
    analyze.add_sample("A", "/data/a2.bam");
    analyze.add_sample("B", "/data/b1.bam");
    analyze
}

/// Fails the round if any sample's reductions disagree with the shared
/// round counter, which only holds when every worker has finished the
/// round before the reductions run.
struct RoundChecker {
    round: usize,
}

impl HyperModel for RoundChecker {
    fn transition(
        &mut self,
        ts: &[Vec<f64>],
        xs: &[Vec<f64>],
        _params: &mut [f64],
    ) -> Result<(), QuantError> {
        self.round += 1;
        let r = self.round as f64;
        for (i, row) in ts.iter().enumerate() {
            let expected = [(2.0 * r).ln(), r.ln()];
            for (g, (&got, &want)) in row.iter().zip(expected.iter()).enumerate() {
                if (got - want).abs() > 1e-12 {
                    return Err(QuantError::Sample(
                        ErrorInfo::new("round-skew", "reduction saw a stale sampler state")
                            .with_context("sample", i.to_string())
                            .with_context("tgroup", g.to_string()),
                    ));
                }
            }
        }
        for row in xs {
            assert!((row[0] - 0.5).abs() < 1e-12);
            assert!((row[1] - 0.5).abs() < 1e-12);
            assert!((row[2] - 1.0).abs() < 1e-12);
        }
        Ok(())
    }
}

#[test]
fn every_round_drains_all_samples_before_the_reductions() {
    let loader = FakeLoader::new(3);
    let mut model = RoundChecker { round: 0 };
    let summary = engine(5, 5).run(&loader, &mut model).expect("run succeeds");
    assert_eq!(model.round, 10);
    assert_eq!(summary.burnin, 5);
    assert_eq!(summary.num_samples, 5);
}

#[test]
fn summary_reports_conditions_and_posterior_means() {
    let loader = FakeLoader::new(3);
    let summary = engine(1, 2)
        .run(&loader, &mut FixedHyperModel)
        .expect("run succeeds");

    assert_eq!(summary.conditions, vec!["A".to_string(), "B".to_string()]);
    assert_eq!(summary.condition_ids, vec![0, 0, 1]);

    // Rounds 2 and 3 are collected; every state entry equals the round
    // counter, so the posterior mean is 2.5 everywhere.
    assert_eq!(summary.mean_quant.len(), 3);
    for row in &summary.mean_quant {
        for &value in row {
            assert!((value - 2.5).abs() < 1e-12, "mean entry {value}");
        }
    }
}

#[test]
fn hyperparameter_pushes_follow_the_condition_layout() {
    struct MuWriter;
    impl HyperModel for MuWriter {
        fn transition(
            &mut self,
            _ts: &[Vec<f64>],
            _xs: &[Vec<f64>],
            params: &mut [f64],
        ) -> Result<(), QuantError> {
            let layout = ParamLayout {
                num_conditions: 2,
                num_tgroups: 2,
            };
            for c in 0..2 {
                for j in 0..2 {
                    params[layout.mu_index(c, j)] = (c * 10 + j) as f64;
                }
            }
            Ok(())
        }
    }

    let loader = FakeLoader::new(3);
    let push_log = loader.push_log.clone();
    engine(0, 3)
        .run(&loader, &mut MuWriter)
        .expect("run succeeds");

    let log = push_log.lock().unwrap();
    for sample in 0..3 {
        let pushes: Vec<&PushRecord> = log.iter().filter(|p| p.sample == sample).collect();
        assert_eq!(pushes.len(), 3);

        // The scale table and the shared degrees of freedom reach every
        // sampler unchanged.
        for push in &pushes {
            assert_eq!(push.scale, 1.0);
            assert_eq!(push.nu, 4.0);
        }

        // The first round sees the configured initial location.
        assert_eq!(pushes[0].mu, vec![-10.0, -10.0]);

        // Later rounds see the model's per-condition values.
        let c = if sample < 2 { 0.0 } else { 10.0 };
        for push in &pushes[1..] {
            assert_eq!(push.mu, vec![c, c + 1.0]);
        }
    }
}

#[test]
fn loader_runs_once_per_sample_with_derived_seeds() {
    let loader = FakeLoader::new(3);
    engine(1, 1)
        .run(&loader, &mut FixedHyperModel)
        .expect("run succeeds");

    let mut calls = loader.calls.into_inner().unwrap();
    calls.sort_unstable();
    let expected: Vec<(usize, u64)> = (0..3).map(|i| (i, derive_substream_seed(42, i as u64))).collect();
    assert_eq!(calls, expected);
    assert!(calls[0].1 != calls[1].1 && calls[1].1 != calls[2].1);
}

#[test]
fn sampler_errors_abort_the_run() {
    struct BrokenSampler {
        hp: HyperParams,
        state: Vec<f64>,
    }
    impl QuantSampler for BrokenSampler {
        fn transition(&mut self) -> Result<(), QuantError> {
            Err(QuantError::Sample(ErrorInfo::new(
                "boom",
                "synthetic transition failure",
            )))
        }
        fn state(&self) -> &[f64] {
            &self.state
        }
        fn hyperparams_mut(&mut self) -> &mut HyperParams {
            &mut self.hp
        }
    }

    struct BrokenLoader;
    impl SampleLoader for BrokenLoader {
        fn load(
            &self,
            _index: usize,
            _seed: u64,
            _spec: &SampleSpec,
        ) -> Result<Box<dyn QuantSampler>, QuantError> {
            Ok(Box::new(BrokenSampler {
                hp: HyperParams::sized(0),
                state: vec![0.0; 3],
            }))
        }
    }

    let err = engine(1, 1)
        .run(&BrokenLoader, &mut FixedHyperModel)
        .unwrap_err();
    assert_eq!(err.info().code, "boom");
}

#[test]
fn loader_errors_abort_the_run() {
    let mut loader = FakeLoader::new(3);
    loader.fail_index = Some(1);
    let err = engine(1, 1)
        .run(&loader, &mut FixedHyperModel)
        .unwrap_err();
    assert_eq!(err.info().code, "load-failed");
}

#[test]
fn an_engine_runs_at_most_once() {
    let loader = FakeLoader::new(3);
    let mut analyze = engine(0, 1);
    analyze
        .run(&loader, &mut FixedHyperModel)
        .expect("first run succeeds");
    let err = analyze.run(&loader, &mut FixedHyperModel).unwrap_err();
    assert_eq!(err.info().code, "already-started");
}

#[test]
fn a_run_with_no_samples_is_a_config_error() {
    let loader = FakeLoader::new(3);
    let mut analyze = Analyze::new(config(1, 1), catalog());
    let err = analyze.run(&loader, &mut FixedHyperModel).unwrap_err();
    assert_eq!(err.info().code, "no-samples");
}

#[test]
fn group_reductions_reject_non_finite_results() {
    let transcripts = catalog();
    let q = vec![vec![0.0, 0.0, 1.0]];

    let mut ts = vec![vec![0.0; 2]];
    let err = compute_ts(&transcripts, &q, &mut ts).unwrap_err();
    assert_eq!(err.info().code, "non-finite-tgroup-expr");

    let mut xs = vec![vec![0.0; 3]];
    let err = compute_xs(&transcripts, &q, &mut xs).unwrap_err();
    assert_eq!(err.info().code, "non-finite-proportion");

    let q = vec![vec![1.0, 3.0, 2.0]];
    compute_ts(&transcripts, &q, &mut ts).unwrap();
    assert!((ts[0][0] - 4.0f64.ln()).abs() < 1e-12);
    assert!((ts[0][1] - 2.0f64.ln()).abs() < 1e-12);
    compute_xs(&transcripts, &q, &mut xs).unwrap();
    assert!((xs[0][0] - 0.25).abs() < 1e-12);
    assert!((xs[0][1] - 0.75).abs() < 1e-12);
    assert!((xs[0][2] - 1.0).abs() < 1e-12);
}
