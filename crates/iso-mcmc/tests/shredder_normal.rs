use iso_core::RngHandle;
use iso_mcmc::{Shredder, SliceTuning};

fn standard_normal(x: f64) -> (f64, f64) {
    (-x * x / 2.0, -x)
}

#[test]
fn unbounded_normal_moments_match_the_target() {
    let shredder = Shredder::new(f64::NEG_INFINITY, f64::INFINITY, SliceTuning::default())
        .expect("valid interval");
    let mut rng = RngHandle::from_seed(1);

    let mut x = 0.0;
    let mut draws = Vec::with_capacity(10_000);
    for _ in 0..10_000 {
        x = shredder
            .sample(&standard_normal, x, &mut rng)
            .expect("draw succeeds");
        draws.push(x);
    }

    let n = draws.len() as f64;
    let mean: f64 = draws.iter().sum::<f64>() / n;
    let var: f64 = draws.iter().map(|&d| (d - mean) * (d - mean)).sum::<f64>() / n;

    assert!(mean.abs() < 0.05, "empirical mean {mean} too far from 0");
    assert!((var - 1.0).abs() < 0.1, "empirical variance {var} too far from 1");
}

#[test]
fn half_infinite_exponential_moments_match_the_target() {
    let shredder =
        Shredder::new(0.0, f64::INFINITY, SliceTuning::default()).expect("valid interval");
    let mut rng = RngHandle::from_seed(11);

    let exponential = |x: f64| (-x, -1.0);
    let mut x = 1.0;
    let mut draws = Vec::with_capacity(20_000);
    for _ in 0..20_000 {
        x = shredder
            .sample(&exponential, x, &mut rng)
            .expect("draw succeeds");
        assert!(x >= 0.0, "draw {x} escaped the support");
        draws.push(x);
    }

    let n = draws.len() as f64;
    let mean: f64 = draws.iter().sum::<f64>() / n;
    let var: f64 = draws.iter().map(|&d| (d - mean) * (d - mean)).sum::<f64>() / n;

    assert!((mean - 1.0).abs() < 0.05, "empirical mean {mean} too far from 1");
    assert!((var - 1.0).abs() < 0.15, "empirical variance {var} too far from 1");
}

#[test]
fn replaying_the_seed_reproduces_the_chain_bit_for_bit() {
    let shredder = Shredder::new(f64::NEG_INFINITY, f64::INFINITY, SliceTuning::default())
        .expect("valid interval");

    let chain = |seed: u64| -> Vec<u64> {
        let mut rng = RngHandle::from_seed(seed);
        let mut x = 0.0;
        (0..200)
            .map(|_| {
                x = shredder.sample(&standard_normal, x, &mut rng).unwrap();
                x.to_bits()
            })
            .collect()
    };

    assert_eq!(chain(77), chain(77));
    assert_ne!(chain(77), chain(78));
}

#[test]
fn draws_respect_a_bounded_support_interval() {
    let shredder = Shredder::new(-1.0, 1.5, SliceTuning::default()).expect("valid interval");
    let mut rng = RngHandle::from_seed(3);

    let mut x = 0.25;
    for _ in 0..2_000 {
        x = shredder
            .sample(&standard_normal, x, &mut rng)
            .expect("draw succeeds");
        assert!((-1.0..=1.5).contains(&x), "draw {x} escaped the interval");
    }
}

#[test]
fn flat_density_on_the_unit_interval_is_roughly_uniform() {
    let shredder = Shredder::new(0.0, 1.0, SliceTuning::default()).expect("valid interval");
    let mut rng = RngHandle::from_seed(9);

    let flat = |_x: f64| (0.0, 0.0);
    let mut x = 0.5;
    let mut sum = 0.0;
    let count = 5_000;
    for _ in 0..count {
        x = shredder.sample(&flat, x, &mut rng).expect("draw succeeds");
        assert!((0.0..=1.0).contains(&x));
        sum += x;
    }
    let mean = sum / count as f64;
    assert!((mean - 0.5).abs() < 0.05, "uniform mean drifted to {mean}");
}

#[test]
fn non_finite_initial_point_is_a_precondition_error() {
    let shredder = Shredder::new(0.0, 1.0, SliceTuning::default()).expect("valid interval");
    let mut rng = RngHandle::from_seed(0);

    let log_density = |x: f64| (x.ln(), 1.0 / x);
    let err = shredder.sample(&log_density, 0.0, &mut rng).unwrap_err();
    assert_eq!(err.info().code, "non-finite");
}

#[test]
fn inverted_intervals_are_rejected_at_construction() {
    assert!(Shredder::new(1.0, 0.0, SliceTuning::default()).is_err());
    assert!(Shredder::new(f64::NAN, 1.0, SliceTuning::default()).is_err());
    assert!(Shredder::new(2.0, 2.0, SliceTuning::default()).is_err());
}
