//! Tests over the sampling verifier.

crate::prelude!();

use std::time::{Duration, Instant};

use sample::{Candidate, Verifier};
use world::{Elevator, Euclidean, NonUniqueOde, SimpleTime, World};

/// Wraps a closure as a shareable candidate.
fn candidate<F>(f: F) -> Arc<dyn Candidate>
where
    F: Fn(&[f64], &[f64]) -> Vec<f64> + Send + Sync + 'static,
{
    Arc::new(f)
}

#[test]
fn euclidean_correct_candidate_passes() {
    let world = Euclidean::new(3).unwrap();
    let correct = candidate(|pos: &[f64], mov: &[f64]| {
        pos.iter().zip(mov).map(|(p, m)| p + m).collect()
    });
    assert!(Verifier::with_seed(42).check(&world, &correct));
    // Also through the world's own entry point.
    assert!(world.check(&correct));
}

#[test]
fn euclidean_identity_candidate_fails() {
    let world = Euclidean::new(3).unwrap();
    let identity = candidate(|pos: &[f64], _mov: &[f64]| pos.to_vec());
    assert!(!Verifier::with_seed(42).check(&world, &identity));
}

#[test]
fn fractional_output_fails() {
    let world = Euclidean::new(3).unwrap();
    // Off by a quarter on every axis: truncating the candidate's output
    // would let this pass, the raw value must be compared.
    let near_miss = candidate(|pos: &[f64], mov: &[f64]| {
        pos.iter().zip(mov).map(|(p, m)| p + m + 0.25).collect()
    });
    assert!(!Verifier::with_seed(42).check(&world, &near_miss));
}

#[test]
fn conforms_rejects_near_integers() {
    let world = Euclidean::new(1).unwrap();
    assert!(world.conforms(&[3.], &[3.]));
    assert!(!world.conforms(&[3.], &[3.25]));
    assert!(!world.conforms(&[3.], &[2.75]));
}

#[test]
fn elevator_correct_candidate_passes() {
    let world = Elevator::new();
    let correct = candidate(|pos: &[f64], mov: &[f64]| {
        let (x, y) = (pos[0] + mov[0], pos[1] + mov[1]);
        let z = if x == 1. && y == 2. && (pos[2] == 0. || pos[2] == 1.) {
            1. - pos[2]
        } else {
            pos[2]
        };
        vec![x, y, z]
    });
    assert!(Verifier::with_seed(7).check(&world, &correct));
}

#[test]
fn simple_time_correct_candidate_passes() {
    let world = SimpleTime::new();
    let correct = candidate(|pos: &[f64], mov: &[f64]| {
        let elapsed = (mov[0] * mov[0] + mov[1] * mov[1]).sqrt().round();
        vec![pos[0] + mov[0], pos[1] + mov[1], pos[2] + elapsed]
    });
    assert!(Verifier::with_seed(7).check(&world, &correct));
}

#[test]
fn simple_time_frozen_clock_fails() {
    let world = SimpleTime::new();
    let frozen = candidate(|pos: &[f64], mov: &[f64]| {
        vec![pos[0] + mov[0], pos[1] + mov[1], pos[2]]
    });
    assert!(!Verifier::with_seed(7).check(&world, &frozen));
}

#[test]
fn ode_law_candidate_passes() {
    let world = NonUniqueOde::new();
    // Law candidates take a bare y value and no movement.
    let law = candidate(|pos: &[f64], _mov: &[f64]| vec![2. * pos[0].abs().sqrt()]);
    assert!(Verifier::with_seed(3).check(&world, &law));
}

#[test]
fn ode_curve_candidate_fails() {
    let world = NonUniqueOde::new();
    // Predicting the curve instead of the law conflates one solution with
    // the family.
    let curve = candidate(|pos: &[f64], _mov: &[f64]| vec![pos[0]]);
    assert!(!Verifier::with_seed(3).check(&world, &curve));
}

#[test]
fn panicking_candidate_fails_cleanly() {
    let world = Euclidean::new(2).unwrap();
    let broken = candidate(|_pos: &[f64], _mov: &[f64]| panic!("candidate bug"));
    assert!(!Verifier::with_seed(0).check(&world, &broken));
}

#[test]
fn wrong_arity_candidate_fails() {
    let world = Euclidean::new(3).unwrap();
    let short = candidate(|_pos: &[f64], _mov: &[f64]| vec![0.]);
    assert!(!Verifier::with_seed(0).check(&world, &short));
}

#[test]
fn non_finite_candidate_fails() {
    let world = Euclidean::new(2).unwrap();
    let weird = candidate(|_pos: &[f64], _mov: &[f64]| vec![f64::NAN, f64::INFINITY]);
    assert!(!Verifier::with_seed(0).check(&world, &weird));
}

#[test]
fn budget_overrun_fails() {
    let world = Euclidean::new(2).unwrap();
    let slow = candidate(|pos: &[f64], mov: &[f64]| {
        std::thread::sleep(Duration::from_millis(5));
        pos.iter().zip(mov).map(|(p, m)| p + m).collect()
    });
    // A correct but slow candidate still fails once the budget is spent.
    let passed = Verifier::with_seed(0)
        .budget(Duration::from_millis(1))
        .check(&world, &slow);
    assert!(!passed);
}

#[test]
fn hanging_candidate_abandoned() {
    let world = Euclidean::new(2).unwrap();
    let hang = candidate(|pos: &[f64], _mov: &[f64]| {
        std::thread::sleep(Duration::from_secs(30));
        pos.to_vec()
    });

    // The check must come back roughly when the budget runs out, not when
    // the candidate deigns to return.
    let started = Instant::now();
    let passed = Verifier::with_seed(0)
        .budget(Duration::from_millis(20))
        .check(&world, &hang);
    assert!(!passed);
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "check blocked for {:?}",
        started.elapsed()
    );
}

#[test]
fn check_never_mutates_the_world() {
    let mut world = Elevator::new();
    world.move_by(&[4., 4.]).unwrap();
    let before = world.position().to_vec();

    let identity = candidate(|pos: &[f64], _mov: &[f64]| pos.to_vec());
    let _ = Verifier::with_seed(9).check(&world, &identity);

    assert_eq!(world.position(), &before[..]);
}
