//! Sampling-based falsification of candidate transition rules.
//!
//! The verifier drives a [`World`]'s own transition through randomized and
//! handpicked trials and compares the candidate's answer on each. The trial
//! mix is variant-specific and combines large-range trials,
//! small-range trials and literal boundary trials, to discover portal and
//! boundary behaviors cheaply.
//!
//! This strategy is sound but incomplete: it can only disprove, never prove,
//! equivalence. Exhaustive checking lives in [`equiv`].

crate::prelude!();

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};

use world::World;

#[cfg(test)]
mod test;

/// A user-supplied function hypothesized to reproduce a world's transition
/// rule.
///
/// Takes the candidate input (a position, except for law-checking worlds) and
/// a movement vector, and predicts the output vector. A panic, a
/// wrong-length return or a non-finite component is a candidate failure, not
/// a system error. Candidates run on a worker thread under the verifier's
/// wall-clock budget, hence the `Send + Sync` bound; one that never returns
/// is abandoned and reported as a failure.
pub trait Candidate: Send + Sync {
    /// Predicts the output for an input.
    fn predict(&self, pos: &[f64], mov: &[f64]) -> Vec<f64>;
}
impl<F> Candidate for F
where
    F: Fn(&[f64], &[f64]) -> Vec<f64> + Send + Sync,
{
    fn predict(&self, pos: &[f64], mov: &[f64]) -> Vec<f64> {
        self(pos, mov)
    }
}

/// One concrete trial: a candidate input and a movement vector.
#[derive(Debug, Clone)]
pub struct Trial {
    /// Candidate input.
    pub pos: Vec<f64>,
    /// Movement input.
    pub mov: Vec<f64>,
}
impl Trial {
    /// Constructor.
    pub fn new(pos: Vec<f64>, mov: Vec<f64>) -> Self {
        Self { pos, mov }
    }
}

/// A round of randomized trials over per-dimension ranges.
#[derive(Debug, Clone)]
pub struct Round {
    /// Number of trials to draw.
    pub count: usize,
    /// Half-open sampling range for each input dimension.
    pub pos: Vec<(f64, f64)>,
    /// Half-open sampling range for each movement dimension.
    pub mov: Vec<(f64, f64)>,
    /// Draw integers instead of reals.
    pub integer: bool,
}
impl Round {
    /// A round drawing integer vectors uniformly from `[-bound, bound)`.
    pub fn uniform_int(count: usize, n_pos: usize, n_mov: usize, bound: i64) -> Self {
        let range = (-bound as f64, bound as f64);
        Self {
            count,
            pos: vec![range; n_pos],
            mov: vec![range; n_mov],
            integer: true,
        }
    }

    /// A round drawing real vectors uniformly from per-dimension ranges.
    pub fn uniform(count: usize, pos: Vec<(f64, f64)>, mov: Vec<(f64, f64)>) -> Self {
        Self {
            count,
            pos,
            mov,
            integer: false,
        }
    }
}

/// A variant's sampling plan.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Randomized rounds.
    pub rounds: Vec<Round>,
    /// Handpicked boundary trials, run after the rounds.
    pub literals: Vec<Trial>,
}
impl Plan {
    /// Constructor.
    pub fn new(rounds: Vec<Round>) -> Self {
        Self {
            rounds,
            literals: vec![],
        }
    }

    /// Adds literal boundary trials.
    pub fn with_literals(mut self, literals: Vec<Trial>) -> Self {
        self.literals = literals;
        self
    }
}

/// Drives a world's sampling plan against a candidate.
pub struct Verifier {
    rng: StdRng,
    budget: Duration,
}
impl Default for Verifier {
    fn default() -> Self {
        Self::new()
    }
}
impl Verifier {
    /// Default wall-clock budget for a whole check, candidate time included.
    const DEFAULT_BUDGET: Duration = Duration::from_secs(5);

    /// Constructor, seeded from entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            budget: Self::DEFAULT_BUDGET,
        }
    }

    /// Constructor with a fixed seed, for reproducible runs.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            budget: Self::DEFAULT_BUDGET,
        }
    }

    /// Overrides the wall-clock budget.
    pub fn budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    /// Checks a candidate against a world's sampling plan.
    ///
    /// `true` means no trial falsified the candidate; it is not a proof of
    /// equivalence. Candidate panics, wrong output arities, non-finite
    /// outputs and budget overruns all yield `false`. The world is never
    /// mutated: trials go through the pure [`World::model_step`].
    pub fn check<W: World + ?Sized>(&mut self, world: &W, candidate: &Arc<dyn Candidate>) -> bool {
        let plan = world.plan();
        let started = Instant::now();
        let mut ran = 0_usize;

        for round in &plan.rounds {
            for _ in 0..round.count {
                let pos = self.draw(&round.pos, round.integer);
                let mov = self.draw(&round.mov, round.integer);
                ran += 1;
                if !self.trial(world, candidate, &pos, &mov, started) {
                    debug!("candidate falsified after {} trial(s)", ran);
                    return false;
                }
            }
        }
        for trial in &plan.literals {
            ran += 1;
            if !self.trial(world, candidate, &trial.pos, &trial.mov, started) {
                debug!("candidate falsified on boundary trial {}", ran);
                return false;
            }
        }
        debug!("candidate survived all {} trial(s)", ran);
        true
    }

    /// Draws one vector for the given per-dimension ranges.
    fn draw(&mut self, ranges: &[(f64, f64)], integer: bool) -> Vec<f64> {
        ranges
            .iter()
            .map(|&(lo, hi)| {
                if lo >= hi {
                    // Degenerate range, the dimension is pinned.
                    lo
                } else if integer {
                    self.rng.gen_range(lo as i64..hi as i64) as f64
                } else {
                    self.rng.gen_range(lo..hi)
                }
            })
            .collect()
    }

    /// Runs one trial; `true` if the candidate conforms.
    ///
    /// The candidate runs on a worker thread, waited on with whatever is
    /// left of the budget. An overrunning worker is abandoned, not joined; a
    /// truly non-terminating candidate leaks its thread.
    fn trial<W: World + ?Sized>(
        &mut self,
        world: &W,
        candidate: &Arc<dyn Candidate>,
        pos: &[f64],
        mov: &[f64],
        started: Instant,
    ) -> bool {
        let expected = match world.model_step(pos, mov) {
            Ok(expected) => expected,
            Err(e) => {
                // The reference rule failing on its own trial plan is a bug
                // in the world, not in the candidate.
                warn!("reference transition failed on trial input: {}", e);
                return false;
            }
        };
        let remaining = match self.budget.checked_sub(started.elapsed()) {
            Some(remaining) => remaining,
            None => {
                warn!("candidate evaluation blew the {:?} budget", self.budget);
                return false;
            }
        };

        let (send, recv) = mpsc::channel();
        let worker = {
            let candidate = candidate.clone();
            let (pos, mov) = (pos.to_vec(), mov.to_vec());
            move || {
                let got = catch_unwind(AssertUnwindSafe(|| candidate.predict(&pos, &mov)));
                let _ = send.send(got);
            }
        };
        thread::spawn(worker);

        let got = match recv.recv_timeout(remaining) {
            Ok(Ok(got)) => got,
            Ok(Err(_)) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                debug!("candidate panicked on input {:?} / {:?}", pos, mov);
                return false;
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!("candidate evaluation blew the {:?} budget", self.budget);
                return false;
            }
        };
        world.conforms(&expected, &got)
    }
}

/// Checks a candidate with a fresh entropy-seeded [`Verifier`].
pub fn check<W: World + ?Sized>(world: &W, candidate: &Arc<dyn Candidate>) -> bool {
    Verifier::new().check(world, candidate)
}
