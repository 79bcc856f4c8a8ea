//! Falsification and equivalence checking for hidden-world transition rules.
//!
//! A [`World`] is a small simulated environment: it owns a position vector and
//! a deterministic transition rule. A player tries to infer the rule and
//! submits a *candidate*, either as a concrete function over numeric vectors
//! or as a symbolic encoding over solver terms. This crate checks candidates
//! two ways:
//!
//! - the [`sample`] module drives randomized and boundary trials against the
//!   world's own transition, which can *disprove* a candidate cheaply but
//!   never prove it;
//! - the [`equiv`] module asks an SMT solver for an assignment where the
//!   candidate and the reference transition diverge. If none exists the
//!   candidate is equivalent on the whole (decidable) input domain; if one
//!   does, it is returned as a concrete [`Counterexample`].
//!
//! Every world variant implements both a concrete `step` and a symbolic
//! `encode`, and the two must agree on every reachable state. That lockstep
//! contract is what the conformance tests in [`world`] pin down.
//!
//! [`World`]: world::World
//! [`Counterexample`]: equiv::Counterexample

#![forbid(missing_docs)]

pub extern crate rsmt2;

mod macros;

pub mod prelude;

pub mod equiv;
pub mod expr;
pub mod sample;
pub mod solver;
pub mod world;
