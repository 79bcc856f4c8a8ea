//! Common imports throughout this project.

pub use std::{
    collections::{BTreeMap as Map, BTreeSet as Set},
    fmt,
    io::Write,
    ops::{Deref, DerefMut},
    sync::Arc,
};

pub use error_chain::bail;
pub use num::{bigint::Sign, BigInt as Int, BigRational as Rat, One, Signed, Zero};
pub use rsmt2::SmtRes;

pub use crate::{build_expr, build_typ, equiv, expr, sample, solver, world};

error_chain::error_chain! {
    types {
        Error, ErrorKind, ResExt, Res;
    }

    links {
        Smt2(rsmt2::errors::Error, rsmt2::errors::ErrorKind)
        /// An error from the `rsmt2` crate.
        ;
    }

    foreign_links {
        Io(std::io::Error)
        /// I/O error.
        ;
    }

    errors {
        /// An operation a world variant does not support, a shape mismatch on
        /// a movement or output vector, an unknown saved point, or a
        /// degenerate measurement.
        Domain(msg: String) {
            description("domain error")
            display("domain error: {}", msg)
        }
        /// The candidate itself misbehaved: it errored out, returned the
        /// wrong arity, or blew its evaluation budget.
        Candidate(msg: String) {
            description("candidate error")
            display("candidate error: {}", msg)
        }
        /// A mismatch between a world's declared dimensions and its own
        /// encoding, or an unusable checker configuration. Fatal, reported
        /// before any solver work.
        Config(msg: String) {
            description("configuration error")
            display("configuration error: {}", msg)
        }
    }
}

impl Error {
    /// Domain error constructor.
    pub fn domain(msg: impl Into<String>) -> Self {
        ErrorKind::Domain(msg.into()).into()
    }
    /// Candidate error constructor.
    pub fn candidate(msg: impl Into<String>) -> Self {
        ErrorKind::Candidate(msg.into()).into()
    }
    /// Configuration error constructor.
    pub fn config(msg: impl Into<String>) -> Self {
        ErrorKind::Config(msg.into()).into()
    }
}
