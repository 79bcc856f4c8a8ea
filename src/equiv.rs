//! SMT-backed equivalence checking of candidate encodings.
//!
//! Where the sampling checker can only disprove a candidate, the engine here
//! proves or disproves it for the *entire* (decidable) input domain. A query
//! asserts the reference formulas and the candidate formulas against shared
//! position/movement variables, then asserts that some output dimension
//! differs. An unsatisfiable query is a proof of global equivalence; a
//! satisfiable one yields a concrete [`Counterexample`].
//!
//! Whether exhaustive proof is actually achievable depends on the variant
//! and the variable domain:
//!
//! - Euclidean and Elevator encode exactly over integers, which is decidable
//!   and fast;
//! - NonUniqueOde's law needs nonlinear real arithmetic, where z3 is strong
//!   but not guaranteed to decide every query;
//! - SimpleTime and Spherical have no exact encoding at all and refuse to
//!   encode.
//!
//! Every query runs in its own single-use solver session under a
//! caller-specified timeout; an overrun reports as
//! [`Outcome::Inconclusive`], never as a hang and never as a proof.

crate::prelude!();

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;

use log::debug;

use expr::{Cst, Expr, HasTyp, Op, Typ, Var};
use solver::{Ident, Role, Value};
use world::World;


/// Equivalence query configuration.
#[derive(Debug, Clone)]
pub struct Conf {
    /// Solver command, split on whitespace (binary, then options).
    pub z3_cmd: String,
    /// Declare integer variables instead of reals.
    ///
    /// Integer domains are decidable and fast for the linear variants; the
    /// real domain is required for variants with division or nonlinear
    /// terms.
    pub use_ints: bool,
    /// Per-query soft timeout. `None` leaves the solver unbounded, which can
    /// hang on undecidable fragments.
    pub timeout_ms: Option<u64>,
    /// When set, a copy of the SMT-LIB query is written to this path.
    pub tee: Option<PathBuf>,
}
impl Default for Conf {
    fn default() -> Self {
        Self {
            z3_cmd: "z3".into(),
            use_ints: true,
            timeout_ms: Some(10_000),
            tee: None,
        }
    }
}
impl Conf {
    /// Integer-domain configuration.
    pub fn ints() -> Self {
        Self::default()
    }
    /// Real-domain configuration.
    pub fn reals() -> Self {
        Self {
            use_ints: false,
            ..Self::default()
        }
    }
}

/// Context handed to encoders, reference and candidate alike.
///
/// Encoders that need case splits or constraints that are not expressible as
/// a single output formula declare auxiliary variables with [`fresh`] and
/// emit constraints with [`assert`]; the engine declares and asserts them
/// before the query runs.
///
/// [`fresh`]: Self::fresh
/// [`assert`]: Self::assert
pub struct EncodeCx {
    typ: Typ,
    ns: String,
    fresh: usize,
    decls: Vec<Var>,
    asserts: Vec<Expr>,
}
impl EncodeCx {
    /// Constructor. `ns` namespaces auxiliary variables so reference and
    /// candidate auxiliaries cannot collide.
    pub fn new(typ: Typ, ns: impl Into<String>) -> Self {
        Self {
            typ,
            ns: ns.into(),
            fresh: 0,
            decls: vec![],
            asserts: vec![],
        }
    }

    /// The arithmetic type of this query's variables.
    pub fn typ(&self) -> Typ {
        self.typ
    }

    /// A numeric constant of the query's arithmetic type.
    pub fn num(&self, n: i64) -> Expr {
        match self.typ {
            Typ::Rat => Expr::new_cst(Cst::rat(Rat::from_integer(Int::from(n)))),
            _ => Expr::new_cst(Cst::int(Int::from(n))),
        }
    }

    /// Declares a fresh auxiliary variable of the query's arithmetic type.
    pub fn fresh(&mut self, hint: &str) -> Expr {
        let var = Var::new(format!("{}_{}_{}", self.ns, hint, self.fresh), self.typ);
        self.fresh += 1;
        self.decls.push(var.clone());
        Expr::new_var(var)
    }

    /// Asserts a boolean constraint.
    pub fn assert(&mut self, expr: Expr) -> Res<()> {
        if expr.typ() != Typ::Bool {
            bail!(Error::config(format!(
                "cannot assert non-boolean constraint `{}`",
                expr
            )))
        }
        self.asserts.push(expr);
        Ok(())
    }

    /// Auxiliary declarations so far.
    pub fn decls(&self) -> &[Var] {
        &self.decls
    }
    /// Constraints so far.
    pub fn asserts(&self) -> &[Expr] {
        &self.asserts
    }
}

/// A candidate's symbolic encoding.
///
/// Same signature as the reference encoding: given position and movement
/// terms, produce one output formula per output dimension. Case splits that
/// need auxiliary variables go through the [`EncodeCx`].
pub trait CandidateEncoder {
    /// Encodes the candidate's transition over the given input terms.
    fn encode(&self, cx: &mut EncodeCx, pos: &[Expr], mov: &[Expr]) -> Res<Vec<Expr>>;
}
impl<F> CandidateEncoder for F
where
    F: Fn(&mut EncodeCx, &[Expr], &[Expr]) -> Res<Vec<Expr>>,
{
    fn encode(&self, cx: &mut EncodeCx, pos: &[Expr], mov: &[Expr]) -> Res<Vec<Expr>> {
        self(cx, pos, mov)
    }
}

/// A concrete input/output witness where candidate and reference diverge.
///
/// Each map goes from a 0-based dimension index to the value the solver
/// assigned. Witnesses are not unique: a wrong encoder can produce different
/// counterexamples across runs.
#[derive(Debug, Clone)]
pub struct Counterexample {
    /// Position input.
    pub pos: Map<usize, Cst>,
    /// Movement input.
    pub mov: Map<usize, Cst>,
    /// Reference output.
    pub exp: Map<usize, Cst>,
    /// Candidate output.
    pub out: Map<usize, Cst>,
    /// Auxiliary variables and solver artifacts, by raw identifier.
    ///
    /// z3 can produce variables beyond the declared ones when asked for a
    /// model, when there is a potential division by zero for instance.
    pub aux: Map<String, String>,
}
impl Counterexample {
    /// Constructor.
    pub fn new() -> Self {
        Self {
            pos: Map::new(),
            mov: Map::new(),
            exp: Map::new(),
            out: Map::new(),
            aux: Map::new(),
        }
    }

    /// The map for a role.
    fn map_for(&mut self, role: Role) -> &mut Map<usize, Cst> {
        match role {
            Role::Pos => &mut self.pos,
            Role::Mov => &mut self.mov,
            Role::Exp => &mut self.exp,
            Role::Out => &mut self.out,
        }
    }

    /// Inserts a value for a role-scoped variable.
    fn insert(&mut self, role: Role, idx: usize, cst: Cst) -> Res<()> {
        let prev = self.map_for(role).insert(idx, cst);
        if prev.is_some() {
            bail!(
                "trying to insert a value for `{}_{}` twice while constructing cex",
                role,
                idx
            )
        }
        Ok(())
    }

    /// Fails unless every declared dimension got a value.
    fn ensure_complete(&self, n_pos: usize, n_mov: usize, n_out: usize) -> Res<()> {
        for (role, map, len) in [
            (Role::Pos, &self.pos, n_pos),
            (Role::Mov, &self.mov, n_mov),
            (Role::Exp, &self.exp, n_out),
            (Role::Out, &self.out, n_out),
        ] {
            for idx in 0..len {
                if !map.contains_key(&idx) {
                    bail!("solver model has no value for `{}_{}`", role, idx)
                }
            }
        }
        Ok(())
    }
}
impl Default for Counterexample {
    fn default() -> Self {
        Self::new()
    }
}
impl fmt::Display for Counterexample {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        for (name, map) in [
            ("pos", &self.pos),
            ("mov", &self.mov),
            ("exp", &self.exp),
            ("out", &self.out),
        ] {
            write!(fmt, "{}: {{", name)?;
            for (idx, (dim, cst)) in map.iter().enumerate() {
                if idx > 0 {
                    write!(fmt, ",")?;
                }
                write!(fmt, " {}: {}", dim, cst)?;
            }
            writeln!(fmt, " }}")?;
        }
        for (id, value) in &self.aux {
            writeln!(fmt, "aux {}: {}", id, value)?;
        }
        Ok(())
    }
}

/// Result of an equivalence query.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The candidate is formula-equivalent to the reference for every input
    /// in the decidable domain.
    Proved,
    /// The candidate diverges from the reference on a concrete witness.
    Falsified(Counterexample),
    /// The candidate encoder panicked, failed, or produced the wrong number
    /// of output formulas. Distinguished from a falsified-but-well-formed
    /// candidate; the solver is never invoked.
    Malformed(String),
    /// Timeout or undecidable-theory escape: neither proved nor falsified.
    Inconclusive(String),
}
impl Outcome {
    /// True if the candidate was proved equivalent.
    pub fn is_proved(&self) -> bool {
        matches!(self, Self::Proved)
    }
    /// The counterexample, if the candidate was falsified.
    pub fn counterexample(&self) -> Option<&Counterexample> {
        match self {
            Self::Falsified(cex) => Some(cex),
            Self::Proved | Self::Malformed(_) | Self::Inconclusive(_) => None,
        }
    }
}
impl fmt::Display for Outcome {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Proved => write!(fmt, "equivalent on the whole input domain"),
            Self::Falsified(cex) => {
                writeln!(fmt, "diverges from the reference:")?;
                cex.fmt(fmt)
            }
            Self::Malformed(msg) => write!(fmt, "malformed candidate: {}", msg),
            Self::Inconclusive(msg) => write!(fmt, "inconclusive: {}", msg),
        }
    }
}

/// Searches for an input where the candidate and the reference transition
/// diverge.
///
/// Constructs fresh position/movement/expected/output variables, asserts the
/// reference and candidate encodings against the shared inputs, and asks the
/// solver for an assignment where some output dimension differs.
///
/// A reference-side failure (a variant with no exact encoding, a domain/type
/// mismatch, a wrong reference arity) is an error: nothing meaningful can be
/// checked. Candidate-side failures are an [`Outcome::Malformed`], reported
/// without invoking the solver.
pub fn find_counterexample(
    world: &dyn World,
    candidate: &dyn CandidateEncoder,
    conf: &Conf,
) -> Res<Outcome> {
    let (n_pos, n_mov, n_out) = world.model_dims();
    let typ = if conf.use_ints { Typ::Int } else { Typ::Rat };

    let pos_vars: Vec<Var> = (0..n_pos).map(|i| solver::var(Role::Pos, i, typ)).collect();
    let mov_vars: Vec<Var> = (0..n_mov).map(|i| solver::var(Role::Mov, i, typ)).collect();
    let exp_vars: Vec<Var> = (0..n_out).map(|i| solver::var(Role::Exp, i, typ)).collect();
    let out_vars: Vec<Var> = (0..n_out).map(|i| solver::var(Role::Out, i, typ)).collect();
    let pos: Vec<Expr> = pos_vars.iter().cloned().map(Expr::new_var).collect();
    let mov: Vec<Expr> = mov_vars.iter().cloned().map(Expr::new_var).collect();

    let mut ref_cx = EncodeCx::new(typ, "ref");
    let exp_terms = world
        .encode(&mut ref_cx, &pos, &mov)
        .chain_err(|| "while encoding the reference transition")?;
    if exp_terms.len() != n_out {
        bail!(Error::config(format!(
            "reference encoding produced {} output formula(s), expected {}",
            exp_terms.len(),
            n_out
        )))
    }

    let mut cand_cx = EncodeCx::new(typ, "cand");
    let encoded = catch_unwind(AssertUnwindSafe(|| {
        candidate.encode(&mut cand_cx, &pos, &mov)
    }));
    let out_terms = match encoded {
        Err(_) => return Ok(Outcome::Malformed("candidate encoder panicked".into())),
        Ok(Err(e)) => {
            return Ok(Outcome::Malformed(format!(
                "candidate encoder failed: {}",
                e
            )))
        }
        Ok(Ok(terms)) => {
            if terms.len() != n_out {
                return Ok(Outcome::Malformed(format!(
                    "candidate encoding produced {} output formula(s), expected {}",
                    terms.len(),
                    n_out
                )));
            }
            terms
        }
    };

    debug!(
        "spawning solver for a {}/{}-dimensional equivalence query over {}s",
        n_pos, n_out, typ
    );
    let mut solver = solver::spawn(&conf.z3_cmd, conf.timeout_ms, conf.tee.as_deref())?;

    for var in pos_vars
        .iter()
        .chain(&mov_vars)
        .chain(&exp_vars)
        .chain(&out_vars)
        .chain(ref_cx.decls())
        .chain(cand_cx.decls())
    {
        solver
            .declare_const(var, &var.typ())
            .chain_err(|| format!("while declaring variable `{}`", var))?;
    }
    for constraint in ref_cx.asserts().iter().chain(cand_cx.asserts()) {
        solver.assert(constraint)?;
    }
    for (var, term) in exp_vars.iter().zip(&exp_terms).chain(out_vars.iter().zip(&out_terms)) {
        let defn = Expr::new_op(Op::Eq, vec![Expr::new_var(var.clone()), term.clone()])?;
        solver
            .assert(&defn)
            .chain_err(|| format!("while asserting the definition of `{}`", var))?;
    }

    // Some output dimension differs.
    let mut diffs = Vec::with_capacity(n_out);
    for (out, exp) in out_vars.iter().zip(&exp_vars) {
        let eq = Expr::new_op(
            Op::Eq,
            vec![
                Expr::new_var(out.clone()),
                Expr::new_var(exp.clone()),
            ],
        )?;
        diffs.push(Expr::new_op(Op::Not, vec![eq])?);
    }
    let diff = if diffs.len() == 1 {
        diffs.pop().expect("one output dimension")
    } else {
        Expr::new_op(Op::Or, diffs)?
    };
    solver.assert(&diff)?;

    let outcome = match solver.check_sat_or_unk()? {
        None => {
            debug!("solver answered unknown");
            Outcome::Inconclusive(
                "solver answered unknown (timeout or undecidable fragment)".into(),
            )
        }
        Some(false) => {
            debug!("query unsatisfiable, candidate proved equivalent");
            Outcome::Proved
        }
        Some(true) => {
            debug!("query satisfiable, extracting counterexample");
            Outcome::Falsified(extract(&mut solver, n_pos, n_mov, n_out)?)
        }
    };
    solver.kill()?;
    Ok(outcome)
}

/// Extracts a counterexample from a sat solver state.
fn extract(solver: &mut solver::Solver, n_pos: usize, n_mov: usize, n_out: usize) -> Res<Counterexample> {
    let model = solver
        .get_model()
        .chain_err(|| "while retrieving the counterexample")?;
    let mut cex = Counterexample::new();
    for (ident, args, typ, value) in model {
        match (ident, value) {
            (Ident::Dim(role, idx), Value::Cst(cst)) if args.is_empty() => {
                cex.insert(role, idx, cst)?
            }
            (ident, value) => {
                // Auxiliary variable or solver artifact; keep it printable.
                let mut desc = ident.to_string();
                if !args.is_empty() {
                    desc.push_str(" (");
                    for (idx, (arg, typ)) in args.into_iter().enumerate() {
                        if idx > 0 {
                            desc.push(' ');
                        }
                        desc.push_str(&format!("({} {})", arg, typ));
                    }
                    desc.push(')');
                }
                desc.push_str(&format!(" {}", typ));
                let prev = cex.aux.insert(desc.clone(), value.to_string());
                if prev.is_some() {
                    bail!("trying to insert a value for `{}` twice", desc)
                }
            }
        }
    }
    cex.ensure_complete(n_pos, n_mov, n_out)?;
    Ok(cex)
}
