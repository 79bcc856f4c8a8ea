//! Provides a parser-equipped [`rsmt2::Solver`] for equivalence queries.
//!
//! Equivalence queries declare their variables under fixed, role-based names:
//! `pos_<i>`, `mov_<i>`, `exp_<i>` and `out_<i>`. The parser in this module
//! maps model identifiers back to those roles so counterexample extraction
//! can partition a satisfying assignment by role. Anything else the solver
//! produces (auxiliary variables from case splits, artifacts like division
//! helpers) is kept as-is under its raw name.

crate::prelude!();

use std::path::Path;

use expr::{Cst, Typ, Var};
use rsmt2::{parse::SmtParser as RSmtParser, SmtConf};

/// The role a solver variable plays in an equivalence query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    /// Position input.
    Pos,
    /// Movement input.
    Mov,
    /// Expected (reference) output.
    Exp,
    /// Candidate output.
    Out,
}
impl Role {
    /// Identifier prefix for this role.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Pos => "pos",
            Self::Mov => "mov",
            Self::Exp => "exp",
            Self::Out => "out",
        }
    }

    /// Parses a role from an identifier prefix.
    pub fn of_prefix(s: &str) -> Option<Self> {
        match s {
            "pos" => Some(Self::Pos),
            "mov" => Some(Self::Mov),
            "exp" => Some(Self::Exp),
            "out" => Some(Self::Out),
            _ => None,
        }
    }
}
impl fmt::Display for Role {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", self.prefix())
    }
}

/// Builds the variable for a role and a dimension index.
pub fn var(role: Role, idx: usize, typ: Typ) -> Var {
    Var::new(format!("{}_{}", role.prefix(), idx), typ)
}

/// An identifier extracted from a solver model.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Ident {
    /// A role-scoped variable, *e.g.* `pos_0`.
    Dim(Role, usize),
    /// Anything else: auxiliary variables or solver artifacts.
    Other(String),
}
impl Ident {
    /// Parses an identifier, recognizing role-scoped names.
    pub fn of_str(input: &str) -> Self {
        let mut subs = input.splitn(2, '_');
        if let (Some(pref), Some(idx)) = (subs.next(), subs.next()) {
            if let (Some(role), Ok(idx)) = (Role::of_prefix(pref), idx.parse::<usize>()) {
                return Self::Dim(role, idx);
            }
        }
        Self::Other(input.into())
    }
}
impl fmt::Display for Ident {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Dim(role, idx) => write!(fmt, "{}_{}", role, idx),
            Self::Other(id) => id.fmt(fmt),
        }
    }
}

/// A value extracted from a solver model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A constant the value parser understood.
    Cst(Cst),
    /// The raw s-expression, when the value is not a plain constant.
    Raw(String),
}
impl fmt::Display for Value {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Cst(cst) => cst.fmt(fmt),
            Self::Raw(s) => s.fmt(fmt),
        }
    }
}

/// SMT-LIB parser for identifiers, types and model values.
#[derive(Debug, Clone, Copy)]
pub struct Parser;

impl<'a> rsmt2::parse::IdentParser<Ident, Typ, &'a str> for Parser {
    fn parse_ident(self, input: &'a str) -> SmtRes<Ident> {
        Ok(Ident::of_str(input.trim()))
    }
    fn parse_type(self, input: &'a str) -> SmtRes<Typ> {
        match input {
            "Bool" => Ok(Typ::Bool),
            "Int" => Ok(Typ::Int),
            "Real" => Ok(Typ::Rat),
            _ => bail!("unexpected type string `{}`", input),
        }
    }
}
impl<'a, Br: std::io::BufRead> rsmt2::parse::ModelParser<Ident, Typ, Value, &'a mut RSmtParser<Br>>
    for Parser
{
    fn parse_value(
        self,
        input: &'a mut RSmtParser<Br>,
        _: &Ident,
        _: &[(Ident, Typ)],
        _: &Typ,
    ) -> SmtRes<Value> {
        let sexpr = input.get_sexpr()?;
        if let Some(cst) = cst_of_sexpr(sexpr) {
            Ok(Value::Cst(cst))
        } else {
            Ok(Value::Raw(sexpr.into()))
        }
    }
}

/// Type alias for rsmt2's solver equipped with our parser.
pub type Solver = rsmt2::Solver<Parser>;

/// Spawns a solver.
///
/// The command is split on whitespace: the first token is the binary, the
/// rest are passed as options. A timeout, when given, is passed as z3's
/// per-query soft timeout so that an overrunning query answers `unknown`
/// instead of hanging.
pub fn spawn(cmd: &str, timeout_ms: Option<u64>, tee: Option<&Path>) -> Res<Solver> {
    let mut split_cmd = cmd.split(|c: char| c.is_whitespace());
    let binary = split_cmd
        .next()
        .ok_or_else(|| format!("illegal solver command `{}`", cmd))?
        .trim();
    let mut conf = SmtConf::z3(binary);

    for opt in split_cmd {
        let opt = opt.trim();
        if !opt.is_empty() {
            conf.option(opt);
        }
    }
    if let Some(ms) = timeout_ms {
        conf.option(format!("-t:{}", ms));
    }
    conf.check_success();

    let mut solver = conf
        .spawn(Parser)
        .chain_err(|| "while spawning z3 solver")?;
    if let Some(path) = tee {
        solver.path_tee(path)?
    }
    Ok(solver)
}

/// Parses a constant from a model s-expression.
///
/// Covers the shapes z3 produces for `Int` and `Real` constants: plain
/// numerals, decimals (`0.5`), negations (`(- 7)`) and quotients
/// (`(/ 1.0 2.0)`), plus the boolean literals.
pub fn cst_of_sexpr(sexpr: &str) -> Option<Cst> {
    let mut tokens = tokenize(sexpr);
    let cst = parse_tokens(&mut tokens)?;
    if tokens.next().is_some() {
        None
    } else {
        Some(cst)
    }
}

/// Splits an s-expression into parenthesis and atom tokens.
fn tokenize(sexpr: &str) -> impl Iterator<Item = String> + '_ {
    sexpr
        .replace('(', " ( ")
        .replace(')', " ) ")
        .split_whitespace()
        .map(String::from)
        .collect::<Vec<_>>()
        .into_iter()
}

/// Parses one constant from a token stream.
fn parse_tokens(tokens: &mut impl Iterator<Item = String>) -> Option<Cst> {
    let token = tokens.next()?;
    match token.as_str() {
        "true" => Some(Cst::bool(true)),
        "false" => Some(Cst::bool(false)),
        "(" => {
            let op = tokens.next()?;
            let res = match op.as_str() {
                "-" => match parse_tokens(tokens)? {
                    Cst::I(i) => Some(Cst::int(-i)),
                    Cst::R(r) => Some(Cst::rat(-r)),
                    Cst::B(_) => None,
                },
                "/" => {
                    let num = parse_tokens(tokens)?.to_rat()?;
                    let den = parse_tokens(tokens)?.to_rat()?;
                    if den.is_zero() {
                        None
                    } else {
                        Some(Cst::rat(num / den))
                    }
                }
                _ => None,
            }?;
            if tokens.next()? == ")" {
                Some(res)
            } else {
                None
            }
        }
        ")" => None,
        atom => atom_cst(atom),
    }
}

/// Parses a numeral or decimal atom.
fn atom_cst(atom: &str) -> Option<Cst> {
    if let Some((int_part, dec_part)) = atom.split_once('.') {
        let digits: String = [int_part, dec_part].concat();
        let num: Int = digits.parse().ok()?;
        let den: Int = num::pow(Int::from(10), dec_part.len());
        Some(Cst::rat(Rat::new(num, den)))
    } else {
        let i: Int = atom.parse().ok()?;
        Some(Cst::int(i))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_plain_constants() {
        assert_eq!(cst_of_sexpr("42"), Some(Cst::int(42)));
        assert_eq!(cst_of_sexpr("true"), Some(Cst::bool(true)));
        assert_eq!(cst_of_sexpr("(- 7)"), Some(Cst::int(-7)));
    }

    #[test]
    fn parse_real_constants() {
        assert_eq!(
            cst_of_sexpr("0.5"),
            Some(Cst::rat(Rat::new(1.into(), 2.into())))
        );
        assert_eq!(
            cst_of_sexpr("(/ 1.0 2.0)"),
            Some(Cst::rat(Rat::new(1.into(), 2.into())))
        );
        assert_eq!(
            cst_of_sexpr("(- (/ 3 2))"),
            Some(Cst::rat(Rat::new((-3).into(), 2.into())))
        );
    }

    #[test]
    fn parse_rejects_non_constants() {
        assert_eq!(cst_of_sexpr("(+ 1 2)"), None);
        assert_eq!(cst_of_sexpr("x"), None);
        assert_eq!(cst_of_sexpr("(/ 1 0)"), None);
    }

    #[test]
    fn idents_by_role() {
        assert_eq!(Ident::of_str("pos_0"), Ident::Dim(Role::Pos, 0));
        assert_eq!(Ident::of_str("out_2"), Ident::Dim(Role::Out, 2));
        assert_eq!(
            Ident::of_str("cand_split_0"),
            Ident::Other("cand_split_0".into())
        );
    }
}
