//! Defines the expression structure used to represent symbolic transitions.
//!
//! An [`Expr`] is a term in the solver's language: constants, typed
//! variables, and operator applications. World encodings and candidate
//! encodings both produce `Expr`s, one per output dimension. Expressions can
//! be written to a solver through [`rsmt2`]'s printing traits, and evaluated
//! concretely through [`Expr::eval`], which is how the crate checks that a
//! symbolic encoding agrees with its concrete transition.

crate::prelude!();

use rsmt2::print::{Expr2Smt, Sort2Smt, Sym2Smt};


pub use crate::{build_expr as build, build_typ};

/// A type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Typ {
    /// Bool type.
    Bool,
    /// Integer type.
    Int,
    /// Rational type.
    Rat,
}
impl Typ {
    /// Creates a bool type.
    pub fn bool() -> Self {
        Self::Bool
    }
    /// Creates an integer type.
    pub fn int() -> Self {
        Self::Int
    }
    /// Creates a rational type.
    pub fn rat() -> Self {
        Self::Rat
    }

    /// True if the type is an arithmetic one.
    pub fn is_arith(self) -> bool {
        match self {
            Self::Bool => false,
            Self::Int | Self::Rat => true,
        }
    }
}
impl Sort2Smt for Typ {
    fn sort_to_smt2<W: Write>(&self, w: &mut W) -> SmtRes<()> {
        write!(
            w,
            "{}",
            match self {
                Self::Bool => "Bool",
                Self::Int => "Int",
                Self::Rat => "Real",
            }
        )?;
        Ok(())
    }
}

/// Constants.
///
/// Currently only booleans, integers and rationals are supported.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Cst {
    /// Bool constant.
    B(bool),
    /// Integer constant.
    I(Int),
    /// Rational constant.
    R(Rat),
}
impl HasTyp for Cst {
    fn typ(&self) -> Typ {
        match self {
            Self::B(_) => Typ::Bool,
            Self::I(_) => Typ::Int,
            Self::R(_) => Typ::Rat,
        }
    }
}
impl Cst {
    /// Creates a boolean constant.
    pub fn bool(b: bool) -> Self {
        Cst::B(b)
    }
    /// Creates an integer constant.
    pub fn int<I: Into<Int>>(i: I) -> Self {
        Cst::I(i.into())
    }
    /// Creates a rational constant.
    pub fn rat<R: Into<Rat>>(r: R) -> Self {
        Cst::R(r.into())
    }

    /// Bool value accessor.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::B(b) => Some(*b),
            Self::I(_) | Self::R(_) => None,
        }
    }
    /// Integer value accessor.
    pub fn as_int(&self) -> Option<&Int> {
        match self {
            Self::I(i) => Some(i),
            Self::B(_) | Self::R(_) => None,
        }
    }

    /// Rational view of an arithmetic constant.
    pub fn to_rat(&self) -> Option<Rat> {
        match self {
            Self::I(i) => Some(Rat::from_integer(i.clone())),
            Self::R(r) => Some(r.clone()),
            Self::B(_) => None,
        }
    }
}
impl Expr2Smt<()> for Cst {
    fn expr_to_smt2<W: Write>(&self, w: &mut W, _: ()) -> SmtRes<()> {
        match self {
            Self::B(b) => write!(w, "{}", b)?,
            Self::I(i) => {
                if i.sign() == Sign::Minus {
                    write!(w, "(- {})", -i)?
                } else {
                    write!(w, "{}", i)?
                }
            }
            Self::R(r) => {
                let (num, den) = (r.numer(), r.denom());
                if num.sign() == Sign::Minus {
                    write!(w, "(- (/ {} {}))", -num, den)?
                } else {
                    write!(w, "(/ {} {})", num, den)?
                }
            }
        }
        Ok(())
    }
}

/// Operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Op {
    /// If-then-else.
    Ite,
    /// Boolean implication.
    Implies,
    /// Addition.
    Add,
    /// Subtraction, or unary minus.
    Sub,
    /// Multiplication.
    Mul,
    /// Rational division.
    Div,
    /// Integer division.
    IDiv,
    /// Integer modulo.
    Mod,
    /// Greater than or equal to.
    Ge,
    /// Less than or equal to.
    Le,
    /// Greater than.
    Gt,
    /// Less than.
    Lt,
    /// Equality.
    Eq,
    /// Boolean negation.
    Not,
    /// Boolean conjunction.
    And,
    /// Boolean disjunction.
    Or,
}
impl Op {
    /// True if `self` is an arithmetic relation.
    pub fn is_arith_relation(self) -> bool {
        match self {
            Self::Ge | Self::Le | Self::Gt | Self::Lt => true,
            Self::Ite
            | Self::Implies
            | Self::Add
            | Self::Sub
            | Self::Mul
            | Self::Div
            | Self::IDiv
            | Self::Mod
            | Self::Eq
            | Self::Not
            | Self::And
            | Self::Or => false,
        }
    }

    /// Minimal arity of `self`.
    pub fn min_arity(self) -> usize {
        match self {
            Self::Not | Self::Add | Self::Sub => 1,
            Self::Mod
            | Self::Mul
            | Self::Div
            | Self::IDiv
            | Self::And
            | Self::Or
            | Self::Implies
            | Self::Eq
            | Self::Le
            | Self::Lt
            | Self::Ge
            | Self::Gt => 2,
            Self::Ite => 3,
        }
    }

    /// Maximal arity for `self`, `None` if infinite.
    pub fn max_arity(self) -> Option<usize> {
        match self {
            Self::Not => Some(1),
            Self::Add
            | Self::Sub
            | Self::Mul
            | Self::And
            | Self::Or
            | Self::Implies
            | Self::Eq
            | Self::Le
            | Self::Lt
            | Self::Ge
            | Self::Gt => None,
            Self::Mod | Self::Div | Self::IDiv => Some(2),
            Self::Ite => Some(3),
        }
    }

    /// Type-checks an operator application.
    pub fn type_check(self, args: &[Expr]) -> Res<Typ> {
        if args.len() < self.min_arity() {
            bail!(
                "`{}` expects at least {} argument(s)",
                self,
                self.min_arity(),
            )
        }
        if let Some(max) = self.max_arity() {
            if args.len() > max {
                bail!("`{}` expects at most {} argument(s)", self, max)
            }
        }

        let typ = match self {
            Self::Ite => {
                let typ = args[0].typ();
                if typ != Typ::Bool {
                    bail!("expected first argument of type `bool`, got `{}`", typ)
                }

                let thn_typ = args[1].typ();
                let els_typ = args[2].typ();

                if thn_typ != els_typ {
                    bail!(
                        "`{}`'s second and third arguments should have the same type, got `{}` and `{}`",
                        self, thn_typ, els_typ,
                    )
                }

                thn_typ
            }
            Self::Implies | Self::And | Self::Or | Self::Not => {
                if args.iter().any(|e| e.typ() != Typ::Bool) {
                    bail!("`{}`'s arguments must all be boolean expressions", self)
                }
                Typ::Bool
            }

            Self::Add
            | Self::Sub
            | Self::Mul
            | Self::Div
            | Self::IDiv
            | Self::Mod
            | Self::Le
            | Self::Ge
            | Self::Lt
            | Self::Gt => {
                let mut typs = args.iter().map(Expr::typ);
                let first = typs.next().expect("at least one argument");
                if !first.is_arith() {
                    bail!(
                        "`{}`'s arguments must have an arithmetic type, unexpected type `{}`",
                        self,
                        first,
                    )
                }
                for typ in typs {
                    if typ != first {
                        bail!(
                            "`{}`'s arguments must all have the same type, found `{}` and `{}`",
                            self,
                            first,
                            typ,
                        )
                    }
                }
                if (self == Self::IDiv || self == Self::Mod) && first != Typ::Int {
                    bail!(
                        "`{}` can only be applied to integer arguments, found `{}`",
                        self,
                        first,
                    )
                }

                if self == Self::Div {
                    Typ::Rat
                } else if self == Self::Mod {
                    Typ::Int
                } else if self.is_arith_relation() {
                    Typ::Bool
                } else {
                    first
                }
            }

            Self::Eq => {
                let mut typs = args.iter().map(Expr::typ);
                let first = typs.next().unwrap();
                for typ in typs {
                    if typ != first {
                        bail!(
                            "`{}`'s arguments must all have the same type, found `{}` and `{}`",
                            self,
                            first,
                            typ,
                        )
                    }
                }
                Typ::Bool
            }
        };

        Ok(typ)
    }
}
impl Expr2Smt<()> for Op {
    fn expr_to_smt2<W: Write>(&self, w: &mut W, _: ()) -> SmtRes<()> {
        write!(
            w,
            "{}",
            match self {
                Self::Ite => "ite",
                Self::Implies => "=>",
                Self::Add => "+",
                Self::Sub => "-",
                Self::Mul => "*",
                Self::Div => "/",
                Self::IDiv => "div",
                Self::Mod => "mod",
                Self::Ge => ">=",
                Self::Le => "<=",
                Self::Gt => ">",
                Self::Lt => "<",
                Self::Eq => "=",
                Self::Not => "not",
                Self::And => "and",
                Self::Or => "or",
            }
        )?;
        Ok(())
    }
}

/// Trait implemented by everything that has a type.
pub trait HasTyp: fmt::Display {
    /// Type accessor.
    fn typ(&self) -> Typ;
}

/// A solver variable.
///
/// Variables are scoped to a single solver query: the equivalence engine
/// creates fresh position/movement/output variables for each query and
/// discards them afterwards.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Var {
    /// Variable identifier.
    id: String,
    /// Type of the variable.
    typ: Typ,
}
impl Var {
    /// Constructor.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use worldcheck::expr::{Var, Typ};
    /// # #[allow(dead_code)]
    /// let var = Var::new("pos_0", Typ::Int);
    /// ```
    pub fn new<S: Into<String>>(id: S, typ: Typ) -> Self {
        Self { id: id.into(), typ }
    }

    /// Identifier accessor.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use worldcheck::expr::{Var, Typ};
    /// let var = Var::new("pos_0", Typ::Int);
    /// assert_eq!(var.id(), "pos_0");
    /// ```
    pub fn id(&self) -> &str {
        &self.id
    }
}
impl HasTyp for Var {
    fn typ(&self) -> Typ {
        self.typ
    }
}
impl Sym2Smt<()> for Var {
    fn sym_to_smt2<W: Write>(&self, w: &mut W, _: ()) -> SmtRes<()> {
        write!(w, "{}", self.id)?;
        Ok(())
    }
}

/// The expression structure.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Expr {
    /// A constant.
    Cst(Cst),
    /// A variable.
    Var(Var),
    /// An operator application.
    App {
        /// The operator.
        op: Op,
        /// The arguments.
        args: Vec<Expr>,
    },
}
impl Expr {
    /// Variable constructor.
    pub fn new_var(var: Var) -> Self {
        Self::Var(var)
    }

    /// Constant constructor.
    pub fn new_cst(cst: Cst) -> Self {
        Self::Cst(cst)
    }

    /// Operator application constructor, type-checks the application.
    pub fn new_op(op: Op, args: Vec<Self>) -> Res<Self> {
        op.type_check(&args)?;
        Ok(Self::App { op, args })
    }

    /// True if `self` is a constant.
    pub fn is_cst(&self) -> bool {
        match self {
            Self::Cst(_) => true,
            Self::Var(_) | Self::App { .. } => false,
        }
    }
    /// True if `self` is a variable.
    pub fn is_var(&self) -> bool {
        match self {
            Self::Var(_) => true,
            Self::Cst(_) | Self::App { .. } => false,
        }
    }

    /// Iterator over the variables of `self`, with repetitions.
    pub fn vars<'a>(&'a self, action: &mut impl FnMut(&'a Var)) {
        match self {
            Self::Cst(_) => (),
            Self::Var(var) => action(var),
            Self::App { args, .. } => {
                for arg in args {
                    arg.vars(action)
                }
            }
        }
    }

    /// Evaluates `self` under an assignment of its variables.
    ///
    /// Fails on unassigned variables and ill-typed applications. This is the
    /// concrete semantics of the term language: the conformance tests use it
    /// to check that a world's symbolic encoding agrees with its concrete
    /// `step`, and counterexample round-trips use it to re-derive expected
    /// outputs from a model.
    pub fn eval(&self, env: &Map<Var, Cst>) -> Res<Cst> {
        match self {
            Self::Cst(cst) => Ok(cst.clone()),
            Self::Var(var) => env
                .get(var)
                .cloned()
                .ok_or_else(|| format!("no value for variable `{}`", var).into()),
            Self::App { op, args } => {
                op.type_check(args)?;
                eval::app(*op, args, env)
            }
        }
    }
}
impl HasTyp for Expr {
    fn typ(&self) -> Typ {
        match self {
            Self::Var(var) => var.typ(),
            Self::Cst(cst) => cst.typ(),
            Self::App { op, args } => match op.type_check(args) {
                Ok(typ) => typ,
                Err(e) => panic!("illegal operator application `{}`: {}", self, e),
            },
        }
    }
}
impl Expr2Smt<()> for Expr {
    fn expr_to_smt2<W: Write>(&self, w: &mut W, i: ()) -> SmtRes<()> {
        match self {
            Self::Cst(cst) => cst.expr_to_smt2(w, ()),
            Self::Var(var) => var.sym_to_smt2(w, i),
            Self::App { op, args } => {
                write!(w, "(")?;
                op.expr_to_smt2(w, ())?;
                for arg in args {
                    write!(w, " ")?;
                    arg.expr_to_smt2(w, i)?
                }
                write!(w, ")")?;
                Ok(())
            }
        }
    }
}

/// Concrete evaluation of operator applications.
mod eval {
    use super::*;

    /// Evaluates an application. Assumes the application type-checks.
    pub fn app(op: Op, args: &[Expr], env: &Map<Var, Cst>) -> Res<Cst> {
        match op {
            Op::Ite => {
                let cnd = args[0].eval(env)?.as_bool().expect("type-checked ite");
                if cnd {
                    args[1].eval(env)
                } else {
                    args[2].eval(env)
                }
            }
            Op::Not => {
                let b = args[0].eval(env)?.as_bool().expect("type-checked not");
                Ok(Cst::bool(!b))
            }
            Op::And => bool_fold(args, env, true, |acc, b| acc && b),
            Op::Or => bool_fold(args, env, false, |acc, b| acc || b),
            Op::Implies => {
                // `a => b => c` associates as `(a and b) => c`.
                let mut csts = Vec::with_capacity(args.len());
                for arg in args {
                    csts.push(arg.eval(env)?.as_bool().expect("type-checked implies"))
                }
                let conclusion = csts.pop().expect("arity-checked implies");
                Ok(Cst::bool(!csts.into_iter().all(|b| b) || conclusion))
            }

            Op::Add | Op::Sub | Op::Mul => arith_fold(op, args, env),
            Op::Div => {
                let (lft, rgt) = arith_pair(args, env)?;
                if rgt.is_zero() {
                    bail!("division by zero in `{}`", args[1])
                }
                Ok(Cst::rat(lft / rgt))
            }
            Op::IDiv | Op::Mod => {
                let lft = args[0].eval(env)?;
                let rgt = args[1].eval(env)?;
                let (lft, rgt) = match (lft, rgt) {
                    (Cst::I(l), Cst::I(r)) => (l, r),
                    _ => bail!("`{}` applied to non-integer arguments", op),
                };
                if rgt.is_zero() {
                    bail!("division by zero in `{}`", args[1])
                }
                if op == Op::IDiv {
                    Ok(Cst::int(lft / rgt))
                } else {
                    Ok(Cst::int(lft % rgt))
                }
            }

            Op::Ge | Op::Le | Op::Gt | Op::Lt => {
                // Chained comparisons hold pairwise over adjacent arguments.
                let mut csts = Vec::with_capacity(args.len());
                for arg in args {
                    csts.push(
                        arg.eval(env)?
                            .to_rat()
                            .ok_or_else(|| format!("`{}` applied to a boolean", op))?,
                    )
                }
                let holds = csts.windows(2).all(|pair| match op {
                    Op::Ge => pair[0] >= pair[1],
                    Op::Le => pair[0] <= pair[1],
                    Op::Gt => pair[0] > pair[1],
                    Op::Lt => pair[0] < pair[1],
                    _ => unreachable!(),
                });
                Ok(Cst::bool(holds))
            }
            Op::Eq => {
                let first = args[0].eval(env)?;
                for arg in &args[1..] {
                    if arg.eval(env)? != first {
                        return Ok(Cst::bool(false));
                    }
                }
                Ok(Cst::bool(true))
            }
        }
    }

    /// Folds boolean arguments.
    fn bool_fold(
        args: &[Expr],
        env: &Map<Var, Cst>,
        init: bool,
        fold: impl Fn(bool, bool) -> bool,
    ) -> Res<Cst> {
        let mut acc = init;
        for arg in args {
            acc = fold(acc, arg.eval(env)?.as_bool().expect("type-checked bool op"))
        }
        Ok(Cst::bool(acc))
    }

    /// Evaluates a binary application's arguments as rationals.
    fn arith_pair(args: &[Expr], env: &Map<Var, Cst>) -> Res<(Rat, Rat)> {
        let lft = args[0]
            .eval(env)?
            .to_rat()
            .ok_or_else(|| format!("`{}` is not arithmetic", args[0]))?;
        let rgt = args[1]
            .eval(env)?
            .to_rat()
            .ok_or_else(|| format!("`{}` is not arithmetic", args[1]))?;
        Ok((lft, rgt))
    }

    /// Folds `+`, `-` or `*` over arithmetic arguments, preserving their type.
    fn arith_fold(op: Op, args: &[Expr], env: &Map<Var, Cst>) -> Res<Cst> {
        let mut csts = Vec::with_capacity(args.len());
        for arg in args {
            csts.push(arg.eval(env)?)
        }
        // Unary minus.
        if op == Op::Sub && csts.len() == 1 {
            return match csts.pop().expect("non-empty") {
                Cst::I(i) => Ok(Cst::int(-i)),
                Cst::R(r) => Ok(Cst::rat(-r)),
                Cst::B(_) => bail!("`-` applied to a boolean"),
            };
        }
        let all_int = csts.iter().all(|c| matches!(c, Cst::I(_)));
        if all_int {
            let mut iter = csts.into_iter().map(|c| match c {
                Cst::I(i) => i,
                _ => unreachable!(),
            });
            let mut acc = iter.next().expect("arity-checked");
            for i in iter {
                acc = match op {
                    Op::Add => acc + i,
                    Op::Sub => acc - i,
                    Op::Mul => acc * i,
                    _ => unreachable!(),
                }
            }
            Ok(Cst::int(acc))
        } else {
            let mut iter = csts.into_iter().map(|c| c.to_rat());
            let mut acc = iter
                .next()
                .expect("arity-checked")
                .ok_or_else(|| format!("`{}` applied to a boolean", op))?;
            for r in iter {
                let r = r.ok_or_else(|| format!("`{}` applied to a boolean", op))?;
                acc = match op {
                    Op::Add => acc + r,
                    Op::Sub => acc - r,
                    Op::Mul => acc * r,
                    _ => unreachable!(),
                }
            }
            Ok(Cst::rat(acc))
        }
    }
}

/// Packs basic trait implementations.
mod trait_impls {
    use super::*;

    impl fmt::Display for Typ {
        fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
            match self {
                Self::Bool => write!(fmt, "bool"),
                Self::Int => write!(fmt, "int"),
                Self::Rat => write!(fmt, "rat"),
            }
        }
    }

    impl fmt::Display for Op {
        fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
            match self {
                Self::Ite => write!(fmt, "ite"),
                Self::Implies => write!(fmt, "=>"),
                Self::Add => write!(fmt, "+"),
                Self::Sub => write!(fmt, "-"),
                Self::Mul => write!(fmt, "*"),
                Self::Div => write!(fmt, "/"),
                Self::IDiv => write!(fmt, "div"),
                Self::Mod => write!(fmt, "%"),
                Self::Ge => write!(fmt, ">="),
                Self::Le => write!(fmt, "<="),
                Self::Gt => write!(fmt, ">"),
                Self::Lt => write!(fmt, "<"),
                Self::Eq => write!(fmt, "="),
                Self::Not => write!(fmt, "not"),
                Self::And => write!(fmt, "and"),
                Self::Or => write!(fmt, "or"),
            }
        }
    }

    impl fmt::Display for Cst {
        fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
            match self {
                Self::B(b) => b.fmt(fmt),
                Self::I(i) => {
                    if i.sign() == Sign::Minus {
                        write!(fmt, "(- {})", -i)
                    } else {
                        i.fmt(fmt)
                    }
                }
                Self::R(r) => {
                    let (num, den) = (r.numer(), r.denom());
                    match (num.sign(), den.sign()) {
                        (Sign::Minus, Sign::Minus) => write!(fmt, "(/ {} {})", -num, -den),
                        (Sign::Minus, _) => write!(fmt, "(- (/ {} {}))", -num, den),
                        (_, Sign::Minus) => write!(fmt, "(- (/ {} {}))", num, -den),
                        _ => write!(fmt, "(/ {} {})", num, den),
                    }
                }
            }
        }
    }
    impl From<bool> for Cst {
        fn from(b: bool) -> Self {
            Self::B(b)
        }
    }
    impl From<Int> for Cst {
        fn from(i: Int) -> Self {
            Self::I(i)
        }
    }
    impl From<usize> for Cst {
        fn from(n: usize) -> Self {
            Int::from_bytes_be(Sign::Plus, &n.to_be_bytes()).into()
        }
    }
    impl From<(usize, usize)> for Cst {
        fn from((num, den): (usize, usize)) -> Self {
            let (num, den): (Int, Int) = (num.into(), den.into());
            Rat::new(num, den).into()
        }
    }
    impl From<Rat> for Cst {
        fn from(r: Rat) -> Self {
            Self::R(r)
        }
    }

    impl fmt::Display for Var {
        fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
            write!(fmt, "{}", self.id)
        }
    }

    impl fmt::Display for Expr {
        fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
            match self {
                Self::Cst(cst) => cst.fmt(fmt),
                Self::Var(var) => var.fmt(fmt),
                Self::App { op, args } => {
                    write!(fmt, "({}", op)?;
                    for arg in args {
                        write!(fmt, " {}", arg)?
                    }
                    write!(fmt, ")")
                }
            }
        }
    }
    impl<C> From<C> for Expr
    where
        C: Into<Cst>,
    {
        fn from(cst: C) -> Self {
            Self::Cst(cst.into())
        }
    }
    impl From<(Op, Vec<Expr>)> for Expr {
        fn from((op, args): (Op, Vec<Expr>)) -> Self {
            Self::App { op, args }
        }
    }
    impl From<Var> for Expr {
        fn from(var: Var) -> Self {
            Self::Var(var)
        }
    }
}
