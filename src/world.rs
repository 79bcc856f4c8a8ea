//! World variants: hidden environments with a position and a transition rule.
//!
//! A [`World`] owns a position vector and a deterministic transition rule.
//! The rule is defined twice, and the two definitions must stay in lockstep:
//!
//! - [`World::step`] is the concrete transition over numeric vectors, used by
//!   the sampling checker and by [`World::move_by`];
//! - [`World::encode`] is the same transition over solver terms, used by the
//!   equivalence engine.
//!
//! The conformance tests in this module sample concrete states and check the
//! two agree; a drift between them silently breaks the soundness of every
//! symbolic check for that variant, so new variants must extend those tests.
//!
//! Variants whose rule leaves decidable arithmetic (trigonometry, rounded
//! norms) do not have an exact encoding: their `encode` fails with a domain
//! error and only the sampling checker applies to them.

crate::prelude!();

use std::f64::consts::{PI, TAU};

use rand::Rng;

use equiv::EncodeCx;
use expr::{Expr, Op, Typ};
use sample::{Candidate, Plan, Round, Trial};

#[cfg(test)]
mod test;

/// Comparison tolerance for real-valued variants.
const REAL_TOLERANCE: f64 = 1e-5;

/// A hidden environment with a position and a deterministic transition rule.
///
/// Positions are owned by the world instance; saved points are copied at save
/// time and never aliased, and each instance owns its own saved-point map.
pub trait World {
    /// Number of position dimensions.
    fn dim(&self) -> usize;
    /// Number of movement dimensions.
    fn dim_move(&self) -> usize;

    /// Candidate signature as (inputs, movement inputs, outputs).
    ///
    /// Defaults to `(dim, dim_move, dim)`. Variants that check a different
    /// law than their own transition (NonUniqueOde) override this.
    fn model_dims(&self) -> (usize, usize, usize) {
        (self.dim(), self.dim_move(), self.dim())
    }

    /// Describes the world and the candidate signature it expects.
    fn description(&self) -> String;

    /// Current position, length [`dim`](Self::dim).
    fn position(&self) -> &[f64];

    /// Saved points accessor.
    fn points(&self) -> &Map<String, Vec<f64>>;
    /// Saved points accessor, mutable.
    fn points_mut(&mut self) -> &mut Map<String, Vec<f64>>;

    /// The concrete transition rule, a pure function of its inputs.
    fn step(&self, pos: &[f64], mov: &[f64]) -> Res<Vec<f64>>;

    /// Reference answer for a candidate input.
    ///
    /// Defaults to [`step`](Self::step); NonUniqueOde overrides it with the
    /// universal law its candidates are checked against.
    fn model_step(&self, pos: &[f64], mov: &[f64]) -> Res<Vec<f64>> {
        self.step(pos, mov)
    }

    /// Applies a movement to the live position.
    fn move_by(&mut self, mov: &[f64]) -> Res<()>;

    /// Snapshots the current position under `name`.
    ///
    /// The snapshot is a copy: it does not change when the live position
    /// later moves. Saving twice under the same name overwrites.
    fn save_point(&mut self, name: &str) -> Res<()> {
        let pos = self.position().to_vec();
        self.points_mut().insert(name.into(), pos);
        Ok(())
    }

    /// Angle in radians between two saved points, seen from the current
    /// position.
    fn measure_angle(&self, left: &str, right: &str) -> Res<f64> {
        let pos = self.position();
        let a = sub(self.point(left)?, pos);
        let b = sub(self.point(right)?, pos);
        angle_between(&a, &b)
    }

    /// Vector from the current position to a saved point.
    fn measure_length(&self, name: &str) -> Res<Vec<f64>> {
        Ok(sub(self.point(name)?, self.position()))
    }

    /// Redraws the world's constants and resets position and saved points.
    ///
    /// Only some variants support this; the default is a domain error.
    fn restart(&mut self) -> Res<()> {
        bail!(Error::domain("this world cannot be restarted"))
    }

    /// The variant's sampling plan: randomized rounds and literal boundary
    /// trials.
    fn plan(&self) -> Plan;

    /// Whether a candidate output matches the expected output.
    ///
    /// The default is how the integer-valued variants compare: the
    /// expectation is cast to an integer, and the candidate's raw output
    /// must equal it exactly. The candidate side is never truncated, a
    /// near-integer answer does not conform. Real-valued variants override
    /// with a tolerance.
    fn conforms(&self, expected: &[f64], got: &[f64]) -> bool {
        expected.len() == got.len()
            && expected
                .iter()
                .zip(got)
                .all(|(e, g)| g.is_finite() && (*e as i64) as f64 == *g)
    }

    /// The symbolic transition rule, mirroring [`step`](Self::step).
    ///
    /// Produces one output formula per output dimension, over the given
    /// position and movement terms. Domain constraints on the inputs (the
    /// Elevator's `z ∈ {0, 1}`) and auxiliary variables go through `cx`.
    ///
    /// Variants with no exact encoding in decidable arithmetic fail with a
    /// domain error.
    fn encode(&self, cx: &mut EncodeCx, pos: &[Expr], mov: &[Expr]) -> Res<Vec<Expr>>;

    /// Checks a candidate by randomized and boundary sampling.
    ///
    /// Can only disprove, never prove: a `true` answer means no trial
    /// falsified the candidate. Never fails for a correct candidate;
    /// candidate panics, wrong arities and budget overruns all count as
    /// falsifications.
    fn check(&self, candidate: &Arc<dyn Candidate>) -> bool {
        sample::check(self, candidate)
    }

    /// A saved point, by name.
    fn point(&self, name: &str) -> Res<&Vec<f64>> {
        self.points()
            .get(name)
            .ok_or_else(|| Error::domain(format!("unknown saved point `{}`", name)))
    }
}

/// Component-wise difference `a - b`.
fn sub(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(a, b)| a - b).collect()
}

/// Euclidean norm.
fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Angle in radians between two vectors, by the dot-product formula.
fn angle_between(a: &[f64], b: &[f64]) -> Res<f64> {
    let (na, nb) = (norm(a), norm(b));
    if na == 0. || nb == 0. {
        bail!(Error::domain("saved point coincides with current position"))
    }
    let dot: f64 = a.iter().zip(b).map(|(a, b)| a * b).sum();
    Ok((dot / (na * nb)).clamp(-1., 1.).acos())
}

/// Shape check for a movement or position vector.
fn check_shape(what: &str, len: usize, want: usize) -> Res<()> {
    if len != want {
        bail!(Error::domain(format!(
            "{} has {} dimension(s), expected {}",
            what, len, want
        )))
    }
    Ok(())
}

/// Python-style closeness: relative tolerance `1e-9`.
fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * f64::max(a.abs(), b.abs())
}

/// Flat space: the position just accumulates movement.
///
/// The simplest variant, and the only one with a configurable dimension.
#[derive(Debug, Clone)]
pub struct Euclidean {
    dim: usize,
    position: Vec<f64>,
    points: Map<String, Vec<f64>>,
}
impl Euclidean {
    /// Constructor. The position starts at the origin.
    pub fn new(dim: usize) -> Res<Self> {
        if dim == 0 {
            bail!(Error::config("a world needs at least one dimension"))
        }
        Ok(Self {
            dim,
            position: vec![0.; dim],
            points: Map::new(),
        })
    }
}
impl World for Euclidean {
    fn dim(&self) -> usize {
        self.dim
    }
    fn dim_move(&self) -> usize {
        self.dim
    }

    fn description(&self) -> String {
        format!(
            "This world takes {dim} values as a movement vector. The candidate takes a \
             {dim}-element position and a {dim}-element movement vector, and must return \
             the {dim}-element predicted new position.",
            dim = self.dim,
        )
    }

    fn position(&self) -> &[f64] {
        &self.position
    }
    fn points(&self) -> &Map<String, Vec<f64>> {
        &self.points
    }
    fn points_mut(&mut self) -> &mut Map<String, Vec<f64>> {
        &mut self.points
    }

    fn step(&self, pos: &[f64], mov: &[f64]) -> Res<Vec<f64>> {
        check_shape("position", pos.len(), self.dim)?;
        check_shape("movement vector", mov.len(), self.dim)?;
        Ok(pos.iter().zip(mov).map(|(p, m)| p + m).collect())
    }

    fn move_by(&mut self, mov: &[f64]) -> Res<()> {
        self.position = self.step(&self.position, mov)?;
        Ok(())
    }

    fn plan(&self) -> Plan {
        Plan::new(vec![Round::uniform_int(100, self.dim, self.dim, 1_000)])
    }

    fn encode(&self, _cx: &mut EncodeCx, pos: &[Expr], mov: &[Expr]) -> Res<Vec<Expr>> {
        check_shape("position", pos.len(), self.dim)?;
        check_shape("movement vector", mov.len(), self.dim)?;
        pos.iter()
            .zip(mov)
            .map(|(p, m)| Expr::new_op(Op::Add, vec![p.clone(), m.clone()]))
            .collect()
    }
}

/// Flat 3d space with a portal: landing exactly on the portal's xy-position
/// teleports between the two layers.
///
/// Movement is 2-dimensional and applies to the xy-plane. After the movement
/// is applied, if the new xy-position equals the portal *and* the z-value
/// before the movement is a layer (0 or 1), z toggles to the other layer.
/// The toggle tests the *post*-movement xy-position, so arriving at the
/// portal from outside toggles too.
///
/// Standing still exactly on the portal also toggles, since a zero movement
/// still "lands" there. That case is hard to probe from outside, but it is
/// not special-cased.
#[derive(Debug, Clone)]
pub struct Elevator {
    position: Vec<f64>,
    portal: [i64; 2],
    points: Map<String, Vec<f64>>,
}
impl Elevator {
    /// Constructor, with the portal at its default xy-position `[1, 2]`.
    ///
    /// A point named `"check me out"` is pre-saved at the portal's ground
    /// layer, as a hint.
    pub fn new() -> Self {
        Self::with_portal([1, 2])
    }

    /// Constructor with an explicit portal xy-position.
    pub fn with_portal(portal: [i64; 2]) -> Self {
        let mut points = Map::new();
        points.insert(
            "check me out".to_string(),
            vec![portal[0] as f64, portal[1] as f64, 0.],
        );
        Self {
            position: vec![0.; 3],
            portal,
            points,
        }
    }
}
impl Default for Elevator {
    fn default() -> Self {
        Self::new()
    }
}
impl World for Elevator {
    fn dim(&self) -> usize {
        3
    }
    fn dim_move(&self) -> usize {
        2
    }

    fn description(&self) -> String {
        "This world takes 2 values as a movement vector. The candidate takes a 3-element \
         position and a 2-element movement vector, and must return the 3-element predicted \
         new position."
            .into()
    }

    fn position(&self) -> &[f64] {
        &self.position
    }
    fn points(&self) -> &Map<String, Vec<f64>> {
        &self.points
    }
    fn points_mut(&mut self) -> &mut Map<String, Vec<f64>> {
        &mut self.points
    }

    fn step(&self, pos: &[f64], mov: &[f64]) -> Res<Vec<f64>> {
        check_shape("position", pos.len(), 3)?;
        check_shape("movement vector", mov.len(), 2)?;
        let (x, y, z) = (pos[0] + mov[0], pos[1] + mov[1], pos[2]);
        let at_portal = x == self.portal[0] as f64 && y == self.portal[1] as f64;
        let z = if at_portal && z == 0. {
            1.
        } else if at_portal && z == 1. {
            0.
        } else {
            z
        };
        Ok(vec![x, y, z])
    }

    fn move_by(&mut self, mov: &[f64]) -> Res<()> {
        self.position = self.step(&self.position, mov)?;
        Ok(())
    }

    fn plan(&self) -> Plan {
        // The two literals land on and next to the portal's x-column, to
        // probe the toggle cheaply from both layers.
        Plan::new(vec![
            Round::uniform_int(100, 3, 2, 1_000),
            Round::uniform_int(30, 3, 2, 10),
        ])
        .with_literals(vec![
            Trial::new(vec![30., 20., 1.], vec![-29., -28.]),
            Trial::new(vec![30., 20., 0.], vec![-29., -28.]),
        ])
    }

    fn encode(&self, cx: &mut EncodeCx, pos: &[Expr], mov: &[Expr]) -> Res<Vec<Expr>> {
        check_shape("position", pos.len(), 3)?;
        check_shape("movement vector", mov.len(), 2)?;

        // Reachable states only have z on a layer.
        cx.assert(Expr::new_op(
            Op::Or,
            vec![
                Expr::new_op(Op::Eq, vec![pos[2].clone(), cx.num(0)])?,
                Expr::new_op(Op::Eq, vec![pos[2].clone(), cx.num(1)])?,
            ],
        )?)?;

        let new_x = Expr::new_op(Op::Add, vec![pos[0].clone(), mov[0].clone()])?;
        let new_y = Expr::new_op(Op::Add, vec![pos[1].clone(), mov[1].clone()])?;

        // The toggle condition is on the post-movement xy-position; the
        // pre-movement z is only constrained to a layer, never compared
        // against 0/1 here, so the toggle is the complement `1 - z`.
        let at_portal = Expr::new_op(
            Op::And,
            vec![
                Expr::new_op(Op::Eq, vec![new_x.clone(), cx.num(self.portal[0])])?,
                Expr::new_op(Op::Eq, vec![new_y.clone(), cx.num(self.portal[1])])?,
            ],
        )?;
        let toggled = Expr::new_op(Op::Sub, vec![cx.num(1), pos[2].clone()])?;
        let new_z = Expr::new_op(Op::Ite, vec![at_portal, toggled, pos[2].clone()])?;

        Ok(vec![new_x, new_y, new_z])
    }
}

/// Flat 2d movement with a clock: the third axis advances by the rounded
/// Euclidean norm of each movement.
///
/// An analogue of a lightspeed/proper-time relation. The rounding puts the
/// rule outside decidable arithmetic, so there is no exact symbolic encoding
/// and only the sampling checker applies.
#[derive(Debug, Clone)]
pub struct SimpleTime {
    position: Vec<f64>,
    points: Map<String, Vec<f64>>,
}
impl SimpleTime {
    /// Constructor. Position and clock start at zero.
    pub fn new() -> Self {
        Self {
            position: vec![0.; 3],
            points: Map::new(),
        }
    }
}
impl Default for SimpleTime {
    fn default() -> Self {
        Self::new()
    }
}
impl World for SimpleTime {
    fn dim(&self) -> usize {
        3
    }
    fn dim_move(&self) -> usize {
        2
    }

    fn description(&self) -> String {
        "This world takes 2 values as a movement vector. The candidate takes a 3-element \
         position and a 2-element movement vector, and must return the 3-element predicted \
         new position."
            .into()
    }

    fn position(&self) -> &[f64] {
        &self.position
    }
    fn points(&self) -> &Map<String, Vec<f64>> {
        &self.points
    }
    fn points_mut(&mut self) -> &mut Map<String, Vec<f64>> {
        &mut self.points
    }

    fn step(&self, pos: &[f64], mov: &[f64]) -> Res<Vec<f64>> {
        check_shape("position", pos.len(), 3)?;
        check_shape("movement vector", mov.len(), 2)?;
        let elapsed = (mov[0] * mov[0] + mov[1] * mov[1]).sqrt().round();
        Ok(vec![pos[0] + mov[0], pos[1] + mov[1], pos[2] + elapsed])
    }

    fn move_by(&mut self, mov: &[f64]) -> Res<()> {
        self.position = self.step(&self.position, mov)?;
        Ok(())
    }

    fn plan(&self) -> Plan {
        Plan::new(vec![
            Round::uniform_int(100, 3, 2, 1_000),
            Round::uniform_int(30, 3, 2, 10),
        ])
    }

    fn encode(&self, _cx: &mut EncodeCx, _pos: &[Expr], _mov: &[Expr]) -> Res<Vec<Expr>> {
        bail!(Error::domain(
            "the time rule uses a rounded square root and has no exact symbolic encoding; \
             use the sampling checker"
        ))
    }
}

/// A closed surface: spherical coordinates on a sphere of fixed radius.
///
/// The position is `[θ, φ, r]` with azimuth `θ ∈ [0, 2π)` and polar angle
/// `φ ∈ [0, π]`; `r` never changes. Movement adds angular deltas, then
/// normalizes: `θ` wraps modulo `2π`, and `φ` leaving `[0, π]` reflects off
/// the pole it crosses, flipping `θ` by `π`. The flip is the sign ambiguity
/// inherent to spherical coordinates at a pole, not a discontinuity of the
/// surface itself.
#[derive(Debug, Clone)]
pub struct Spherical {
    radius: f64,
    position: Vec<f64>,
    points: Map<String, Vec<f64>>,
}
impl Spherical {
    /// Constructor. Starts on the equator at `θ = 0`.
    pub fn new(radius: f64) -> Res<Self> {
        if !radius.is_finite() || radius <= 0. {
            bail!(Error::config("radius must be positive"))
        }
        Ok(Self {
            radius,
            position: vec![0., PI / 2., radius],
            points: Map::new(),
        })
    }

    /// Sphere radius.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Cartesian coordinates of a surface point.
    fn cartesian(&self, theta: f64, phi: f64) -> [f64; 3] {
        [
            self.radius * phi.sin() * theta.cos(),
            self.radius * phi.sin() * theta.sin(),
            self.radius * phi.cos(),
        ]
    }

    /// Wraps `θ` to `[0, 2π)` and reflects `φ` into `[0, π]`.
    fn normalize(mut theta: f64, mut phi: f64) -> (f64, f64) {
        while !(0. ..=PI).contains(&phi) {
            if phi < 0. {
                phi = -phi;
            } else {
                phi = TAU - phi;
            }
            // Crossing a pole flips the azimuth.
            theta += PI;
        }
        (theta.rem_euclid(TAU), phi)
    }
}
impl World for Spherical {
    fn dim(&self) -> usize {
        3
    }
    fn dim_move(&self) -> usize {
        2
    }

    fn description(&self) -> String {
        "This world takes 2 values as a movement vector. The candidate takes a 3-element \
         position and a 2-element movement vector, and must return the 3-element predicted \
         new position. Coordinates are real-valued; outputs are compared within a small \
         tolerance."
            .into()
    }

    fn position(&self) -> &[f64] {
        &self.position
    }
    fn points(&self) -> &Map<String, Vec<f64>> {
        &self.points
    }
    fn points_mut(&mut self) -> &mut Map<String, Vec<f64>> {
        &mut self.points
    }

    fn step(&self, pos: &[f64], mov: &[f64]) -> Res<Vec<f64>> {
        check_shape("position", pos.len(), 3)?;
        check_shape("movement vector", mov.len(), 2)?;
        let (theta, phi) = Self::normalize(pos[0] + mov[0], pos[1] + mov[1]);
        Ok(vec![theta, phi, self.radius])
    }

    fn move_by(&mut self, mov: &[f64]) -> Res<()> {
        self.position = self.step(&self.position, mov)?;
        Ok(())
    }

    fn measure_angle(&self, left: &str, right: &str) -> Res<f64> {
        let cur = self.cartesian(self.position[0], self.position[1]);
        let lft = self.point(left)?;
        let rgt = self.point(right)?;
        let a = sub(&self.cartesian(lft[0], lft[1]), &cur);
        let b = sub(&self.cartesian(rgt[0], rgt[1]), &cur);
        angle_between(&a, &b)
    }

    fn measure_length(&self, name: &str) -> Res<Vec<f64>> {
        let cur = self.cartesian(self.position[0], self.position[1]);
        let oth = self.point(name)?;
        let oth = self.cartesian(oth[0], oth[1]);
        let dot: f64 = cur.iter().zip(&oth).map(|(a, b)| a * b).sum();
        let sigma = (dot / (self.radius * self.radius)).clamp(-1., 1.).acos();
        Ok(vec![self.radius * sigma])
    }

    fn plan(&self) -> Plan {
        // Movement stays within half a circumference so a trial never
        // crosses both poles at once.
        Plan::new(vec![Round::uniform(
            100,
            vec![(0., TAU), (0., PI), (self.radius, self.radius)],
            vec![(-PI, PI), (-PI / 2., PI / 2.)],
        )])
    }

    fn conforms(&self, expected: &[f64], got: &[f64]) -> bool {
        if got.len() != 3 || got.iter().any(|g| !g.is_finite()) {
            return false;
        }
        let theta_diff = (got[0] - expected[0]).rem_euclid(TAU);
        let theta_diff = theta_diff.min(TAU - theta_diff);
        theta_diff <= REAL_TOLERANCE
            && (got[1] - expected[1]).abs() <= REAL_TOLERANCE
            && (got[2] - self.radius).abs() <= REAL_TOLERANCE
    }

    fn encode(&self, _cx: &mut EncodeCx, _pos: &[Expr], _mov: &[Expr]) -> Res<Vec<Expr>> {
        bail!(Error::domain(
            "the spherical rule uses trigonometry and has no exact symbolic encoding; \
             use the sampling checker"
        ))
    }
}

/// A 1-dimensional curve in the plane, shaped by two hidden constants.
///
/// The position is always `[x, y(x)]` where `y` is the piecewise curve
///
/// ```text
/// y(x) = -(x - A)²   if x < A
///      = 0           if A ≤ x ≤ B
///      = (x - B)²    if x > B
/// ```
///
/// with `A ≤ 0 ≤ B`. Every such curve solves the same differential equation
/// `dy/dx = 2·√|y|` with `y(0) = 0`; `A` and `B` pick one solution out of
/// that non-unique family. [`restart`](World::restart) redraws them, which
/// changes the curve but not the law.
///
/// Candidates are checked against the *law*, not the curve: they take a
/// single `y` value and must return the derivative magnitude.
#[derive(Debug, Clone)]
pub struct NonUniqueOde {
    x: f64,
    a: i64,
    b: i64,
    position: Vec<f64>,
    points: Map<String, Vec<f64>>,
}
impl NonUniqueOde {
    /// Constructor, with the fixed initial constants `A = -2`, `B = 1`.
    pub fn new() -> Self {
        let mut world = Self {
            x: 0.,
            a: -2,
            b: 1,
            position: vec![0., 0.],
            points: Map::new(),
        };
        world.position = vec![world.x, world.curve(world.x)];
        world
    }

    /// The curve's constants `(A, B)`.
    pub fn constants(&self) -> (i64, i64) {
        (self.a, self.b)
    }

    /// The curve `y(x)` for the current constants.
    fn curve(&self, x: f64) -> f64 {
        let (a, b) = (self.a as f64, self.b as f64);
        if x < a {
            -(x - a) * (x - a)
        } else if x > b {
            (x - b) * (x - b)
        } else {
            0.
        }
    }

    /// The universal law: the derivative magnitude for a `y` value.
    fn law(y: f64) -> f64 {
        2. * y.abs().sqrt()
    }
}
impl Default for NonUniqueOde {
    fn default() -> Self {
        Self::new()
    }
}
impl World for NonUniqueOde {
    fn dim(&self) -> usize {
        2
    }
    fn dim_move(&self) -> usize {
        1
    }
    fn model_dims(&self) -> (usize, usize, usize) {
        // Candidates see only a y value and answer the derivative.
        (1, 0, 1)
    }

    fn description(&self) -> String {
        "In this world the candidate takes only a single value, the y coordinate, and must \
         return a single value. The task is to find the universal law governing this space. \
         Hint: restart the world, see what changes, and what doesn't."
            .into()
    }

    fn position(&self) -> &[f64] {
        &self.position
    }
    fn points(&self) -> &Map<String, Vec<f64>> {
        &self.points
    }
    fn points_mut(&mut self) -> &mut Map<String, Vec<f64>> {
        &mut self.points
    }

    fn step(&self, pos: &[f64], mov: &[f64]) -> Res<Vec<f64>> {
        check_shape("position", pos.len(), 2)?;
        check_shape("movement vector", mov.len(), 1)?;
        let x = pos[0] + mov[0];
        Ok(vec![x, self.curve(x)])
    }

    fn model_step(&self, pos: &[f64], mov: &[f64]) -> Res<Vec<f64>> {
        check_shape("candidate input", pos.len(), 1)?;
        check_shape("movement vector", mov.len(), 0)?;
        Ok(vec![Self::law(pos[0])])
    }

    fn move_by(&mut self, mov: &[f64]) -> Res<()> {
        let next = self.step(&self.position, mov)?;
        self.x = next[0];
        self.position = next;
        Ok(())
    }

    fn measure_angle(&self, _left: &str, _right: &str) -> Res<f64> {
        bail!(Error::domain(
            "measuring angles is not needed in this world"
        ))
    }

    fn measure_length(&self, _name: &str) -> Res<Vec<f64>> {
        bail!(Error::domain(
            "measuring lengths is not needed in this world"
        ))
    }

    fn restart(&mut self) -> Res<()> {
        let mut rng = rand::thread_rng();
        self.a = rng.gen_range(-10..0);
        self.b = rng.gen_range(0..10);
        self.x = 0.;
        self.position = vec![self.x, self.curve(self.x)];
        self.points.clear();
        Ok(())
    }

    fn plan(&self) -> Plan {
        Plan::new(vec![Round::uniform_int(100, 1, 0, 50)])
    }

    fn conforms(&self, expected: &[f64], got: &[f64]) -> bool {
        got.len() == 1 && got[0].is_finite() && close(expected[0], got[0])
    }

    fn encode(&self, cx: &mut EncodeCx, pos: &[Expr], mov: &[Expr]) -> Res<Vec<Expr>> {
        check_shape("candidate input", pos.len(), 1)?;
        check_shape("movement vector", mov.len(), 0)?;
        if cx.typ() != Typ::Rat {
            bail!(Error::config(
                "the derivative law is only encodable over the reals"
            ))
        }

        // The law `d = 2·√|y|` is the unique nonnegative solution of
        // `d² = 4·|y|`, which nonlinear real arithmetic can express.
        let y = pos[0].clone();
        let abs_y = Expr::new_op(
            Op::Ite,
            vec![
                Expr::new_op(Op::Lt, vec![y.clone(), cx.num(0)])?,
                Expr::new_op(Op::Sub, vec![y.clone()])?,
                y,
            ],
        )?;
        let d = cx.fresh("deriv");
        cx.assert(Expr::new_op(
            Op::Eq,
            vec![
                Expr::new_op(Op::Mul, vec![d.clone(), d.clone()])?,
                Expr::new_op(Op::Mul, vec![cx.num(4), abs_y])?,
            ],
        )?)?;
        cx.assert(Expr::new_op(Op::Ge, vec![d.clone(), cx.num(0)])?)?;
        Ok(vec![d])
    }
}
