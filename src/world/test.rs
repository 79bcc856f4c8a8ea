//! Tests over the world variants.

crate::prelude!();

use std::f64::consts::PI;

use num::ToPrimitive;

use expr::{Cst, Typ, Var};
use solver::Role;
use world::*;

/// Float equality within a tiny absolute tolerance.
fn assert_close(got: &[f64], want: &[f64]) {
    assert_eq!(got.len(), want.len(), "{:?} vs {:?}", got, want);
    for (g, w) in got.iter().zip(want) {
        assert!((g - w).abs() < 1e-9, "{:?} vs {:?}", got, want);
    }
}

#[test]
fn euclidean_step_and_move() {
    let mut world = Euclidean::new(3).unwrap();
    assert_eq!(world.position(), &[0., 0., 0.]);

    let next = world.step(&[1., 2., 3.], &[10., -2., 0.5]).unwrap();
    assert_close(&next, &[11., 0., 3.5]);

    world.move_by(&[1., 1., 1.]).unwrap();
    world.move_by(&[-1., 0., 2.]).unwrap();
    assert_close(world.position(), &[0., 1., 3.]);
}

#[test]
fn euclidean_zero_dim_fail() {
    let err = Euclidean::new(0).unwrap_err();
    assert!(err.to_string().contains("at least one dimension"));
}

#[test]
fn euclidean_shape_fail() {
    let world = Euclidean::new(3).unwrap();
    assert!(world.step(&[0., 0., 0.], &[1., 2.]).is_err());
    assert!(world.step(&[0., 0.], &[1., 2., 3.]).is_err());
}

#[test]
fn elevator_hint_point() {
    let world = Elevator::new();
    assert_eq!(world.point("check me out").unwrap(), &vec![1., 2., 0.]);
}

#[test]
fn elevator_toggle_on_arrival() {
    let world = Elevator::new();
    // Arriving on the portal from the ground layer rides up.
    let next = world.step(&[0., 0., 0.], &[1., 2.]).unwrap();
    assert_close(&next, &[1., 2., 1.]);
    // Arriving from the upper layer rides down.
    let next = world.step(&[0., 2., 1.], &[1., 0.]).unwrap();
    assert_close(&next, &[1., 2., 0.]);
}

#[test]
fn elevator_toggle_standing_still() {
    let world = Elevator::new();
    // A zero movement on the portal still toggles: the post-movement
    // position is the portal.
    let next = world.step(&[1., 2., 0.], &[0., 0.]).unwrap();
    assert_close(&next, &[1., 2., 1.]);
    let next = world.step(&next, &[0., 0.]).unwrap();
    assert_close(&next, &[1., 2., 0.]);
}

#[test]
fn elevator_no_toggle_off_portal() {
    let world = Elevator::new();
    let next = world.step(&[30., 20., 1.], &[-29., -28.]).unwrap();
    assert_close(&next, &[1., -8., 1.]);
    // Off-layer z passes through unchanged when off the portal.
    let next = world.step(&[5., 5., 7.], &[1., 1.]).unwrap();
    assert_close(&next, &[6., 6., 7.]);
}

#[test]
fn simple_time_clock() {
    let world = SimpleTime::new();
    // 3-4-5 triangle, the clock advances by exactly 5.
    let next = world.step(&[0., 0., 0.], &[3., 4.]).unwrap();
    assert_close(&next, &[3., 4., 5.]);
    // Rounded elapsed time: |(1, 1)| = 1.41... rounds to 1.
    let next = world.step(&[0., 0., 10.], &[1., 1.]).unwrap();
    assert_close(&next, &[1., 1., 11.]);
}

#[test]
fn spherical_starts_on_equator() {
    let world = Spherical::new(2.).unwrap();
    assert_close(world.position(), &[0., PI / 2., 2.]);
    assert!(Spherical::new(0.).is_err());
    assert!(Spherical::new(-1.).is_err());
}

#[test]
fn spherical_plain_step() {
    let world = Spherical::new(1.).unwrap();
    let next = world.step(&[0., 1., 1.], &[0.5, 0.5]).unwrap();
    assert_close(&next, &[0.5, 1.5, 1.]);
}

#[test]
fn spherical_pole_reflection() {
    let world = Spherical::new(1.).unwrap();
    // Crossing the north pole reflects phi and flips theta by pi.
    let next = world.step(&[0., 0.1, 1.], &[0., -0.3]).unwrap();
    assert_close(&next, &[PI, 0.2, 1.]);
}

#[test]
fn spherical_theta_wraps() {
    let world = Spherical::new(1.).unwrap();
    let next = world.step(&[6., 1., 1.], &[1., 0.]).unwrap();
    assert!((0. ..std::f64::consts::TAU).contains(&next[0]));
    assert_close(&next, &[7. - std::f64::consts::TAU, 1., 1.]);
}

#[test]
fn spherical_great_circle_length() {
    let mut world = Spherical::new(2.).unwrap();
    world.save_point("home").unwrap();
    world.move_by(&[PI / 2., 0.]).unwrap();
    // A quarter of the equator.
    let len = world.measure_length("home").unwrap();
    assert_close(&len, &[2. * PI / 2.]);
}

#[test]
fn spherical_conforms_wraps_theta() {
    let world = Spherical::new(1.).unwrap();
    // theta 0 and tau are the same azimuth.
    assert!(world.conforms(
        &[0., 1., 1.],
        &[std::f64::consts::TAU - 1e-9, 1., 1.]
    ));
    assert!(!world.conforms(&[0., 1., 1.], &[0., 1.1, 1.]));
    assert!(!world.conforms(&[0., 1., 1.], &[0., f64::NAN, 1.]));
}

#[test]
fn ode_curve_follows_constants() {
    let world = NonUniqueOde::new();
    assert_eq!(world.constants(), (-2, 1));
    assert_close(world.position(), &[0., 0.]);

    // Flat between the constants, parabolic outside.
    let next = world.step(&[0., 0.], &[-3.]).unwrap();
    assert_close(&next, &[-3., -1.]);
    let next = world.step(&[0., 0.], &[3.]).unwrap();
    assert_close(&next, &[3., 4.]);
    let next = world.step(&[0., 0.], &[0.5]).unwrap();
    assert_close(&next, &[0.5, 0.]);
}

#[test]
fn ode_law_is_the_reference() {
    let world = NonUniqueOde::new();
    // Candidates answer the law, not the curve: d = 2 * sqrt(|y|).
    assert_close(&world.model_step(&[16.], &[]).unwrap(), &[8.]);
    assert_close(&world.model_step(&[-16.], &[]).unwrap(), &[8.]);
    assert_close(&world.model_step(&[0.], &[]).unwrap(), &[0.]);
    assert_eq!(world.model_dims(), (1, 0, 1));
}

#[test]
fn ode_restart_resets() {
    let mut world = NonUniqueOde::new();
    world.move_by(&[5.]).unwrap();
    world.save_point("far").unwrap();
    world.restart().unwrap();

    let (a, b) = world.constants();
    assert!((-10..0).contains(&a));
    assert!((0..10).contains(&b));
    assert_close(world.position(), &[0., 0.]);
    assert!(world.points().is_empty());
}

#[test]
fn ode_measures_rejected() {
    let mut world = NonUniqueOde::new();
    world.save_point("p").unwrap();
    assert!(world.measure_angle("p", "p").is_err());
    assert!(world.measure_length("p").is_err());
}

#[test]
fn points_are_instance_owned() {
    let mut w_1 = Euclidean::new(2).unwrap();
    let mut w_2 = Euclidean::new(2).unwrap();

    w_1.move_by(&[1., 1.]).unwrap();
    w_1.save_point("p").unwrap();
    w_2.save_point("p").unwrap();

    // Same name, different worlds, different snapshots.
    assert_eq!(w_1.point("p").unwrap(), &vec![1., 1.]);
    assert_eq!(w_2.point("p").unwrap(), &vec![0., 0.]);

    // Snapshots are copies, later movement does not rewrite them.
    w_1.move_by(&[3., 3.]).unwrap();
    assert_eq!(w_1.point("p").unwrap(), &vec![1., 1.]);
}

#[test]
fn unknown_point_fail() {
    let world = Euclidean::new(2).unwrap();
    let err = world.point("nope").unwrap_err();
    assert_eq!(err.to_string(), "domain error: unknown saved point `nope`");
}

#[test]
fn euclidean_angle() {
    let mut world = Euclidean::new(2).unwrap();
    world.move_by(&[1., 0.]).unwrap();
    world.save_point("a").unwrap();
    world.move_by(&[-1., 1.]).unwrap();
    world.save_point("b").unwrap();
    world.move_by(&[0., -1.]).unwrap();

    let angle = world.measure_angle("a", "b").unwrap();
    assert!((angle - PI / 2.).abs() < 1e-9);

    // Degenerate: a point on the current position has no direction.
    world.save_point("here").unwrap();
    assert!(world.measure_angle("here", "a").is_err());
}

#[test]
fn euclidean_length() {
    let mut world = Euclidean::new(3).unwrap();
    world.save_point("origin").unwrap();
    world.move_by(&[1., 2., 3.]).unwrap();
    let len = world.measure_length("origin").unwrap();
    assert_close(&len, &[-1., -2., -3.]);
}

#[test]
fn no_exact_encoding_for_sampled_variants() {
    let mut cx = equiv::EncodeCx::new(Typ::Int, "ref");
    let pos: Vec<_> = (0..3)
        .map(|i| expr::Expr::new_var(solver::var(Role::Pos, i, Typ::Int)))
        .collect();
    let mov: Vec<_> = (0..2)
        .map(|i| expr::Expr::new_var(solver::var(Role::Mov, i, Typ::Int)))
        .collect();

    assert!(SimpleTime::new().encode(&mut cx, &pos, &mov).is_err());
    assert!(Spherical::new(1.)
        .unwrap()
        .encode(&mut cx, &pos, &mov)
        .is_err());
}

/// Evaluates a world's integer encoding on concrete inputs.
///
/// Checks the context's domain constraints hold on the inputs, then returns
/// the evaluated outputs.
fn eval_encoding(world: &dyn World, pos: &[i64], mov: &[i64]) -> Vec<i64> {
    let mut env: Map<Var, Cst> = Map::new();
    let mut pos_exprs = Vec::with_capacity(pos.len());
    for (idx, val) in pos.iter().enumerate() {
        let var = solver::var(Role::Pos, idx, Typ::Int);
        env.insert(var.clone(), Cst::int(Int::from(*val)));
        pos_exprs.push(expr::Expr::new_var(var));
    }
    let mut mov_exprs = Vec::with_capacity(mov.len());
    for (idx, val) in mov.iter().enumerate() {
        let var = solver::var(Role::Mov, idx, Typ::Int);
        env.insert(var.clone(), Cst::int(Int::from(*val)));
        mov_exprs.push(expr::Expr::new_var(var));
    }

    let mut cx = equiv::EncodeCx::new(Typ::Int, "ref");
    let terms = world.encode(&mut cx, &pos_exprs, &mov_exprs).unwrap();

    assert!(cx.decls().is_empty(), "integer encodings need no auxiliaries");
    for constraint in cx.asserts() {
        assert_eq!(constraint.eval(&env).unwrap().as_bool(), Some(true));
    }

    terms
        .iter()
        .map(|term| {
            term.eval(&env)
                .unwrap()
                .as_int()
                .expect("integer encoding")
                .to_i64()
                .expect("small test values")
        })
        .collect()
}

#[test]
fn euclidean_encoding_matches_step() {
    let world = Euclidean::new(3).unwrap();
    for (pos, mov) in [
        ([0, 0, 0], [1, 2, 3]),
        ([100, -50, 7], [-100, 50, -7]),
        ([-3, 8, 2], [5, 5, 5]),
    ] {
        let pos_f: Vec<f64> = pos.iter().map(|n| *n as f64).collect();
        let mov_f: Vec<f64> = mov.iter().map(|n| *n as f64).collect();
        let concrete: Vec<i64> = world
            .step(&pos_f, &mov_f)
            .unwrap()
            .into_iter()
            .map(|x| x as i64)
            .collect();
        assert_eq!(eval_encoding(&world, &pos, &mov), concrete);
    }
}

#[test]
fn elevator_encoding_matches_step() {
    let world = Elevator::new();
    // z must be on a layer, that is the encoding's domain constraint.
    for (pos, mov) in [
        ([0, 0, 0], [1, 2]),
        ([0, 2, 1], [1, 0]),
        ([1, 2, 0], [0, 0]),
        ([1, 2, 1], [0, 0]),
        ([5, 5, 0], [1, 1]),
        ([30, 20, 1], [-29, -28]),
    ] {
        let pos_f: Vec<f64> = pos.iter().map(|n| *n as f64).collect();
        let mov_f: Vec<f64> = mov.iter().map(|n| *n as f64).collect();
        let concrete: Vec<i64> = world
            .step(&pos_f, &mov_f)
            .unwrap()
            .into_iter()
            .map(|x| x as i64)
            .collect();
        assert_eq!(eval_encoding(&world, &pos, &mov), concrete);
    }
}

#[test]
fn ode_encoding_needs_reals() {
    let world = NonUniqueOde::new();
    let mut cx = equiv::EncodeCx::new(Typ::Int, "ref");
    let y = expr::Expr::new_var(solver::var(Role::Pos, 0, Typ::Int));
    assert!(world.encode(&mut cx, &[y], &[]).is_err());
}

#[test]
fn ode_encoding_solves_the_law() {
    let world = NonUniqueOde::new();
    let mut cx = equiv::EncodeCx::new(Typ::Rat, "ref");
    let y_var = solver::var(Role::Pos, 0, Typ::Rat);
    let y = expr::Expr::new_var(y_var.clone());

    let terms = world.encode(&mut cx, &[y], &[]).unwrap();
    assert_eq!(terms.len(), 1);
    assert_eq!(cx.decls().len(), 1);

    // The auxiliary equations pin the derivative: for y = 16, the
    // constraints `d * d = 4 * |y|` and `d >= 0` only accept d = 8.
    let mut env: Map<Var, Cst> = Map::new();
    env.insert(y_var, Cst::rat(Rat::from_integer(Int::from(16))));
    env.insert(
        cx.decls()[0].clone(),
        Cst::rat(Rat::from_integer(Int::from(8))),
    );
    for constraint in cx.asserts() {
        assert_eq!(constraint.eval(&env).unwrap().as_bool(), Some(true));
    }
    assert_eq!(
        terms[0].eval(&env).unwrap(),
        Cst::rat(Rat::from_integer(Int::from(8))),
    );

    // A negative derivative satisfies the square but not the sign
    // constraint.
    let mut env: Map<Var, Cst> = Map::new();
    env.insert(
        solver::var(Role::Pos, 0, Typ::Rat),
        Cst::rat(Rat::from_integer(Int::from(16))),
    );
    env.insert(
        cx.decls()[0].clone(),
        Cst::rat(Rat::from_integer(Int::from(-8))),
    );
    let verdicts: Vec<bool> = cx
        .asserts()
        .iter()
        .map(|c| c.eval(&env).unwrap().as_bool().unwrap())
        .collect();
    assert!(verdicts.contains(&false));
}
