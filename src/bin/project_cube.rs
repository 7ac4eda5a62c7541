//! Interactive diagnostic for the projector: builds a small built-in toy
//! cube, lets `--var` flags pick which of its uninterpreted constants to
//! eliminate, runs `project_literals`, and prints the residual cube plus the
//! final flag. Not a production solver CLI — there is no parser for SMT-LIB
//! or any other input format; the cube is fixed in source.

use std::env;

use num_traits::One;
use yices_mbp::term::{Monomial, Rational, TermOccurrence};
use yices_mbp::{project_literals, Model, ProjectorFlag, Sort, TermStore, Value};

fn parse_vars(args: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let mut it = args.iter();
    while let Some(a) = it.next() {
        if a == "--var" {
            if let Some(name) = it.next() {
                out.push(name.clone());
            }
        }
    }
    out
}

/// The built-in toy cube: `x = y + 1`, `x >= a`, `a <= b`, `P(x)`, with
/// model `x=5, y=4, a=1, b=3, P(5)=true`.
fn build_toy_cube(store: &mut TermStore, model: &mut Model) -> (Vec<(String, TermOccurrence)>, Vec<TermOccurrence>) {
    let x = store.mk_uninterpreted("x", Sort::Real);
    let y = store.mk_uninterpreted("y", Sort::Real);
    let a = store.mk_uninterpreted("a", Sort::Real);
    let b = store.mk_uninterpreted("b", Sort::Real);

    model.assign(x.term(), Value::Rational(Rational::from_integer(5.into())));
    model.assign(y.term(), Value::Rational(Rational::from_integer(4.into())));
    model.assign(a.term(), Value::Rational(Rational::from_integer(1.into())));
    model.assign(b.term(), Value::Rational(Rational::from_integer(3.into())));

    let y_plus_1 = store.mk_polynomial(vec![
        Monomial { coeff: Rational::one(), var: Some(y.term()) },
        Monomial { coeff: Rational::one(), var: None },
    ]);
    let eq_x = store.mk_eq(x, TermOccurrence::positive(y_plus_1));

    let x_ge_a = store.mk_arith_ge(store.mk_polynomial(vec![
        Monomial { coeff: Rational::one(), var: Some(x.term()) },
        Monomial { coeff: -Rational::one(), var: Some(a.term()) },
    ]));
    let a_le_b = store.mk_arith_ge(store.mk_polynomial(vec![
        Monomial { coeff: -Rational::one(), var: Some(a.term()) },
        Monomial { coeff: Rational::one(), var: Some(b.term()) },
    ]));

    let p_of_x = store.mk_app("P", vec![x]);
    model.assign(p_of_x.term(), Value::Bool(true));

    let named = vec![
        ("x".to_string(), x),
        ("y".to_string(), y),
        ("a".to_string(), a),
        ("b".to_string(), b),
    ];
    (named, vec![eq_x, x_ge_a, a_le_b, p_of_x])
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env::var("RUST_LOG").unwrap_or_else(|_| "project_cube=info,yices_mbp=info".into()))
        .with_target(false)
        .compact()
        .init();

    let args: Vec<String> = env::args().collect();
    let requested = parse_vars(&args[1..]);

    let mut store = TermStore::new();
    let mut model = Model::new();
    let (named, literals) = build_toy_cube(&mut store, &mut model);

    let names: Vec<&str> = if requested.is_empty() {
        println!("No --var given; defaulting to eliminating `x`. Pass e.g. `--var x --var y`.");
        vec!["x"]
    } else {
        requested.iter().map(|s| s.as_str()).collect()
    };

    let vars: Vec<TermOccurrence> = named
        .iter()
        .filter(|(name, _)| names.contains(&name.as_str()))
        .map(|(_, occ)| *occ)
        .collect();

    let mut out = Vec::new();
    let flag = project_literals(&mut store, &model, &literals, &vars, &mut out);

    println!("eliminated: {:?}", names);
    println!("flag: {}", flag);
    if flag == ProjectorFlag::NoError {
        println!("residual cube ({} literals):", out.len());
        for lit in &out {
            println!("  {}", lit);
        }
    }

    Ok(())
}
