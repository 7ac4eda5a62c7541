//! Three-phase model-based projection orchestrator.
//!
//! [`Projector`] ties the term graph ([`crate::term`]), the driving
//! [`crate::model::Model`], and the two sub-engines
//! ([`crate::subst::EliminationSubstitution`]/[`crate::subst::TermSubstitutor`]
//! and [`crate::arith::ArithProjector`]) together into the pipeline described
//! together: a generic equality-elimination pass, a linear
//! arithmetic virtual-substitution pass, and a value-closure fallback. Each
//! phase only shrinks the set of surviving eliminable variables (`EVars`);
//! the first phase to signal an error makes the rest of the pipeline a
//! no-op, and that error is what `run` finally returns.

#![forbid(unsafe_code)]

use std::collections::HashSet;
use std::fmt;

use crate::arith::ArithProjector;
use crate::config::ProjectorConfig;
use crate::model::Model;
use crate::subst::{self, EliminationSubstitution, TermSubstitutor};
use crate::term::{TermId, TermKind, TermOccurrence, TermStore};

/// Why an arithmetic literal was rejected as non-linear, for
/// [`ProjectorFlag::NonLinear`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NonLinearKind {
    /// A two-argument `App` headed `"*"` — the only power-product shape this
    /// crate's term graph can express, e.g. `x*x >= 0`.
    PowerProduct,
    /// Any other term kind found where only a constant, polynomial, or
    /// uninterpreted constant is allowed.
    Unsupported(String),
}

impl fmt::Display for NonLinearKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NonLinearKind::PowerProduct => write!(f, "power product"),
            NonLinearKind::Unsupported(desc) => write!(f, "unsupported term kind ({desc})"),
        }
    }
}

/// Sticky status returned by [`Projector::run`].
///
/// `NoError` is the only successful outcome; every other variant is
/// first-wins — once set, later phases are skipped entirely. `ErrorInConvert`
/// and the `String`-carrying variants fold in the `Display` output of this
/// crate's collaborators (`Model`, `ArithProjector`, the substitutors), which
/// already carry their own `thiserror` types, rather than re-deriving a
/// parallel code space here.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProjectorFlag {
    #[error("no error")]
    NoError,
    #[error("too many variables to eliminate: {0} exceeds the configured limit")]
    TooManyVars(usize),
    #[error("non-linear subterm in an arithmetic literal: {0}")]
    NonLinear(NonLinearKind),
    #[error("arithmetic projector rejected a constraint: {0}")]
    BadArithLiteral(String),
    #[error("model could not evaluate a surviving variable: {0}")]
    ErrorInEval(String),
    #[error("a model value has no term representation in this store")]
    ErrorInConvert,
    #[error("term substitution failed while closing the projection: {0}")]
    ErrorInSubst(String),
}

impl ProjectorFlag {
    pub fn is_ok(&self) -> bool {
        matches!(self, ProjectorFlag::NoError)
    }
}

/// Model-based projection of a conjunction of literals over a set of
/// existentially quantified uninterpreted constants.
///
/// Construct with [`Projector::new`], feed literals one at a time with
/// [`Projector::add_literal`], then call [`Projector::run`] once. There is no
/// explicit `dispose`: every on-demand sub-engine this type creates during
/// `run` is a local value dropped at the end of its phase, so resources are
/// released on the error path the same as on success, via ordinary Rust scope
/// exit.
pub struct Projector {
    vars_to_elim: HashSet<TermId>,
    evars: Vec<TermId>,
    arith_vars_to_keep: HashSet<TermId>,
    arith_vars: Vec<TermId>,
    gen_literals: Vec<TermOccurrence>,
    arith_literals: Vec<TermOccurrence>,
    flag: ProjectorFlag,
}

impl Projector {
    /// Construct a projector for `vars` (each must be a positive-polarity
    /// uninterpreted constant; checked by debug assertion). Fails with
    /// `TooManyVars` if `vars.len()` exceeds `config.max_vars_to_elim`.
    /// Duplicate entries in `vars` are folded (a variable is only ever an
    /// EVar once).
    pub fn new(store: &TermStore, vars: &[TermOccurrence], config: ProjectorConfig) -> Result<Self, ProjectorFlag> {
        if vars.len() > config.max_vars_to_elim {
            return Err(ProjectorFlag::TooManyVars(vars.len()));
        }
        let mut vars_to_elim = HashSet::with_capacity(vars.len());
        let mut evars = Vec::with_capacity(vars.len());
        for &v in vars {
            debug_assert!(!v.is_negated(), "vars_to_elim must be positive-polarity occurrences");
            debug_assert!(store.is_uninterpreted_const(v), "vars_to_elim must be uninterpreted constants");
            if vars_to_elim.insert(v.term()) {
                evars.push(v.term());
            }
        }
        Ok(Projector {
            vars_to_elim,
            evars,
            arith_vars_to_keep: HashSet::new(),
            arith_vars: Vec::new(),
            gen_literals: Vec::new(),
            arith_literals: Vec::new(),
            flag: ProjectorFlag::NoError,
        })
    }

    /// Add one literal of the cube. Classifies it into `GenLiterals` or
    /// `ArithLiterals`; arithmetic literals are additionally scanned
    /// for arithmetic variables outside `vars_to_elim`, which are collected
    /// into `ArithVarsToKeep`/`ArithVars` for the arithmetic phase. A
    /// variable kind the classifier cannot represent (e.g. a power product)
    /// signals `NonLinear` (sticky: does not stop later `add_literal` calls
    /// from running, but `run` will short-circuit immediately).
    pub fn add_literal(&mut self, store: &TermStore, model: &Model, lit: TermOccurrence) {
        debug_assert!(
            model.holds(store, lit).unwrap_or(false),
            "every literal added to a projector must hold in its driving model"
        );
        if store.is_arithmetic_literal(lit) {
            self.classify_arith_literal(store, lit);
            self.arith_literals.push(lit);
        } else {
            self.gen_literals.push(lit);
        }
    }

    fn classify_arith_literal(&mut self, store: &TermStore, lit: TermOccurrence) {
        let args: Vec<TermId> = match store.kind(lit) {
            TermKind::ArithmeticEqAtom(p) | TermKind::ArithmeticGeAtom(p) => vec![*p],
            TermKind::ArithmeticBinEqAtom(a, b) => vec![*a, *b],
            _ => return,
        };
        for arg in args {
            self.classify_arith_arg(store, arg);
        }
    }

    fn classify_arith_arg(&mut self, store: &TermStore, arg: TermId) {
        match store.poly_monomials(arg) {
            Ok(monomials) => {
                for m in monomials {
                    if let Some(v) = m.var {
                        self.classify_arith_var(store, v);
                    }
                }
            }
            Err(_) => self.signal(ProjectorFlag::NonLinear(describe_nonlinear(store, arg))),
        }
    }

    /// Processing a single variable found inside an arithmetic literal:
    /// variables already slated for elimination are left
    /// alone (the arithmetic phase will pick them up), other uninterpreted
    /// constants join `ArithVarsToKeep`/`ArithVars`, and anything else is a
    /// modeling error this crate cannot linearize.
    fn classify_arith_var(&mut self, store: &TermStore, v: TermId) {
        if self.vars_to_elim.contains(&v) {
            return;
        }
        if store.is_uninterpreted_const(TermOccurrence::positive(v)) {
            if self.arith_vars_to_keep.insert(v) {
                self.arith_vars.push(v);
            }
        } else {
            self.signal(ProjectorFlag::NonLinear(describe_nonlinear(store, v)));
        }
    }

    fn signal(&mut self, flag: ProjectorFlag) {
        if self.flag.is_ok() {
            self.flag = flag;
        }
    }

    /// Run the three phases (generic → arithmetic → value-closure) and
    /// append the residual cube to `out` on success. `out` is left
    /// untouched on error. Returns the final sticky flag either way.
    pub fn run(&mut self, store: &mut TermStore, model: &Model, out: &mut Vec<TermOccurrence>) -> ProjectorFlag {
        let span = tracing::info_span!(
            "mbp.run",
            vars = self.evars.len(),
            gen_literals = self.gen_literals.len(),
            arith_literals = self.arith_literals.len(),
        );
        let _enter = span.enter();

        if !self.flag.is_ok() {
            tracing::warn!(flag = %self.flag, "skipping run: literal classification already failed");
            return self.flag.clone();
        }

        self.run_generic_phase(store);
        if self.flag.is_ok() {
            self.run_arith_phase(store, model);
        }
        if self.flag.is_ok() {
            self.run_value_closure_phase(store, model);
        }

        if !self.flag.is_ok() {
            tracing::warn!(flag = %self.flag, "projection failed");
            return self.flag.clone();
        }

        out.extend(self.gen_literals.drain(..));
        out.extend(self.arith_literals.drain(..));
        tracing::debug!(residual = out.len(), "projection succeeded");
        ProjectorFlag::NoError
    }

    /// Equality substitution from the generic literals.
    fn run_generic_phase(&mut self, store: &mut TermStore) {
        let span = tracing::debug_span!("generic", evars_before = self.evars.len());
        let _enter = span.enter();

        let mut es = EliminationSubstitution::new();
        for &lit in &self.gen_literals {
            es.try_cheap_map(store, &self.vars_to_elim, lit);
        }
        es.remove_cycles();

        if es.is_empty() {
            tracing::debug!("no equality substitutions found");
            return;
        }

        self.evars.retain(|v| !es.map().contains_key(v));

        let mut rewritten = Vec::with_capacity(self.gen_literals.len());
        for &lit in &self.gen_literals {
            let new_lit = es.apply(store, lit);
            if !store.is_true(new_lit) {
                rewritten.push(new_lit);
            }
        }
        self.gen_literals = rewritten;

        tracing::debug!(evars_after = self.evars.len(), eliminated = es.map().len(), "generic phase complete");
    }

    /// Loos–Weispfenning virtual substitution over the collected
    /// arithmetic literals.
    fn run_arith_phase(&mut self, store: &mut TermStore, model: &Model) {
        let span = tracing::debug_span!("arith", evars_before = self.evars.len());
        let _enter = span.enter();

        let mut arith_evars = Vec::new();
        let mut remaining = Vec::new();
        for &v in &self.evars {
            if store.is_arithmetic(TermOccurrence::positive(v)) {
                arith_evars.push(v);
            } else {
                remaining.push(v);
            }
        }

        if arith_evars.is_empty() {
            tracing::debug!("no arithmetic evars to project");
            return;
        }

        let mut proj = ArithProjector::new();
        for &v in &arith_evars {
            let value = match model.rational_value(store, v) {
                Ok(r) => r,
                Err(e) => return self.signal(ProjectorFlag::ErrorInEval(e.to_string())),
            };
            proj.add_var(v, true, value);
        }
        for &v in &self.arith_vars {
            let value = match model.rational_value(store, v) {
                Ok(r) => r,
                Err(e) => return self.signal(ProjectorFlag::ErrorInEval(e.to_string())),
            };
            proj.add_var(v, false, value);
        }
        proj.close_var_set();

        for &lit in &self.arith_literals {
            if let Err(e) = proj.add_constraint(store, lit) {
                return self.signal(ProjectorFlag::BadArithLiteral(e.to_string()));
            }
        }

        let vars_in_generics: HashSet<TermId> = arith_evars
            .iter()
            .copied()
            .filter(|&v| self.gen_literals.iter().any(|&g| subst::occurs(store, v, g)))
            .collect();

        let outcome = proj.eliminate(store, &vars_in_generics);

        if !outcome.gen_subst.is_empty() {
            let sub = TermSubstitutor::from_map(outcome.gen_subst.clone());
            let mut rewritten = Vec::with_capacity(self.gen_literals.len());
            for &lit in &self.gen_literals {
                let new_lit = sub.apply(store, lit);
                if !store.is_true(new_lit) {
                    rewritten.push(new_lit);
                }
            }
            self.gen_literals = rewritten;
        }

        let eliminated_count = arith_evars.len() - outcome.still_to_eliminate.len();
        self.arith_literals = outcome.residual;
        remaining.extend(outcome.still_to_eliminate);
        self.evars = remaining;

        tracing::debug!(evars_after = self.evars.len(), eliminated = eliminated_count, "arith phase complete");
    }

    /// Close every surviving EVar to its value in the model.
    fn run_value_closure_phase(&mut self, store: &mut TermStore, model: &Model) {
        let span = tracing::debug_span!("value_closure", evars_before = self.evars.len());
        let _enter = span.enter();

        if self.evars.is_empty() {
            tracing::debug!("nothing left to close");
            return;
        }

        let mut sub = TermSubstitutor::new();
        for &v in &self.evars {
            let value = match model.evaluate(store, TermOccurrence::positive(v)) {
                Ok(v) => v,
                Err(e) => return self.signal(ProjectorFlag::ErrorInEval(e.to_string())),
            };
            let replacement = match crate::model::value_to_term(store, &value) {
                Some(occ) => occ,
                None => return self.signal(ProjectorFlag::ErrorInConvert),
            };
            sub.insert(v, replacement);
        }

        self.gen_literals = close_literals(store, &sub, &self.gen_literals);
        self.arith_literals = close_literals(store, &sub, &self.arith_literals);
        self.evars.clear();

        tracing::debug!("value closure complete");
    }
}

fn close_literals(store: &mut TermStore, sub: &TermSubstitutor, literals: &[TermOccurrence]) -> Vec<TermOccurrence> {
    let mut rewritten = Vec::with_capacity(literals.len());
    for &lit in literals {
        let new_lit = sub.apply(store, lit);
        if !store.is_true(new_lit) {
            rewritten.push(new_lit);
        }
    }
    rewritten
}

fn describe_nonlinear(store: &TermStore, term: TermId) -> NonLinearKind {
    match store.kind(TermOccurrence::positive(term)) {
        TermKind::App { head, args } if &**head == "*" && args.len() == 2 => NonLinearKind::PowerProduct,
        other => NonLinearKind::Unsupported(format!("{other:?}")),
    }
}

/// One-shot convenience wrapping `new`/`add_literal`/`run`.
pub fn project_literals(
    store: &mut TermStore,
    model: &Model,
    literals: &[TermOccurrence],
    vars: &[TermOccurrence],
    out: &mut Vec<TermOccurrence>,
) -> ProjectorFlag {
    let mut projector = match Projector::new(store, vars, ProjectorConfig::default()) {
        Ok(p) => p,
        Err(flag) => return flag,
    };
    for &lit in literals {
        projector.add_literal(store, model, lit);
    }
    projector.run(store, model, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Model, Value};
    use crate::term::{Monomial, Rational};
    use crate::Sort;
    use num_traits::One;

    fn rat(n: i64) -> Rational {
        Rational::from_integer(n.into())
    }

    /// Small `TermStore` + `Model` pair, built up by scenario-specific test
    /// functions (mirrors the `TestFixture` pattern used for `srs_setup`-style
    /// tests elsewhere in this codebase).
    struct Fixture {
        store: TermStore,
        model: Model,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture { store: TermStore::new(), model: Model::new() }
        }

        fn real(&mut self, name: &str, value: i64) -> TermOccurrence {
            let occ = self.store.mk_uninterpreted(name, Sort::Real);
            self.model.assign(occ.term(), Value::Rational(rat(value)));
            occ
        }

        fn bool_var(&mut self, name: &str, value: bool) -> TermOccurrence {
            let occ = self.store.mk_uninterpreted(name, Sort::Bool);
            self.model.assign(occ.term(), Value::Bool(value));
            occ
        }

        fn run(&mut self, vars: &[TermOccurrence], literals: &[TermOccurrence]) -> (Vec<TermOccurrence>, ProjectorFlag) {
            let mut out = Vec::new();
            let flag = project_literals(&mut self.store, &self.model, literals, vars, &mut out);
            (out, flag)
        }
    }

    #[test]
    fn empty_vars_to_elim_returns_input_unchanged() {
        let mut fx = Fixture::new();
        let p = fx.bool_var("p", true);
        let (out, flag) = fx.run(&[], &[p]);
        assert_eq!(flag, ProjectorFlag::NoError);
        assert_eq!(out, vec![p]);
    }

    #[test]
    fn empty_literal_list_is_a_no_op() {
        let mut fx = Fixture::new();
        let x = fx.real("x", 1);
        let (out, flag) = fx.run(&[x], &[]);
        assert_eq!(flag, ProjectorFlag::NoError);
        assert!(out.is_empty());
    }

    #[test]
    fn pure_substitution_scenario() {
        // vars={x}; literals={x = y + 1, P(x)}; model x=5, y=4, P(5)=true.
        let mut fx = Fixture::new();
        let x = fx.real("x", 5);
        let y = fx.real("y", 4);
        let y_plus_1 = {
            let p = fx.store.mk_polynomial(vec![
                Monomial { coeff: Rational::one(), var: Some(y.term()) },
                Monomial { coeff: Rational::one(), var: None },
            ]);
            TermOccurrence::positive(p)
        };
        let eq = fx.store.mk_eq(x, y_plus_1);
        let p_of_x = fx.store.mk_app("P", vec![x]);
        fx.model.assign(p_of_x.term(), Value::Bool(true));

        let (out, flag) = fx.run(&[x], &[eq, p_of_x]);
        assert_eq!(flag, ProjectorFlag::NoError);
        assert_eq!(out.len(), 1);
        let args = fx.store.app_args(out[0]).unwrap();
        assert_eq!(args[0], y_plus_1);
    }

    #[test]
    fn linear_arithmetic_projection_scenario() {
        // vars={x}; literals={x>=a, x<=b, a<=b}; model a=1,b=3,x=2.
        let mut fx = Fixture::new();
        let x = fx.real("x", 2).term();
        let a = fx.real("a", 1).term();
        let b = fx.real("b", 3).term();

        let x_ge_a = fx.store.mk_arith_ge(fx.store.mk_polynomial(vec![
            Monomial { coeff: rat(1), var: Some(x) },
            Monomial { coeff: rat(-1), var: Some(a) },
        ]));
        let x_le_b = fx.store.mk_arith_ge(fx.store.mk_polynomial(vec![
            Monomial { coeff: rat(-1), var: Some(x) },
            Monomial { coeff: rat(1), var: Some(b) },
        ]));
        let a_le_b = fx.store.mk_arith_ge(fx.store.mk_polynomial(vec![
            Monomial { coeff: rat(-1), var: Some(a) },
            Monomial { coeff: rat(1), var: Some(b) },
        ]));

        let (out, flag) = fx.run(&[TermOccurrence::positive(x)], &[x_ge_a, x_le_b, a_le_b]);
        assert_eq!(flag, ProjectorFlag::NoError);
        for &lit in &out {
            match fx.store.kind(lit) {
                TermKind::ArithmeticGeAtom(p) => {
                    let monos = fx.store.poly_monomials(*p).unwrap();
                    assert!(monos.iter().all(|m| m.var != Some(x)));
                }
                other => panic!("unexpected residual literal kind {other:?}"),
            }
        }
    }

    #[test]
    fn value_closure_scenario() {
        // vars={p}; literals={p \/ q}; model p=true, q=false.
        let mut fx = Fixture::new();
        let p = fx.bool_var("p", true);
        let q = fx.bool_var("q", false);
        let or_pq = fx.store.mk_or(vec![p, q]);
        fx.model.assign(or_pq.term(), Value::Bool(true));

        let (out, flag) = fx.run(&[p], &[or_pq]);
        assert_eq!(flag, ProjectorFlag::NoError);
        assert!(out.is_empty());
    }

    #[test]
    fn nonlinear_power_product_is_rejected() {
        // vars={x}; literal={x*x >= 0} (x*x modeled as App("*", [x,x])).
        let mut fx = Fixture::new();
        let x = fx.real("x", 3);
        let xx = fx.store.mk_app("*", vec![x, x]);
        let lit = fx.store.mk_arith_ge(xx.term());
        fx.model.assign(xx.term(), Value::Rational(rat(9)));

        let (out, flag) = fx.run(&[x], &[lit]);
        assert!(matches!(flag, ProjectorFlag::NonLinear(NonLinearKind::PowerProduct)));
        assert!(out.is_empty());
    }

    #[test]
    fn mixed_generic_and_arithmetic_scenario() {
        // vars={x,y}; literals={x=f(z), y>=0, y<=w}; model x=f(7),y=2,z=7,w=5.
        let mut fx = Fixture::new();
        let x = fx.real("x", 7);
        let y = fx.real("y", 2).term();
        let z = fx.real("z", 7);
        let w = fx.real("w", 5).term();

        let f_z = fx.store.mk_app("f", vec![z]);
        let eq = fx.store.mk_eq(x, f_z);

        let y_ge_0 = fx.store.mk_arith_ge(fx.store.mk_polynomial(vec![Monomial { coeff: rat(1), var: Some(y) }]));
        let y_le_w = fx.store.mk_arith_ge(fx.store.mk_polynomial(vec![
            Monomial { coeff: rat(-1), var: Some(y) },
            Monomial { coeff: rat(1), var: Some(w) },
        ]));

        let vars = vec![x, TermOccurrence::positive(y)];
        let (out, flag) = fx.run(&vars, &[eq, y_ge_0, y_le_w]);
        assert_eq!(flag, ProjectorFlag::NoError);

        for &lit in &out {
            assert!(!subst::occurs(&fx.store, x.term(), lit));
            assert!(!subst::occurs(&fx.store, y, lit));
        }
    }

    #[test]
    fn cycle_breaking_scenario() {
        // vars={x,y}; literals={x=y, y=x+0}. One mapping survives.
        let mut fx = Fixture::new();
        let x = fx.real("x", 1);
        let y = fx.real("y", 1);
        let eq1 = fx.store.mk_eq(x, y);
        let x_plus_0 = {
            let p = fx.store.mk_polynomial(vec![Monomial { coeff: rat(1), var: Some(x.term()) }]);
            TermOccurrence::positive(p)
        };
        let eq2 = fx.store.mk_eq(y, x_plus_0);

        let (out, flag) = fx.run(&[x, y], &[eq1, eq2]);
        assert_eq!(flag, ProjectorFlag::NoError);
        // Neither x nor y may survive in the residual (one substituted away
        // by the generic phase, the other closed by its model value).
        for &lit in &out {
            assert!(!subst::occurs(&fx.store, x.term(), lit));
            assert!(!subst::occurs(&fx.store, y.term(), lit));
        }
    }

    #[test]
    fn idempotent_on_its_own_output() {
        let mut fx = Fixture::new();
        let x = fx.real("x", 5);
        let y = fx.real("y", 4);
        let y_plus_1 = {
            let p = fx.store.mk_polynomial(vec![
                Monomial { coeff: Rational::one(), var: Some(y.term()) },
                Monomial { coeff: Rational::one(), var: None },
            ]);
            TermOccurrence::positive(p)
        };
        let eq = fx.store.mk_eq(x, y_plus_1);
        let p_of_x = fx.store.mk_app("P", vec![x]);
        fx.model.assign(p_of_x.term(), Value::Bool(true));

        let (first, flag1) = fx.run(&[x], &[eq, p_of_x]);
        assert_eq!(flag1, ProjectorFlag::NoError);

        let (second, flag2) = fx.run(&[], &first);
        assert_eq!(flag2, ProjectorFlag::NoError);
        assert_eq!(first, second);
    }

    #[test]
    fn determinism_same_inputs_same_output() {
        let mut fx = Fixture::new();
        let x = fx.real("x", 2).term();
        let a = fx.real("a", 1).term();
        let b = fx.real("b", 3).term();
        let x_ge_a = fx.store.mk_arith_ge(fx.store.mk_polynomial(vec![
            Monomial { coeff: rat(1), var: Some(x) },
            Monomial { coeff: rat(-1), var: Some(a) },
        ]));
        let x_le_b = fx.store.mk_arith_ge(fx.store.mk_polynomial(vec![
            Monomial { coeff: rat(-1), var: Some(x) },
            Monomial { coeff: rat(1), var: Some(b) },
        ]));

        let (out1, _) = fx.run(&[TermOccurrence::positive(x)], &[x_ge_a, x_le_b]);
        let (out2, _) = fx.run(&[TermOccurrence::positive(x)], &[x_ge_a, x_le_b]);
        assert_eq!(out1, out2);
    }

    #[test]
    fn too_many_vars_is_rejected_up_front() {
        let mut fx = Fixture::new();
        let x = fx.real("x", 1);
        let config = ProjectorConfig { max_vars_to_elim: 0, ..ProjectorConfig::default() };
        let err = Projector::new(&fx.store, &[x], config).unwrap_err();
        assert_eq!(err, ProjectorFlag::TooManyVars(1));
    }

    #[test]
    fn unassigned_boolean_evar_fails_with_error_in_eval() {
        // A Boolean EVar with no literals mentioning it and no model
        // assignment: the generic/arith phases no-op, value-closure must
        // evaluate it and fails.
        let mut fx = Fixture::new();
        let p = fx.store.mk_uninterpreted("p", Sort::Bool);
        let (out, flag) = fx.run(&[p], &[]);
        assert!(out.is_empty());
        assert!(matches!(flag, ProjectorFlag::ErrorInEval(_)));
    }

    #[test]
    fn unassigned_arithmetic_evar_fails_with_error_in_eval() {
        let mut fx = Fixture::new();
        let x = fx.store.mk_uninterpreted("x", Sort::Real);
        // No model assignment for x, and no literals at all: the projector
        // still has to close `x` via value-closure, which requires
        // evaluating it in the model.
        let (_out, flag) = fx.run(&[x], &[]);
        assert!(matches!(flag, ProjectorFlag::ErrorInEval(_)));
    }
}
