//! The two substitution engines shared by the generic-equality phase and the
//! value-closure phase.
//!
//! [`EliminationSubstitution`] builds and applies a finite map from
//! to-eliminate variables to generic (non-arithmetic) replacement terms,
//! discovered from equalities already present in the cube; it is
//! responsible for detecting and breaking substitution cycles before
//! anything is rewritten. [`TermSubstitutor`] is the simpler, total
//! variant used once every surviving variable already has a concrete
//! replacement term (arithmetic virtual-substitution results, or raw model
//! values in the final closure phase).

#![forbid(unsafe_code)]

use std::collections::{HashMap, HashSet};

use crate::term::{TermId, TermKind, TermOccurrence, TermStore};

/// Errors raised while building or applying a substitution.
#[derive(Debug, thiserror::Error)]
pub enum SubstError {
    #[error("substitution target for term {0:?} is itself unresolved")]
    UnresolvedTarget(TermId),
}

/// Rewrite `occ` by replacing every positive occurrence of a key of `map`
/// with the occurrence it maps to (composing polarity), recursing through
/// the generic composite shapes [`TermStore::children`] exposes. Arithmetic
/// atoms are rewritten by rebuilding their polynomial argument from its
/// monomials, substituting any variable that is a map key with its
/// replacement's underlying arithmetic term — a replacement for an
/// arithmetic-sorted variable must itself be an arithmetic term (constant,
/// polynomial, or variable); every caller in this crate satisfies this —
/// none of the generic-equality, arithmetic-projection, or value-closure
/// phases ever maps an arithmetic variable to a non-arithmetic term.
fn rewrite(
    store: &mut TermStore,
    map: &HashMap<TermId, TermOccurrence>,
    occ: TermOccurrence,
    cache: &mut HashMap<TermOccurrence, TermOccurrence>,
) -> TermOccurrence {
    if let Some(hit) = cache.get(&occ) {
        return *hit;
    }
    let result = rewrite_uncached(store, map, occ, cache);
    cache.insert(occ, result);
    result
}

fn rewrite_uncached(
    store: &mut TermStore,
    map: &HashMap<TermId, TermOccurrence>,
    occ: TermOccurrence,
    cache: &mut HashMap<TermOccurrence, TermOccurrence>,
) -> TermOccurrence {
    let id = occ.term();
    if let Some(replacement) = map.get(&id) {
        return if occ.is_negated() { !*replacement } else { *replacement };
    }

    match store.kind(occ).clone() {
        TermKind::BoolConstant(_)
        | TermKind::ArithmeticConstant(_)
        | TermKind::UninterpretedConstant { .. }
        | TermKind::BvConstant(_) => occ,

        TermKind::ArithmeticEqAtom(p) => {
            let p2 = rewrite_arith_arg(store, map, p, cache);
            let base = store.mk_arith_eq(p2);
            if occ.is_negated() { !base } else { base }
        }
        TermKind::ArithmeticGeAtom(p) => {
            let p2 = rewrite_arith_arg(store, map, p, cache);
            let base = store.mk_arith_ge(p2);
            if occ.is_negated() { !base } else { base }
        }
        TermKind::ArithmeticBinEqAtom(a, b) => {
            let a2 = rewrite_arith_arg(store, map, a, cache);
            let b2 = rewrite_arith_arg(store, map, b, cache);
            let base = store.mk_arith_bin_eq(a2, b2);
            if occ.is_negated() { !base } else { base }
        }
        TermKind::Ite(c, a, b) => {
            let c2 = rewrite(store, map, c, cache);
            let a2 = rewrite(store, map, a, cache);
            let b2 = rewrite(store, map, b, cache);
            let base = if store.is_true(c2) {
                a2
            } else if store.is_true(!c2) {
                b2
            } else {
                store.mk_ite(c2, a2, b2)
            };
            if occ.is_negated() { !base } else { base }
        }
        TermKind::Eq(a, b) => {
            let a2 = rewrite(store, map, a, cache);
            let b2 = rewrite(store, map, b, cache);
            let base = if a2 == b2 {
                store.true_occ()
            } else if a2 == !b2 {
                store.false_occ()
            } else {
                store.mk_eq(a2, b2)
            };
            if occ.is_negated() { !base } else { base }
        }
        TermKind::Distinct(args) => {
            let args2: Vec<_> = args.iter().map(|a| rewrite(store, map, *a, cache)).collect();
            let has_dup = args2.iter().enumerate().any(|(i, a)| args2[..i].contains(a));
            let base = if has_dup { store.false_occ() } else { store.mk_distinct(args2) };
            if occ.is_negated() { !base } else { base }
        }
        TermKind::Or(args) => {
            let args2: Vec<_> = args.iter().map(|a| rewrite(store, map, *a, cache)).collect();
            let base = if args2.iter().any(|a| store.is_true(*a)) {
                store.true_occ()
            } else {
                let kept: Vec<_> = args2.into_iter().filter(|a| !store.is_true(!*a)).collect();
                match kept.len() {
                    0 => store.false_occ(),
                    1 => kept[0],
                    _ => store.mk_or(kept),
                }
            };
            if occ.is_negated() { !base } else { base }
        }
        TermKind::Xor(a, b) => {
            let a2 = rewrite(store, map, a, cache);
            let b2 = rewrite(store, map, b, cache);
            let base = if store.is_true(a2) {
                !b2
            } else if store.is_true(!a2) {
                b2
            } else if store.is_true(b2) {
                !a2
            } else if store.is_true(!b2) {
                a2
            } else {
                store.mk_xor(a2, b2)
            };
            if occ.is_negated() { !base } else { base }
        }
        TermKind::App { head, args } => {
            let args2: Vec<_> = args.iter().map(|a| rewrite(store, map, *a, cache)).collect();
            let base = store.mk_app(head, args2);
            if occ.is_negated() { !base } else { base }
        }
    }
}

/// Rewrite an arithmetic argument (constant/polynomial/variable `TermId`,
/// always positive by construction) by substituting any variable monomial
/// that is a map key with the replacement's arithmetic term, then
/// re-normalizing through [`TermStore::mk_polynomial`].
fn rewrite_arith_arg(
    store: &mut TermStore,
    map: &HashMap<TermId, TermOccurrence>,
    arg: TermId,
    _cache: &mut HashMap<TermOccurrence, TermOccurrence>,
) -> TermId {
    let monomials = match store.poly_monomials(arg) {
        Ok(ms) => ms,
        Err(_) => return arg,
    };
    let mut any_subst = false;
    let mut rebuilt = Vec::with_capacity(monomials.len());
    for m in monomials {
        match m.var {
            None => rebuilt.push(m),
            Some(v) => match map.get(&v) {
                None => rebuilt.push(m),
                Some(replacement) => {
                    any_subst = true;
                    let sub_arg = replacement.term();
                    let sub_monos = store.poly_monomials(sub_arg).unwrap_or_else(|_| {
                        vec![crate::term::Monomial { coeff: crate::term::Rational::from_integer(1.into()), var: Some(sub_arg) }]
                    });
                    for sm in sub_monos {
                        rebuilt.push(crate::term::Monomial { coeff: sm.coeff * m.coeff.clone(), var: sm.var });
                    }
                }
            },
        }
    }
    if any_subst { store.mk_polynomial(rebuilt) } else { arg }
}

/// Generic-equality elimination substitution.
///
/// Scans the cube's generic literals for equalities of the shape
/// `x = u` (`x` a to-eliminate uninterpreted constant, `u` not mentioning
/// `x`), builds the largest acyclic sub-map of the discovered proposals,
/// and applies it.
pub struct EliminationSubstitution {
    map: HashMap<TermId, TermOccurrence>,
    /// Uninterpreted constants reachable from each mapping's RHS, computed
    /// once (while `store` is at hand, in `try_cheap_map`) so cycle
    /// detection never needs a store handle of its own.
    deps: HashMap<TermId, Vec<TermId>>,
    insertion_order: Vec<TermId>,
}

impl Default for EliminationSubstitution {
    fn default() -> Self {
        Self::new()
    }
}

impl EliminationSubstitution {
    pub fn new() -> Self {
        EliminationSubstitution { map: HashMap::new(), deps: HashMap::new(), insertion_order: Vec::new() }
    }

    /// Propose `x := rhs` if `lit` has the syntactic shape of a generic
    /// equality pinning one of `vars_to_elim` to a term that does not
    /// mention that same variable — either a direct `x = u`, or the
    /// one-sided `ite` disguise `ite(c, x = u1, x = u2)` (both branches pin
    /// the same variable, so `x := ite(c, u1, u2)` holds unconditionally,
    /// not just under the current model). The first proposal for a given
    /// `x` wins; later ones are ignored.
    pub fn try_cheap_map(&mut self, store: &mut TermStore, vars_to_elim: &HashSet<TermId>, lit: TermOccurrence) {
        let Some((x, rhs)) = extract_equality(store, vars_to_elim, lit) else {
            return;
        };
        if self.map.contains_key(&x) {
            return;
        }
        if occurs(store, x, rhs) {
            return;
        }
        self.deps.insert(x, free_vars(store, rhs));
        self.map.insert(x, rhs);
        self.insertion_order.push(x);
    }

    /// Remove the minimal set of mappings needed to make the map acyclic,
    /// preferring to keep earlier-inserted mappings. Deterministic: DFS
    /// always explores in insertion order, and whenever a cycle is found the
    /// latest-inserted node on it is dropped.
    pub fn remove_cycles(&mut self) {
        loop {
            if let Some(victim) = self.find_cycle_victim() {
                self.map.remove(&victim);
                self.deps.remove(&victim);
                self.insertion_order.retain(|v| *v != victim);
            } else {
                break;
            }
        }
    }

    fn find_cycle_victim(&self) -> Option<TermId> {
        #[derive(Clone, Copy, PartialEq)]
        enum State {
            Visiting,
            Done,
        }

        fn dfs(
            node: TermId,
            map: &HashMap<TermId, TermOccurrence>,
            deps: &HashMap<TermId, Vec<TermId>>,
            state: &mut HashMap<TermId, State>,
            path: &mut Vec<TermId>,
        ) -> Option<TermId> {
            match state.get(&node) {
                Some(State::Done) => return None,
                Some(State::Visiting) => {
                    // Cycle found: everything from node's position onward in
                    // `path` is on the cycle. Return the latest-inserted
                    // (last visited, i.e. last in path) of those.
                    let start = path.iter().position(|v| *v == node).unwrap();
                    return path[start..].last().copied();
                }
                None => {}
            }
            state.insert(node, State::Visiting);
            path.push(node);
            if let Some(ds) = deps.get(&node) {
                for dep in ds {
                    if map.contains_key(dep) {
                        if let Some(victim) = dfs(*dep, map, deps, state, path) {
                            return Some(victim);
                        }
                    }
                }
            }
            path.pop();
            state.insert(node, State::Done);
            None
        }

        let mut state: HashMap<TermId, State> = HashMap::new();
        let mut path: Vec<TermId> = Vec::new();
        for x in &self.insertion_order {
            if state.get(x) == Some(&State::Done) {
                continue;
            }
            if let Some(victim) = dfs(*x, &self.map, &self.deps, &mut state, &mut path) {
                return Some(victim);
            }
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn map(&self) -> &HashMap<TermId, TermOccurrence> {
        &self.map
    }

    /// Rewrite `occ` through the final (acyclic) map.
    pub fn apply(&self, store: &mut TermStore, occ: TermOccurrence) -> TermOccurrence {
        let mut cache = HashMap::new();
        rewrite(store, &self.map, occ, &mut cache)
    }
}

/// Look for the syntactic equality shape `try_cheap_map` accepts in `lit`:
/// a direct `x = u`, or the one-sided `ite` disguise described there.
/// Negated literals are never equalities in this sense.
fn extract_equality(
    store: &mut TermStore,
    vars_to_elim: &HashSet<TermId>,
    lit: TermOccurrence,
) -> Option<(TermId, TermOccurrence)> {
    if lit.is_negated() {
        return None;
    }
    match store.kind(lit).clone() {
        TermKind::Eq(a, b) => pick_side(store, vars_to_elim, a, b),
        TermKind::Ite(c, t1, t2) => {
            let (x1, r1) = pick_side_of_eq(store, vars_to_elim, t1)?;
            let (x2, r2) = pick_side_of_eq(store, vars_to_elim, t2)?;
            if x1 != x2 {
                return None;
            }
            let rhs = store.mk_ite(c, r1, r2);
            Some((x1, rhs))
        }
        // `distinct(x, u)` is a disequality, not a substitutable equality —
        // recognized here only so it is never mistaken for one.
        TermKind::Distinct(args) if args.len() == 2 => None,
        _ => None,
    }
}

/// `lit` must be a positive-polarity `Eq`; pick whichever side is a
/// to-eliminate uninterpreted constant.
fn pick_side_of_eq(
    store: &TermStore,
    vars_to_elim: &HashSet<TermId>,
    occ: TermOccurrence,
) -> Option<(TermId, TermOccurrence)> {
    if occ.is_negated() {
        return None;
    }
    match store.kind(occ) {
        TermKind::Eq(a, b) => pick_side(store, vars_to_elim, *a, *b),
        _ => None,
    }
}

fn pick_side(
    store: &TermStore,
    vars_to_elim: &HashSet<TermId>,
    a: TermOccurrence,
    b: TermOccurrence,
) -> Option<(TermId, TermOccurrence)> {
    for (candidate, rhs) in [(a, b), (b, a)] {
        if candidate.is_negated() {
            continue;
        }
        let x = candidate.term();
        if store.is_uninterpreted_const(candidate) && vars_to_elim.contains(&x) {
            return Some((x, rhs));
        }
    }
    None
}

/// `true` if `x` occurs anywhere in the occurrence tree rooted at `occ`
/// (its underlying id directly, or reachable through generic children or
/// arithmetic polynomial arguments).
pub(crate) fn occurs(store: &TermStore, x: TermId, occ: TermOccurrence) -> bool {
    if occ.term() == x {
        return true;
    }
    match store.kind(occ) {
        TermKind::ArithmeticEqAtom(p) | TermKind::ArithmeticGeAtom(p) => {
            store.poly_monomials(*p).map(|ms| ms.iter().any(|m| m.var == Some(x))).unwrap_or(false)
        }
        TermKind::ArithmeticBinEqAtom(a, b) => {
            let in_a = store.poly_monomials(*a).map(|ms| ms.iter().any(|m| m.var == Some(x))).unwrap_or(false);
            let in_b = store.poly_monomials(*b).map(|ms| ms.iter().any(|m| m.var == Some(x))).unwrap_or(false);
            in_a || in_b
        }
        _ => store.children(occ).iter().any(|c| occurs(store, x, *c)),
    }
}

/// Every uninterpreted constant reachable from `occ`, through generic
/// composite structure or arithmetic polynomial arguments. Used by cycle
/// detection to know which other map keys a mapping's RHS depends on.
fn free_vars(store: &TermStore, occ: TermOccurrence) -> Vec<TermId> {
    let mut out = Vec::new();
    collect_vars(store, occ, &mut out);
    out
}

fn collect_vars(store: &TermStore, occ: TermOccurrence, out: &mut Vec<TermId>) {
    if store.is_uninterpreted_const(occ) {
        out.push(occ.term());
        return;
    }
    match store.kind(occ) {
        TermKind::ArithmeticEqAtom(p) | TermKind::ArithmeticGeAtom(p) => {
            if let Ok(ms) = store.poly_monomials(*p) {
                out.extend(ms.into_iter().filter_map(|m| m.var));
            }
        }
        TermKind::ArithmeticBinEqAtom(a, b) => {
            for arg in [*a, *b] {
                if let Ok(ms) = store.poly_monomials(arg) {
                    out.extend(ms.into_iter().filter_map(|m| m.var));
                }
            }
        }
        _ => {
            for c in store.children(occ) {
                collect_vars(store, c, out);
            }
        }
    }
}

/// A total substitution from surviving term ids to concrete replacement
/// occurrences: used both to push arithmetic-phase closed forms into the
/// generic literals, and — at the end of the pipeline — to close every
/// remaining EVar to its model value.
pub struct TermSubstitutor {
    map: HashMap<TermId, TermOccurrence>,
}

impl Default for TermSubstitutor {
    fn default() -> Self {
        Self::new()
    }
}

impl TermSubstitutor {
    pub fn new() -> Self {
        TermSubstitutor { map: HashMap::new() }
    }

    pub fn from_map(map: HashMap<TermId, TermOccurrence>) -> Self {
        TermSubstitutor { map }
    }

    pub fn insert(&mut self, x: TermId, replacement: TermOccurrence) {
        self.map.insert(x, replacement);
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn extend(&mut self, other: impl IntoIterator<Item = (TermId, TermOccurrence)>) {
        self.map.extend(other);
    }

    /// Rewrite `occ`, dropping the result entirely (returning `None`) when
    /// it simplifies to the reserved `true` occurrence — callers that fold
    /// substituted literals into an output vector skip trivially-true
    /// results rather than emitting them.
    pub fn apply(&self, store: &mut TermStore, occ: TermOccurrence) -> TermOccurrence {
        let mut cache = HashMap::new();
        rewrite(store, &self.map, occ, &mut cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sort;

    #[test]
    fn maps_simple_equality_and_rewrites_application() {
        let mut ts = TermStore::new();
        let x = ts.mk_uninterpreted("x", Sort::Bool);
        let y = ts.mk_uninterpreted("y", Sort::Bool);
        let eq = ts.mk_eq(x, y);
        let app = ts.mk_app("p", vec![x]);

        let mut vars = HashSet::new();
        vars.insert(x.term());

        let mut es = EliminationSubstitution::new();
        es.try_cheap_map(&mut ts, &vars, eq);
        es.remove_cycles();
        assert!(!es.is_empty());

        let rewritten = es.apply(&mut ts, app);
        assert_eq!(ts.app_args(rewritten).unwrap()[0], y);
    }

    #[test]
    fn breaks_cycle_keeping_earlier_inserted_mapping() {
        let mut ts = TermStore::new();
        let x = ts.mk_uninterpreted("x", Sort::Bool);
        let y = ts.mk_uninterpreted("y", Sort::Bool);

        let mut vars = HashSet::new();
        vars.insert(x.term());
        vars.insert(y.term());

        let mut es = EliminationSubstitution::new();
        // x := y inserted first, y := x proposed second — forms a cycle.
        es.map.insert(x.term(), y);
        es.deps.insert(x.term(), vec![y.term()]);
        es.insertion_order.push(x.term());
        es.map.insert(y.term(), x);
        es.deps.insert(y.term(), vec![x.term()]);
        es.insertion_order.push(y.term());

        es.remove_cycles();
        assert_eq!(es.map().len(), 1);
        assert!(es.map().contains_key(&x.term()));
    }

    #[test]
    fn rejects_self_referential_equality() {
        let mut ts = TermStore::new();
        let x = ts.mk_uninterpreted("x", Sort::Bool);
        let app = ts.mk_app("f", vec![x]);
        let eq = ts.mk_eq(x, app);

        let mut vars = HashSet::new();
        vars.insert(x.term());

        let mut es = EliminationSubstitution::new();
        es.try_cheap_map(&mut ts, &vars, eq);
        assert!(es.is_empty());
    }

    #[test]
    fn recognizes_one_sided_ite_equality_disguise() {
        let mut ts = TermStore::new();
        let x = ts.mk_uninterpreted("x", Sort::Real);
        let c = ts.mk_uninterpreted("c", Sort::Bool);
        let u1 = ts.mk_uninterpreted("u1", Sort::Real);
        let u2 = ts.mk_uninterpreted("u2", Sort::Real);
        let eq1 = ts.mk_eq(x, u1);
        let eq2 = ts.mk_eq(x, u2);
        let disguise = ts.mk_ite(c, eq1, eq2);

        let mut vars = HashSet::new();
        vars.insert(x.term());

        let mut es = EliminationSubstitution::new();
        es.try_cheap_map(&mut ts, &vars, disguise);
        es.remove_cycles();
        assert!(!es.is_empty());

        let replacement = *es.map().get(&x.term()).unwrap();
        assert!(matches!(ts.kind(replacement), TermKind::Ite(_, _, _)));
    }

    #[test]
    fn distinct_pair_is_never_mistaken_for_an_equality() {
        let mut ts = TermStore::new();
        let x = ts.mk_uninterpreted("x", Sort::Bool);
        let u = ts.mk_uninterpreted("u", Sort::Bool);
        let distinct = ts.mk_distinct(vec![x, u]);

        let mut vars = HashSet::new();
        vars.insert(x.term());

        let mut es = EliminationSubstitution::new();
        es.try_cheap_map(&mut ts, &vars, distinct);
        assert!(es.is_empty());
    }
}
