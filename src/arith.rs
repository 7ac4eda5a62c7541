//! Loos–Weispfenning-style virtual substitution for linear arithmetic.
//!
//! [`ArithProjector`] eliminates a batch of rational-valued (or
//! integer-valued, relaxed to their rational values — see [`crate::Sort`])
//! uninterpreted constants from a set of linear atoms, guided by their
//! values in the driving [`crate::Model`]. Two elimination strategies are
//! used, chosen per variable:
//!
//! - **Equality substitution.** If any current literal pins the variable
//!   exactly (`a·x + t = 0`, `a ≠ 0`), the variable is replaced everywhere —
//!   including in the caller's generic literals — by the closed-form term
//!   `-t/a`. This is always sound: `-t/a` evaluates, under the model, to
//!   exactly the variable's model value, so substituting it cannot change
//!   the truth value of any other literal that mentions the variable.
//! - **Bound elimination (Fourier–Motzkin).** Absent an equality, the
//!   variable's inequality literals are split into lower bounds (`x ≥ lo`)
//!   and upper bounds (`x ≤ hi`); each literal is dropped and replaced by
//!   the cross product `hi ≥ lo` for every bound pair. This is sound because
//!   every original bound held in the model (`v_lo ≤ v_x ≤ v_hi`), so every
//!   generated `hi ≥ lo` holds too — and it never needs a closed-form term
//!   for the variable at all.
//!
//! A variable that has a strict/disequality literal and no equality, or
//! that also occurs in a generic (non-arithmetic) literal the caller must
//! later rewrite, is left untouched here — the projector's value-closure
//! phase is the fallback for anything this phase cannot remove without
//! losing soundness.

#![forbid(unsafe_code)]

use std::collections::{HashMap, HashSet};

use num_traits::Zero;

use crate::term::{Monomial, Rational, TermId, TermKind, TermOccurrence, TermStore};

/// Errors surfaced by the arithmetic projector.
#[derive(Debug, thiserror::Error)]
pub enum ArithError {
    #[error("literal is not a recognized linear arithmetic atom")]
    NotArithLiteral,
    #[error("a term in this literal is not a constant, polynomial, or variable")]
    NonLinearTerm,
}

/// A linear combination `Σ cᵢ·xᵢ + constant` over uninterpreted arithmetic
/// variables. The internal, malleable counterpart of
/// [`crate::term::TermKind::ArithmeticPolynomial`] used while the projector
/// is rewriting constraints.
#[derive(Clone, Debug)]
struct LinExpr {
    terms: Vec<(TermId, Rational)>,
    constant: Rational,
}

impl LinExpr {
    fn zero() -> Self {
        LinExpr { terms: Vec::new(), constant: Rational::zero() }
    }

    fn add_term(&mut self, v: TermId, c: Rational) {
        if c.is_zero() {
            return;
        }
        if let Some(slot) = self.terms.iter_mut().find(|(vv, _)| *vv == v) {
            slot.1 += c;
        } else {
            self.terms.push((v, c));
        }
        self.terms.retain(|(_, c)| !c.is_zero());
    }

    fn add_scaled(&mut self, other: &LinExpr, k: &Rational) {
        if k.is_zero() {
            return;
        }
        for (v, c) in &other.terms {
            self.add_term(*v, c.clone() * k.clone());
        }
        self.constant += other.constant.clone() * k.clone();
    }

    fn coeff(&self, x: TermId) -> Rational {
        self.terms.iter().find(|(v, _)| *v == x).map(|(_, c)| c.clone()).unwrap_or_else(Rational::zero)
    }

    fn without(&self, x: TermId) -> LinExpr {
        LinExpr { terms: self.terms.iter().filter(|(v, _)| *v != x).cloned().collect(), constant: self.constant.clone() }
    }

    fn sub(&self, other: &LinExpr) -> LinExpr {
        let mut r = self.clone();
        r.add_scaled(other, &-Rational::from_integer(1.into()));
        r
    }

    fn value(&self, values: &HashMap<TermId, Rational>) -> Option<Rational> {
        let mut total = self.constant.clone();
        for (v, c) in &self.terms {
            total += c.clone() * values.get(v)?.clone();
        }
        Some(total)
    }

    fn to_term(&self, store: &mut TermStore) -> TermId {
        let mut ms: Vec<Monomial> =
            self.terms.iter().map(|(v, c)| Monomial { coeff: c.clone(), var: Some(*v) }).collect();
        if !self.constant.is_zero() || ms.is_empty() {
            ms.push(Monomial { coeff: self.constant.clone(), var: None });
        }
        store.mk_polynomial(ms)
    }

    /// `self[x := replacement]`, i.e. `self - coeff(x)·x + coeff(x)·replacement`.
    fn substitute(&self, x: TermId, replacement: &LinExpr) -> LinExpr {
        let a = self.coeff(x);
        if a.is_zero() {
            return self.clone();
        }
        let mut r = self.without(x);
        r.add_scaled(replacement, &a);
        r
    }
}

fn poly_to_linexpr(store: &TermStore, arg: TermId) -> Result<LinExpr, ArithError> {
    let monomials = store.poly_monomials(arg).map_err(|_| ArithError::NonLinearTerm)?;
    let mut expr = LinExpr::zero();
    for m in monomials {
        match m.var {
            None => expr.constant += m.coeff,
            Some(v) => expr.add_term(v, m.coeff),
        }
    }
    Ok(expr)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Ge,
    Lt,
}

#[derive(Clone, Debug)]
struct NormalizedLit {
    expr: LinExpr,
    op: CmpOp,
}

fn normalize(store: &TermStore, occ: TermOccurrence) -> Result<NormalizedLit, ArithError> {
    match store.kind(occ) {
        TermKind::ArithmeticEqAtom(p) => {
            let expr = poly_to_linexpr(store, *p)?;
            Ok(NormalizedLit { expr, op: if occ.is_negated() { CmpOp::Ne } else { CmpOp::Eq } })
        }
        TermKind::ArithmeticGeAtom(p) => {
            let expr = poly_to_linexpr(store, *p)?;
            Ok(NormalizedLit { expr, op: if occ.is_negated() { CmpOp::Lt } else { CmpOp::Ge } })
        }
        TermKind::ArithmeticBinEqAtom(a, b) => {
            let expr = poly_to_linexpr(store, *a)?.sub(&poly_to_linexpr(store, *b)?);
            Ok(NormalizedLit { expr, op: if occ.is_negated() { CmpOp::Ne } else { CmpOp::Eq } })
        }
        _ => Err(ArithError::NotArithLiteral),
    }
}

fn denormalize(store: &mut TermStore, lit: &NormalizedLit) -> TermOccurrence {
    let term = lit.expr.to_term(store);
    match lit.op {
        CmpOp::Eq => store.mk_arith_eq(term),
        CmpOp::Ne => !store.mk_arith_eq(term),
        CmpOp::Ge => store.mk_arith_ge(term),
        CmpOp::Lt => !store.mk_arith_ge(term),
    }
}

struct VarEntry {
    id: TermId,
    eliminate: bool,
    value: Rational,
}

/// Outcome of [`ArithProjector::eliminate`].
pub struct EliminationOutcome {
    /// Residual arithmetic literals (replacing the caller's `ArithLiterals`).
    pub residual: Vec<TermOccurrence>,
    /// Closed-form substitutions discovered via the equality case, to be
    /// applied to the caller's generic literals too (a variable eliminated
    /// this way may still occur inside a generic literal).
    pub gen_subst: HashMap<TermId, TermOccurrence>,
    /// To-eliminate variables this phase could not remove (no equality was
    /// available and either a strict/disequality literal or a generic-side
    /// occurrence made bound-only elimination unsound to attempt); these
    /// fall through to the value-closure phase.
    pub still_to_eliminate: Vec<TermId>,
}

/// Model-guided virtual substitution engine for one projector run.
///
/// `vars_in_generics` must name every to-eliminate arithmetic variable that
/// also occurs (even transitively) inside the caller's generic literals —
/// such variables are only eliminated here when an exact equality is
/// available, since the bound-elimination case produces no substitutable
/// closed form.
pub struct ArithProjector {
    vars: Vec<VarEntry>,
    values: HashMap<TermId, Rational>,
    literals: Vec<NormalizedLit>,
    closed: bool,
}

impl Default for ArithProjector {
    fn default() -> Self {
        Self::new()
    }
}

impl ArithProjector {
    pub fn new() -> Self {
        ArithProjector { vars: Vec::new(), values: HashMap::new(), literals: Vec::new(), closed: false }
    }

    /// Register a variable, marking whether it is to be eliminated, with
    /// its rational value under the driving model.
    pub fn add_var(&mut self, x: TermId, to_eliminate: bool, value: Rational) {
        debug_assert!(!self.closed, "add_var called after close_var_set");
        self.values.insert(x, value.clone());
        self.vars.push(VarEntry { id: x, eliminate: to_eliminate, value });
    }

    /// Barrier between variable registration and constraint ingestion.
    pub fn close_var_set(&mut self) {
        self.closed = true;
    }

    /// Offer a constraint (already known to be a linear arithmetic literal
    /// by the caller's classification pass).
    pub fn add_constraint(&mut self, store: &TermStore, lit: TermOccurrence) -> Result<(), ArithError> {
        debug_assert!(self.closed, "add_constraint called before close_var_set");
        let normalized = normalize(store, lit)?;
        debug_assert!(
            match normalized.expr.value(&self.values) {
                Some(v) => match normalized.op {
                    CmpOp::Eq => v.is_zero(),
                    CmpOp::Ne => !v.is_zero(),
                    CmpOp::Ge => v >= Rational::zero(),
                    CmpOp::Lt => v < Rational::zero(),
                },
                None => true,
            },
            "constraint does not hold at the supplied variable values"
        );
        self.literals.push(normalized);
        Ok(())
    }

    /// Eliminate every registered to-eliminate variable that this phase can
    /// remove without loss of soundness, in insertion order.
    ///
    /// `vars_in_generics` marks to-eliminate variables the caller's generic
    /// literals still reference.
    pub fn eliminate(mut self, store: &mut TermStore, vars_in_generics: &HashSet<TermId>) -> EliminationOutcome {
        let mut gen_subst: HashMap<TermId, TermOccurrence> = HashMap::new();
        let mut still_to_eliminate = Vec::new();

        let elim_order: Vec<TermId> = self.vars.iter().filter(|v| v.eliminate).map(|v| v.id).collect();

        for x in elim_order {
            let mentions: Vec<usize> =
                self.literals.iter().enumerate().filter(|(_, l)| !l.expr.coeff(x).is_zero()).map(|(i, _)| i).collect();
            if mentions.is_empty() {
                continue;
            }

            let eq_idx = mentions.iter().copied().find(|&i| self.literals[i].op == CmpOp::Eq);

            if let Some(i) = eq_idx {
                let a = self.literals[i].expr.coeff(x);
                let rest = self.literals[i].expr.without(x);
                // a*x + rest = 0  =>  x = -rest/a
                let inv_a = -Rational::from_integer(1.into()) / a;
                let replacement = {
                    let mut r = LinExpr::zero();
                    r.add_scaled(&rest, &inv_a);
                    r
                };
                for lit in self.literals.iter_mut() {
                    lit.expr = lit.expr.substitute(x, &replacement);
                }
                let term = replacement.to_term(store);
                gen_subst.insert(x, TermOccurrence::positive(term));
                continue;
            }

            let has_strict_or_disequality = mentions.iter().any(|&i| matches!(self.literals[i].op, CmpOp::Ne | CmpOp::Lt));
            if has_strict_or_disequality || vars_in_generics.contains(&x) {
                still_to_eliminate.push(x);
                continue;
            }

            let mut lowers = Vec::new();
            let mut uppers = Vec::new();
            for &i in &mentions {
                let a = self.literals[i].expr.coeff(x);
                let rest = self.literals[i].expr.without(x);
                let inv_a = -Rational::from_integer(1.into()) / a.clone();
                let mut bound = LinExpr::zero();
                bound.add_scaled(&rest, &inv_a);
                if a > Rational::zero() {
                    lowers.push(bound);
                } else {
                    uppers.push(bound);
                }
            }
            let mut new_literals: Vec<NormalizedLit> = Vec::new();
            for lo in &lowers {
                for hi in &uppers {
                    new_literals.push(NormalizedLit { expr: hi.sub(lo), op: CmpOp::Ge });
                }
            }
            // Drop the eliminated literals, keep everything untouched by x, append the FM pairs.
            let mentioned: HashSet<usize> = mentions.into_iter().collect();
            let mut kept = Vec::with_capacity(self.literals.len() - mentioned.len() + new_literals.len());
            for (i, lit) in self.literals.into_iter().enumerate() {
                if !mentioned.contains(&i) {
                    kept.push(lit);
                }
            }
            kept.extend(new_literals);
            self.literals = kept;
        }

        let residual = self.literals.iter().map(|l| denormalize(store, l)).collect();
        EliminationOutcome { residual, gen_subst, still_to_eliminate }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sort;

    #[test]
    fn eliminates_bounded_variable_via_fourier_motzkin() {
        let mut ts = TermStore::new();
        let x = ts.mk_uninterpreted("x", Sort::Real).term();
        let a = ts.mk_uninterpreted("a", Sort::Real).term();
        let b = ts.mk_uninterpreted("b", Sort::Real).term();

        // x >= a  <=>  x - a >= 0
        let p1 = ts.mk_polynomial(vec![
            Monomial { coeff: Rational::from_integer(1.into()), var: Some(x) },
            Monomial { coeff: Rational::from_integer(-1i64.into()), var: Some(a) },
        ]);
        let lit1 = ts.mk_arith_ge(p1);
        // x <= b  <=>  b - x >= 0
        let p2 = ts.mk_polynomial(vec![
            Monomial { coeff: Rational::from_integer(-1i64.into()), var: Some(x) },
            Monomial { coeff: Rational::from_integer(1.into()), var: Some(b) },
        ]);
        let lit2 = ts.mk_arith_ge(p2);

        let mut proj = ArithProjector::new();
        proj.add_var(x, true, Rational::from_integer(2.into()));
        proj.add_var(a, false, Rational::from_integer(1.into()));
        proj.add_var(b, false, Rational::from_integer(3.into()));
        proj.close_var_set();
        proj.add_constraint(&ts, lit1).unwrap();
        proj.add_constraint(&ts, lit2).unwrap();

        let outcome = proj.eliminate(&mut ts, &HashSet::new());
        assert!(outcome.still_to_eliminate.is_empty());
        assert_eq!(outcome.residual.len(), 1);
        // The residual literal must not mention x.
        let occ = outcome.residual[0];
        let arg = ts.arith_atom_arg(occ).unwrap();
        let monos = ts.poly_monomials(arg).unwrap();
        assert!(monos.iter().all(|m| m.var != Some(x)));
    }

    #[test]
    fn equality_substitution_produces_closed_form() {
        let mut ts = TermStore::new();
        let x = ts.mk_uninterpreted("x", Sort::Real).term();
        let y = ts.mk_uninterpreted("y", Sort::Real).term();

        // x - y - 1 = 0  <=>  x = y + 1
        let p = ts.mk_polynomial(vec![
            Monomial { coeff: Rational::from_integer(1.into()), var: Some(x) },
            Monomial { coeff: Rational::from_integer(-1i64.into()), var: Some(y) },
            Monomial { coeff: Rational::from_integer(-1i64.into()), var: None },
        ]);
        let lit = ts.mk_arith_eq(p);

        let mut proj = ArithProjector::new();
        proj.add_var(x, true, Rational::from_integer(5.into()));
        proj.add_var(y, false, Rational::from_integer(4.into()));
        proj.close_var_set();
        proj.add_constraint(&ts, lit).unwrap();

        let outcome = proj.eliminate(&mut ts, &HashSet::new());
        assert!(outcome.still_to_eliminate.is_empty());
        assert!(outcome.residual.is_empty());
        assert!(outcome.gen_subst.contains_key(&x));
    }
}
