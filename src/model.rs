//! The satisfying assignment the projector is guided by.
//!
//! A [`Model`] is a total-on-what-it-knows-about map from term occurrences to
//! theory values, built up by the caller before the projector ever sees it.
//! It never executes theory reasoning itself — it is a lookup table plus a
//! handful of arithmetic-specific convenience evaluators the projector and
//! [`crate::arith::ArithProjector`] depend on.

#![forbid(unsafe_code)]

use std::collections::HashMap;

use num_traits::Zero;

use crate::term::{Monomial, Rational, TermId, TermKind, TermOccurrence, TermStore};

/// Convert a [`Value`] into a constant term occurrence in `store`, used to
/// close a surviving variable to its model value. Every variant this
/// crate's [`Value`] can hold maps to an existing `TermStore` constructor,
/// so this is total in practice; it still returns `Option` so a `Value`
/// shape a future collaborator might add without a matching constant
/// constructor is reported as a conversion failure rather than panicking.
pub fn value_to_term(store: &mut TermStore, value: &Value) -> Option<TermOccurrence> {
    match value {
        Value::Bool(b) => Some(store.mk_bool_constant(*b)),
        Value::Rational(r) => Some(TermOccurrence::positive(store.mk_arith_constant(r.clone()))),
        Value::BitVec(bits) => Some(store.mk_bv_constant(bits.clone())),
    }
}

/// A theory value a [`Model`] can hand back for a term.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Rational(Rational),
    BitVec(Box<[bool]>),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_rational(&self) -> Option<&Rational> {
        match self {
            Value::Rational(r) => Some(r),
            _ => None,
        }
    }
}

/// Errors a [`Model`] can report when asked to evaluate a term.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("no value assigned to term {0:?}")]
    Unassigned(TermId),
    #[error("term {0:?} does not evaluate to a rational value")]
    NotRational(TermId),
    #[error("term {0:?} is not a recognized constant shape")]
    Unevaluable(TermId),
}

/// A satisfying assignment: a partial map from term occurrences to values.
///
/// Assignments are keyed on the underlying [`TermId`] (polarity-free); a
/// negated occurrence of a Boolean term is evaluated by flipping the stored
/// Boolean, never by a second lookup.
#[derive(Default, Clone, Debug)]
pub struct Model {
    assignments: HashMap<TermId, Value>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the value of a term's positive occurrence.
    pub fn assign(&mut self, id: TermId, value: Value) {
        self.assignments.insert(id, value);
    }

    /// Evaluate a term occurrence, interpreting constants structurally and
    /// falling back to the assignment table for uninterpreted constants and
    /// polynomials over them.
    pub fn evaluate(&self, store: &TermStore, occ: TermOccurrence) -> Result<Value, ModelError> {
        let id = occ.term();
        let base = match store.kind(occ) {
            TermKind::BoolConstant(b) => Value::Bool(*b),
            TermKind::ArithmeticConstant(c) => Value::Rational(c.clone()),
            TermKind::BvConstant(bits) => Value::BitVec(bits.clone()),
            TermKind::ArithmeticPolynomial(monomials) => {
                Value::Rational(self.eval_monomials(store, monomials)?)
            }
            TermKind::ArithmeticEqAtom(p) => {
                let v = self.rational_value_of(store, *p)?;
                Value::Bool(v.is_zero())
            }
            TermKind::ArithmeticGeAtom(p) => {
                let v = self.rational_value_of(store, *p)?;
                Value::Bool(v >= Rational::zero())
            }
            TermKind::ArithmeticBinEqAtom(a, b) => {
                let va = self.rational_value_of(store, *a)?;
                let vb = self.rational_value_of(store, *b)?;
                Value::Bool(va == vb)
            }
            TermKind::Eq(a, b) => {
                let va = self.evaluate(store, *a)?;
                let vb = self.evaluate(store, *b)?;
                Value::Bool(va == vb)
            }
            TermKind::Ite(c, a, b) => {
                let vc = self.evaluate(store, *c)?.as_bool().ok_or(ModelError::Unevaluable(id))?;
                return self.evaluate(store, if vc { *a } else { *b });
            }
            TermKind::Distinct(args) => {
                let mut vals = Vec::with_capacity(args.len());
                for a in args {
                    vals.push(self.evaluate(store, *a)?);
                }
                let mut all_distinct = true;
                'outer: for i in 0..vals.len() {
                    for j in (i + 1)..vals.len() {
                        if vals[i] == vals[j] {
                            all_distinct = false;
                            break 'outer;
                        }
                    }
                }
                Value::Bool(all_distinct)
            }
            TermKind::Or(args) => {
                let mut any = false;
                for a in args {
                    if self.evaluate(store, *a)?.as_bool().ok_or(ModelError::Unevaluable(id))? {
                        any = true;
                        break;
                    }
                }
                Value::Bool(any)
            }
            TermKind::Xor(a, b) => {
                let va = self.evaluate(store, *a)?.as_bool().ok_or(ModelError::Unevaluable(id))?;
                let vb = self.evaluate(store, *b)?.as_bool().ok_or(ModelError::Unevaluable(id))?;
                Value::Bool(va ^ vb)
            }
            TermKind::UninterpretedConstant { .. } => {
                self.assignments.get(&id).cloned().ok_or(ModelError::Unassigned(id))?
            }
            TermKind::App { .. } => {
                self.assignments.get(&id).cloned().ok_or(ModelError::Unassigned(id))?
            }
        };
        Ok(if occ.is_negated() {
            match base {
                Value::Bool(b) => Value::Bool(!b),
                other => other,
            }
        } else {
            base
        })
    }

    fn eval_monomials(&self, store: &TermStore, monomials: &[Monomial]) -> Result<Rational, ModelError> {
        let mut total = Rational::zero();
        for m in monomials {
            let term_val = match m.var {
                None => Rational::from_integer(1.into()),
                Some(v) => self.rational_value(store, v)?,
            };
            total += m.coeff.clone() * term_val;
        }
        Ok(total)
    }

    /// Rational value of an arithmetic term (constant, polynomial, or
    /// uninterpreted arithmetic variable).
    pub fn rational_value(&self, store: &TermStore, id: TermId) -> Result<Rational, ModelError> {
        self.rational_value_of(store, id)
    }

    fn rational_value_of(&self, store: &TermStore, id: TermId) -> Result<Rational, ModelError> {
        match self.evaluate(store, TermOccurrence::positive(id))? {
            Value::Rational(r) => Ok(r),
            _ => Err(ModelError::NotRational(id)),
        }
    }

    /// Whether a Boolean term occurrence holds in this model. Used by the
    /// `add_literal` debug precondition and by tests.
    pub fn holds(&self, store: &TermStore, occ: TermOccurrence) -> Result<bool, ModelError> {
        self.evaluate(store, occ)?.as_bool().ok_or(ModelError::Unevaluable(occ.term()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sort;

    #[test]
    fn evaluates_polynomial_with_assigned_variable() {
        let mut ts = TermStore::new();
        let mut m = Model::new();
        let x = ts.mk_uninterpreted("x", Sort::Real);
        m.assign(x.term(), Value::Rational(Rational::from_integer(3.into())));

        let p = ts.mk_polynomial(vec![
            Monomial { coeff: Rational::from_integer(2.into()), var: Some(x.term()) },
            Monomial { coeff: Rational::from_integer(1.into()), var: None },
        ]);
        let v = m.rational_value(&ts, p).unwrap();
        assert_eq!(v, Rational::from_integer(7.into()));
    }

    #[test]
    fn negated_boolean_occurrence_flips_value() {
        let mut ts = TermStore::new();
        let mut m = Model::new();
        let p = ts.mk_uninterpreted("p", Sort::Bool);
        m.assign(p.term(), Value::Bool(true));
        assert_eq!(m.holds(&ts, p).unwrap(), true);
        assert_eq!(m.holds(&ts, !p).unwrap(), false);
    }

    #[test]
    fn unassigned_variable_is_an_error() {
        let mut ts = TermStore::new();
        let m = Model::new();
        let x = ts.mk_uninterpreted("x", Sort::Real);
        assert!(matches!(m.rational_value(&ts, x.term()), Err(ModelError::Unassigned(_))));
    }
}
