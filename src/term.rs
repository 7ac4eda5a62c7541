//! Term graph with hash-consing and polarity-tagged occurrences.
//!
//! Terms live in a single arena (`TermStore`). Every term is identified by a
//! [`TermId`], and every *occurrence* of a term carries an independent
//! polarity bit ([`TermOccurrence`]): `t+` and `t-` both name the same
//! underlying node, and negation is a single bit flip, never a new
//! allocation. Structural equality is index equality because the store
//! hash-conses on construction: two syntactically identical nodes always
//! resolve to the same [`TermId`].
//!
//! Only the subset of term kinds the projector needs to reason about is
//! modeled here: uninterpreted constants, linear arithmetic atoms/polynomials,
//! the generic composites, and bitvector constants carried only as opaque
//! pass-through values.

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::fmt;

use num_rational::BigRational;
use num_traits::{One, Zero};
use rustc_hash::FxHasher;

use crate::Sort;

type FxBuildHasher = std::hash::BuildHasherDefault<FxHasher>;

/// Index of a term node in the [`TermStore`] arena.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TermId(u32);

impl TermId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A signed occurrence of a term: the node plus a polarity bit.
///
/// The low bit of the wrapped word is the polarity flag (0 = positive, 1 =
/// negated); the remaining bits index the underlying [`TermId`]. Two
/// occurrences built from the same `TermId` always compare equal modulo
/// polarity, and `!occ` is a pure bit flip — it never touches the arena.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TermOccurrence(i64);

impl TermOccurrence {
    #[inline]
    pub fn positive(id: TermId) -> Self {
        TermOccurrence((id.0 as i64) << 1)
    }

    #[inline]
    pub fn negative(id: TermId) -> Self {
        TermOccurrence(((id.0 as i64) << 1) | 1)
    }

    /// The underlying term, with polarity stripped.
    #[inline]
    pub fn term(self) -> TermId {
        TermId((self.0 >> 1) as u32)
    }

    #[inline]
    pub fn is_negated(self) -> bool {
        self.0 & 1 == 1
    }

    /// Complement: flips polarity, same underlying node.
    #[inline]
    pub fn negate(self) -> Self {
        TermOccurrence(self.0 ^ 1)
    }
}

impl std::ops::Not for TermOccurrence {
    type Output = Self;
    #[inline]
    fn not(self) -> Self {
        self.negate()
    }
}

impl fmt::Display for TermOccurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negated() {
            write!(f, "~t{}", self.term().0)
        } else {
            write!(f, "t{}", self.term().0)
        }
    }
}

/// A single monomial in an [`ArithmeticPolynomial`]: a rational coefficient
/// times an optional variable. `var = None` marks the constant monomial.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Monomial {
    pub coeff: Rational,
    pub var: Option<TermId>,
}

/// Wrapper around [`BigRational`] giving it a total, hashable identity
/// suitable for hash-consing (rationals are always kept in lowest terms by
/// `num-rational`, so structural equality is exact equality).
pub type Rational = BigRational;

/// Tagged term kinds relevant to the projector.
///
/// Only the constructors the projector actually touches are modeled;
/// anything else the surrounding solver might build is not representable
/// here.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TermKind {
    /// An uninterpreted (possibly arithmetic-typed) constant symbol.
    UninterpretedConstant { name: Box<str>, sort: Sort },
    /// A Boolean constant (`true`/`false` live as reserved nodes, see
    /// [`TermStore::true_occ`]/[`TermStore::false_occ`], but a constant term
    /// node still exists for uniformity).
    BoolConstant(bool),
    /// A constant arithmetic value.
    ArithmeticConstant(Rational),
    /// A sum of rational-weighted monomials over variables.
    ArithmeticPolynomial(Vec<Monomial>),
    /// `p = 0` where `p` is an arithmetic argument (constant, polynomial, or
    /// variable).
    ArithmeticEqAtom(TermId),
    /// `p >= 0`.
    ArithmeticGeAtom(TermId),
    /// `t1 = t2`, both arithmetic.
    ArithmeticBinEqAtom(TermId, TermId),
    /// `if c then a else b`.
    Ite(TermOccurrence, TermOccurrence, TermOccurrence),
    /// `a = b` (generic, non-arithmetic-atom equality).
    Eq(TermOccurrence, TermOccurrence),
    /// `distinct(args)`.
    Distinct(Vec<TermOccurrence>),
    /// `or(args)`.
    Or(Vec<TermOccurrence>),
    /// `xor(a, b)`.
    Xor(TermOccurrence, TermOccurrence),
    /// An uninterpreted application, e.g. `f(args)` — tracked only so the
    /// generic phase can substitute into its arguments; the projector never
    /// interprets `f`.
    App { head: Box<str>, args: Vec<TermOccurrence> },
    /// A bitvector constant, carried opaquely (pass-through).
    BvConstant(Box<[bool]>),
}

/// Errors raised by [`TermStore`] queries and constructors.
#[derive(Debug, thiserror::Error)]
pub enum TermError {
    #[error("term {0:?} is not an arithmetic term")]
    NotArithmetic(TermId),
    #[error("term {0:?} is not an arithmetic literal")]
    NotArithmeticLiteral(TermId),
    #[error("term {0:?} is not a binary arithmetic equality")]
    NotBinEq(TermId),
    #[error("value has no term representation in this store")]
    Unrepresentable,
}

/// Hash-consed, append-only term graph.
///
/// Construction always goes through `mk_*`, which looks the node up in an
/// internal table first; a node is allocated only on a hash-consing miss.
/// This is the same immutable-arena-with-integer-handles pattern used
/// throughout this codebase for "term"/"index" style values (see
/// [`crate::model`] and the index newtypes it shares with this module).
pub struct TermStore {
    nodes: Vec<TermKind>,
    intern: HashMap<TermKind, TermId, FxBuildHasher>,
    true_id: TermId,
    false_id: TermId,
}

impl Default for TermStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TermStore {
    pub fn new() -> Self {
        let mut nodes = Vec::new();
        let mut intern: HashMap<TermKind, TermId, FxBuildHasher> = HashMap::default();

        let mut push = |nodes: &mut Vec<TermKind>, intern: &mut HashMap<TermKind, TermId, FxBuildHasher>, k: TermKind| -> TermId {
            if let Some(id) = intern.get(&k) {
                return *id;
            }
            let id = TermId(nodes.len() as u32);
            nodes.push(k.clone());
            intern.insert(k, id);
            id
        };

        let true_id = push(&mut nodes, &mut intern, TermKind::BoolConstant(true));
        let false_id = push(&mut nodes, &mut intern, TermKind::BoolConstant(false));

        TermStore { nodes, intern, true_id, false_id }
    }

    /// The reserved occurrence for Boolean `true`.
    #[inline]
    pub fn true_occ(&self) -> TermOccurrence {
        TermOccurrence::positive(self.true_id)
    }

    /// The reserved occurrence for Boolean `false`.
    #[inline]
    pub fn false_occ(&self) -> TermOccurrence {
        TermOccurrence::positive(self.false_id)
    }

    #[inline]
    pub fn is_true(&self, occ: TermOccurrence) -> bool {
        occ == self.true_occ()
    }

    fn intern(&mut self, k: TermKind) -> TermId {
        if let Some(id) = self.intern.get(&k) {
            return *id;
        }
        let id = TermId(self.nodes.len() as u32);
        self.nodes.push(k.clone());
        self.intern.insert(k, id);
        id
    }

    // ------------------------------ constructors ------------------------------

    pub fn mk_uninterpreted(&mut self, name: impl Into<Box<str>>, sort: Sort) -> TermOccurrence {
        TermOccurrence::positive(self.intern(TermKind::UninterpretedConstant { name: name.into(), sort }))
    }

    pub fn mk_bool_constant(&mut self, v: bool) -> TermOccurrence {
        if v { self.true_occ() } else { self.false_occ() }
    }

    pub fn mk_arith_constant(&mut self, v: Rational) -> TermId {
        self.intern(TermKind::ArithmeticConstant(v))
    }

    /// Build a polynomial node from monomials, normalizing away zero
    /// coefficients and folding duplicate variables. Collapses to a plain
    /// [`TermKind::ArithmeticConstant`] node when no variable survives.
    pub fn mk_polynomial(&mut self, mut monomials: Vec<Monomial>) -> TermId {
        monomials.retain(|m| !m.coeff.is_zero());
        // Fold duplicate variables (stable, first-seen order) and constants.
        let mut order: Vec<Option<TermId>> = Vec::new();
        let mut acc: HashMap<Option<TermId>, Rational> = HashMap::new();
        for m in monomials {
            if !acc.contains_key(&m.var) {
                order.push(m.var);
            }
            *acc.entry(m.var).or_insert_with(Rational::zero) += m.coeff;
        }
        let folded: Vec<Monomial> = order
            .into_iter()
            .filter_map(|v| {
                let c = acc.remove(&v).unwrap();
                if c.is_zero() {
                    None
                } else {
                    Some(Monomial { coeff: c, var: v })
                }
            })
            .collect();

        if folded.is_empty() {
            return self.mk_arith_constant(Rational::zero());
        }
        if folded.len() == 1 && folded[0].var.is_none() {
            return self.mk_arith_constant(folded[0].coeff.clone());
        }
        self.intern(TermKind::ArithmeticPolynomial(folded))
    }

    pub fn mk_arith_eq(&mut self, p: TermId) -> TermOccurrence {
        TermOccurrence::positive(self.intern(TermKind::ArithmeticEqAtom(p)))
    }

    pub fn mk_arith_ge(&mut self, p: TermId) -> TermOccurrence {
        TermOccurrence::positive(self.intern(TermKind::ArithmeticGeAtom(p)))
    }

    pub fn mk_arith_bin_eq(&mut self, a: TermId, b: TermId) -> TermOccurrence {
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        TermOccurrence::positive(self.intern(TermKind::ArithmeticBinEqAtom(a, b)))
    }

    pub fn mk_eq(&mut self, a: TermOccurrence, b: TermOccurrence) -> TermOccurrence {
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        TermOccurrence::positive(self.intern(TermKind::Eq(a, b)))
    }

    pub fn mk_ite(&mut self, c: TermOccurrence, a: TermOccurrence, b: TermOccurrence) -> TermOccurrence {
        TermOccurrence::positive(self.intern(TermKind::Ite(c, a, b)))
    }

    pub fn mk_distinct(&mut self, mut args: Vec<TermOccurrence>) -> TermOccurrence {
        args.sort_unstable();
        TermOccurrence::positive(self.intern(TermKind::Distinct(args)))
    }

    pub fn mk_or(&mut self, args: Vec<TermOccurrence>) -> TermOccurrence {
        TermOccurrence::positive(self.intern(TermKind::Or(args)))
    }

    pub fn mk_xor(&mut self, a: TermOccurrence, b: TermOccurrence) -> TermOccurrence {
        TermOccurrence::positive(self.intern(TermKind::Xor(a, b)))
    }

    pub fn mk_app(&mut self, head: impl Into<Box<str>>, args: Vec<TermOccurrence>) -> TermOccurrence {
        TermOccurrence::positive(self.intern(TermKind::App { head: head.into(), args }))
    }

    pub fn mk_bv_constant(&mut self, bits: impl Into<Box<[bool]>>) -> TermOccurrence {
        TermOccurrence::positive(self.intern(TermKind::BvConstant(bits.into())))
    }

    // -------------------------------- queries ---------------------------------

    /// Kind of a term, with polarity stripped. Looking up a negated
    /// occurrence still returns the underlying node's kind: polarity is a
    /// property of the occurrence, not the node.
    pub fn kind(&self, occ: TermOccurrence) -> &TermKind {
        &self.nodes[occ.term().index()]
    }

    pub fn is_boolean(&self, occ: TermOccurrence) -> bool {
        matches!(
            self.kind(occ),
            TermKind::BoolConstant(_)
                | TermKind::ArithmeticEqAtom(_)
                | TermKind::ArithmeticGeAtom(_)
                | TermKind::ArithmeticBinEqAtom(_, _)
                | TermKind::Ite(_, _, _)
                | TermKind::Eq(_, _)
                | TermKind::Distinct(_)
                | TermKind::Or(_)
                | TermKind::Xor(_, _)
        )
    }

    pub fn is_arithmetic(&self, occ: TermOccurrence) -> bool {
        matches!(
            self.kind(occ),
            TermKind::ArithmeticConstant(_) | TermKind::ArithmeticPolynomial(_)
        ) || matches!(
            self.kind(occ),
            TermKind::UninterpretedConstant { sort, .. } if sort.is_arithmetic()
        )
    }

    pub fn is_arithmetic_literal(&self, occ: TermOccurrence) -> bool {
        matches!(
            self.kind(occ),
            TermKind::ArithmeticEqAtom(_) | TermKind::ArithmeticGeAtom(_) | TermKind::ArithmeticBinEqAtom(_, _)
        )
    }

    pub fn is_uninterpreted_const(&self, occ: TermOccurrence) -> bool {
        matches!(self.kind(occ), TermKind::UninterpretedConstant { .. })
    }

    pub fn sort_of(&self, occ: TermOccurrence) -> Option<Sort> {
        match self.kind(occ) {
            TermKind::UninterpretedConstant { sort, .. } => Some(*sort),
            TermKind::BoolConstant(_)
            | TermKind::ArithmeticEqAtom(_)
            | TermKind::ArithmeticGeAtom(_)
            | TermKind::ArithmeticBinEqAtom(_, _)
            | TermKind::Ite(_, _, _)
            | TermKind::Eq(_, _)
            | TermKind::Distinct(_)
            | TermKind::Or(_)
            | TermKind::Xor(_, _) => Some(Sort::Bool),
            TermKind::ArithmeticConstant(_) | TermKind::ArithmeticPolynomial(_) => Some(Sort::Real),
            TermKind::BvConstant(bits) => Some(Sort::BitVec(bits.len())),
            TermKind::App { .. } => None,
        }
    }

    /// The single arithmetic argument of an `ArithmeticEqAtom`/`ArithmeticGeAtom`.
    pub fn arith_atom_arg(&self, occ: TermOccurrence) -> Result<TermId, TermError> {
        match self.kind(occ) {
            TermKind::ArithmeticEqAtom(p) | TermKind::ArithmeticGeAtom(p) => Ok(*p),
            _ => Err(TermError::NotArithmeticLiteral(occ.term())),
        }
    }

    /// The two arguments of an `ArithmeticBinEqAtom`.
    pub fn arith_bineq_args(&self, occ: TermOccurrence) -> Result<(TermId, TermId), TermError> {
        match self.kind(occ) {
            TermKind::ArithmeticBinEqAtom(a, b) => Ok((*a, *b)),
            _ => Err(TermError::NotBinEq(occ.term())),
        }
    }

    /// Monomials of an arithmetic argument, normalizing a bare constant or
    /// variable into a one-monomial sequence so callers have a single
    /// traversal shape. The leading constant monomial (`var: None`), if
    /// present, is always first.
    pub fn poly_monomials(&self, arg: TermId) -> Result<Vec<Monomial>, TermError> {
        match &self.nodes[arg.index()] {
            TermKind::ArithmeticPolynomial(ms) => Ok(ms.clone()),
            TermKind::ArithmeticConstant(c) => Ok(vec![Monomial { coeff: c.clone(), var: None }]),
            TermKind::UninterpretedConstant { sort, .. } if sort.is_arithmetic() => {
                Ok(vec![Monomial { coeff: Rational::one(), var: Some(arg) }])
            }
            _ => Err(TermError::NotArithmetic(arg)),
        }
    }

    pub fn app_args(&self, occ: TermOccurrence) -> Option<&[TermOccurrence]> {
        match self.kind(occ) {
            TermKind::App { args, .. } => Some(args),
            _ => None,
        }
    }

    /// Direct Boolean/composite sub-occurrences of `occ`, used by the
    /// substitutors to recurse. Arithmetic subterms are walked separately
    /// via [`TermStore::poly_monomials`]; this only covers the generic
    /// composite shapes the substitution engines rewrite.
    pub fn children(&self, occ: TermOccurrence) -> Vec<TermOccurrence> {
        match self.kind(occ) {
            TermKind::Ite(c, a, b) => vec![*c, *a, *b],
            TermKind::Eq(a, b) => vec![*a, *b],
            TermKind::Distinct(args) | TermKind::Or(args) => args.clone(),
            TermKind::Xor(a, b) => vec![*a, *b],
            TermKind::App { args, .. } => args.clone(),
            TermKind::ArithmeticEqAtom(p) | TermKind::ArithmeticGeAtom(p) => {
                vec![TermOccurrence::positive(*p)]
            }
            TermKind::ArithmeticBinEqAtom(a, b) => {
                vec![TermOccurrence::positive(*a), TermOccurrence::positive(*b)]
            }
            TermKind::ArithmeticPolynomial(ms) => ms
                .iter()
                .filter_map(|m| m.var.map(TermOccurrence::positive))
                .collect(),
            TermKind::BoolConstant(_) | TermKind::ArithmeticConstant(_) | TermKind::UninterpretedConstant { .. } | TermKind::BvConstant(_) => {
                vec![]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_consing_dedups_identical_constants() {
        let mut ts = TermStore::new();
        let a = ts.mk_uninterpreted("x", Sort::Real);
        let b = ts.mk_uninterpreted("x", Sort::Real);
        assert_eq!(a, b);
    }

    #[test]
    fn polarity_is_a_single_bit_flip() {
        let mut ts = TermStore::new();
        let x = ts.mk_uninterpreted("p", Sort::Bool);
        assert_eq!(x.term(), (!x).term());
        assert_ne!(x.is_negated(), (!x).is_negated());
        assert_eq!(!!x, x);
    }

    #[test]
    fn polynomial_folds_duplicate_variables() {
        let mut ts = TermStore::new();
        let x = ts.mk_uninterpreted("x", Sort::Real).term();
        let p = ts.mk_polynomial(vec![
            Monomial { coeff: Rational::one(), var: Some(x) },
            Monomial { coeff: Rational::one(), var: Some(x) },
        ]);
        let ms = ts.poly_monomials(p).unwrap();
        assert_eq!(ms.len(), 1);
        assert_eq!(ms[0].coeff, Rational::from_integer(2.into()));
    }

    #[test]
    fn polynomial_collapses_to_constant_when_no_var_survives() {
        let mut ts = TermStore::new();
        let x = ts.mk_uninterpreted("x", Sort::Real).term();
        let p = ts.mk_polynomial(vec![
            Monomial { coeff: Rational::one(), var: Some(x) },
            Monomial { coeff: -Rational::one(), var: Some(x) },
        ]);
        assert!(matches!(ts.kind(TermOccurrence::positive(p)), TermKind::ArithmeticConstant(c) if c.is_zero()));
    }
}
