//! Model-based projection (MBP) of a conjunction of literals over a set of
//! existentially quantified uninterpreted constants, given a model that
//! satisfies the conjunction.
//!
//! This crate is the core algorithmic subsystem of an SMT solver's
//! quantifier-free quantifier-elimination pass: given (a) a model that
//! satisfies a cube (conjunction of literals), (b) a set of uninterpreted
//! "variables to eliminate", and (c) the literals of the cube, the
//! [`projector::Projector`] produces an equisatisfiable cube that does not
//! mention the eliminated variables and remains true in the same model.
//!
//! ## Layout
//!
//! - [`term`] — the hash-consed term graph ([`term::TermStore`]) and its
//!   polarity-tagged [`term::TermOccurrence`] handles.
//! - [`model`] — [`model::Model`], the satisfying assignment the projector
//!   is guided by.
//! - [`subst`] — the two substitution engines consumed by the generic and
//!   value-closure phases ([`subst::EliminationSubstitution`],
//!   [`subst::TermSubstitutor`]).
//! - [`arith`] — [`arith::ArithProjector`], the Loos–Weispfenning virtual
//!   substitution engine for linear arithmetic.
//! - [`projector`] — [`projector::Projector`], the three-phase orchestrator,
//!   and [`projector::ProjectorFlag`], its sticky error/status type.
//! - [`config`] — the small set of tunables the core exposes
//!   ([`config::ProjectorConfig`]).
//!
//! `#![forbid(unsafe_code)]` holds crate-wide: the term graph, model, and
//! substitution/projection engines are all safe-Rust data structures over a
//! single hash-consed arena.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

/// Linear-arithmetic virtual substitution (Loos–Weispfenning projector).
pub mod arith;
/// Tunables the projection core exposes to callers.
pub mod config;
/// The satisfying assignment the projector is guided by.
pub mod model;
/// Three-phase orchestrator tying the term graph, model, and sub-engines
/// together.
pub mod projector;
/// Generic-equality and value-closure substitution engines.
pub mod subst;
/// Hash-consed term graph with polarity-tagged occurrences.
pub mod term;


pub use config::ProjectorConfig;
pub use model::{Model, ModelError, Value};
pub use projector::{project_literals, NonLinearKind, Projector, ProjectorFlag};
pub use term::{TermId, TermOccurrence, TermStore};

/// The theory sort of a term, as far as the projector needs to distinguish.
///
/// `Int`/`Real` both flow through the same rational-valued arithmetic
/// machinery: an integer to-eliminate variable is still projected by
/// ordinary Loos–Weispfenning substitution over its rational relaxation,
/// which is sound because its model value is itself an integer. Full
/// integer virtual substitution with divisibility side constraints is out
/// of scope (mixed non-linear/integer projection is a declared non-goal).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Sort {
    Bool,
    Int,
    Real,
    BitVec(usize),
}

impl Sort {
    #[inline]
    pub fn is_arithmetic(self) -> bool {
        matches!(self, Sort::Int | Sort::Real)
    }
}
