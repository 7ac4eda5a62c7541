//! Tunables the projection core exposes to callers.
//!
//! The projector genuinely has very few knobs: a cap on how many variables a
//! single projection can be asked to eliminate (so a misbehaving caller gets
//! a typed error instead of unbounded internal work), and a flag recording
//! that tie-breaking is always deterministic. Unlike the solver's other
//! subsystems there is no file- or environment-based configuration surface
//! here — a `ProjectorConfig` is just a plain value the caller constructs.

#![forbid(unsafe_code)]

/// Configuration for a single [`crate::projector::Projector`] run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProjectorConfig {
    /// Upper bound on `|vars_to_elim|`. [`crate::projector::Projector::new`]
    /// fails with `TooManyVars` above this limit.
    pub max_vars_to_elim: usize,
    /// Always `true` in this crate. Kept as an explicit field rather than
    /// hardcoded behavior so a future caller can observe the contract even
    /// though only one tie-break policy (insertion order) is implemented.
    pub deterministic_tiebreak: bool,
}

impl ProjectorConfig {
    /// The solver's internal default limit on variables eliminated in one
    /// projection call.
    pub const DEFAULT_MAX_VARS_TO_ELIM: usize = 4096;
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        ProjectorConfig {
            max_vars_to_elim: Self::DEFAULT_MAX_VARS_TO_ELIM,
            deterministic_tiebreak: true,
        }
    }
}
