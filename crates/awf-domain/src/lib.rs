//! Domain allowlist grammar (C1) and proxy ruleset derivation.
//!
//! `DomainSpec` is a tagged union rather than a base class with two
//! subtypes: pattern compilation lives on the `Wildcard` variant itself,
//! matching has no dynamic dispatch, and exhaustive `match`es at call
//! sites double as documentation of every place protocol/wildcard
//! semantics matter.

pub mod error;
pub mod pattern;
#[cfg(test)]
mod proptest_support;
pub mod ruleset;
pub mod spec;

pub use error::{DomainError, Result};
pub use ruleset::ProxyRuleset;
pub use spec::{parse, DomainSpec, DomainSpecBody, Protocol};
