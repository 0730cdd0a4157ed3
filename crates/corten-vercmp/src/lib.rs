//! Version comparison for release-style package versions.
//!
//! Versions have the shape `[epoch:]version[-release]`. Comparison walks
//! alternating digit and alpha segments the way system packaging tools do,
//! with the epoch dominating everything and the release part only consulted
//! when both sides carry one.

mod compare;
mod relation;

pub use compare::{compare, satisfies};
pub use relation::{DepSpec, ParseError, Relation};
