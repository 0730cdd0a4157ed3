//! Ordering of resolved operations into a commit plan.
//!
//! A change set produced by the resolver says WHAT to do but not in
//! which order. Requirements, conflicts and upgrades all constrain the
//! order; this module turns them into a precedence graph and emits a
//! linear plan.
//!
//! # Architecture
//!
//! * [`ElementSorter`] sorts arbitrary elements under `Enforce` and
//!   `Optional` edges, with or- and and-groups guiding which edges the
//!   loop breaker may sacrifice.
//! * [`ChangeSetSorter`] maps a [`ChangeSet`](crate::transaction::ChangeSet)
//!   onto sorter elements and derives the edges from cache relations.
//!
//! Dependency graphs of real systems are rarely acyclic. The sorter
//! first drops sacrificial edges until no cycle remains, then runs a
//! plain topological emission. A cycle held together entirely by hard
//! edges cannot be broken and fails the sort with
//! [`SortError::Loop`](crate::error::SortError::Loop).

mod changeset;
mod element;

#[cfg(test)]
mod tests;

pub use changeset::{sort_changeset, ChangeSetSorter, ChangeStep};
pub use element::{EdgeKind, ElementSorter, GroupId, GroupKind};
