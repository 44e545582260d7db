//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in a DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own format.

pub mod admin;
pub mod candidate;
pub mod closer;
pub mod group;
pub mod history;
pub mod settings;
pub mod vote;
