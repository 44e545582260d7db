//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - IDs are serialised as hex strings.
//! - Datetimes are serialised as RFC 3339 strings.
//! - Field names are camelCase.

pub mod admin;
pub mod ai;
pub mod auth;
pub mod candidate;
pub mod group;
pub mod history;
pub mod otp;
pub mod results;
pub mod settings;
pub mod vote;
