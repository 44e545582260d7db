//! Data types, split by where they live:
//!
//! - [`api`]: request and response bodies, serialised in an API-friendly way.
//! - [`db`]: documents stored in MongoDB.
//! - [`common`]: value types shared by both.
//! - [`mongodb`]: typed collections and BSON helpers.

pub mod api;
pub mod common;
pub mod db;
pub mod mongodb;
