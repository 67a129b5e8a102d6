//! API-compatible types.
//!
//! The types in this module are request and response bodies that have no
//! direct counterpart in the domain model. Field names are camelCase.

pub mod admin;
pub mod attendance;
pub mod session;
pub mod stats;
pub mod vote;
pub mod voter;
