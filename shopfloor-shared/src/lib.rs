//! # Shopfloor Shared Library
//!
//! This crate contains the domain types, persistence code and business logic
//! used by the Shopfloor API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `assignment`: Ticket ↔ mechanic / inventory assignment workflow
//! - `auth`: Password hashing, JWT tokens and request auth context
//! - `cache`: Listing cache with explicit invalidation
//! - `db`: Connection pool and migrations

pub mod assignment;
pub mod auth;
pub mod cache;
pub mod db;
pub mod models;

/// Current version of the Shopfloor shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
