//! Charity Yeti Core - Shared types library.
//!
//! This crate provides the domain types used across all Charity Yeti components:
//! - `relay` - Payment relay server and mention responder
//! - `cli` - Command-line tools for migrations and one-off replies
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Payment requests, middleware transactions, donation records,
//!   social profiles and type-safe IDs

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
