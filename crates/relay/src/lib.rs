//! Charity Yeti payment relay library.
//!
//! This crate provides the relay functionality as a library so the binary,
//! the CLI and the integration tests share one implementation:
//!
//! - [`payments`] - client for the payment middleware
//! - [`store`] - donation store adapters
//! - [`social`] - social platform client and profile lookup
//! - [`responder`] - mention replies and the stream listener
//! - [`routes`] - HTTP handlers and router

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod payments;
pub mod responder;
pub mod routes;
pub mod social;
pub mod state;
pub mod store;
