//! Medico Core - Shared types library.
//!
//! This crate provides common types used across all Medico Store components:
//! - `client` - SDK for the medico-store REST backend (session, cart, profile)
//! - `cli` - Command-line front end built on the client
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, contact details and roles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
