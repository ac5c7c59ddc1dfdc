//! Zeytin Core - shared types and domain rules.
//!
//! This crate is used by:
//! - `admin` - the REST/WebSocket admin API
//! - `cli` - migrations, user management and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic: no I/O, no database
//! access, no HTTP. With the `postgres` feature enabled the ID newtypes and
//! status enums also implement the `sqlx` traits.
//!
//! # Modules
//!
//! - [`types`] - type-safe IDs, statuses, emails and money/text helpers
//! - [`inventory`] - the order-status-driven stock rule
//! - [`pricing`] - the pricing-policy calculator
//! - [`catalog`] - product variants, stock and image helpers
//! - [`orders`] - order line items, addresses, totals and numbering
//! - [`slug`] - URL slug generation
//! - [`validation`] - request field validation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod inventory;
pub mod orders;
pub mod pricing;
pub mod slug;
pub mod types;
pub mod validation;

pub use types::*;
