//! Core types for the Zeytin admin.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod status;
pub mod text;

pub use email::{Email, EmailError};
pub use id::*;
pub use status::*;
