//! Integration tests for the Zeytin admin API.
//!
//! # Running Tests
//!
//! ```bash
//! # Domain tests (no services needed)
//! cargo test -p zeytin-integration-tests
//!
//! # HTTP tests against a running, seeded admin server
//! ADMIN_BASE_URL=http://localhost:3001 \
//!     cargo test -p zeytin-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `order_workflow` - checkout totals, stock rules and representative access
//! - `seed_catalog` - the embedded sample catalog against the catalog rules
//! - `admin_api` - HTTP round trips through the running server
