//! Business logic services for admin.
//!
//! # Services
//!
//! - `auth` - Username/password login with argon2id hashes
//! - `cache` - Moka cache for the public settings and catalog reads
//! - `catalog` - Categories, products and pricing
//! - `orders` - Order workflow, assignment and stock movements
//! - `realtime` - Event bus relayed to dashboard sockets
//! - `seed` - Default accounts, settings and sample catalog
//! - `settings` - Store settings
//! - `users` - Representative accounts

pub mod auth;
pub mod cache;
pub mod catalog;
pub mod orders;
pub mod realtime;
pub mod seed;
pub mod settings;
pub mod users;

pub use auth::{AuthError, AuthService};
pub use cache::AdminCache;
pub use catalog::CatalogService;
pub use orders::OrderService;
pub use realtime::{AdminEvent, EventBus, EventName};
pub use seed::{SeedError, SeedReport, seed_all};
pub use settings::SettingsService;
pub use users::UserService;
