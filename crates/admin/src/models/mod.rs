//! Domain models for the admin API.
//!
//! Models are the validated, serializable shapes handed to route handlers.
//! Repositories convert database rows into these types.

pub mod admin_user;
pub mod category;
pub mod order;
pub mod product;
pub mod session;

pub use admin_user::{AdminRole, AdminUser, UserSummary};
pub use category::{Category, CategoryWithProducts};
pub use order::{ActivityKind, Order, OrderActivity, OrderWithAssignee};
pub use product::{Product, ProductWithCategory};
pub use session::{CurrentAdmin, keys as session_keys};
