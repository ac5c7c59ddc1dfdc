//! HTTP middleware stack for admin.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS (dashboard origins, credentials allowed)
//! 5. Session layer (tower-sessions with `PostgreSQL` store)
//! 6. Rate limiting on login and public order creation (governor)

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::{RequireAdmin, RequireAuth, clear_current_admin, set_current_admin};
pub use rate_limit::{login_rate_limiter, order_rate_limiter};
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
