//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod auth;
pub mod migration;
mod password;

pub use auth::{AuthService, DEFAULT_STORE_TIMEOUT};
pub use migration::{MigrationResult, MigrationService};
pub use password::PasswordHasher;
