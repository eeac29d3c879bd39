//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod password;
pub mod result;
mod token;
mod user;

pub use password::Argon2Params;
pub use token::{SessionToken, TokenClaims};
pub use user::{Role, StoredCredential, User, UserCredential, UserDetail, UserId};
