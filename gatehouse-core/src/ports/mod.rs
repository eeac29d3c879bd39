//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.

mod clock;
mod credential_store;
mod token_authority;

pub use clock::{Clock, SystemClock};
pub use credential_store::CredentialStore;
pub use token_authority::TokenAuthority;
