//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the CredentialStore port
//! - An in-memory map for the CredentialStore port (tests, embedding)
//! - HMAC-SHA256 signed tokens for the TokenAuthority port

pub mod duckdb;
pub mod hmac_token;
pub mod memory;
