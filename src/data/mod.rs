//! Data layer module
//!
//! Handles session persistence:
//! - Session models (identifier, fields, record)
//! - `SessionStore` interface
//! - In-memory session store (volatile)

mod cache;
mod models;
mod store;

pub use cache::MemorySessionStore;
pub use models::*;
pub use store::SessionStore;
