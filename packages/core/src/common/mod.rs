// Common types and utilities shared across the crate

pub mod auth;
pub mod entity_ids;
pub mod errors;
pub mod id;
pub mod types;

pub use auth::{Actor, GroupCapability};
pub use entity_ids::*;
pub use errors::{DomainError, DomainResult};
pub use types::UserProfile;
