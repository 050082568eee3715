//! Authorization for group operations.
//!
//! Provides a fluent API for the creator-only checks that every mutating
//! service performs before touching the store:
//!
//! ```rust,ignore
//! use crate::common::auth::{Actor, GroupCapability};
//!
//! actor.can(GroupCapability::AdjustPoints).check(&group)?;
//! ```
//!
//! The `Actor` is an explicit session object handed into each service call.
//! There is no ambient current-user state anywhere in this crate, and the
//! checks run in the same layer that performs the persistence call; a check
//! done only in the UI is not a security boundary.

mod builder;
mod capability;

pub use builder::{Actor, CapabilityCheck};
pub use capability::GroupCapability;
