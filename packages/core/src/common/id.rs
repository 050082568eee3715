//! Typed wrappers for the opaque string keys assigned by the external store.
//!
//! Every entity is keyed by a string the store generates on `append`. This
//! module provides `Id<T>`, a typed wrapper around that key which prevents
//! accidentally mixing up different ID kinds (e.g., passing a `UserId` where
//! a `GroupId` was expected).
//!
//! # Example
//!
//! ```rust
//! use aura_core::common::id::Id;
//!
//! pub struct Group;
//! pub struct User;
//!
//! pub type GroupId = Id<Group>;
//! pub type UserId = Id<User>;
//!
//! let group_id = GroupId::from_key("-NxQ3f2a");
//! let user_id = UserId::from_key("uid-123");
//!
//! // This would be a compile error:
//! // let wrong: GroupId = user_id;
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt::{self, Debug, Display};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// A typed wrapper around a store-assigned string key.
///
/// The type parameter `T` is a marker for the entity type this ID belongs to.
/// IDs with different `T` parameters are incompatible at compile time.
pub struct Id<T>(String, PhantomData<fn() -> T>);

impl<T> Id<T> {
    /// Wraps a raw store key.
    ///
    /// Keys come from the store (`append` return values, subscription paths);
    /// this crate never invents them.
    #[inline]
    pub fn from_key(key: impl Into<String>) -> Self {
        Self(key.into(), PhantomData)
    }

    /// Returns the key as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the ID, returning the raw key.
    #[inline]
    pub fn into_key(self) -> String {
        self.0
    }
}

// ============================================================================
// Standard trait implementations
// ============================================================================

impl<T> Clone for Id<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self(self.0.clone(), PhantomData)
    }
}

impl<T> Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Include type name for debugging clarity
        f.debug_tuple(&format!("Id<{}>", std::any::type_name::<T>()))
            .field(&self.0)
            .finish()
    }
}

impl<T> Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<T> PartialEq for Id<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl<T> Hash for Id<T> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<T> AsRef<str> for Id<T> {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<T> From<String> for Id<T> {
    #[inline]
    fn from(key: String) -> Self {
        Self::from_key(key)
    }
}

impl<T> From<Id<T>> for String {
    #[inline]
    fn from(id: Id<T>) -> Self {
        id.0
    }
}

// ============================================================================
// Serde support
// ============================================================================

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self(String::deserialize(deserializer)?, PhantomData))
    }
}
