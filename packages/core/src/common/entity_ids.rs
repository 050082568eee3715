//! Typed ID definitions for all domain entities.
//!
//! One alias per entity keeps ID usage type-safe throughout the crate:
//! a `UserId` can never be handed to a function expecting a `GroupId`.

// Re-export the core Id type
pub use super::id::Id;

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker type for Group entities.
pub struct Group;

/// Marker type for User entities.
pub struct User;

/// Marker type for Rule entities.
pub struct Rule;

/// Marker type for ledger HistoryEntry entities.
pub struct HistoryEntry;

/// Marker type for chat Message entities (polls and elections included).
pub struct Message;

/// Marker type for Notification entities.
pub struct Notification;

// ============================================================================
// Type aliases - the primary API
// ============================================================================

/// Typed ID for Group entities.
pub type GroupId = Id<Group>;

/// Typed ID for User entities.
pub type UserId = Id<User>;

/// Typed ID for Rule entities.
pub type RuleId = Id<Rule>;

/// Typed ID for ledger history entries.
pub type EntryId = Id<HistoryEntry>;

/// Typed ID for chat messages. Polls and elections live in the message
/// stream, so they share this ID space.
pub type MessageId = Id<Message>;

/// Typed ID for notifications.
pub type NotificationId = Id<Notification>;
