use thiserror::Error;

use crate::kernel::store::StoreError;

/// Failure taxonomy shared by all domain services.
///
/// Validation failures (`NotFound`, `Forbidden`, `InvalidArgument`,
/// `AlreadyMember`, `DuplicatePending`, `InvalidTarget`) are recoverable and
/// surfaced to the caller as user-facing conditions. `Conflict` means an
/// optimistic balance update lost its race and exhausted its retries.
/// `Unavailable` wraps a failed store call. No error here is fatal to the
/// process; each operation fails independently.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("permission denied: {0}")]
    Forbidden(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("requester is already a member of this group")]
    AlreadyMember,

    #[error("a join request for this group is already pending")]
    DuplicatePending,

    #[error("invalid target: {0}")]
    InvalidTarget(&'static str),

    #[error("concurrent update lost: {0}")]
    Conflict(&'static str),

    #[error("malformed stored record: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error(transparent)]
    Unavailable(#[from] StoreError),
}

pub type DomainResult<T> = Result<T, DomainError>;
