pub mod entry;

pub use entry::{ChangeType, HistoryEntry};
