// Infrastructure: the store contract, its in-memory implementation, the
// dependency container, and scheduled background work.

pub mod deps;
pub mod expiry;
pub mod memory;
pub mod store;
#[cfg(test)]
pub mod test_support;

pub use deps::CoreDeps;
pub use expiry::{start_expiry_scheduler, PollExpiryChecker};
pub use memory::MemoryStore;
pub use store::{paths, BaseStore, StoreError, StoreEvent, Subscription};
