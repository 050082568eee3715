// Aura - Group Points Core
//
// This crate is the domain core of a group points-tracking app: members of a
// group accrue and lose points under creator-defined rules, vote in polls and
// creator elections, and exchange messages. The crate owns the invariants
// (balances reconcile with history, join requests never duplicate, elections
// resolve exactly once) and talks to a realtime key-value store through the
// `kernel::store::BaseStore` contract.
//
// The app shell (screens, navigation, auth session, push delivery) lives
// outside this crate and drives it through the domain services.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;

pub use config::Config;
