pub mod chat;
pub mod groups;
pub mod ledger;
pub mod membership;
pub mod notifications;
pub mod polls;
