pub mod group;
pub mod rule;

pub use group::{Group, Membership, Role};
pub use rule::Rule;
