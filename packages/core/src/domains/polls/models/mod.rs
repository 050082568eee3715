pub mod poll;

pub use poll::{Choice, Poll};
