//! General-purpose collections shared by the dispatcher pool and the session cache.

pub mod queue;

pub use queue::{IntoIter, Iter, Queue};
