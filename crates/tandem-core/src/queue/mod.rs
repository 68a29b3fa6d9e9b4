//! Blocking bounded queue used between pipeline producers and consumers.

mod bounded;

pub use bounded::{BoundedQueue, ShutdownRejected};
