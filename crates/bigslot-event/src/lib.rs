//! # bigslot-event — Game notifications
//!
//! Every change to the progression record and every spin produces a
//! [`GameEvent`]. The [`EventBus`] wraps it in a timestamped
//! [`EventEnvelope`] and hands it synchronously to each subscriber.
//! No queueing, no delivery guarantee beyond the listeners present at
//! emit time.

pub mod bus;
pub mod event;

pub use bus::*;
pub use event::*;
