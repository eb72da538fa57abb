//! Domain-event plumbing: the `Event` trait and a transport-agnostic pub/sub bus.
//!
//! Domain crates define their own typed event enums and implement [`Event`];
//! this crate only provides the mechanics for distributing them after commit.

pub mod bus;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
