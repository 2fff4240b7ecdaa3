//! Typed event bus for agent activity streaming

mod bus;
mod types;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, EventEmitter, create_event_bus};
pub use types::{AgentEvent, Envelope};
