//! JetStream stream definitions and durable subscribers for storage events.

mod event_stream;
mod message;
mod subscriber;

pub use event_stream::{EventStream, StorageEventStream};
pub use message::{EventMessage, EventMessages};
pub use subscriber::{ConsumerConfig, EventSubscriber};
