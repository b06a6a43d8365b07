//! Messaging mechanics for the executor: commands, events, envelopes, the
//! at-least-once message bus, the command-handler contract and sagas.

pub mod bus;
pub mod command;
pub mod envelope;
pub mod event;
pub mod handler;
pub mod in_memory_bus;
pub mod outbox;
pub mod saga;

pub use bus::{MessageBus, Subscription};
pub use command::Command;
pub use envelope::Envelope;
pub use event::Event;
pub use handler::{CommandHandler, CommandHandlingResult, HandlingError};
pub use in_memory_bus::{InMemoryBusError, InMemoryMessageBus};
pub use outbox::Outbox;
pub use saga::Saga;
