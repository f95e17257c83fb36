//! Domain model (documents, commands, events, chain ids and states).

pub mod command;
pub mod document;
pub mod event;
pub mod ids;
pub mod state;

pub use command::Command;
pub use document::{SpecDocument, normalize_channel};
pub use event::{Event, EventDocument, Trigger};
pub use ids::ChainId;
pub use state::ChainState;
