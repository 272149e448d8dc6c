mod channel;
mod context;
mod executor;

pub use channel::{Channel, ChannelEvent, ChannelOptions};
pub use context::{Context, NodeOutcome};
pub use executor::Executor;
pub(crate) use executor::failure_error;
