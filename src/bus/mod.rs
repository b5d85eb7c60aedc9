pub mod events;

pub use events::{InboundEvent, OutboundMessage};
