pub mod events;

pub use events::{ChatScope, InboundEvent, ReplyTarget};
