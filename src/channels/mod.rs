pub mod base;
pub mod console;
pub mod onebot;

pub use base::{Transport, split_message};
pub use console::ConsoleTransport;
pub use onebot::OneBotTransport;
