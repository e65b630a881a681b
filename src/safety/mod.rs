pub mod command_gate;

pub use command_gate::{DenyCategory, DenyMatch, SafetyGate};
