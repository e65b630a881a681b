#![warn(clippy::pedantic)]
// Doc-section lints would need annotating every public fallible function
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
// format!("{}", x) is kept over format!("{x}") throughout
#![allow(clippy::uninlined_format_args)]
// Character counts, token limits and timeouts cross integer widths
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]
// The round loop and the transport handlers are long state machines
#![allow(clippy::too_many_lines)]
// Types are named after their module (session::SessionManager, ...)
#![allow(clippy::module_name_repetitions)]

pub mod agent;
pub mod bus;
pub mod channels;
pub mod cli;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod providers;
pub mod safety;
pub mod session;
pub(crate) mod utils;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
