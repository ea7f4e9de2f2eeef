//! Terminal client for Parley
//!
//! A thin shell over [`parley_app::Driver`] that reads commands from stdin,
//! prints the view to stdout and talks to the broker over WebSocket and the
//! REST API over HTTP. All orchestration logic lives in the generic
//! [`parley_app::Runtime`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod args;
pub mod system_env;
pub mod terminal;
pub mod view;

pub use args::{Args, CliError};
pub use parley_app::{App, AppAction, AppEvent, Bridge, Driver, Runtime};
pub use system_env::SystemEnv;
pub use terminal::{TerminalDriver, TerminalError};
