//! ferroftp: a small shared-folder transfer system over a private
//! line-based TCP protocol.
//!
//! The server exposes one shared root directory; clients browse it with
//! text commands (LIST, CD, MKDIR, ...) and move payloads with a
//! length-prefixed binary framing (GET/PUT for files, GETDIR/PUTDIR for
//! whole trees). The client side wraps every exchange in timeouts and a
//! single write-serialization lock, and recovers from dropped
//! connections by reconnecting and replaying its navigation.

pub mod config;
pub mod constants;
pub mod core_channel;
pub mod core_cli;
pub mod core_client;
pub mod core_command;
pub mod core_network;
pub mod core_sandbox;
pub mod core_transfer;
pub mod error;
pub mod helpers;
pub mod server;
pub mod session;

pub use config::Config;
pub use core_client::{ListEntry, OpOutcome, Session as ClientSession};
pub use error::FtpError;
