pub mod network;

pub use network::{start_server, Server};
