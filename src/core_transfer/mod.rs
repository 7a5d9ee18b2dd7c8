pub mod progress;
pub mod transfer;

pub use progress::{ProgressFn, ProgressReporter};
pub use transfer::{collect_files, drain_bytes, recv_file, send_file, transfer_rate};
