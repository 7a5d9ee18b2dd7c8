// src/constants.rs

use std::time::Duration;

// Wire markers. The protocol is ad hoc: sentinels and counts are the only
// framing besides the length lines that precede every raw byte segment.
pub const SENDING_FILE: &str = "SENDING_FILE";
pub const END_OF_FILE: &str = "END_OF_FILE";
pub const SENDING_DIR: &str = "SENDING_DIR";
pub const END_OF_DIR: &str = "END_OF_DIR";
pub const READY_FOR_DIR: &str = "READY_FOR_DIR";
pub const END_OF_LIST: &str = "END_OF_LIST";
pub const OK_PREFIX: &str = "OK:";

pub const LIST_HEADER: &str = "Directory listing:";
pub const FOLDER_PREFIX: &str = "[Folder] ";
pub const FILE_PREFIX: &str = "[File] ";

// Fixed response lines the client matches against.
pub const NOOP_OK: &str = "OK";
pub const QUIT_BYE: &str = "Bye";
pub const FILE_DELETED: &str = "File deleted.";
pub const DIRECTORY_DELETED: &str = "Directory deleted.";
pub const DIRECTORY_CREATED: &str = "Directory created.";
pub const FILE_RECEIVED: &str = "File received successfully!";

pub const DEFAULT_BANNER: &str = "Welcome to ferroftpd.";

// Chunk sizes. Downloads use a larger buffer than uploads.
pub const DOWNLOAD_CHUNK_SIZE: usize = 16 * 1024;
pub const UPLOAD_CHUNK_SIZE: usize = 8 * 1024;

// Bounded retries.
pub const MAX_GET_ATTEMPTS: u32 = 3;
pub const RMDIR_ATTEMPTS: u32 = 3;
pub const RMDIR_RETRY_DELAY: Duration = Duration::from_millis(500);
pub const RECONNECT_DELAY: Duration = Duration::from_secs(1);

// Server-side read bounds: a session may sit idle between commands far
// longer than it may stall in the middle of a payload.
pub const SERVER_IDLE_TIMEOUT: Duration = Duration::from_secs(900);
pub const SERVER_DATA_TIMEOUT: Duration = Duration::from_secs(120);

// Client defaults; the collaborator can override the response timeout at
// connect time.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_DATA_TIMEOUT: Duration = Duration::from_secs(120);
pub const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(5);

// Minimum interval between progress callback invocations.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);
