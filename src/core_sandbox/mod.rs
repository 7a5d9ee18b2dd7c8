pub mod sandbox;

pub use sandbox::{parent_virtual, resolve, resolve_dir, safe_join};
