pub mod recovery;
pub mod session;
pub mod transfer;

pub use session::Session;

/// One entry of a remote directory listing. Produced per LIST response,
/// not retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub name: String,
    pub is_folder: bool,
}

/// Success/failure of one logical operation plus the human-readable log
/// line the collaborator shows. Engine failures (timeouts, severed
/// connections) surface as `FtpError` instead.
#[derive(Debug, Clone)]
pub struct OpOutcome {
    pub success: bool,
    pub message: String,
}

impl OpOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
