use std::path::PathBuf;

/// Per-connection server state. Owned by exactly one connection task; the
/// accept loop never shares it across connections.
#[derive(Debug)]
pub struct Session {
    /// Current virtual directory: root-relative, `/`-separated, rooted at
    /// `/`, never containing `..`.
    pub current_dir: String,
    /// Canonical shared root all virtual paths resolve beneath.
    pub base_path: PathBuf,
}

impl Session {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            current_dir: String::from("/"),
            base_path,
        }
    }

    /// The real directory the session currently points at.
    pub fn real_current_dir(&self) -> PathBuf {
        self.base_path
            .join(self.current_dir.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_virtual_root() {
        let session = Session::new(PathBuf::from("/srv/share"));
        assert_eq!(session.current_dir, "/");
        assert_eq!(session.real_current_dir(), PathBuf::from("/srv/share/"));
    }
}
