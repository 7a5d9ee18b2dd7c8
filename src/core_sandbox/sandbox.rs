use std::path::{Component, Path, PathBuf};

use crate::error::FtpError;

/// Lexically flattens an untrusted path fragment from the wire.
///
/// `.` segments are dropped; `..`, absolute roots, drive prefixes and NUL
/// bytes are rejected outright. Backslashes are treated as separators so a
/// peer on either platform combines paths the same way.
fn normalize_fragment(fragment: &str) -> Result<PathBuf, FtpError> {
    if fragment.contains('\0') {
        return Err(FtpError::PathRejected(fragment.to_string()));
    }
    let unified = fragment.replace('\\', "/");
    let mut safe = PathBuf::new();
    for component in Path::new(&unified).components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => safe.push(part),
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(FtpError::PathRejected(fragment.to_string()));
            }
        }
    }
    Ok(safe)
}

/// Resolves `shared_root + virtual_dir + argument` to a real path.
///
/// `shared_root` must already be canonical and `virtual_dir` is the
/// server-maintained current directory (invariant: never contains `..`).
/// Rejection happens before any filesystem call; when the target already
/// exists the canonical form is additionally required to stay under the
/// root (the lexical walk already guarantees containment for paths that
/// do not exist yet).
pub fn resolve(shared_root: &Path, virtual_dir: &str, argument: &str) -> Result<PathBuf, FtpError> {
    let fragment = normalize_fragment(argument)?;
    let joined = shared_root
        .join(virtual_dir.trim_start_matches('/'))
        .join(&fragment);

    if joined.exists() {
        let canonical = joined
            .canonicalize()
            .map_err(|_| FtpError::PathRejected(argument.to_string()))?;
        if !canonical.starts_with(shared_root) {
            return Err(FtpError::PathRejected(argument.to_string()));
        }
        return Ok(canonical);
    }
    Ok(joined)
}

/// Resolves a CD argument. Success yields the real directory path and the
/// new canonical virtual directory: root-relative, `/`-separated, rooted
/// at `/`.
pub fn resolve_dir(
    shared_root: &Path,
    virtual_dir: &str,
    argument: &str,
) -> Result<(PathBuf, String), FtpError> {
    let real = resolve(shared_root, virtual_dir, argument)?;
    if !real.is_dir() {
        return Err(FtpError::PathRejected(argument.to_string()));
    }
    let rel = real
        .strip_prefix(shared_root)
        .map_err(|_| FtpError::PathRejected(argument.to_string()))?;

    let mut virt = String::from("/");
    let mut first = true;
    for component in rel.components() {
        if !first {
            virt.push('/');
        }
        virt.push_str(&component.as_os_str().to_string_lossy());
        first = false;
    }
    Ok((real, virt))
}

/// String-level parent of a virtual directory. `/` is its own parent, so
/// CDUP at the root is idempotent. No filesystem re-validation happens.
pub fn parent_virtual(virtual_dir: &str) -> String {
    let trimmed = virtual_dir.trim_end_matches('/');
    match trimmed.rfind('/') {
        None | Some(0) => String::from("/"),
        Some(idx) => trimmed[..idx].to_string(),
    }
}

/// Combines a destination folder with a relative path received inside a
/// directory transfer, applying the same escape discipline as `resolve`.
pub fn safe_join(destination: &Path, relative: &str) -> Result<PathBuf, FtpError> {
    let fragment = normalize_fragment(relative)?;
    if fragment.as_os_str().is_empty() {
        return Err(FtpError::PathRejected(relative.to_string()));
    }
    Ok(destination.join(fragment))
}
