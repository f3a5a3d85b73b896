use std::path::{Component, Path, PathBuf};

/// Turns raw filename bytes from the wire into a path without re-encoding.
#[cfg(unix)]
fn path_from_bytes(raw: &[u8]) -> Option<PathBuf> {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    Some(PathBuf::from(OsStr::from_bytes(raw)))
}

/// Non-unix paths are not byte strings; only UTF-8 names can be opened.
#[cfg(not(unix))]
fn path_from_bytes(raw: &[u8]) -> Option<PathBuf> {
    std::str::from_utf8(raw).ok().map(PathBuf::from)
}

/// Maps a requested filename to the path that will be opened.
///
/// Without a root the filename is used verbatim, relative to the working
/// directory or absolute, exactly as received. With a root, only plain
/// relative segments are accepted and the result is joined onto the root.
/// `None` means the request cannot name a file and is answered as not found.
pub fn resolve_path(root: Option<&Path>, filename: &[u8]) -> Option<PathBuf> {
    if filename.is_empty() {
        return None;
    }

    let requested = path_from_bytes(filename)?;
    let Some(root) = root else {
        return Some(requested);
    };

    let confined = requested
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));

    if !confined {
        tracing::warn!(path = %requested.display(), "Rejected path outside the configured root");
        return None;
    }

    Some(root.join(&requested))
}
