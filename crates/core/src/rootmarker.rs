// ==============================================================================
// Project root discovery via marker globs
// ==============================================================================

use std::path::{Path, PathBuf};

use glob::Pattern;

use crate::config::LanguageConfig;

/// Walk from the file's directory toward the filesystem root and return the
/// first directory containing an entry matched by any marker. Markers with a
/// trailing `/` match directory entries (slash stripped), the rest match file
/// entries. Unreadable directories are treated as empty rather than aborting
/// the walk.
pub fn match_root_path(filename: &str, markers: &[String]) -> Option<PathBuf> {
    if markers.is_empty() {
        return None;
    }

    let mut dir = Path::new(filename).parent()?.to_path_buf();
    loop {
        if dir_has_marker(&dir, markers) {
            return Some(dir);
        }
        match dir.parent() {
            Some(parent) => dir = parent.to_path_buf(),
            None => return None,
        }
    }
}

fn dir_has_marker(dir: &Path, markers: &[String]) -> bool {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return false,
    };

    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);

        for marker in markers {
            let matched = match marker.strip_suffix('/') {
                Some(dir_marker) => is_dir && glob_matches(dir_marker, &name),
                None => !is_dir && glob_matches(marker, &name),
            };
            if matched {
                return true;
            }
        }
    }
    false
}

fn glob_matches(pattern: &str, name: &str) -> bool {
    Pattern::new(pattern).map(|p| p.matches(name)).unwrap_or(false)
}

/// Per-command working directory: the marker match when there is one, else
/// the server-level root (which may be empty, in which case the child inherits the
/// server's cwd).
pub fn effective_root(filename: &str, config: &LanguageConfig, server_root: &str) -> String {
    match match_root_path(filename, &config.root_markers) {
        Some(dir) => dir.to_string_lossy().into_owned(),
        None => server_root.to_string(),
    }
}
