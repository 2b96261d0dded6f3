//! File system helpers that never fail.
//!
//! Each helper swallows the I/O error, logs it at debug level and returns a
//! neutral value, so callers can treat the directory listing as best effort.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

fn log_error(op: &str, path: &Path, error: &io::Error) {
    tracing::debug!(target: "batchlog", path = %path.display(), %error, "{op} failed");
}

/// Returns true if `path` exists.
pub fn exists(path: &Path) -> bool {
    match path.try_exists() {
        Ok(exists) => exists,
        Err(e) => {
            log_error("exists", path, &e);
            false
        }
    }
}

/// Returns true if `path` is a directory.
pub fn is_dir(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}

/// Returns true if `path` is a regular file.
pub fn is_file(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

/// Size of the file at `path`, or 0 if it cannot be read.
pub fn len(path: &Path) -> u64 {
    match fs::metadata(path) {
        Ok(m) => m.len(),
        Err(e) => {
            if e.kind() != io::ErrorKind::NotFound {
                log_error("len", path, &e);
            }
            0
        }
    }
}

/// Returns true if `path` is not read-only.
pub fn can_write(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(m) => !m.permissions().readonly(),
        Err(e) => {
            log_error("can_write", path, &e);
            false
        }
    }
}

/// Creates `path` and its parents. Succeeds if the directory already exists.
pub fn create_dir_all(path: &Path) -> bool {
    match fs::create_dir_all(path) {
        Ok(()) => true,
        Err(e) => {
            log_error("create_dir_all", path, &e);
            is_dir(path)
        }
    }
}

/// Creates an empty file at `path` unless one already exists.
pub fn touch(path: &Path) -> bool {
    match fs::OpenOptions::new().append(true).create(true).open(path) {
        Ok(_) => true,
        Err(e) => {
            log_error("touch", path, &e);
            false
        }
    }
}

/// Deletes the file at `path`. Returns true if a file was removed.
pub fn delete(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) => {
            if e.kind() != io::ErrorKind::NotFound {
                log_error("delete", path, &e);
            }
            false
        }
    }
}

/// Lists the entries of the directory at `path`.
pub fn list_dir(path: &Path) -> Option<Vec<PathBuf>> {
    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(e) => {
            log_error("list_dir", path, &e);
            return None;
        }
    };

    Some(
        entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect(),
    )
}
