// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Canonicalise host paths and extract directory components.
// Author: Lukas Bower

//! Path resolution helpers.
//!
//! The hosted runtime never re-resolves relative paths, so every path handed
//! across the ABI goes through [`resolve_absolute_path`] first.

use std::ffi::{CString, OsStr};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::HostError;

/// A canonical, absolute path that existed when it was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AbsolutePath(PathBuf);

impl AbsolutePath {
    /// Borrow the underlying path.
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Borrow the path as an OS string.
    pub fn as_os_str(&self) -> &OsStr {
        self.0.as_os_str()
    }

    /// Join a file name onto this directory without re-resolving it.
    pub fn join_file(&self, name: &OsStr) -> AbsolutePath {
        AbsolutePath(self.0.join(name))
    }

    /// Convert to a C string for the runtime ABI.
    pub fn to_c_string(&self) -> Result<CString, HostError> {
        os_to_c_string(self.as_os_str()).ok_or_else(|| HostError::InvalidPath(self.0.clone()))
    }

    /// Consume into the inner `PathBuf`.
    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl AsRef<Path> for AbsolutePath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for AbsolutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.display().fmt(f)
    }
}

/// Canonicalise `path`, following every symlink.
///
/// The target must exist: a missing file, a broken symlink chain or a
/// permission failure all yield [`HostError::PathNotFound`].
pub fn resolve_absolute_path(path: impl AsRef<Path>) -> Result<AbsolutePath, HostError> {
    let path = path.as_ref();
    fs::canonicalize(path)
        .map(AbsolutePath)
        .map_err(|source| HostError::PathNotFound {
            path: path.to_path_buf(),
            source,
        })
}

/// Resolve `path` against `base` when it is relative, then canonicalise.
pub fn resolve_against(base: &Path, path: impl AsRef<Path>) -> Result<AbsolutePath, HostError> {
    let path = path.as_ref();
    if path.is_absolute() {
        resolve_absolute_path(path)
    } else {
        resolve_absolute_path(base.join(path))
    }
}

/// Return the directory that contains `path`.
///
/// A path whose only separator is the leading one yields `/`.
pub fn parent_directory(path: &AbsolutePath) -> Result<AbsolutePath, HostError> {
    match path.0.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(AbsolutePath(parent.to_path_buf())),
        _ => Err(HostError::NoParent(path.0.clone())),
    }
}

/// Convert an OS string into a NUL-terminated C string.
pub fn os_to_c_string(value: &OsStr) -> Option<CString> {
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        CString::new(value.as_bytes()).ok()
    }
    #[cfg(not(unix))]
    {
        CString::new(value.to_string_lossy().into_owned()).ok()
    }
}
