// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Build the trusted platform assembly (TPA) manifest for the runtime.
// Author: Lukas Bower

//! Trusted platform assembly list construction.
//!
//! The manifest is kept as an ordered list of absolute paths keyed by base
//! name and is only flattened into the delimited string at the ABI boundary.
//! Extension priority is applied extension-major: every candidate in a
//! directory is checked against `.ni.dll` before any is checked against
//! `.dll`, so the winner for a base name never depends on enumeration order.

use std::collections::HashSet;
use std::ffi::{CString, OsStr, OsString};
use std::fs::{self, DirEntry};

use log::{debug, warn};

use crate::error::HostError;
use crate::paths::{os_to_c_string, AbsolutePath};

/// Recognised artifact extensions, most preferred first.
pub const TPA_EXTENSIONS: [&str; 4] = [".ni.dll", ".dll", ".ni.exe", ".exe"];

/// Delimiter between manifest entries.
#[cfg(unix)]
pub const MANIFEST_DELIMITER: char = ':';
/// Delimiter between manifest entries.
#[cfg(not(unix))]
pub const MANIFEST_DELIMITER: char = ';';

/// A single accepted manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TpaEntry {
    base_name: OsString,
    extension: &'static str,
    path: AbsolutePath,
}

impl TpaEntry {
    /// File name with the matched extension stripped.
    pub fn base_name(&self) -> &OsStr {
        &self.base_name
    }

    /// Extension the entry was accepted under, or `""` for unrecognised files.
    pub fn extension(&self) -> &'static str {
        self.extension
    }

    /// Absolute path of the artifact.
    pub fn path(&self) -> &AbsolutePath {
        &self.path
    }
}

/// Ordered, de-duplicated trusted assembly list.
#[derive(Debug, Clone, Default)]
pub struct TpaList {
    entries: Vec<TpaEntry>,
    seen: HashSet<OsString>,
}

struct Candidate {
    name: OsString,
    base_name: OsString,
    extension: &'static str,
}

impl TpaList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan `dir` and append every loadable artifact whose base name is new.
    ///
    /// An unreadable directory contributes nothing. Returns the number of
    /// entries added.
    pub fn add_directory(&mut self, dir: &AbsolutePath) -> usize {
        let candidates = scan_directory(dir);
        let before = self.entries.len();
        for ext in TPA_EXTENSIONS {
            for candidate in candidates.iter().filter(|c| c.extension == ext) {
                if self.seen.contains(&candidate.base_name) {
                    debug!(
                        "tpa: skipping {} in {dir}, higher priority variant present",
                        candidate.name.to_string_lossy()
                    );
                    continue;
                }
                self.accept(
                    candidate.base_name.clone(),
                    candidate.extension,
                    dir.join_file(&candidate.name),
                );
            }
        }
        self.entries.len() - before
    }

    /// Append a single file. Returns `false` if its base name is already listed.
    pub fn add_file(&mut self, path: AbsolutePath) -> bool {
        let name = path.as_path().file_name().unwrap_or_default().to_os_string();
        let (base_name, extension) = classify(&name).unwrap_or((name, ""));
        if self.seen.contains(&base_name) {
            warn!(
                "tpa: {path} shadowed by an earlier entry for {}",
                base_name.to_string_lossy()
            );
            return false;
        }
        self.accept(base_name, extension, path);
        true
    }

    fn accept(&mut self, base_name: OsString, extension: &'static str, path: AbsolutePath) {
        if path.as_os_str().to_string_lossy().contains(MANIFEST_DELIMITER) {
            warn!("tpa: {path} contains the manifest delimiter and will be split by the runtime");
        }
        self.seen.insert(base_name.clone());
        self.entries.push(TpaEntry {
            base_name,
            extension,
            path,
        });
    }

    /// Accepted entries in manifest order.
    pub fn entries(&self) -> &[TpaEntry] {
        &self.entries
    }

    /// Return `true` if `base_name` has been accepted.
    pub fn contains(&self, base_name: impl AsRef<OsStr>) -> bool {
        self.seen.contains(base_name.as_ref())
    }

    /// Number of accepted entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` when nothing has been accepted.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flatten into the delimiter-joined manifest string.
    pub fn to_manifest(&self) -> OsString {
        let mut out = OsString::new();
        for (idx, entry) in self.entries.iter().enumerate() {
            if idx > 0 {
                out.push(MANIFEST_DELIMITER.to_string());
            }
            out.push(entry.path.as_os_str());
        }
        out
    }

    /// Flatten into a C string for the runtime property set.
    pub fn to_c_string(&self) -> Result<CString, HostError> {
        let manifest = self.to_manifest();
        os_to_c_string(&manifest).ok_or_else(|| HostError::InvalidPath(manifest.into()))
    }
}

/// Build the manifest contribution of a single directory.
pub fn build_manifest(dir: &AbsolutePath) -> OsString {
    let mut list = TpaList::new();
    list.add_directory(dir);
    list.to_manifest()
}

/// Split `name` into base name and the most specific recognised extension.
///
/// Matching is done on the raw name bytes, so names that are not valid
/// UTF-8 are classified like any other.
fn classify(name: &OsStr) -> Option<(OsString, &'static str)> {
    let bytes = name.as_encoded_bytes();
    let ext = TPA_EXTENSIONS
        .iter()
        .filter(|ext| bytes.len() > ext.len() && bytes.ends_with(ext.as_bytes()))
        .max_by_key(|ext| ext.len())?;
    Some((strip_suffix(name, ext.len()), *ext))
}

#[cfg(unix)]
fn strip_suffix(name: &OsStr, len: usize) -> OsString {
    use std::os::unix::ffi::OsStrExt;
    let bytes = name.as_bytes();
    OsStr::from_bytes(&bytes[..bytes.len() - len]).to_os_string()
}

#[cfg(not(unix))]
fn strip_suffix(name: &OsStr, len: usize) -> OsString {
    let lossy = name.to_string_lossy();
    OsString::from(&lossy[..lossy.len() - len])
}

fn scan_directory(dir: &AbsolutePath) -> Vec<Candidate> {
    let read = match fs::read_dir(dir) {
        Ok(read) => read,
        Err(e) => {
            warn!("tpa: cannot read {dir}: {e}");
            return Vec::new();
        }
    };
    let mut out = Vec::new();
    for entry in read {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("tpa: skipping unreadable entry in {dir}: {e}");
                continue;
            }
        };
        let name = entry.file_name();
        let Some((base_name, extension)) = classify(&name) else {
            continue;
        };
        if !is_regular_file(&entry) {
            continue;
        }
        out.push(Candidate {
            name,
            base_name,
            extension,
        });
    }
    out
}

fn is_regular_file(entry: &DirEntry) -> bool {
    match entry.file_type() {
        Ok(ft) if ft.is_file() => true,
        Ok(ft) if ft.is_dir() => false,
        // Symlinks and unknown types need a stat of the target.
        _ => match fs::metadata(entry.path()) {
            Ok(meta) => meta.is_file(),
            Err(e) => {
                debug!("tpa: stat {} failed: {e}", entry.path().display());
                false
            }
        },
    }
}
