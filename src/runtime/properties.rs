// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Assemble the runtime initialization property set.
// Author: Lukas Bower

use std::ffi::{c_char, CStr, CString};

use crate::config::HostConfiguration;
use crate::error::HostError;
use crate::paths::{os_to_c_string, AbsolutePath};
use crate::tpa::MANIFEST_DELIMITER;

pub const TRUSTED_PLATFORM_ASSEMBLIES: &str = "TRUSTED_PLATFORM_ASSEMBLIES";
pub const APP_PATHS: &str = "APP_PATHS";
pub const APP_NI_PATHS: &str = "APP_NI_PATHS";
pub const NATIVE_DLL_SEARCH_DIRECTORIES: &str = "NATIVE_DLL_SEARCH_DIRECTORIES";
pub const APP_DOMAIN_COMPAT_SWITCH: &str = "AppDomainCompatSwitch";

/// Value passed for [`APP_DOMAIN_COMPAT_SWITCH`].
pub const COMPAT_SWITCH_LATEST: &str = "UseLatestBehaviorWhenTFMNotSpecified";

/// Ordered key/value pairs handed to the initialize entry point.
///
/// Keys and values are held as parallel vectors so the pointer arrays built
/// by [`InitProperties::key_ptrs`] and [`InitProperties::value_ptrs`] line up.
#[derive(Debug, Clone, Default)]
pub struct InitProperties {
    keys: Vec<CString>,
    values: Vec<CString>,
}

impl InitProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the standard host property set from a resolved configuration.
    pub fn for_host(config: &HostConfiguration) -> Result<Self, HostError> {
        let app_paths = join_paths(config.application_paths())?;
        let mut props = Self::new();
        props.insert(
            TRUSTED_PLATFORM_ASSEMBLIES,
            config.trusted_assemblies().to_c_string()?,
        );
        props.insert(APP_PATHS, app_paths.clone());
        props.insert(APP_NI_PATHS, app_paths);
        props.insert(
            NATIVE_DLL_SEARCH_DIRECTORIES,
            join_paths(config.native_search_directories())?,
        );
        props.insert(APP_DOMAIN_COMPAT_SWITCH, static_c_string(COMPAT_SWITCH_LATEST));
        Ok(props)
    }

    /// Set `key`, replacing an existing value in place.
    pub fn insert(&mut self, key: &str, value: CString) {
        if let Some(idx) = self.position(key) {
            self.values[idx] = value;
            return;
        }
        self.keys.push(static_c_string(key));
        self.values.push(value);
    }

    pub fn get(&self, key: &str) -> Option<&CStr> {
        self.position(key).map(|idx| self.values[idx].as_c_str())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CStr, &CStr)> {
        self.keys
            .iter()
            .zip(self.values.iter())
            .map(|(k, v)| (k.as_c_str(), v.as_c_str()))
    }

    /// Pointer array over the keys; valid while `self` is borrowed.
    pub fn key_ptrs(&self) -> Vec<*const c_char> {
        self.keys.iter().map(|k| k.as_ptr()).collect()
    }

    /// Pointer array over the values; valid while `self` is borrowed.
    pub fn value_ptrs(&self) -> Vec<*const c_char> {
        self.values.iter().map(|v| v.as_ptr()).collect()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|k| k.as_bytes() == key.as_bytes())
    }
}

fn join_paths(paths: &[AbsolutePath]) -> Result<CString, HostError> {
    let mut joined = std::ffi::OsString::new();
    for (idx, path) in paths.iter().enumerate() {
        if idx > 0 {
            joined.push(MANIFEST_DELIMITER.to_string());
        }
        joined.push(path.as_os_str());
    }
    os_to_c_string(&joined).ok_or_else(|| HostError::InvalidPath(joined.into()))
}

// Property names and fixed values are compile-time ASCII without NUL.
fn static_c_string(value: &str) -> CString {
    CString::new(value).unwrap_or_default()
}
