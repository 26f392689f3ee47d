// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Resolve host arguments and environment into a HostConfiguration.
// Author: Lukas Bower

use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use log::debug;

use crate::cli::HostArgs;
use crate::error::HostError;
use crate::paths::{parent_directory, resolve_absolute_path, resolve_against, AbsolutePath};
use crate::runtime::runtime_library_name;
use crate::tpa::{TpaList, MANIFEST_DELIMITER};

/// Environment variable naming the runtime directory.
pub const CORE_ROOT_VAR: &str = "CORE_ROOT";

/// Friendly name given to the default domain.
pub const DEFAULT_DOMAIN_NAME: &str = "host_cmdline";

/// Process facts the configuration is resolved against.
#[derive(Debug, Clone)]
pub struct HostEnvironment {
    pub core_root: Option<OsString>,
    pub current_dir: PathBuf,
    pub host_executable: PathBuf,
}

impl HostEnvironment {
    /// Capture `CORE_ROOT`, the working directory and the running executable.
    pub fn capture() -> Result<Self, HostError> {
        let current_dir = env::current_dir().map_err(|source| HostError::PathNotFound {
            path: PathBuf::from("."),
            source,
        })?;
        let host_executable = env::current_exe().map_err(|source| HostError::PathNotFound {
            path: PathBuf::from("/proc/self/exe"),
            source,
        })?;
        Ok(Self {
            core_root: env::var_os(CORE_ROOT_VAR),
            current_dir,
            host_executable,
        })
    }
}

/// Immutable, fully resolved host configuration.
///
/// Every path held here is absolute and canonical.
#[derive(Debug, Clone)]
pub struct HostConfiguration {
    runtime_library_directory: AbsolutePath,
    host_executable: AbsolutePath,
    entry_assembly: AbsolutePath,
    application_paths: Vec<AbsolutePath>,
    native_search_directories: Vec<AbsolutePath>,
    load_context_assembly: Option<AbsolutePath>,
    base_path: AbsolutePath,
    trusted_assemblies: TpaList,
    domain_friendly_name: String,
    forwarded_args: Vec<OsString>,
}

impl HostConfiguration {
    /// Resolve against the live process environment.
    pub fn from_env(args: &HostArgs) -> Result<Self, HostError> {
        Self::resolve(args, &HostEnvironment::capture()?)
    }

    /// Resolve `args` against `environment`.
    ///
    /// Fails before anything is loaded when a required path is missing.
    pub fn resolve(args: &HostArgs, environment: &HostEnvironment) -> Result<Self, HostError> {
        let cwd = environment.current_dir.as_path();
        let core_root = environment
            .core_root
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or(HostError::EnvNotSet(CORE_ROOT_VAR))?;
        let runtime_library_directory = resolve_against(cwd, core_root)?;
        debug!("config: {CORE_ROOT_VAR}={runtime_library_directory}");

        let host_executable = resolve_absolute_path(&environment.host_executable)?;
        let entry_assembly = resolve_against(cwd, &args.entry_assembly)?;
        let entry_dir = parent_directory(&entry_assembly)?;

        let load_context_assembly = args
            .load_context
            .as_ref()
            .map(|p| resolve_against(cwd, p))
            .transpose()?;

        let base_path = match &args.base_path {
            Some(p) => resolve_against(cwd, p)?,
            None => resolve_absolute_path(cwd)?,
        };

        let mut application_paths = vec![entry_dir.clone()];
        for path in split_list(args.search_paths.as_deref()) {
            let path = resolve_against(cwd, path)?;
            if !application_paths.contains(&path) {
                application_paths.push(path);
            }
        }

        let native_search_directories = if entry_dir == runtime_library_directory {
            vec![entry_dir]
        } else {
            vec![entry_dir, runtime_library_directory.clone()]
        };

        let mut trusted_assemblies = TpaList::new();
        let found = trusted_assemblies.add_directory(&runtime_library_directory);
        debug!("config: {found} trusted assemblies in {runtime_library_directory}");
        if let Some(alc) = &load_context_assembly {
            trusted_assemblies.add_file(alc.clone());
        }
        for path in split_list(args.trusted_assemblies.as_deref()) {
            trusted_assemblies.add_file(resolve_against(cwd, path)?);
        }

        Ok(Self {
            runtime_library_directory,
            host_executable,
            entry_assembly,
            application_paths,
            native_search_directories,
            load_context_assembly,
            base_path,
            trusted_assemblies,
            domain_friendly_name: DEFAULT_DOMAIN_NAME.to_owned(),
            forwarded_args: args.forwarded.clone(),
        })
    }

    pub fn runtime_library_directory(&self) -> &AbsolutePath {
        &self.runtime_library_directory
    }

    /// Full path of the runtime shared library inside `CORE_ROOT`.
    pub fn runtime_library_path(&self) -> PathBuf {
        self.runtime_library_directory
            .as_path()
            .join(runtime_library_name())
    }

    pub fn host_executable(&self) -> &AbsolutePath {
        &self.host_executable
    }

    pub fn entry_assembly(&self) -> &AbsolutePath {
        &self.entry_assembly
    }

    pub fn application_paths(&self) -> &[AbsolutePath] {
        &self.application_paths
    }

    pub fn native_search_directories(&self) -> &[AbsolutePath] {
        &self.native_search_directories
    }

    pub fn load_context_assembly(&self) -> Option<&AbsolutePath> {
        self.load_context_assembly.as_ref()
    }

    pub fn base_path(&self) -> &AbsolutePath {
        &self.base_path
    }

    pub fn trusted_assemblies(&self) -> &TpaList {
        &self.trusted_assemblies
    }

    pub fn domain_friendly_name(&self) -> &str {
        &self.domain_friendly_name
    }

    pub fn forwarded_args(&self) -> &[OsString] {
        &self.forwarded_args
    }
}

/// Split a delimiter-separated list, dropping empty segments.
fn split_list(list: Option<&OsStr>) -> Vec<&Path> {
    let Some(list) = list else {
        return Vec::new();
    };
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        list.as_bytes()
            .split(|b| *b == MANIFEST_DELIMITER as u8)
            .filter(|s| !s.is_empty())
            .map(|s| Path::new(OsStr::from_bytes(s)))
            .collect()
    }
    #[cfg(not(unix))]
    {
        list.to_str()
            .map(|s| {
                s.split(MANIFEST_DELIMITER)
                    .filter(|s| !s.is_empty())
                    .map(Path::new)
                    .collect()
            })
            .unwrap_or_default()
    }
}
