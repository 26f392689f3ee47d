// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Open the hostable runtime library and bind its entry points.
// Author: Lukas Bower

//! Dynamic runtime loader.
//!
//! The library is opened process-local (`RTLD_LOCAL`) so its symbols never
//! leak into global resolution for the rest of the process. Binding is
//! all-or-nothing: a library missing any of the four hosting symbols is
//! closed again and rejected.

use std::ffi::{c_char, c_int, c_uint, c_void, CStr, CString};
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};

use libloading::Library;
use log::{debug, info, warn};

use crate::error::{HostError, RuntimeStatus};
use crate::runtime::{HostHandle, HostingApi, InitProperties, RuntimeLibrary};

pub const SYM_INITIALIZE: &str = "coreclr_initialize";
pub const SYM_SHUTDOWN: &str = "coreclr_shutdown";
pub const SYM_EXECUTE_ASSEMBLY: &str = "coreclr_execute_assembly";
pub const SYM_CREATE_DELEGATE: &str = "coreclr_create_delegate";

/// Every symbol a hostable runtime must export, in binding order.
pub const REQUIRED_SYMBOLS: [&str; 4] = [
    SYM_INITIALIZE,
    SYM_SHUTDOWN,
    SYM_EXECUTE_ASSEMBLY,
    SYM_CREATE_DELEGATE,
];

type InitializeFn = unsafe extern "C" fn(
    exe_path: *const c_char,
    app_domain_friendly_name: *const c_char,
    property_count: c_int,
    property_keys: *const *const c_char,
    property_values: *const *const c_char,
    host_handle: *mut *mut c_void,
    domain_id: *mut c_uint,
) -> c_int;

type ShutdownFn = unsafe extern "C" fn(host_handle: *mut c_void, domain_id: c_uint) -> c_int;

type ExecuteAssemblyFn = unsafe extern "C" fn(
    host_handle: *mut c_void,
    domain_id: c_uint,
    argc: c_int,
    argv: *const *const c_char,
    managed_assembly_path: *const c_char,
    exit_code: *mut c_uint,
) -> c_int;

type CreateDelegateFn = unsafe extern "C" fn(
    host_handle: *mut c_void,
    domain_id: c_uint,
    entry_point_assembly_name: *const c_char,
    entry_point_type_name: *const c_char,
    entry_point_method_name: *const c_char,
    delegate: *mut *mut c_void,
) -> c_int;

/// Resolved hosting entry points.
///
/// Only meaningful while the [`Library`] they came from is open.
#[derive(Clone, Copy)]
pub struct EntryPoints {
    initialize: InitializeFn,
    shutdown: ShutdownFn,
    execute_assembly: ExecuteAssemblyFn,
    create_delegate: CreateDelegateFn,
}

/// File name of the runtime library on this platform.
pub fn runtime_library_name() -> &'static str {
    if cfg!(target_os = "macos") {
        "libcoreclr.dylib"
    } else if cfg!(windows) {
        "coreclr.dll"
    } else {
        "libcoreclr.so"
    }
}

/// Open the shared library at `path` without exporting its symbols globally.
pub fn load_runtime(path: &Path) -> Result<Library, HostError> {
    debug!("loader: opening {}", path.display());
    open_library(path).map_err(|e| HostError::LoadFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(unix)]
fn open_library(path: &Path) -> Result<Library, libloading::Error> {
    use libloading::os::unix::{Library as UnixLibrary, RTLD_LAZY, RTLD_LOCAL};
    unsafe { UnixLibrary::open(Some(path), RTLD_LAZY | RTLD_LOCAL) }.map(Library::from)
}

#[cfg(not(unix))]
fn open_library(path: &Path) -> Result<Library, libloading::Error> {
    unsafe { Library::new(path) }
}

/// Required symbols `library` does not export, in binding order.
pub fn missing_symbols(library: &Library) -> Vec<&'static str> {
    REQUIRED_SYMBOLS
        .into_iter()
        .filter(|name| unsafe { library.get::<*const c_void>(name.as_bytes()) }.is_err())
        .collect()
}

/// Bind all four hosting entry points from `library`.
///
/// Every missing symbol is logged; the first one is reported.
pub fn resolve_entry_points(library: &Library) -> Result<EntryPoints, HostError> {
    let missing = missing_symbols(library);
    if let Some(first) = missing.first() {
        debug!("loader: unresolved hosting symbols: {}", missing.join(", "));
        return Err(HostError::MissingSymbol(*first));
    }
    Ok(EntryPoints {
        initialize: bind::<InitializeFn>(library, SYM_INITIALIZE)?,
        shutdown: bind::<ShutdownFn>(library, SYM_SHUTDOWN)?,
        execute_assembly: bind::<ExecuteAssemblyFn>(library, SYM_EXECUTE_ASSEMBLY)?,
        create_delegate: bind::<CreateDelegateFn>(library, SYM_CREATE_DELEGATE)?,
    })
}

fn bind<T: Copy>(library: &Library, name: &'static str) -> Result<T, HostError> {
    let symbol = unsafe { library.get::<T>(name.as_bytes()) }.map_err(|e| {
        debug!("loader: {name} unresolved: {e}");
        HostError::MissingSymbol(name)
    })?;
    Ok(*symbol)
}

/// Release `library`, logging rather than escalating a failure.
pub fn close_runtime(library: Library, path: &Path) -> Result<(), String> {
    library.close().map_err(|e| {
        warn!("loader: failed to close {}: {e}", path.display());
        e.to_string()
    })
}

/// A runtime library that is open and fully bound.
pub struct LoadedRuntime {
    library: Option<Library>,
    path: PathBuf,
    entry: EntryPoints,
}

impl LoadedRuntime {
    /// Open `path` and bind every required entry point.
    ///
    /// On a missing symbol the library is closed before the error returns.
    pub fn load(path: &Path) -> Result<Self, HostError> {
        let library = load_runtime(path)?;
        match resolve_entry_points(&library) {
            Ok(entry) => {
                info!("loader: bound hosting entry points from {}", path.display());
                Ok(Self {
                    library: Some(library),
                    path: path.to_path_buf(),
                    entry,
                })
            }
            Err(err) => {
                let _ = close_runtime(library, path);
                Err(err)
            }
        }
    }

    /// Path the library was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_open(&self) -> bool {
        self.library.is_some()
    }
}

impl HostingApi for LoadedRuntime {
    fn initialize(
        &self,
        exe_path: &CStr,
        domain_name: &CStr,
        properties: &InitProperties,
    ) -> Result<HostHandle, RuntimeStatus> {
        if !self.is_open() {
            return Err(RuntimeStatus::UNEXPECTED);
        }
        let keys = properties.key_ptrs();
        let values = properties.value_ptrs();
        let mut host: *mut c_void = ptr::null_mut();
        let mut domain_id: c_uint = 0;
        let status = RuntimeStatus(unsafe {
            (self.entry.initialize)(
                exe_path.as_ptr(),
                domain_name.as_ptr(),
                keys.len() as c_int,
                keys.as_ptr(),
                values.as_ptr(),
                &mut host,
                &mut domain_id,
            )
        });
        if status.is_failure() {
            return Err(status);
        }
        Ok(HostHandle::from_raw(host, domain_id))
    }

    fn shutdown(&self, handle: &HostHandle) -> RuntimeStatus {
        if !self.is_open() || handle.is_null() {
            warn!("loader: no live runtime host, skipping {SYM_SHUTDOWN}");
            return RuntimeStatus::UNEXPECTED;
        }
        RuntimeStatus(unsafe { (self.entry.shutdown)(handle.as_ptr(), handle.domain_id()) })
    }

    fn execute_assembly(
        &self,
        handle: &HostHandle,
        argv: &[CString],
        assembly_path: &CStr,
    ) -> Result<u32, RuntimeStatus> {
        if !self.is_open() {
            return Err(RuntimeStatus::UNEXPECTED);
        }
        let args: Vec<*const c_char> = argv.iter().map(|a| a.as_ptr()).collect();
        let mut exit_code: c_uint = 0;
        let status = RuntimeStatus(unsafe {
            (self.entry.execute_assembly)(
                handle.as_ptr(),
                handle.domain_id(),
                args.len() as c_int,
                args.as_ptr(),
                assembly_path.as_ptr(),
                &mut exit_code,
            )
        });
        if status.is_failure() {
            return Err(status);
        }
        Ok(exit_code)
    }

    fn create_delegate(
        &self,
        handle: &HostHandle,
        assembly: &CStr,
        type_name: &CStr,
        method: &CStr,
    ) -> Result<NonNull<c_void>, RuntimeStatus> {
        if !self.is_open() {
            return Err(RuntimeStatus::UNEXPECTED);
        }
        let mut delegate: *mut c_void = ptr::null_mut();
        let status = RuntimeStatus(unsafe {
            (self.entry.create_delegate)(
                handle.as_ptr(),
                handle.domain_id(),
                assembly.as_ptr(),
                type_name.as_ptr(),
                method.as_ptr(),
                &mut delegate,
            )
        });
        if status.is_failure() {
            return Err(status);
        }
        NonNull::new(delegate).ok_or(RuntimeStatus::UNEXPECTED)
    }
}

impl RuntimeLibrary for LoadedRuntime {
    fn close(&mut self) -> Result<(), String> {
        match self.library.take() {
            Some(library) => close_runtime(library, &self.path),
            None => Ok(()),
        }
    }
}

impl Drop for LoadedRuntime {
    fn drop(&mut self) {
        if self.library.is_some() {
            debug!("loader: closing {} on drop", self.path.display());
            let _ = self.close();
        }
    }
}
