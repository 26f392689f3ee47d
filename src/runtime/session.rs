// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Own a hosted runtime session from initialize through teardown.
// Author: Lukas Bower

//! Host lifecycle controller.
//!
//! `Unloaded → Loaded → Initialized → ShutDown`. A loaded library enters
//! this module by value; from then on shutdown and close run exactly once,
//! whether initialization fails, a delegate cannot be bound, execution
//! fails, or the session is simply dropped. [`HostSession::shutdown`]
//! consumes the session so nothing can call into the runtime afterwards,
//! and a [`Delegate`] borrows the session so it cannot outlive it either.

use std::ffi::{c_void, CString, OsString};
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use log::{debug, error, info, warn};

use crate::error::{HostError, RuntimeStatus};
use crate::paths::{os_to_c_string, AbsolutePath};
use crate::runtime::{HostHandle, HostingApi, InitProperties, RuntimeLibrary};

/// Arguments to the runtime's initialize entry point.
#[derive(Debug, Clone)]
pub struct InitRequest {
    exe_path: CString,
    domain_name: CString,
    properties: InitProperties,
}

impl InitRequest {
    pub fn new(
        exe_path: &AbsolutePath,
        domain_name: &str,
        properties: InitProperties,
    ) -> Result<Self, HostError> {
        let domain_name = CString::new(domain_name)
            .map_err(|_| HostError::InvalidPath(domain_name.into()))?;
        Ok(Self {
            exe_path: exe_path.to_c_string()?,
            domain_name,
            properties,
        })
    }

    pub fn properties(&self) -> &InitProperties {
        &self.properties
    }
}

/// Fully qualified location of a managed static method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegateTarget {
    assembly: CString,
    type_name: CString,
    method: CString,
}

impl DelegateTarget {
    /// Build a target, rejecting partial assembly identities.
    ///
    /// The identity must carry name, `Version=`, `Culture=` and
    /// `PublicKeyToken=`; the runtime does not resolve partial names here.
    pub fn new(assembly: &str, type_name: &str, method: &str) -> Result<Self, HostError> {
        let qualified = assembly.split(',').count() >= 4
            && ["Version=", "Culture=", "PublicKeyToken="]
                .iter()
                .all(|part| assembly.contains(part));
        if !qualified {
            return Err(HostError::InvalidIdentity(assembly.to_owned()));
        }
        let c = |value: &str| {
            CString::new(value).map_err(|_| HostError::InvalidIdentity(value.to_owned()))
        };
        Ok(Self {
            assembly: c(assembly)?,
            type_name: c(type_name)?,
            method: c(method)?,
        })
    }

    /// `Type.Method` for diagnostics.
    pub fn method_name(&self) -> String {
        format!(
            "{}.{}",
            self.type_name.to_string_lossy(),
            self.method.to_string_lossy()
        )
    }
}

/// A native entry point into managed code, valid while its session lives.
pub struct Delegate<'session> {
    ptr: NonNull<c_void>,
    _session: PhantomData<&'session ()>,
}

impl Delegate<'_> {
    pub fn as_ptr(&self) -> *mut c_void {
        self.ptr.as_ptr()
    }

    /// Call the delegate as `void (*)(const char16_t*)`.
    ///
    /// `arg` is encoded as NUL-terminated UTF-16.
    ///
    /// # Safety
    ///
    /// The managed method behind the delegate must have that signature.
    pub unsafe fn call_with_utf16(&self, arg: &str) {
        let wide: Vec<u16> = arg.encode_utf16().chain(std::iter::once(0)).collect();
        let f: unsafe extern "C" fn(*const u16) = std::mem::transmute(self.ptr.as_ptr());
        f(wide.as_ptr());
    }
}

impl fmt::Debug for Delegate<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Delegate({:p})", self.ptr)
    }
}

/// Outcome of the teardown steps. Never affects the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeardownReport {
    pub shutdown: RuntimeStatus,
    pub closed: bool,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        !self.shutdown.is_failure() && self.closed
    }
}

/// Sole owner of an initialized runtime and its library.
pub struct HostSession<R: RuntimeLibrary> {
    runtime: R,
    handle: HostHandle,
    torn_down: bool,
}

impl<R: RuntimeLibrary> HostSession<R> {
    /// Initialize the runtime behind `runtime`.
    ///
    /// On failure the library is still shut down and closed before the
    /// error is returned.
    pub fn start(mut runtime: R, request: &InitRequest) -> Result<Self, HostError> {
        for (key, value) in request.properties.iter() {
            debug!("session: {}={}", key.to_string_lossy(), value.to_string_lossy());
        }
        match runtime.initialize(&request.exe_path, &request.domain_name, &request.properties) {
            Ok(handle) => {
                info!(
                    "session: runtime initialized, domain id {}",
                    handle.domain_id()
                );
                Ok(Self {
                    runtime,
                    handle,
                    torn_down: false,
                })
            }
            Err(status) => {
                error!("session: runtime initialization failed with status {status}");
                teardown(&mut runtime, &HostHandle::null());
                Err(HostError::InitFailed(status))
            }
        }
    }

    /// Domain id assigned by the runtime.
    pub fn domain_id(&self) -> u32 {
        self.handle.domain_id()
    }

    pub fn create_delegate(&self, target: &DelegateTarget) -> Result<Delegate<'_>, HostError> {
        let method = target.method_name();
        debug!("session: creating delegate {method}");
        self.runtime
            .create_delegate(&self.handle, &target.assembly, &target.type_name, &target.method)
            .map(|ptr| Delegate {
                ptr,
                _session: PhantomData,
            })
            .map_err(|status| {
                error!("session: create delegate {method} failed with status {status}");
                HostError::DelegateFailed { method, status }
            })
    }

    /// Run `assembly` with `args`, blocking until its entry point returns.
    ///
    /// The hosted program's exit code is returned as-is.
    pub fn execute_assembly(
        &self,
        assembly: &AbsolutePath,
        args: &[OsString],
    ) -> Result<i32, HostError> {
        let path = assembly.to_c_string()?;
        let argv = args
            .iter()
            .map(|arg| {
                os_to_c_string(arg).ok_or_else(|| HostError::InvalidPath(arg.clone().into()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!("session: executing {assembly} with {} argument(s)", argv.len());
        match self.runtime.execute_assembly(&self.handle, &argv, &path) {
            Ok(code) => {
                debug!("session: {assembly} exited with {code}");
                Ok(code as i32)
            }
            Err(status) => {
                error!("session: execute {assembly} failed with status {status}");
                Err(HostError::ExecuteFailed(status))
            }
        }
    }

    /// Shut the runtime down and close its library.
    pub fn shutdown(mut self) -> TeardownReport {
        self.torn_down = true;
        teardown(&mut self.runtime, &self.handle)
    }
}

impl<R: RuntimeLibrary> Drop for HostSession<R> {
    fn drop(&mut self) {
        if !self.torn_down {
            warn!("session: dropped without shutdown, tearing down");
            self.torn_down = true;
            teardown(&mut self.runtime, &self.handle);
        }
    }
}

fn teardown<R: RuntimeLibrary>(runtime: &mut R, handle: &HostHandle) -> TeardownReport {
    let shutdown = runtime.shutdown(handle);
    if shutdown.is_failure() {
        warn!("session: runtime shutdown failed with status {shutdown}");
    } else {
        debug!("session: runtime shut down");
    }
    let closed = match runtime.close() {
        Ok(()) => true,
        Err(e) => {
            warn!("session: runtime library close failed: {e}");
            false
        }
    };
    TeardownReport { shutdown, closed }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY: &str =
        "Sample.Loader, Version=1.0.0.0, Culture=neutral, PublicKeyToken=31bf3856ad364e35";

    #[test]
    fn qualified_identity_is_accepted() {
        let target = DelegateTarget::new(IDENTITY, "Sample.Init", "Run").unwrap();
        assert_eq!(target.method_name(), "Sample.Init.Run");
    }

    #[test]
    fn partial_identity_is_rejected() {
        let err = DelegateTarget::new("Sample.Loader", "Sample.Init", "Run").unwrap_err();
        assert!(matches!(err, HostError::InvalidIdentity(_)));
        assert!(DelegateTarget::new("Sample.Loader, Version=1.0.0.0", "T", "M").is_err());
    }

    #[test]
    fn teardown_report_cleanliness() {
        let clean = TeardownReport {
            shutdown: RuntimeStatus::OK,
            closed: true,
        };
        assert!(clean.is_clean());
        let dirty = TeardownReport {
            shutdown: RuntimeStatus(-1),
            closed: true,
        };
        assert!(!dirty.is_clean());
    }
}
