// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Define the hosting ABI seam between the host and the runtime library.
// Author: Lukas Bower

//! Runtime hosting contract.
//!
//! The hosted runtime is reached through exactly four entry points. They are
//! modelled as the [`HostingApi`] trait so the lifecycle controller in
//! [`session`] can be driven by the dynamically loaded library in
//! production and by an in-memory double in tests.

use std::ffi::{c_void, CStr, CString};
use std::ptr::{self, NonNull};

use crate::error::RuntimeStatus;

pub mod loader;
pub mod properties;
pub mod session;

pub use loader::{runtime_library_name, LoadedRuntime};
pub use properties::InitProperties;
pub use session::{Delegate, DelegateTarget, HostSession, InitRequest, TeardownReport};

/// Opaque `(host handle, domain id)` capability returned by initialize.
///
/// Neither `Clone` nor `Send`; one session owns it.
#[derive(Debug)]
pub struct HostHandle {
    host: *mut c_void,
    domain_id: u32,
}

impl HostHandle {
    /// Wrap raw values produced by the runtime's initialize entry point.
    pub fn from_raw(host: *mut c_void, domain_id: u32) -> Self {
        Self { host, domain_id }
    }

    /// Handle used when initialize never produced one.
    pub fn null() -> Self {
        Self::from_raw(ptr::null_mut(), 0)
    }

    /// Raw host pointer.
    pub fn as_ptr(&self) -> *mut c_void {
        self.host
    }

    /// Domain id assigned by the runtime.
    pub fn domain_id(&self) -> u32 {
        self.domain_id
    }

    /// Return `true` when no runtime host is behind this handle.
    pub fn is_null(&self) -> bool {
        self.host.is_null()
    }
}

/// The four entry points every hostable runtime library must export.
pub trait HostingApi {
    /// Start the runtime and create the default domain.
    fn initialize(
        &self,
        exe_path: &CStr,
        domain_name: &CStr,
        properties: &InitProperties,
    ) -> Result<HostHandle, RuntimeStatus>;

    /// Stop the runtime behind `handle`.
    fn shutdown(&self, handle: &HostHandle) -> RuntimeStatus;

    /// Run the entry point of `assembly_path`, returning its exit code.
    fn execute_assembly(
        &self,
        handle: &HostHandle,
        argv: &[CString],
        assembly_path: &CStr,
    ) -> Result<u32, RuntimeStatus>;

    /// Bind a static managed method and return it as a native function pointer.
    fn create_delegate(
        &self,
        handle: &HostHandle,
        assembly: &CStr,
        type_name: &CStr,
        method: &CStr,
    ) -> Result<NonNull<c_void>, RuntimeStatus>;
}

/// A hosting library that owns an OS-level handle which must be released.
pub trait RuntimeLibrary: HostingApi {
    /// Release the library. Called exactly once, after shutdown.
    fn close(&mut self) -> Result<(), String>;
}
