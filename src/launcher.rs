// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Drive a full hosting session from parsed arguments to exit code.
// Author: Lukas Bower

//! End-to-end host orchestration.
//!
//! Configuration → TPA list → load → initialize → optional load-context
//! bootstrap → execute → shutdown → close. Teardown is owned by
//! [`HostSession`], so every exit path after a successful load releases the
//! runtime exactly once.

use std::path::Path;

use log::{debug, info};

use crate::cli::HostArgs;
use crate::config::{HostConfiguration, HostEnvironment};
use crate::error::HostError;
use crate::runtime::{
    DelegateTarget, HostSession, InitProperties, InitRequest, LoadedRuntime, RuntimeLibrary,
};

/// Assembly identity of the default load-context initializer.
pub const LOAD_CONTEXT_ASSEMBLY: &str = "Microsoft.PowerShell.CoreCLR.AssemblyLoadContext, Version=1.0.0.0, Culture=neutral, PublicKeyToken=31bf3856ad364e35";
/// Type holding the load-context initializer.
pub const LOAD_CONTEXT_TYPE: &str = "System.Management.Automation.PowerShellAssemblyLoadContextInitializer";
/// Static method called with the base path.
pub const LOAD_CONTEXT_METHOD: &str = "SetPowerShellAssemblyLoadContext";

/// Opens a runtime library from a path.
pub trait RuntimeLoader {
    type Runtime: RuntimeLibrary;

    fn load(&self, path: &Path) -> Result<Self::Runtime, HostError>;
}

/// Loads the real shared library through the dynamic linker.
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicLoader;

impl RuntimeLoader for DynamicLoader {
    type Runtime = LoadedRuntime;

    fn load(&self, path: &Path) -> Result<LoadedRuntime, HostError> {
        LoadedRuntime::load(path)
    }
}

/// Managed method invoked with the base path when `-alc` is given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadContextInitializer {
    pub assembly: String,
    pub type_name: String,
    pub method: String,
}

impl Default for LoadContextInitializer {
    fn default() -> Self {
        Self {
            assembly: LOAD_CONTEXT_ASSEMBLY.to_owned(),
            type_name: LOAD_CONTEXT_TYPE.to_owned(),
            method: LOAD_CONTEXT_METHOD.to_owned(),
        }
    }
}

impl LoadContextInitializer {
    pub fn target(&self) -> Result<DelegateTarget, HostError> {
        DelegateTarget::new(&self.assembly, &self.type_name, &self.method)
    }
}

/// Runs hosting sessions with a given loader.
#[derive(Debug, Clone, Default)]
pub struct Launcher<L> {
    loader: L,
    initializer: LoadContextInitializer,
}

impl<L: RuntimeLoader> Launcher<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            initializer: LoadContextInitializer::default(),
        }
    }

    /// Replace the load-context initializer used for `-alc`.
    pub fn with_initializer(mut self, initializer: LoadContextInitializer) -> Self {
        self.initializer = initializer;
        self
    }

    /// Resolve `args` against `environment` and run the hosted program.
    pub fn launch(&self, args: &HostArgs, environment: &HostEnvironment) -> Result<i32, HostError> {
        let config = HostConfiguration::resolve(args, environment)?;
        self.run(&config)
    }

    /// Run the hosted program described by `config`, returning its exit code.
    pub fn run(&self, config: &HostConfiguration) -> Result<i32, HostError> {
        log_configuration(config);
        let properties = InitProperties::for_host(config)?;
        let request = InitRequest::new(
            config.host_executable(),
            config.domain_friendly_name(),
            properties,
        )?;

        let runtime = self.loader.load(&config.runtime_library_path())?;
        let session = HostSession::start(runtime, &request)?;
        let outcome = self.drive(&session, config);
        let report = session.shutdown();
        debug!(
            "launcher: teardown shutdown={} closed={}",
            report.shutdown, report.closed
        );
        outcome
    }

    fn drive<R: RuntimeLibrary>(
        &self,
        session: &HostSession<R>,
        config: &HostConfiguration,
    ) -> Result<i32, HostError> {
        if let Some(alc) = config.load_context_assembly() {
            let target = self.initializer.target()?;
            let delegate = session.create_delegate(&target)?;
            let base = config.base_path().to_string();
            info!("launcher: initializing load context from {alc} with base {base}");
            // The initializer takes the base path as a UTF-16 string.
            unsafe { delegate.call_with_utf16(&base) };
        }
        let code = session.execute_assembly(config.entry_assembly(), config.forwarded_args())?;
        info!("launcher: {} returned {code}", config.entry_assembly());
        Ok(code)
    }
}

/// Run the host against the live process environment and the real loader.
pub fn run(args: &HostArgs) -> Result<i32, HostError> {
    let config = HostConfiguration::from_env(args)?;
    Launcher::new(DynamicLoader).run(&config)
}

fn log_configuration(config: &HostConfiguration) {
    debug!("launcher: runtime library {}", config.runtime_library_path().display());
    debug!("launcher: entry assembly {}", config.entry_assembly());
    debug!("launcher: base path {}", config.base_path());
    for path in config.application_paths() {
        debug!("launcher: app path {path}");
    }
    for path in config.native_search_directories() {
        debug!("launcher: native search directory {path}");
    }
    debug!(
        "launcher: {} trusted assemblies: {}",
        config.trusted_assemblies().len(),
        config.trusted_assemblies().to_manifest().to_string_lossy()
    );
}
