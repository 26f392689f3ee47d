// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Define host error taxonomy and process exit-code mapping.
// Author: Lukas Bower

//! Host-level errors and the fixed exit codes they map to.
//!
//! Every failure in the host is surfaced as a value at the point it occurs.
//! Nothing here is retried: each variant describes a misconfiguration or an
//! environment defect.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Exit code for a missing argument or flag value.
pub const EXIT_MISSING_ARGS: i32 = 1;
/// Exit code when a required path cannot be resolved.
pub const EXIT_PATH_RESOLUTION: i32 = 2;
/// Exit code when the runtime library cannot be loaded or bound.
pub const EXIT_LOAD_FAILURE: i32 = 3;
/// Exit code for init, delegate or execute failures reported by the runtime.
pub const EXIT_RUNTIME_FAILURE: i32 = 4;

/// Status code returned across the runtime ABI.
///
/// Negative values are failures. The magnitude is an opaque runtime-defined
/// diagnostic and is never translated into errno space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuntimeStatus(pub i32);

impl RuntimeStatus {
    /// Status reported for a successful call.
    pub const OK: RuntimeStatus = RuntimeStatus(0);
    /// Reported by the host when a call cannot reach the runtime at all.
    pub const UNEXPECTED: RuntimeStatus = RuntimeStatus(0x8000_ffff_u32 as i32);

    /// Return `true` when the runtime reported a failure.
    pub fn is_failure(self) -> bool {
        self.0 < 0
    }

    /// Return the raw status value.
    pub fn code(self) -> i32 {
        self.0
    }
}

impl fmt::Display for RuntimeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0 as u32)
    }
}

/// Errors produced while configuring, loading or driving the hosted runtime.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("missing entry assembly argument")]
    MissingArgument,
    #[error("option {0} requires a value")]
    MissingFlagValue(String),
    #[error("could not get absolute path for {0}: environment variable is not set")]
    EnvNotSet(&'static str),
    #[error("could not get absolute path for {path}: {source}")]
    PathNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("path {0} has no parent directory")]
    NoParent(PathBuf),
    #[error("path {0} contains an interior NUL byte")]
    InvalidPath(PathBuf),
    #[error("failed to load runtime library {path}: {reason}")]
    LoadFailed { path: PathBuf, reason: String },
    #[error("runtime library is missing required symbol {0}")]
    MissingSymbol(&'static str),
    #[error("runtime initialization failed with status {0}")]
    InitFailed(RuntimeStatus),
    #[error("assembly identity {0:?} is not fully qualified")]
    InvalidIdentity(String),
    #[error("could not create delegate for {method}: status {status}")]
    DelegateFailed {
        method: String,
        status: RuntimeStatus,
    },
    #[error("assembly execution failed with status {0}")]
    ExecuteFailed(RuntimeStatus),
}

impl HostError {
    /// Map the error to the process exit code reported by the host.
    pub fn exit_code(&self) -> i32 {
        match self {
            HostError::MissingArgument | HostError::MissingFlagValue(_) => EXIT_MISSING_ARGS,
            HostError::EnvNotSet(_)
            | HostError::PathNotFound { .. }
            | HostError::NoParent(_)
            | HostError::InvalidPath(_) => EXIT_PATH_RESOLUTION,
            HostError::LoadFailed { .. } | HostError::MissingSymbol(_) => EXIT_LOAD_FAILURE,
            HostError::InitFailed(_)
            | HostError::InvalidIdentity(_)
            | HostError::DelegateFailed { .. }
            | HostError::ExecuteFailed(_) => EXIT_RUNTIME_FAILURE,
        }
    }

    /// Return `true` for configuration errors that warrant printing usage.
    pub fn is_usage_error(&self) -> bool {
        matches!(self, HostError::MissingArgument | HostError::MissingFlagValue(_))
    }
}
