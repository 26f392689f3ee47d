// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Root library for the native managed-runtime host.
// Author: Lukas Bower

//! Native bootstrap host for a CLR-style managed runtime.
//!
//! Builds the trusted platform assembly list, loads the runtime's shared
//! library, initializes it, runs an entry assembly and tears the runtime
//! down again.

/// Host error taxonomy and exit codes
pub mod error;

/// Path canonicalisation helpers
pub mod paths;

/// Trusted platform assembly list builder
pub mod tpa;

/// Runtime ABI seam, loader and session lifecycle
pub mod runtime;

/// Command-line splitting for the host binary
pub mod cli;

/// Resolved host configuration
pub mod config;

/// End-to-end hosting flow
pub mod launcher;

/// Logger setup shared by the binaries
pub mod logging;

pub use error::{HostError, RuntimeStatus};
