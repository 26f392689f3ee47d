// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Expose the host command-line surface.
// Author: Lukas Bower

//! Command-line handling for the host binaries.

pub mod args;

pub use args::{parse_host_args, HostArgs, USAGE};
