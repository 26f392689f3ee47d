// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Command-line host that boots the runtime and runs an entry assembly.
// Author: Lukas Bower

//! `host_cmdline [-alc <path>] [-s <paths>] [-b <path>] [-tpa <paths>] [-v] <entry_assembly> [args...]`

use std::process;

use corehost::cli::{parse_host_args, USAGE};
use corehost::{launcher, logging};
use log::error;

fn main() {
    let args = match parse_host_args(std::env::args_os().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("host_cmdline: {e}");
            eprintln!("{USAGE}");
            process::exit(e.exit_code());
        }
    };
    logging::init_logging(args.verbose);

    match launcher::run(&args) {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("{e}");
            eprintln!("host_cmdline: {e}");
            if e.is_usage_error() {
                eprintln!("{USAGE}");
            }
            process::exit(e.exit_code());
        }
    }
}
