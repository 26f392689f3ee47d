// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Print the trusted platform assembly list built for runtime directories.
// Author: Lukas Bower

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use corehost::config::CORE_ROOT_VAR;
use corehost::logging;
use corehost::paths::resolve_absolute_path;
use corehost::tpa::TpaList;

#[derive(Debug, Parser)]
#[command(
    author = "Lukas Bower",
    version,
    about = "Print the trusted platform assembly list for runtime directories",
    long_about = None
)]
struct Cli {
    /// Directories to scan, highest precedence first. Defaults to $CORE_ROOT.
    dirs: Vec<PathBuf>,

    /// Print one path per line instead of the delimited manifest.
    #[arg(long)]
    lines: bool,

    /// Show the accepted extension and base name for each entry.
    #[arg(long, conflicts_with = "lines")]
    explain: bool,

    /// Verbose diagnostics on stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let dirs = if cli.dirs.is_empty() {
        let root = std::env::var_os(CORE_ROOT_VAR)
            .with_context(|| format!("no directories given and {CORE_ROOT_VAR} is not set"))?;
        vec![PathBuf::from(root)]
    } else {
        cli.dirs
    };

    let mut list = TpaList::new();
    for dir in &dirs {
        let dir = resolve_absolute_path(dir)?;
        list.add_directory(&dir);
    }

    if cli.explain {
        for entry in list.entries() {
            println!(
                "{:<40} {:<8} {}",
                entry.base_name().to_string_lossy(),
                entry.extension(),
                entry.path()
            );
        }
    } else if cli.lines {
        for entry in list.entries() {
            println!("{}", entry.path());
        }
    } else {
        println!("{}", list.to_manifest().to_string_lossy());
    }
    Ok(())
}
