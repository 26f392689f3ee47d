// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Split the host command line into host flags and forwarded arguments.
// Author: Lukas Bower
//
// ─────────────────────────────────────────────────────────────
// Grammar:
//
//   host_cmdline [-alc <path>] [-s <paths>] [-b <path>] [-tpa <paths>] [-v]
//                <entry_assembly> [args...]
//
// Host flags are only recognised before the entry assembly. Everything after
// it belongs to the hosted program and is forwarded untouched, even tokens
// that look like host flags.
// ─────────────────────────────────────────────────────────────

use std::ffi::OsString;

use crate::error::HostError;

/// Usage text printed on argument errors.
pub const USAGE: &str = "\
Usage: host_cmdline [-alc <path>] [-s <search_paths>] [-b <base_path>] [-tpa <list>] [-v] <entry_assembly> [args...]

  -alc <path>    assembly providing a custom load context; added to the TPA list
  -s <paths>     ':'-separated application search paths
  -b <path>      base path for the load context (default: current directory)
  -tpa <paths>   ':'-separated files to add to the TPA list
  -v             verbose diagnostics on stderr

CORE_ROOT must name the directory holding the runtime library.";

/// Parsed host command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostArgs {
    /// `-alc`: custom load-context assembly.
    pub load_context: Option<OsString>,
    /// `-s`: delimiter-separated application search paths.
    pub search_paths: Option<OsString>,
    /// `-b`: base path override.
    pub base_path: Option<OsString>,
    /// `-tpa`: delimiter-separated extra trusted assemblies.
    pub trusted_assemblies: Option<OsString>,
    /// `-v`
    pub verbose: bool,
    /// First positional token.
    pub entry_assembly: OsString,
    /// Everything after the entry assembly, verbatim.
    pub forwarded: Vec<OsString>,
}

/// Parse host arguments, excluding the program name.
///
/// # Examples
///
/// ```
/// use corehost::cli::args::parse_host_args;
///
/// let args = parse_host_args(["-v", "app.dll", "-v"]).unwrap();
/// assert!(args.verbose);
/// assert_eq!(args.entry_assembly, "app.dll");
/// assert_eq!(args.forwarded, vec!["-v"]);
/// ```
pub fn parse_host_args<I, T>(args: I) -> Result<HostArgs, HostError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut parsed = HostArgs::default();
    let mut tokens = args.into_iter().map(Into::into);

    while let Some(token) = tokens.next() {
        let slot = match token.to_str() {
            Some("-alc") => &mut parsed.load_context,
            Some("-s") => &mut parsed.search_paths,
            Some("-b") => &mut parsed.base_path,
            Some("-tpa") => &mut parsed.trusted_assemblies,
            Some("-v") => {
                parsed.verbose = true;
                continue;
            }
            _ => {
                parsed.entry_assembly = token;
                parsed.forwarded = tokens.collect();
                return Ok(parsed);
            }
        };
        let flag = token.to_string_lossy().into_owned();
        *slot = Some(tokens.next().ok_or(HostError::MissingFlagValue(flag))?);
    }

    Err(HostError::MissingArgument)
}

// ───────────────────────────── tests ─────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_flags() {
        let args = parse_host_args([
            "-alc", "Loader.dll", "-s", "/a:/b", "-b", "/base", "-tpa", "/x.dll", "-v", "app.dll",
        ])
        .unwrap();
        assert_eq!(args.load_context.as_deref(), Some("Loader.dll".as_ref()));
        assert_eq!(args.search_paths.as_deref(), Some("/a:/b".as_ref()));
        assert_eq!(args.base_path.as_deref(), Some("/base".as_ref()));
        assert_eq!(args.trusted_assemblies.as_deref(), Some("/x.dll".as_ref()));
        assert!(args.verbose);
        assert_eq!(args.entry_assembly, "app.dll");
        assert!(args.forwarded.is_empty());
    }

    #[test]
    fn flags_after_entry_assembly_are_forwarded() {
        let args = parse_host_args(["-v", "myprog.exe", "-alc", "notAFlagAnymore"]).unwrap();
        assert_eq!(args.entry_assembly, "myprog.exe");
        assert_eq!(args.forwarded, vec!["-alc", "notAFlagAnymore"]);
        assert!(args.load_context.is_none());
    }

    #[test]
    fn missing_entry_assembly() {
        assert!(matches!(
            parse_host_args(["-v"]),
            Err(HostError::MissingArgument)
        ));
        assert!(matches!(
            parse_host_args(Vec::<String>::new()),
            Err(HostError::MissingArgument)
        ));
    }

    #[test]
    fn flag_without_value() {
        let err = parse_host_args(["-s"]).unwrap_err();
        assert!(matches!(err, HostError::MissingFlagValue(ref f) if f == "-s"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn flag_value_may_look_like_a_flag() {
        let args = parse_host_args(["-b", "-v", "app.dll"]).unwrap();
        assert_eq!(args.base_path.as_deref(), Some("-v".as_ref()));
        assert!(!args.verbose);
    }
}
