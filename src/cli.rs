// Copyright (C) 2025 Michael Herstine <sp1ff@pobox.com>
//
// This file is part of audit-echo.
//
// audit-echo is free software: you can redistribute it and/or modify it under the terms of the
// GNU General Public License as published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// audit-echo is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without
// even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with audit-echo.  If
// not, see <http://www.gnu.org/licenses/>.

//! Command-line interface.
//!
//! Tokens clap doesn't recognize are not usage errors here: they're set aside, audited & reported
//! (see [`Invocation::unrecognised`]). To get that, argv is split against the options [`Cli`]
//! declares *before* clap sees it.

use clap::{CommandFactory, Parser};

use std::{ffi::OsString, net::Ipv4Addr, path::PathBuf};

pub const DEFAULT_PORT: u16 = 12346;
pub const DEFAULT_LOG_FILE: &str = "/var/log/testLog";

/// TCP echo server with syslog-style audit logging.
#[derive(Parser, Debug)]
#[command(name = "audit-echo", disable_help_flag = true)]
pub struct Cli {
    /// Log all audit events starting from debug (7 for syslog) level.
    #[arg(short, long)]
    pub verbose: bool,

    /// Show the application description & its options.
    #[arg(short, long)]
    pub help: bool,

    /// Append audit records to this file.
    #[arg(long, value_name = "PATH", conflicts_with = "collector")]
    pub log_file: Option<PathBuf>,

    /// Send audit records to a collector listening on TCP at this address.
    #[arg(long, value_name = "HOST:PORT")]
    pub collector: Option<String>,

    /// Address on which to listen.
    #[arg(long, value_name = "ADDR", default_value_t = Ipv4Addr::UNSPECIFIED)]
    pub bind: Ipv4Addr,

    /// Port on which to listen.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Audit line template.
    #[arg(long, value_name = "TEMPLATE")]
    pub line_format: Option<String>,

    /// Audit timestamp template (strftime, plus %F for milliseconds).
    #[arg(long, value_name = "TEMPLATE")]
    pub date_format: Option<String>,
}

/// The result of parsing the command line: the options we know, and everything else.
#[derive(Debug)]
pub struct Invocation {
    pub cli: Cli,
    pub unrecognised: Vec<String>,
}

/// How one of [`Cli`]'s options is spelled, and whether it takes a value.
struct Known {
    short: Option<char>,
    long: Option<String>,
    takes_value: bool,
}

fn known_options() -> Vec<Known> {
    Cli::command()
        .get_arguments()
        .filter(|arg| !arg.is_positional())
        .map(|arg| Known {
            short: arg.get_short(),
            long: arg.get_long().map(str::to_string),
            takes_value: arg.get_action().takes_values(),
        })
        .collect()
}

/// Partition `args` (sans program name) into tokens for clap & tokens nobody asked for.
fn split_known(args: Vec<String>) -> (Vec<String>, Vec<String>) {
    let opts = known_options();
    let by_long = |name: &str| opts.iter().find(|k| k.long.as_deref() == Some(name));
    let by_short = |c: char| opts.iter().find(|k| k.short == Some(c));

    let mut known = Vec::new();
    let mut unknown = Vec::new();
    let mut iter = args.into_iter();
    while let Some(tok) = iter.next() {
        if tok == "--" {
            unknown.extend(iter.by_ref());
        } else if let Some(long) = tok.strip_prefix("--") {
            let (name, inline) = match long.split_once('=') {
                Some((name, _)) => (name, true),
                None => (long, false),
            };
            match by_long(name) {
                Some(opt) => {
                    let wants_next = opt.takes_value && !inline;
                    known.push(tok);
                    if wants_next {
                        known.extend(iter.next());
                    }
                }
                None => unknown.push(tok),
            }
        } else if tok.len() > 1 && tok.starts_with('-') {
            let shorts: Vec<char> = tok.chars().skip(1).collect();
            match by_short(shorts[0]) {
                Some(opt) if opt.takes_value => {
                    let attached = shorts.len() > 1;
                    known.push(tok);
                    if !attached {
                        known.extend(iter.next());
                    }
                }
                // A cluster like `-vh` is ours only if every flag in it is
                _ if shorts
                    .iter()
                    .all(|&c| by_short(c).map(|k| !k.takes_value).unwrap_or(false)) =>
                {
                    known.push(tok)
                }
                _ => unknown.push(tok),
            }
        } else {
            unknown.push(tok);
        }
    }
    (known, unknown)
}

impl Invocation {
    /// Parse `args`, the first of which is the program name.
    ///
    /// Unknown tokens land in `unrecognised`; malformed values for known options (e.g.
    /// `--port lots`) are still clap errors.
    pub fn try_parse_from<I, T>(args: I) -> std::result::Result<Invocation, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let mut args = args
            .into_iter()
            .map(|arg| arg.into().to_string_lossy().into_owned());
        let program = args.next().unwrap_or_else(|| "audit-echo".to_string());
        let (known, unrecognised) = split_known(args.collect());
        let cli = Cli::try_parse_from(std::iter::once(program).chain(known))?;
        Ok(Invocation { cli, unrecognised })
    }
}

/// The text printed for `-h`/`--help`.
pub fn help_text(port: u16) -> String {
    format!(
        "DESCRIPTION\n\
         \tTCP echo server, accepts TCP connections on port {port}.\n\
         \tIt audits all operations and appends them to a log file or sends them to a central\n\
         \tsyslog collector.\n\
         \n\
         OPTIONS\n\
         \tGeneric Application Information\n\
         \t\t-h, --help\n\
         \t\t\tShow application description and its options.\n\
         \n\
         \tLogging verbosity\n\
         \t\t-v, --verbose\n\
         \t\t\tForce logging facility to log all events starting from DEBUG (7 for Syslog) level.\n\
         \n\
         \tAudit destination\n\
         \t\t--log-file PATH\n\
         \t\t\tAppend audit records to PATH (default {log_file}).\n\
         \t\t--collector HOST:PORT\n\
         \t\t\tSend audit records over TCP to the collector at HOST:PORT.\n\
         \t\t--line-format TEMPLATE, --date-format TEMPLATE\n\
         \t\t\tOverride the audit line & timestamp layouts.\n\
         \n\
         \tNetwork\n\
         \t\t--bind ADDR, --port PORT\n\
         \t\t\tListen on ADDR:PORT (default 0.0.0.0:{default_port}).\n",
        port = port,
        log_file = DEFAULT_LOG_FILE,
        default_port = DEFAULT_PORT,
    )
}
