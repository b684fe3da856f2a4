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

//! audit-echo: a TCP echo server that audits itself.

use audit_echo::{app, cli::Invocation, config::Config, context::Context, signal::Shutdown};

use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    // Malformed values for known options are usage errors, same as any clap program
    let invocation = Invocation::try_parse_from(std::env::args_os()).unwrap_or_else(|err| err.exit());

    // Diagnostics go to stderr; audit records never pass through here.
    let level = if invocation.cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::filter::LevelFilter::from_level(level))
        .init();

    let context = Context::resolve();
    let status = Shutdown::install().and_then(|shutdown| {
        app::run(
            invocation,
            &mut std::io::stdout(),
            &context,
            &shutdown,
            Config::open_sink,
        )
    });
    match status {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:?}", err);
            std::process::exit(1);
        }
    }
}
