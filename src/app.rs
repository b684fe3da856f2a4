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

//! The application proper.
//!
//! [`run`] takes everything process-wide as an argument (the identity [`Context`], the
//! [`Shutdown`] handle, where console output goes, how to open the audit sink) so that `main` is
//! left with nothing to do but resolve those.

use crate::{
    cli::{help_text, Invocation},
    config::Config,
    context::Context,
    emitter::Emitter,
    error::Result,
    events::Lifecycle,
    facility::Severity,
    server,
    signal::Shutdown,
    transport::Sink,
};

use tracing::{debug, info};

use std::io::Write;

const FAREWELL: &str = "Exiting program... If you were not granted clearance to do so, please \
                        report yourself to the nearest sysadmin affiliated with the \
                        establishment, have a good day.";

/// Run the server as described by `invocation`; return the process exit status.
///
/// Unrecognised arguments & `--help` both end things early (with status zero). Otherwise this
/// binds, serves until `shutdown` fires, audits the shutdown & returns zero. Any error (bad
/// templates, sink, socket) comes back as-is, typically before or without an audit record.
pub fn run<W, S, O>(
    invocation: Invocation,
    out: &mut W,
    context: &Context,
    shutdown: &Shutdown,
    open_sink: O,
) -> Result<i32>
where
    W: Write,
    S: Sink,
    O: FnOnce(&Config) -> Result<S>,
{
    let config = Config::from_cli(&invocation.cli);

    // `-v` hasn't been looked at yet, so this path always audits at debug
    if !invocation.unrecognised.is_empty() {
        let config = config.with_threshold(Severity::Debug);
        let emitter = Emitter::new(config.threshold, config.formatter()?, open_sink(&config)?);
        emitter.emit(&Lifecycle::UnrecognisedArgument.record(context))?;
        emitter.emit(
            &Lifecycle::UnrecognisedArgumentDetail {
                args: &invocation.unrecognised,
            }
            .record(context),
        )?;
        writeln!(out, "Unrecognized arguments: ")?;
        writeln!(out, "{:?}", invocation.unrecognised)?;
        return Ok(0);
    }

    if invocation.cli.help {
        writeln!(out, "{}", help_text(config.bind.port()))?;
        return Ok(0);
    }

    debug!("Configuration: {:?}", config);
    let emitter = Emitter::new(config.threshold, config.formatter()?, open_sink(&config)?);

    let listener = server::listen(config.bind, config.backlog)?;
    let addr = listener.local_addr()?;
    emitter.emit(&Lifecycle::Bound { addr }.record(context))?;
    info!("Listening on {}", addr);
    writeln!(
        out,
        "Started a simple tcp server on {} port {}",
        addr.ip(),
        addr.port()
    )?;
    out.flush()?;

    let signum = server::serve(&listener, &emitter, context, shutdown)?;

    emitter.emit(&Lifecycle::ShutdownRequested.record(context))?;
    emitter.emit(&Lifecycle::ShutdownSignal { signum }.record(context))?;
    writeln!(out, "{}", FAREWELL)?;
    Ok(0)
}
