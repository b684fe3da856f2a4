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

//! [audit-echo](crate) errors

use backtrace::Backtrace;

/// [audit-echo](crate) error type
///
/// Like its sibling projects, [audit-echo](crate) skips [thiserror] & [anyhow] in favor of a plain
/// enumeration whose arms are chosen on the basis of what the caller will need to do about them.
/// Every arm that can originate deep in the stack carries a [`Backtrace`].
///
/// [thiserror]: https://docs.rs/thiserror
/// [anyhow]: https://docs.rs/anyhow
#[non_exhaustive]
pub enum Error {
    /// The source label isn't an RFC 5424 APP-NAME (ASCII, less than forty-nine bytes)
    BadSourceLabel { name: Vec<u8>, back: Backtrace },
    /// The date template isn't something chrono can render
    BadDateFormat { format: String, back: Backtrace },
    /// The line template has an unknown placeholder, or an unterminated one
    BadLineTemplate {
        template: String,
        reason: String,
        back: Backtrace,
    },
    /// Failed to fetch the current executable (via std::env)
    NoExecutable {
        source: std::io::Error,
        back: Backtrace,
    },
    /// Failed to install a signal handler
    Signal { source: nix::Error, back: Backtrace },
    /// Failed to create, bind or listen on the server socket
    Socket { source: nix::Error, back: Backtrace },
    /// The audit sink refused a line
    Sink {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// General I/O error on the service socket
    Io {
        source: std::io::Error,
        back: Backtrace,
    },
}

impl std::convert::From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            source: err,
            back: Backtrace::new(),
        }
    }
}

impl std::fmt::Display for Error {
    // `Error` is non-exhaustive so that adding variants won't be a breaking change to our
    // callers. That means the compiler won't catch us if we miss a variant here, so we
    // always include a `_` arm.
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::BadSourceLabel { name, .. } => write!(
                f,
                "{:?} is not usable as a source label (APP-NAME)",
                String::from_utf8_lossy(name)
            ),
            Error::BadDateFormat { format, .. } => {
                write!(f, "'{}' is not a valid date/time template", format)
            }
            Error::BadLineTemplate {
                template, reason, ..
            } => write!(f, "Bad line template '{}': {}", template, reason),
            Error::NoExecutable { source, .. } => {
                write!(f, "Couldn't determine the current executable: {}", source)
            }
            Error::Signal { source, .. } => {
                write!(f, "Failed to install the signal handler: {}", source)
            }
            Error::Socket { source, .. } => write!(f, "Server socket error: {}", source),
            Error::Sink { source, .. } => write!(f, "Audit sink error: {}", source),
            Error::Io { source, .. } => write!(f, "I/O error: {}", source),
            _ => write!(f, "Other audit-echo error"),
        }
    }
}

impl std::fmt::Debug for Error {
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::BadSourceLabel { name: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::BadDateFormat { format: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::BadLineTemplate { back, .. } => write!(f, "{}\n{:?}", self, back),
            Error::NoExecutable { source: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::Signal { source: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::Socket { source: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::Sink { source: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::Io { source: _, back } => write!(f, "{}\n{:?}", self, back),
            err => write!(f, "audit-echo error: {}", err),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
