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

//! A TCP echo server that writes a [`syslog`]-style audit record for everything it does.
//!
//! [`syslog`]: https://en.wikipedia.org/wiki/Syslog
//!
//! # Introduction
//!
//! The network side of this crate is about as small as a server gets: accept a connection, read
//! once, write the same bytes back, hang up. The interesting part is the audit trail. Every
//! lifecycle event (binding, accepting a client, receiving & echoing its message, shutting down,
//! being handed arguments nobody asked for) produces one structured record, rendered as a single
//! [RFC 5424]-flavored line & appended to a log file or shipped to a collector over TCP:
//!
//! [RFC 5424]: https://datatracker.ietf.org/doc/html/rfc5424
//!
//! ```text
//! <14>1 2022-06-23T16:10:55.007+01:00 10.0.0.5 audit-echo 4321 TCPIN [tcpServer@12345 user=alice] Server was bound to 0.0.0.0 at 12346
//! ```
//!
//! The pieces are deliberately decomposed along the same lines as a logging pipeline:
//!
//! - a [`Record`](record::Record) borrows the process' identity ([`Context`](context::Context))
//!   & carries a severity, a MSGID & a message
//! - a [`Formatter`](formatter::Formatter) turns a record into bytes
//! - a [`Sink`](transport::Sink) puts those bytes somewhere
//! - an [`Emitter`](emitter::Emitter) strings the two together behind a severity threshold
//!
//! The [`Lifecycle`](events::Lifecycle) enum is the catalog of auditable occasions; it alone
//! decides each record's severity & text.
//!
//! # Usage
//!
//! ```no_run
//! use audit_echo::{
//!     context::Context, emitter::Emitter, events::Lifecycle, facility::Severity,
//!     rfc5424::Rfc5424, transport::FileSink,
//! };
//!
//! let context = Context::resolve();
//! let emitter = Emitter::new(
//!     Severity::Info,
//!     Rfc5424::builder().build().unwrap(),
//!     FileSink::new("/tmp/audit.log").unwrap(),
//! );
//! emitter
//!     .emit(&Lifecycle::Bound { addr: "0.0.0.0:12346".parse().unwrap() }.record(&context))
//!     .unwrap();
//! ```

pub mod app;
pub mod cli;
pub mod config;
pub mod context;
pub mod emitter;
pub mod error;
pub mod events;
pub mod facility;
pub mod formatter;
pub mod record;
pub mod rfc5424;
pub mod server;
pub mod signal;
pub mod transport;
