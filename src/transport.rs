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

//! Audit sinks.
//!
//! This module defines the [`Sink`] trait that all destinations must support, along with the two
//! destinations the server knows how to write to: an append-mode file, and a log collector
//! listening on a TCP port.
//!
//! # Examples
//!
//! Appending to a file:
//!
//! ```rust
//! use audit_echo::transport::FileSink;
//! let dir = std::env::temp_dir();
//! let sink = FileSink::new(dir.join("audit-echo-doctest.log"));
//! assert!(sink.is_ok());
//! ```
//!
//! Sending to a collector that isn't there:
//!
//! ```rust
//! use audit_echo::transport::TcpSink;
//! let sink = TcpSink::new("some-host.domain.io:5514");
//! assert!(sink.is_err()); // no such host, after all
//! ```

use crate::error::{Error, Result};

use backtrace::Backtrace;

use std::{
    fs::{File, OpenOptions},
    io::Write,
    net::TcpStream,
    path::{Path, PathBuf},
};

/// Operations all sinks must support.
pub trait Sink {
    /// Append one formatted line to this sink.
    ///
    /// `buf` carries no line terminator; the sink supplies one. Failures are returned to the
    /// caller, never retried.
    fn send(&self, buf: &[u8]) -> Result<usize>;
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn send(&self, buf: &[u8]) -> Result<usize> {
        (**self).send(buf)
    }
}

fn sink_error(err: std::io::Error) -> Error {
    Error::Sink {
        source: Box::new(err),
        back: Backtrace::new(),
    }
}

/// Write `buf` followed by a newline, then flush.
///
/// `Write` wants `&mut self` but [`Sink::send`] only has `&self`; since `Write` is implemented for
/// `&File` & `&TcpStream` as well, callers hand us `&mut &File` (or `&mut &TcpStream`).
fn write_line<W: Write>(mut writer: W, buf: &[u8]) -> Result<usize> {
    writer.write_all(buf).map_err(sink_error)?;
    writer.write_all(b"\n").map_err(sink_error)?;
    writer.flush().map_err(sink_error)?;
    Ok(buf.len())
}

/// Appending audit lines to a local file.
///
/// The file is opened once, in append mode (created if need be), and held for the life of the
/// sink; it is never rotated, truncated or reopened.
pub struct FileSink {
    path: PathBuf,
    file: File,
}

impl FileSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<FileSink> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(sink_error)?;
        Ok(FileSink { path, file })
    }
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for FileSink {
    fn send(&self, buf: &[u8]) -> Result<usize> {
        let writer: &File = &self.file;
        write_line(writer, buf)
    }
}

/// Sending audit lines to a collector over a TCP stream, one newline-terminated line per record.
pub struct TcpSink {
    socket: TcpStream,
}

impl TcpSink {
    /// Connect to the collector at `addr`.
    pub fn new<A: std::net::ToSocketAddrs>(addr: A) -> Result<TcpSink> {
        Ok(TcpSink {
            socket: TcpStream::connect(addr).map_err(sink_error)?,
        })
    }
}

impl Sink for TcpSink {
    fn send(&self, buf: &[u8]) -> Result<usize> {
        let writer: &TcpStream = &self.socket;
        write_line(writer, buf)
    }
}
