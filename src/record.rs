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

//! The audit record.
//!
//! A [`Record`] is one audit entry: built for a single occasion, immutable once built, consumed
//! synchronously by the [`Emitter`]. Only its rendered text ever outlives it.
//!
//! [`Emitter`]: crate::emitter::Emitter

use crate::{
    context::Context,
    facility::{priority, Severity},
};

use chrono::prelude::*;

type StdResult<T, E> = std::result::Result<T, E>;

/// The RFC 5424 MSGID values used by this server, distinguishing inbound from outbound flows.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MsgId {
    TcpIn,
    TcpOut,
}

impl MsgId {
    pub fn as_str(&self) -> &'static str {
        match self {
            MsgId::TcpIn => "TCPIN",
            MsgId::TcpOut => "TCPOUT",
        }
    }
}

impl std::fmt::Display for MsgId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        write!(f, "{}", self.as_str())
    }
}

/// One audit entry.
///
/// The identity fields (host, user, pid) aren't stored here; they're read through the borrowed
/// [`Context`].
#[derive(Clone, Debug)]
pub struct Record<'a> {
    context: &'a Context,
    severity: Severity,
    priority: u8,
    timestamp: DateTime<FixedOffset>,
    msgid: MsgId,
    message: String,
}

impl<'a> Record<'a> {
    /// Build a record stamped with the current local time.
    pub fn new(
        context: &'a Context,
        severity: Severity,
        msgid: MsgId,
        message: impl Into<String>,
    ) -> Record<'a> {
        Record {
            context,
            severity,
            priority: priority(context.facility(), severity),
            timestamp: Local::now().fixed_offset(),
            msgid,
            message: message.into(),
        }
    }
    /// Replace the timestamp; the only way to alter a record after construction.
    pub fn with_timestamp<Tz: TimeZone>(mut self, timestamp: DateTime<Tz>) -> Record<'a> {
        self.timestamp = timestamp.fixed_offset();
        self
    }
    pub fn context(&self) -> &'a Context {
        self.context
    }
    pub fn severity(&self) -> Severity {
        self.severity
    }
    pub fn priority(&self) -> u8 {
        self.priority
    }
    pub fn timestamp(&self) -> &DateTime<FixedOffset> {
        &self.timestamp
    }
    pub fn msgid(&self) -> MsgId {
        self.msgid
    }
    pub fn message(&self) -> &str {
        &self.message
    }
}
