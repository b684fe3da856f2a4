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

//! syslog facility & severity definitions, and the PRI calculation.
//!
//! [`Facility`] replicates the names used in `<syslog.h>`. [`Severity`] is deliberately narrower
//! than syslog's eight levels: audit records are only ever emitted at the five levels below.
//!
//! The PRI value that leads every syslog line is `facility * 8 + severity`; see [`priority`].

type StdResult<T, E> = std::result::Result<T, E>;

/// The twenty-four syslog facilities. As in `<syslog.h>` the discriminants are the facility codes
/// already multiplied by 8, so that a PRI value is just `facility as u8 | severity.code()`.
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Facility {
    /// kernel messages
    LOG_KERN = 0 << 3,
    /// random user-level messages
    LOG_USER = 1 << 3,
    /// mail system
    LOG_MAIL = 2 << 3,
    /// system daemons
    LOG_DAEMON = 3 << 3,
    /// security/authorization messages
    LOG_AUTH = 4 << 3,
    /// messages generated internally by syslogd
    LOG_SYSLOG = 5 << 3,
    /// line printer subsystem
    LOG_LPR = 6 << 3,
    /// network news subsystem
    LOG_NEWS = 7 << 3,
    /// UUCP subsystem
    LOG_UUCP = 8 << 3,
    /// clock daemon
    LOG_CRON = 9 << 3,
    /// security/authorization messages (private)
    LOG_AUTHPRIV = 10 << 3,
    /// ftp daemon
    LOG_FTP = 11 << 3,
    /// NTP subsystem
    LOG_NTP = 12 << 3,
    /// log audit
    LOG_AUDIT = 13 << 3,
    /// log alert
    LOG_ALERT = 14 << 3,
    /// clock daemon (alternate)
    LOG_CLOCK = 15 << 3,
    /// reserved for local use
    LOG_LOCAL0 = 16 << 3,
    /// reserved for local use
    LOG_LOCAL1 = 17 << 3,
    /// reserved for local use
    LOG_LOCAL2 = 18 << 3,
    /// reserved for local use
    LOG_LOCAL3 = 19 << 3,
    /// reserved for local use
    LOG_LOCAL4 = 20 << 3,
    /// reserved for local use
    LOG_LOCAL5 = 21 << 3,
    /// reserved for local use
    LOG_LOCAL6 = 22 << 3,
    /// reserved for local use
    LOG_LOCAL7 = 23 << 3,
}

impl std::default::Default for Facility {
    /// Audit records are user-level messages.
    fn default() -> Self {
        Facility::LOG_USER
    }
}

impl Facility {
    /// The facility code proper, i.e. *not* multiplied by 8.
    pub fn code(&self) -> u8 {
        (*self as u8) >> 3
    }
}

/// The severities at which audit records are emitted.
///
/// Variants are declared from least to most significant, so the derived [`Ord`] lets the emitter
/// compare a record against its threshold directly: `Severity::Debug < Severity::Crit`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// debug-level message
    Debug,
    /// informational message
    Info,
    /// warning conditions
    Warn,
    /// error conditions
    Err,
    /// critical conditions
    Crit,
}

impl Severity {
    /// The syslog severity ordinal, as documented in `syslog(3)`.
    pub fn code(&self) -> u8 {
        match self {
            Severity::Debug => 7,
            Severity::Info => 6,
            Severity::Warn => 4,
            Severity::Err => 3,
            Severity::Crit => 2,
        }
    }
    /// The short name used throughout the audit taxonomy.
    pub fn name(&self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Err => "err",
            Severity::Crit => "crit",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        write!(f, "{}", self.name())
    }
}

/// Compute the syslog PRI value for `severity` under `facility`.
///
/// Downstream collectors parse the leading `<NNN>` tag, so this must be exact.
pub fn priority(facility: Facility, severity: Severity) -> u8 {
    facility as u8 | severity.code()
}
