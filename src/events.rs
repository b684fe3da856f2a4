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

//! The lifecycle event taxonomy.
//!
//! Every occasion on which the server writes an audit record is a variant of [`Lifecycle`]; the
//! variant alone decides the record's severity, MSGID & message text.
//!
//! | Occasion                     | Severity | MSGID  |
//! |------------------------------|----------|--------|
//! | unrecognised argument        | err      | TCPIN  |
//! | unrecognised argument detail | debug    | TCPIN  |
//! | server bound                 | info     | TCPIN  |
//! | connection accepted          | info     | TCPIN  |
//! | message received             | debug    | TCPIN  |
//! | message echoed               | info     | TCPOUT |
//! | shutdown requested           | warn     | TCPIN  |
//! | shutdown signal detail       | debug    | TCPIN  |
//!
//! Note that the bind & shutdown records are tagged TCPIN even though nothing came in over the
//! wire; collectors already key on that, so it stays.

use crate::{
    context::Context,
    facility::Severity,
    record::{MsgId, Record},
};

use std::net::{IpAddr, SocketAddr};

/// Where a client connected from, relative to this host.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Origin {
    Local,
    Remote,
}

impl Origin {
    /// A peer is local if it's on loopback or is this host's own audit address.
    pub fn of(peer: &SocketAddr, host: IpAddr) -> Origin {
        if peer.ip().is_loopback() || peer.ip() == host {
            Origin::Local
        } else {
            Origin::Remote
        }
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Local => write!(f, "local"),
            Origin::Remote => write!(f, "remote"),
        }
    }
}

/// One occasion that produces an audit record.
#[derive(Clone, Debug)]
pub enum Lifecycle<'a> {
    UnrecognisedArgument,
    UnrecognisedArgumentDetail { args: &'a [String] },
    Bound { addr: SocketAddr },
    Accepted { peer: SocketAddr, origin: Origin },
    Received { peer: SocketAddr, payload: &'a [u8] },
    Echoed { peer: SocketAddr, count: usize },
    ShutdownRequested,
    ShutdownSignal { signum: i32 },
}

impl<'a> Lifecycle<'a> {
    pub fn severity(&self) -> Severity {
        match self {
            Lifecycle::UnrecognisedArgument => Severity::Err,
            Lifecycle::UnrecognisedArgumentDetail { .. } => Severity::Debug,
            Lifecycle::Bound { .. } => Severity::Info,
            Lifecycle::Accepted { .. } => Severity::Info,
            Lifecycle::Received { .. } => Severity::Debug,
            Lifecycle::Echoed { .. } => Severity::Info,
            Lifecycle::ShutdownRequested => Severity::Warn,
            Lifecycle::ShutdownSignal { .. } => Severity::Debug,
        }
    }
    pub fn msgid(&self) -> MsgId {
        match self {
            Lifecycle::Echoed { .. } => MsgId::TcpOut,
            _ => MsgId::TcpIn,
        }
    }
    pub fn message(&self) -> String {
        match self {
            Lifecycle::UnrecognisedArgument => "Unrecognised program argument!".to_string(),
            Lifecycle::UnrecognisedArgumentDetail { args } => {
                format!("Detected unhandled argument: {:?}", args)
            }
            Lifecycle::Bound { addr } => {
                format!("Server was bound to {} at {}", addr.ip(), addr.port())
            }
            Lifecycle::Accepted { peer, origin } => {
                format!("Accepted {} connection from {}", origin, peer)
            }
            Lifecycle::Received { peer, payload } => format!(
                "Received {} bytes from {}: {}",
                payload.len(),
                peer,
                String::from_utf8_lossy(payload).escape_debug()
            ),
            Lifecycle::Echoed { peer, count } => format!("Echoed {} bytes to {}", count, peer),
            Lifecycle::ShutdownRequested => "Program execution ended".to_string(),
            Lifecycle::ShutdownSignal { signum } => {
                format!("Signal handler called with signal {}", signum)
            }
        }
    }
    /// Build the record for this occasion.
    pub fn record<'c>(&self, context: &'c Context) -> Record<'c> {
        Record::new(context, self.severity(), self.msgid(), self.message())
    }
}

#[cfg(test)]
mod test {

    use super::*;

    fn peer() -> SocketAddr {
        "192.168.180.20:50312".parse().unwrap()
    }

    #[test]
    fn start_and_stop_taxonomy() {
        let args = vec!["foo".to_string(), "--bar".to_string()];
        let cases = [
            (
                Lifecycle::UnrecognisedArgument,
                Severity::Err,
                "Unrecognised program argument!".to_string(),
            ),
            (
                Lifecycle::UnrecognisedArgumentDetail { args: &args },
                Severity::Debug,
                "Detected unhandled argument: [\"foo\", \"--bar\"]".to_string(),
            ),
            (
                Lifecycle::Bound {
                    addr: "0.0.0.0:12346".parse().unwrap(),
                },
                Severity::Info,
                "Server was bound to 0.0.0.0 at 12346".to_string(),
            ),
            (
                Lifecycle::ShutdownRequested,
                Severity::Warn,
                "Program execution ended".to_string(),
            ),
            (
                Lifecycle::ShutdownSignal { signum: 2 },
                Severity::Debug,
                "Signal handler called with signal 2".to_string(),
            ),
        ];
        for (event, severity, message) in cases {
            assert_eq!(event.severity(), severity);
            // None of these came in over the wire, but they are tagged inbound all the same
            assert_eq!(event.msgid(), MsgId::TcpIn);
            assert_eq!(event.message(), message);
        }
    }

    #[test]
    fn connection_events() {
        let accepted = Lifecycle::Accepted {
            peer: peer(),
            origin: Origin::Remote,
        };
        assert_eq!(accepted.severity(), Severity::Info);
        assert_eq!(accepted.msgid(), MsgId::TcpIn);
        assert_eq!(
            accepted.message(),
            "Accepted remote connection from 192.168.180.20:50312"
        );

        let received = Lifecycle::Received {
            peer: peer(),
            payload: b"hi\n",
        };
        assert_eq!(received.severity(), Severity::Debug);
        assert_eq!(
            received.message(),
            "Received 3 bytes from 192.168.180.20:50312: hi\\n"
        );

        let echoed = Lifecycle::Echoed {
            peer: peer(),
            count: 3,
        };
        assert_eq!(echoed.msgid(), MsgId::TcpOut);
        assert_eq!(echoed.message(), "Echoed 3 bytes to 192.168.180.20:50312");
    }

    #[test]
    fn origin() {
        let host: IpAddr = "10.0.0.5".parse().unwrap();
        assert_eq!(
            Origin::of(&"127.0.0.1:4000".parse().unwrap(), host),
            Origin::Local
        );
        assert_eq!(
            Origin::of(&"10.0.0.5:4000".parse().unwrap(), host),
            Origin::Local
        );
        assert_eq!(Origin::of(&peer(), host), Origin::Remote);
    }

    #[test]
    fn records_take_identity_from_context() {
        let ctx = Context::new("10.0.0.5".parse().unwrap(), "alice", 4321);
        let rec = Lifecycle::ShutdownRequested.record(&ctx);
        assert_eq!(rec.priority(), 12);
        assert_eq!(rec.context().pid(), 4321);
        assert_eq!(rec.message(), "Program execution ended");
    }
}
