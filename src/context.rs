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

//! Process-wide audit context.
//!
//! Every audit record names the host, the user & the process that produced it. Those three are
//! resolved exactly once, at start-up, into a [`Context`], which is then handed by reference to
//! everything that builds records. Records borrow the context rather than copying out of it, so
//! there is no way for two records of the same process to disagree about who they came from.

use crate::facility::Facility;

use tracing::{debug, warn};

use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs};

/// Identity constants shared by every record of one process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Context {
    host: IpAddr,
    user: String,
    pid: u32,
    facility: Facility,
}

impl Context {
    /// Build a [`Context`] from known values; mostly useful in tests.
    pub fn new(host: IpAddr, user: impl Into<String>, pid: u32) -> Context {
        Context {
            host,
            user: user.into(),
            pid,
            facility: Facility::default(),
        }
    }
    /// Resolve host address, login name & process ID for the running process.
    ///
    /// This cannot fail: each field has a fallback, the last of which is a constant.
    pub fn resolve() -> Context {
        let ctx = Context::new(resolve_host(), resolve_user(), std::process::id());
        debug!(
            "Resolved audit identity: host={} user={} pid={}",
            ctx.host, ctx.user, ctx.pid
        );
        ctx
    }
    pub fn with_facility(mut self, facility: Facility) -> Context {
        self.facility = facility;
        self
    }
    pub fn host(&self) -> IpAddr {
        self.host
    }
    pub fn user(&self) -> &str {
        &self.user
    }
    pub fn pid(&self) -> u32 {
        self.pid
    }
    pub fn facility(&self) -> Facility {
        self.facility
    }
}

/// Figure out an IP address for this host.
///
/// The order of preference is:
///
/// 1. the first IPv4 address our own hostname resolves to
/// 2. whatever [`local_ip_address`] picks from the network interfaces
/// 3. the loopback address
fn resolve_host() -> IpAddr {
    hostname::get()
        .ok()
        .and_then(|hn| hn.into_string().ok())
        .and_then(|hn| (hn.as_str(), 0).to_socket_addrs().ok())
        .and_then(|mut addrs| addrs.find(|addr| addr.is_ipv4()))
        .map(|addr| addr.ip())
        .or_else(|| local_ip_address::local_ip().ok())
        .unwrap_or_else(|| {
            warn!("Couldn't resolve an address for this host; using the loopback address");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        })
}

/// Figure out the login name of the invoking user.
///
/// The environment wins (as it does for `getlogin(3)` in practice), then the password database
/// entry for our real UID. Failing both we fall back to the RFC 5424 NILVALUE.
fn resolve_user() -> String {
    login_from_env(std::env::var("LOGNAME").ok(), std::env::var("USER").ok())
        .or_else(|| {
            nix::unistd::User::from_uid(nix::unistd::getuid())
                .ok()
                .flatten()
                .map(|user| user.name)
        })
        .unwrap_or_else(|| {
            warn!("Couldn't determine the login name of the invoking user");
            "-".to_string()
        })
}

/// `$LOGNAME` if set & non-empty, else `$USER` under the same conditions.
fn login_from_env(logname: Option<String>, user: Option<String>) -> Option<String> {
    logname
        .filter(|name| !name.is_empty())
        .or_else(|| user.filter(|name| !name.is_empty()))
}
