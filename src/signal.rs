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

//! Shutdown requests.
//!
//! The signal handler does exactly one thing: store the signal number. The service loop polls for
//! it through a [`Shutdown`] handle and does all the logging itself, outside of signal context.

use crate::error::{Error, Result};

use backtrace::Backtrace;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

use std::sync::{
    atomic::{AtomicI32, Ordering},
    Arc,
};

/// Signal number of the first pending shutdown request, zero if none.
static PENDING: AtomicI32 = AtomicI32::new(0);

extern "C" fn on_signal(signum: nix::libc::c_int) {
    // Only the first request counts
    let _ = PENDING.compare_exchange(0, signum, Ordering::SeqCst, Ordering::SeqCst);
}

#[derive(Clone)]
enum Flag {
    /// The process-wide flag the signal handler sets
    Process,
    Detached(Arc<AtomicI32>),
}

/// A handle on the process' pending shutdown request.
#[derive(Clone)]
pub struct Shutdown {
    flag: Flag,
}

impl Shutdown {
    /// Route SIGINT & SIGTERM to the shutdown flag.
    ///
    /// Handlers are installed with `SA_RESTART`, so a blocking call in flight when the signal lands
    /// is restarted rather than failing with `EINTR`. Anything waiting on a peer must therefore
    /// wake up periodically & check [`Shutdown::requested`] itself.
    pub fn install() -> Result<Shutdown> {
        let action = SigAction::new(
            SigHandler::Handler(on_signal),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );
        for signal in [Signal::SIGINT, Signal::SIGTERM] {
            // Safety: `on_signal` only touches an atomic, which is async-signal-safe.
            unsafe { sigaction(signal, &action) }.map_err(|err| Error::Signal {
                source: err,
                back: Backtrace::new(),
            })?;
        }
        Ok(Shutdown {
            flag: Flag::Process,
        })
    }
    /// A handle that no signal will ever set; only [`Shutdown::request`] (on it or one of its
    /// clones) can.
    pub fn detached() -> Shutdown {
        Shutdown {
            flag: Flag::Detached(Arc::new(AtomicI32::new(0))),
        }
    }
    fn pending(&self) -> &AtomicI32 {
        match &self.flag {
            Flag::Process => &PENDING,
            Flag::Detached(pending) => pending,
        }
    }
    /// The signal number of the pending request, if any.
    pub fn requested(&self) -> Option<i32> {
        match self.pending().load(Ordering::SeqCst) {
            0 => None,
            signum => Some(signum),
        }
    }
    /// Request shutdown as though `signum` had been delivered.
    pub fn request(&self, signum: i32) {
        let _ = self
            .pending()
            .compare_exchange(0, signum, Ordering::SeqCst, Ordering::SeqCst);
    }
}
