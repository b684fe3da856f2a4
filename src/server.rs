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

//! The network service loop.
//!
//! One connection at a time: accept, read once (at most [`MAX_READ`] bytes), write those bytes
//! back, close. Socket failures are not caught here; they end the loop & go back to the caller.

use crate::{
    context::Context,
    emitter::Emitter,
    error::{Error, Result},
    events::{Lifecycle, Origin},
    formatter::Formatter,
    signal::Shutdown,
    transport::Sink,
};

use backtrace::Backtrace;
use nix::sys::socket::{
    bind, listen as nix_listen, setsockopt, socket, sockopt, AddressFamily, Backlog, SockFlag,
    SockType, SockaddrIn, SockaddrIn6,
};
use tracing::{debug, info};

use std::{
    io::{ErrorKind, Read, Write},
    net::{SocketAddr, TcpListener, TcpStream},
    os::fd::AsRawFd,
    time::Duration,
};

/// The most we'll read from a client in one exchange.
pub const MAX_READ: usize = 1024;

/// How long to sleep between accept attempts when nobody's knocking.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn socket_error(err: nix::Error) -> Error {
    Error::Socket {
        source: err,
        back: Backtrace::new(),
    }
}

/// Bind a listening TCP socket to `addr` with an explicit `backlog`.
///
/// [`TcpListener::bind`] always asks for a backlog of 128, so the socket is built with [`nix`] &
/// handed to std afterwards.
pub fn listen(addr: SocketAddr, backlog: i32) -> Result<TcpListener> {
    let family = match addr {
        SocketAddr::V4(_) => AddressFamily::Inet,
        SocketAddr::V6(_) => AddressFamily::Inet6,
    };
    let fd = socket(family, SockType::Stream, SockFlag::SOCK_CLOEXEC, None).map_err(socket_error)?;
    setsockopt(&fd, sockopt::ReuseAddr, &true).map_err(socket_error)?;
    let bound = match addr {
        SocketAddr::V4(v4) => bind(fd.as_raw_fd(), &SockaddrIn::from(v4)),
        SocketAddr::V6(v6) => bind(fd.as_raw_fd(), &SockaddrIn6::from(v6)),
    };
    bound.map_err(socket_error)?;
    nix_listen(&fd, Backlog::new(backlog).map_err(socket_error)?).map_err(socket_error)?;
    Ok(TcpListener::from(fd))
}

/// Service connections on `listener` until shutdown is requested.
///
/// Returns the number of the signal that ended the loop. The shutdown records themselves are the
/// caller's business.
pub fn serve<F: Formatter, S: Sink>(
    listener: &TcpListener,
    emitter: &Emitter<F, S>,
    context: &Context,
    shutdown: &Shutdown,
) -> Result<i32> {
    listener.set_nonblocking(true)?;
    loop {
        if let Some(signum) = shutdown.requested() {
            debug!("Shutdown requested by signal {}", signum);
            return Ok(signum);
        }
        match listener.accept() {
            Ok((stream, peer)) => echo(stream, peer, emitter, context, shutdown)?,
            Err(err)
                if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::Interrupted =>
            {
                std::thread::sleep(POLL_INTERVAL)
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// One exchange with one client.
///
/// The single read is made in [`POLL_INTERVAL`] slices so that a client that connects & then says
/// nothing can't hold up shutdown; if shutdown is requested before anything arrives, the
/// connection is closed without a reply.
fn echo<F: Formatter, S: Sink>(
    mut stream: TcpStream,
    peer: SocketAddr,
    emitter: &Emitter<F, S>,
    context: &Context,
    shutdown: &Shutdown,
) -> Result<()> {
    // Accepted sockets may inherit O_NONBLOCK from the listener on some platforms
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(POLL_INTERVAL))?;

    let origin = Origin::of(&peer, context.host());
    info!("Accepted {} connection from {}", origin, peer);
    emitter.emit(&Lifecycle::Accepted { peer, origin }.record(context))?;

    let mut buf = [0u8; MAX_READ];
    let count = loop {
        match stream.read(&mut buf) {
            Ok(count) => break count,
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) =>
            {
                if shutdown.requested().is_some() {
                    debug!("Hanging up on {} unanswered; shutting down", peer);
                    return Ok(());
                }
            }
            Err(err) => return Err(err.into()),
        }
    };
    let payload = &buf[..count];
    debug!("{:?}", String::from_utf8_lossy(payload));
    emitter.emit(&Lifecycle::Received { peer, payload }.record(context))?;

    stream.write_all(payload)?;
    emitter.emit(&Lifecycle::Echoed { peer, count }.record(context))?;
    Ok(())
}

#[cfg(test)]
mod test {

    use super::*;

    use crate::{
        emitter::testing::{context, formatter, priorities, MemorySink},
        facility::Severity,
    };

    use std::thread;

    fn loopback() -> TcpListener {
        listen("127.0.0.1:0".parse().unwrap(), 5).unwrap()
    }

    /// Connect to `addr`, send `msg` & return whatever comes back before the server hangs up.
    fn exchange(addr: SocketAddr, msg: Vec<u8>) -> Vec<u8> {
        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(&msg).unwrap();
        let mut reply = Vec::new();
        client.read_to_end(&mut reply).unwrap();
        reply
    }

    #[test]
    fn echoes_then_shuts_down() {
        let listener = loopback();
        let addr = listener.local_addr().unwrap();
        let shutdown = Shutdown::detached();
        let flag = shutdown.clone();

        let client = thread::spawn(move || {
            let reply = exchange(addr, b"hello, world\n".to_vec());
            flag.request(15);
            reply
        });

        let ctx = context();
        let sink = MemorySink::default();
        let emitter = Emitter::new(Severity::Debug, formatter(), sink.clone());
        assert_eq!(serve(&listener, &emitter, &ctx, &shutdown).unwrap(), 15);
        assert_eq!(client.join().unwrap(), b"hello, world\n");

        // accepted (info), received (debug), echoed (info)
        assert_eq!(priorities(&sink), vec![14, 15, 14]);
        let lines = sink.lines();
        assert!(lines[0].contains(" TCPIN ") && lines[0].contains("Accepted local connection"));
        assert!(lines[1].contains("Received 13 bytes from 127.0.0.1:"));
        assert!(lines[2].contains(" TCPOUT ") && lines[2].contains("Echoed 13 bytes to 127.0.0.1:"));
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn echoes_a_full_read() {
        let listener = loopback();
        let addr = listener.local_addr().unwrap();
        let shutdown = Shutdown::detached();
        let flag = shutdown.clone();

        let msg = pattern(MAX_READ);
        let sent = msg.clone();
        let client = thread::spawn(move || {
            let reply = exchange(addr, msg);
            flag.request(2);
            reply
        });

        let ctx = context();
        let sink = MemorySink::default();
        let emitter = Emitter::new(Severity::Info, formatter(), sink.clone());
        serve(&listener, &emitter, &ctx, &shutdown).unwrap();
        assert_eq!(client.join().unwrap(), sent);
        // accepted & echoed; received is debug
        let lines = sink.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("Echoed 1024 bytes to 127.0.0.1:"));
    }

    #[test]
    fn reads_at_most_max_read() {
        let listener = loopback();
        let addr = listener.local_addr().unwrap();
        let shutdown = Shutdown::detached();
        let flag = shutdown.clone();

        // One byte more than the server will take, & the write half left open
        let msg = pattern(MAX_READ + 1);
        let expected = msg[..MAX_READ].to_vec();
        let client = thread::spawn(move || {
            let mut client = TcpStream::connect(addr).unwrap();
            client
                .set_read_timeout(Some(Duration::from_secs(5)))
                .unwrap();
            client.write_all(&msg).unwrap();
            let mut reply = vec![0u8; MAX_READ];
            client.read_exact(&mut reply).unwrap();
            // Then nothing: the server has hung up (possibly with a reset, given the byte it
            // never read)
            let mut rest = [0u8; 16];
            let extra = client.read(&mut rest).unwrap_or(0);
            flag.request(2);
            (reply, extra)
        });

        let ctx = context();
        let emitter = Emitter::new(Severity::Info, formatter(), MemorySink::default());
        serve(&listener, &emitter, &ctx, &shutdown).unwrap();
        let (reply, extra) = client.join().unwrap();
        assert_eq!(reply, expected);
        assert_eq!(extra, 0);
    }

    #[test]
    fn silent_client_does_not_block_shutdown() {
        let listener = loopback();
        let addr = listener.local_addr().unwrap();
        let shutdown = Shutdown::detached();
        let flag = shutdown.clone();

        // Connected before the server starts, so the first accept finds it waiting
        let mut idle = TcpStream::connect(addr).unwrap();
        let client = thread::spawn(move || {
            thread::sleep(Duration::from_millis(300));
            flag.request(2);
            let mut reply = Vec::new();
            let _ = idle.read_to_end(&mut reply);
            reply
        });

        let ctx = context();
        let sink = MemorySink::default();
        let emitter = Emitter::new(Severity::Debug, formatter(), sink.clone());
        assert_eq!(serve(&listener, &emitter, &ctx, &shutdown).unwrap(), 2);
        // Hung up on without a reply: accepted, but never received or echoed
        assert!(client.join().unwrap().is_empty());
        assert_eq!(priorities(&sink), vec![14]);
        assert!(sink.lines()[0].contains("Accepted local connection"));
    }

    #[test]
    fn pending_shutdown_stops_before_accepting() {
        let listener = loopback();
        let shutdown = Shutdown::detached();
        shutdown.request(2);
        let sink = MemorySink::default();
        let emitter = Emitter::new(Severity::Debug, formatter(), sink.clone());
        assert_eq!(serve(&listener, &emitter, &context(), &shutdown).unwrap(), 2);
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn backlog_listener_is_usable() {
        let listener = loopback();
        let addr = listener.local_addr().unwrap();
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
        // The address is in use now
        assert!(listen(addr, 5).is_err());
    }
}
