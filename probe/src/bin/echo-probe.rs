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

//! Send one message to a running audit-echo server & check that it comes back unchanged.

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use std::{
    io::{Read, Write},
    net::TcpStream,
};

/// The server reads at most this much per connection.
const MAX_ECHO: usize = 1024;

#[derive(Parser, Debug)]
#[command(name = "echo-probe")]
struct Args {
    /// Server address
    #[arg(long, default_value = "127.0.0.1:12346")]
    server: String,

    /// Message to send
    #[arg(default_value = "你好, TCP socket.")]
    message: String,
}

pub fn main() {
    let args = Args::parse();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut stream = match TcpStream::connect(&args.server) {
        Ok(stream) => stream,
        Err(err) => {
            error!("Couldn't connect to {}: {}", args.server, err);
            std::process::exit(2);
        }
    };
    let sent = args.message.as_bytes();
    let mut reply = Vec::new();
    if let Err(err) = stream
        .write_all(sent)
        .and_then(|_| stream.read_to_end(&mut reply))
    {
        error!("Exchange with {} failed: {}", args.server, err);
        std::process::exit(2);
    }

    let expected = &sent[..sent.len().min(MAX_ECHO)];
    if reply == expected {
        info!("{} echoed {} bytes", args.server, reply.len());
    } else {
        error!(
            "{} echoed {:?}; expected {:?}",
            args.server,
            String::from_utf8_lossy(&reply),
            String::from_utf8_lossy(expected)
        );
        std::process::exit(1);
    }
}
