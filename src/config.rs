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

//! Start-up configuration.
//!
//! [`Config`] is assembled once from the command line and never changes afterwards.

use crate::{
    cli::{Cli, DEFAULT_LOG_FILE},
    error::Result,
    facility::Severity,
    rfc5424::{Rfc5424, DEFAULT_DATE_TEMPLATE, DEFAULT_LINE_TEMPLATE},
    transport::{FileSink, Sink, TcpSink},
};

use std::{
    net::{SocketAddr, SocketAddrV4},
    path::PathBuf,
};

/// Pending connections the kernel will queue before refusing new ones.
pub const BACKLOG: i32 = 5;

/// Where audit lines go.
#[derive(Clone, Debug, PartialEq)]
pub enum SinkConfig {
    File(PathBuf),
    Collector(String),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub threshold: Severity,
    pub sink: SinkConfig,
    pub line_template: String,
    pub date_template: String,
    pub bind: SocketAddr,
    pub backlog: i32,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Config {
        Config {
            threshold: if cli.verbose {
                Severity::Debug
            } else {
                Severity::Info
            },
            sink: match (&cli.collector, &cli.log_file) {
                (Some(addr), _) => SinkConfig::Collector(addr.clone()),
                (None, Some(path)) => SinkConfig::File(path.clone()),
                (None, None) => SinkConfig::File(PathBuf::from(DEFAULT_LOG_FILE)),
            },
            line_template: cli
                .line_format
                .clone()
                .unwrap_or_else(|| DEFAULT_LINE_TEMPLATE.to_string()),
            date_template: cli
                .date_format
                .clone()
                .unwrap_or_else(|| DEFAULT_DATE_TEMPLATE.to_string()),
            bind: SocketAddr::V4(SocketAddrV4::new(cli.bind, cli.port)),
            backlog: BACKLOG,
        }
    }
    /// Same configuration, different threshold.
    pub fn with_threshold(mut self, threshold: Severity) -> Config {
        self.threshold = threshold;
        self
    }
    pub fn formatter(&self) -> Result<Rfc5424> {
        Rfc5424::builder()
            .line_template(self.line_template.as_str())
            .date_template(self.date_template.as_str())
            .build()
    }
    /// Open (or connect to) the configured sink.
    pub fn open_sink(&self) -> Result<Box<dyn Sink>> {
        Ok(match &self.sink {
            SinkConfig::File(path) => Box::new(FileSink::new(path)?),
            SinkConfig::Collector(addr) => Box::new(TcpSink::new(addr.as_str())?),
        })
    }
}

#[cfg(test)]
mod test {

    use super::*;

    use crate::cli::Invocation;

    fn config(args: &[&str]) -> Config {
        let inv =
            Invocation::try_parse_from(std::iter::once("audit-echo").chain(args.iter().copied()))
                .unwrap();
        Config::from_cli(&inv.cli)
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]);
        assert_eq!(cfg.threshold, Severity::Info);
        assert_eq!(cfg.sink, SinkConfig::File(PathBuf::from("/var/log/testLog")));
        assert_eq!(cfg.bind.to_string(), "0.0.0.0:12346");
        assert_eq!(cfg.backlog, 5);
        assert_eq!(cfg.line_template, DEFAULT_LINE_TEMPLATE);
        assert_eq!(cfg.date_template, DEFAULT_DATE_TEMPLATE);
    }

    #[test]
    fn overrides() {
        let cfg = config(&[
            "-v",
            "--collector",
            "127.0.0.1:514",
            "--bind",
            "127.0.0.1",
            "--port",
            "0",
            "--date-format",
            "%s",
        ]);
        assert_eq!(cfg.threshold, Severity::Debug);
        assert_eq!(cfg.sink, SinkConfig::Collector("127.0.0.1:514".to_string()));
        assert_eq!(cfg.bind.to_string(), "127.0.0.1:0");
        assert_eq!(cfg.date_template, "%s");
        assert_eq!(
            cfg.clone().with_threshold(Severity::Info).threshold,
            Severity::Info
        );
    }

    #[test]
    fn opens_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let cfg = config(&["--log-file", path.to_str().unwrap()]);
        let sink = cfg.open_sink().unwrap();
        sink.send(b"hello").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
    }
}
