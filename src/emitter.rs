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

//! The audit emitter.
//!
//! [`Emitter`] is parameterized by the two steps it strings together: a [`Formatter`] & a
//! [`Sink`]. Its threshold is fixed when it's built.

use crate::{
    error::Result,
    facility::Severity,
    formatter::Formatter,
    record::Record,
    transport::Sink,
};

pub struct Emitter<F: Formatter, S: Sink> {
    threshold: Severity,
    formatter: F,
    sink: S,
}

impl<F: Formatter, S: Sink> Emitter<F, S> {
    pub fn new(threshold: Severity, formatter: F, sink: S) -> Emitter<F, S> {
        Emitter {
            threshold,
            formatter,
            sink,
        }
    }
    pub fn threshold(&self) -> Severity {
        self.threshold
    }
    pub fn enabled(&self, severity: Severity) -> bool {
        severity >= self.threshold
    }
    /// Format `record` & append it to the sink, unless it's below our threshold, in which case
    /// this is a no-op.
    ///
    /// Formatting & sink errors are handed back to the caller as-is; there is no retry.
    pub fn emit(&self, record: &Record<'_>) -> Result<()> {
        if !self.enabled(record.severity()) {
            return Ok(());
        }
        let line = self.formatter.format(record)?;
        self.sink.send(&*line)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A sink that keeps everything in memory, for tests across the crate.

    use super::*;

    use crate::{
        context::Context,
        error::{Error, Result},
        rfc5424::Rfc5424,
    };

    use backtrace::Backtrace;

    use std::{cell::RefCell, rc::Rc};

    #[derive(Clone, Default)]
    pub struct MemorySink {
        lines: Rc<RefCell<Vec<String>>>,
        broken: bool,
    }

    impl MemorySink {
        pub fn broken() -> MemorySink {
            MemorySink {
                lines: Rc::default(),
                broken: true,
            }
        }
        pub fn lines(&self) -> Vec<String> {
            self.lines.borrow().clone()
        }
    }

    impl Sink for MemorySink {
        fn send(&self, buf: &[u8]) -> Result<usize> {
            if self.broken {
                return Err(Error::Sink {
                    source: Box::new(std::io::Error::new(
                        std::io::ErrorKind::BrokenPipe,
                        "collector went away",
                    )),
                    back: Backtrace::new(),
                });
            }
            self.lines
                .borrow_mut()
                .push(String::from_utf8_lossy(buf).into_owned());
            Ok(buf.len())
        }
    }

    pub fn formatter() -> Rfc5424 {
        Rfc5424::builder()
            .source_as_string("audit-echo".to_string())
            .unwrap()
            .build()
            .unwrap()
    }

    pub fn context() -> Context {
        Context::new("10.0.0.5".parse().unwrap(), "alice", 4321)
    }

    /// The PRI values, in order, of every line the sink has seen
    pub fn priorities(sink: &MemorySink) -> Vec<u8> {
        sink.lines()
            .iter()
            .map(|line| {
                let end = line.find('>').unwrap();
                line[1..end].parse().unwrap()
            })
            .collect()
    }
}
