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

//! Record formatting primitives.
//!
//! This module defines the [`Formatter`] trait.

use crate::{error::Result, record::Record};

use std::ops::Deref;

/// Operations all formatters must support
/// ======================================
///
/// Getting an audit record onto disk (or onto the wire) happens in two parts:
///
/// 1. rendering the [`Record`] to a single line of text
///
/// 2. handing that line to a [`Sink`]
///
/// [`Formatter`] implements step 1. The rendered line carries no terminator; framing is the sink's
/// business.
///
/// # Design
///
/// The associated type `Output` is there so that the thing handed to a [`Sink`] is, by
/// construction, something a [`Formatter`] produced, while still letting the sink treat it as a
/// plain slice of `u8`.
///
/// [`Sink`]: crate::transport::Sink
pub trait Formatter {
    type Output: Deref<Target = [u8]>;
    fn format(&self, record: &Record<'_>) -> Result<Self::Output>;
}
