/*
 * Copyright © 2023 Archer <archer@nefarious.dev>
 * Licensed under the Apache License, Version 2.0 (the "Licence");
 * you may not use this file except in compliance with the Licence.
 * You may obtain a copy of the Licence at
 *     https://www.apache.org/licenses/LICENSE-2.0
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the Licence is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the Licence for the specific language governing permissions and
 * limitations under the Licence.
 */

//! The [`Snowflake`] value type and its textual representation.

use crate::layout::{self, EPOCH, MAX_SAFE_INTEGER};
use crate::{Error, Result};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::{Duration, SystemTime};

/// A snowflake ID.
///
/// Snowflakes are timestamps combined with a worker ID, a process ID, and a sequence number. They are meant to provide
/// IDs that are
/// * unique (no snowflake will be generated twice by the same worker and process)
/// * and roughly ordered by their creation time.
///
/// Refer to the [`layout`] module for the exact composition.
///
/// # Textual representation
///
/// Snowflakes exceed the range of integers that 64-bit floats represent exactly, so they're exchanged as decimal
/// strings. [`Display`] produces this representation, and [`Snowflake::parse`] (or [`FromStr`]) reads it back.
///
/// # Example
///
/// ```
/// use snowflake_codec::Snowflake;
///
/// let snowflake: Snowflake = "175928847299117063".parse().unwrap();
/// assert_eq!(1462015105796, snowflake.get_unix_millis());
/// assert_eq!(1, snowflake.get_worker_id());
/// assert_eq!(0, snowflake.get_process_id());
/// assert_eq!(7, snowflake.get_sequence_number());
/// assert_eq!("175928847299117063", snowflake.to_string());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Snowflake {
    inner: u64,
}

impl Snowflake {
    /// Returns the snowflake for the given integer representation.
    ///
    /// Every 64-bit integer is a valid snowflake, so unlike [`parse`](Self::parse), this doesn't reject small values.
    #[inline]
    pub const fn from_raw(input: u64) -> Self {
        Self { inner: input }
    }

    /// Parses the decimal representation of a snowflake.
    ///
    /// The input must consist of ASCII digits only (no sign, whitespace, or radix prefix) and fit into 64 bits.
    /// Moreover, values up to [`MAX_SAFE_INTEGER`] are rejected: such small integers aren't produced by generators in
    /// practice, so they most likely aren't genuine snowflakes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFormat`] if any of the requirements above isn't met.
    ///
    /// # Example
    ///
    /// ```
    /// use snowflake_codec::{Error, Snowflake};
    ///
    /// assert!(Snowflake::parse("175928847299117063").is_ok());
    /// assert!(matches!(Snowflake::parse("abc"), Err(Error::InvalidFormat)));
    /// assert!(matches!(Snowflake::parse("42"), Err(Error::InvalidFormat)));
    /// assert!(matches!(Snowflake::parse("-175928847299117063"), Err(Error::InvalidFormat)));
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        // `u64::from_str` also accepts a leading `+`, which isn't part of our format
        if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidFormat);
        }
        let inner = input.parse::<u64>().map_err(|_| Error::InvalidFormat)?;
        if inner <= MAX_SAFE_INTEGER {
            return Err(Error::InvalidFormat);
        }
        Ok(Self { inner })
    }

    /// Returns the integer representation of this snowflake.
    #[inline]
    pub fn get(&self) -> u64 {
        self.inner
    }

    /// Returns the timestamp of this snowflake's birth.
    ///
    /// If the time can't be represented with a `SystemTime` instance, [`Error::FatalSnowflakeExhaustion`] is returned
    /// instead. With a 42-bit timestamp, this only happens on platforms with a very limited `SystemTime` range.
    pub fn get_timestamp(&self) -> Result<SystemTime> {
        SystemTime::UNIX_EPOCH
            .checked_add(Duration::from_millis(self.get_unix_millis()))
            .ok_or(Error::FatalSnowflakeExhaustion)
    }

    /// Returns the number of milliseconds since the snowflake [`EPOCH`].
    #[inline]
    pub fn get_timestamp_raw(&self) -> u64 {
        layout::get_timestamp(self.inner)
    }

    /// Returns the number of milliseconds since the Unix epoch.
    ///
    /// A 42-bit timestamp plus the epoch always fits into 64 bits, so this can't overflow.
    #[inline]
    pub fn get_unix_millis(&self) -> u64 {
        self.get_timestamp_raw() + EPOCH
    }

    /// Returns the ID (0-31) of the worker that generated this snowflake.
    #[inline]
    pub fn get_worker_id(&self) -> u8 {
        layout::get_worker_id(self.inner) as u8
    }

    /// Returns the ID (0-31) of the process that generated this snowflake.
    #[inline]
    pub fn get_process_id(&self) -> u8 {
        layout::get_process_id(self.inner) as u8
    }

    /// Returns this snowflake's sequence number (0-4095).
    ///
    /// A sequence number of `n` means that this is the `n + 1`th snowflake generated by its process for this
    /// millisecond.
    #[inline]
    pub fn get_sequence_number(&self) -> u16 {
        layout::get_sequence_number(self.inner) as u16
    }

    /// Splits this snowflake into its individual components.
    pub fn deconstruct(&self) -> SnowflakeRecord {
        SnowflakeRecord {
            snowflake: *self,
            timestamp: self.get_unix_millis(),
            worker_id: self.get_worker_id(),
            process_id: self.get_process_id(),
            sequence: self.get_sequence_number(),
        }
    }
}

impl Display for Snowflake {
    /// Displays the snowflake as a decimal-encoded integer.
    ///
    /// You can losslessly convert this method's output back into the same snowflake.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl FromStr for Snowflake {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for Snowflake {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<Snowflake> for u64 {
    #[inline]
    fn from(snowflake: Snowflake) -> Self {
        snowflake.inner
    }
}

/// The individual components of a [`Snowflake`].
///
/// Use [`construct`](crate::construct) to obtain a record from a snowflake's decimal representation, or
/// [`Snowflake::deconstruct`] if you already have a snowflake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SnowflakeRecord {
    /// The snowflake these components were read from.
    pub snowflake: Snowflake,
    /// The snowflake's timestamp in milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// The worker ID (0-31).
    pub worker_id: u8,
    /// The process ID (0-31).
    pub process_id: u8,
    /// The sequence number (0-4095).
    pub sequence: u16,
}

// End skip coverage
