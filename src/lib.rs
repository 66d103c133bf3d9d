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

//! This crate generates and parses 64-bit snowflake IDs for applications that run as several cooperating workers and
//! processes.
//!
//! A snowflake packs a timestamp (milliseconds since the first millisecond of 2015), a worker ID, a process ID, and a
//! sequence number into a single `u64`. Every process generates snowflakes with its own worker and process ID, so
//! instances don't need to coordinate with each other as long as no two of them share the same pair of IDs (modulo
//! 32). Within a process, the sequence number distinguishes snowflakes generated in the same millisecond. Once 4096
//! snowflakes were generated in a millisecond, the generator blocks until the clock reaches the next millisecond.
//!
//! Refer to the [`layout`] module for the exact bit layout.
//!
//! # Example
//!
//! ```
//! use snowflake_codec::{construct, GeneratorConfig};
//!
//! // Create one generator per process and share it (it's cheap to clone)
//! let generator = GeneratorConfig::default().with_worker_id(3).build();
//!
//! // Snowflakes are exchanged as decimal strings
//! let id = generator.generate_string().unwrap();
//!
//! // Any process can take the string apart again
//! let record = construct(&id).unwrap();
//! assert_eq!(3, record.worker_id);
//! assert_eq!(std::process::id() % 32, u32::from(record.process_id));
//! assert_eq!(id, record.snowflake.to_string());
//! ```
//!
//! # Crate features
//!
//! * `blocking` (default): [`Generator::generate_blocking`], a generator implementation that uses a mutex.
//! * `lock-free`: [`Generator::generate_lock_free`], a generator implementation based on a CAS loop.
//! * `serde`: (de)serialization of snowflakes as decimal strings and of [`GeneratorConfig`].
//! * `tracing`: trace spans for snowflake generation and events for clock regressions and exhausted milliseconds.

#![warn(missing_docs, missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(not(any(feature = "blocking", feature = "lock-free")))]
compile_error!("you must enable at least one generator implementation (blocking or lock-free)");

mod clock;
mod config;
mod generator;
pub mod layout;
#[cfg(feature = "serde")]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
mod serialize;
mod snowflake;
mod sync;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::GeneratorConfig;
pub use generator::Generator;
pub use snowflake::{Snowflake, SnowflakeRecord};

use std::fmt::{Display, Formatter};

/// Parses the decimal representation of a snowflake and splits it into its components.
///
/// This is a pure function: it doesn't depend on any generator, so it can take apart snowflakes generated by any
/// worker or process.
///
/// # Errors
///
/// Returns [`Error::InvalidFormat`] if the input isn't a decimal integer in the range `2^53..2^64`. Refer to
/// [`Snowflake::parse`] for details.
///
/// # Example
///
/// ```
/// use snowflake_codec::construct;
///
/// let record = construct("175928847299117063").unwrap();
/// assert_eq!(1462015105796, record.timestamp);
/// assert_eq!(1, record.worker_id);
/// assert_eq!(0, record.process_id);
/// assert_eq!(7, record.sequence);
/// ```
pub fn construct(input: &str) -> Result<SnowflakeRecord> {
    Snowflake::parse(input).map(|snowflake| snowflake.deconstruct())
}

/// Errors that can occur when generating or parsing a [`Snowflake`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// An error that occurs if the clock went backwards.
    ///
    /// Generators assume that time is monotonic. It's possible to generate snowflakes again once the clock caught up
    /// with the last generated snowflake, but there's no telling when this will happen.
    ClockRegression,
    /// An error that occurs if the clock reads a time before the snowflake epoch (or before the Unix epoch).
    InvalidEpoch,
    /// An error that occurs if a timestamp exceeds the limits of the underlying data structure.
    ///
    /// Specifically, this error occurs once the time since the epoch doesn't fit into a snowflake's 42 timestamp bits
    /// anymore (in 2154) or if a timestamp can't be represented as a [`SystemTime`](std::time::SystemTime) instance.
    FatalSnowflakeExhaustion,
    /// An error that occurs when something other than a string is passed where a snowflake's decimal representation is
    /// expected.
    InvalidInputType,
    /// An error that occurs when a string isn't the decimal representation of a snowflake.
    ///
    /// Refer to [`Snowflake::parse`] for the accepted format.
    InvalidFormat,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::ClockRegression => {
                write!(f, "can't generate a new snowflake - the clock went backwards")
            }
            Error::InvalidEpoch => {
                write!(f, "the clock is before the snowflake epoch")
            }
            Error::FatalSnowflakeExhaustion => {
                write!(f, "the timestamp can't be represented by the underlying data structure")
            }
            Error::InvalidInputType => {
                write!(f, "expected a string containing a snowflake")
            }
            Error::InvalidFormat => {
                write!(f, "the input is not a valid snowflake (expected a decimal integer above 2^53 - 1)")
            }
        }
    }
}

impl std::error::Error for Error {}

/// The primary result type of this crate.
pub type Result<T> = std::result::Result<T, Error>;

// End skip coverage
