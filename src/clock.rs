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

//! Wall-clock sources for [`Generator`](crate::Generator)s.

use crate::sync::atomic::{AtomicU64, Ordering};
use crate::sync::{Arc, Mutex};
use crate::{Error, Result};
use std::time::SystemTime;

/// A source of the current wall-clock time.
///
/// Generators read the time through this trait, so tests (or applications with their own notion of time) can drive
/// snowflake generation deterministically. The time is the number of milliseconds since the **Unix epoch**; the
/// generator subtracts the snowflake [`EPOCH`](crate::layout::EPOCH) itself.
///
/// Implementations should be cheap, as every generated snowflake reads the clock at least once, and the overflow wait
/// polls it in a loop.
///
/// # Example
///
/// ```
/// use snowflake_codec::{Clock, Generator, GeneratorConfig};
///
/// #[derive(Debug, Clone)]
/// struct FixedClock;
///
/// impl Clock for FixedClock {
///     fn millis_since_unix(&self) -> snowflake_codec::Result<u64> {
///         // One millisecond after the first millisecond of 2015
///         Ok(1420070400001)
///     }
/// }
///
/// let generator = GeneratorConfig::default()
///     .with_worker_id(1)
///     .with_process_id(1)
///     .build_with_clock(FixedClock);
/// assert_eq!(4329472, generator.generate().unwrap().get());
/// ```
pub trait Clock {
    /// Returns the number of milliseconds since the Unix epoch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEpoch`] if the clock reads a time before the Unix epoch.
    fn millis_since_unix(&self) -> Result<u64>;
}

/// The system's wall clock ([`SystemTime::now`]).
///
/// Note that the wall clock isn't monotonic. If it's adjusted backwards, generators return
/// [`Error::ClockRegression`] until the clock caught up with the last generated snowflake.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn millis_since_unix(&self) -> Result<u64> {
        let millis = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_err(|_| Error::InvalidEpoch)?
            .as_millis();
        if millis > u64::MAX as u128 {
            return Err(Error::FatalSnowflakeExhaustion);
        }
        Ok(millis as u64)
    }
}

impl<C> Clock for &C
where
    C: Clock + ?Sized,
{
    #[inline]
    fn millis_since_unix(&self) -> Result<u64> {
        (**self).millis_since_unix()
    }
}

/// A clock that only moves when it's told to.
///
/// This clock is meant for tests that need deterministic timestamps. Clones share the same time, so a test can keep a
/// handle to the clock after passing it to a generator. Besides setting the time directly, the clock can be scheduled
/// to jump to a new time after a number of reads, which lets single-threaded tests observe the overflow wait of a
/// generator.
///
/// # Example
///
/// ```
/// use snowflake_codec::{layout::EPOCH, Clock, ManualClock};
///
/// let clock = ManualClock::new(EPOCH);
/// clock.advance_after(2, EPOCH + 1);
/// assert_eq!(EPOCH, clock.millis_since_unix().unwrap());
/// assert_eq!(EPOCH, clock.millis_since_unix().unwrap());
/// assert_eq!(EPOCH + 1, clock.millis_since_unix().unwrap());
/// assert_eq!(3, clock.reads());
/// ```
#[derive(Debug, Clone)]
pub struct ManualClock {
    time: Arc<AtomicU64>,
    reads: Arc<AtomicU64>,
    // The number of reads left before the clock jumps and the time it jumps to
    scheduled: Arc<Mutex<Option<(u64, u64)>>>,
}

impl ManualClock {
    /// Creates a clock that reads `millis` milliseconds since the Unix epoch.
    pub fn new(millis: u64) -> Self {
        Self {
            time: Arc::new(AtomicU64::new(millis)),
            reads: Arc::new(AtomicU64::new(0)),
            scheduled: Arc::new(Mutex::new(None)),
        }
    }

    /// Sets the current time. This also cancels a jump scheduled with [`advance_after`](Self::advance_after).
    pub fn set(&self, millis: u64) {
        let mut scheduled = self.scheduled.lock().unwrap_or_else(|e| e.into_inner());
        *scheduled = None;
        self.time.store(millis, Ordering::SeqCst);
    }

    /// Moves the clock forward by the given number of milliseconds.
    pub fn advance(&self, millis: u64) {
        self.time.fetch_add(millis, Ordering::SeqCst);
    }

    /// Lets the clock return its current time for `reads` more reads and jump to `millis` afterwards.
    pub fn advance_after(&self, reads: u64, millis: u64) {
        let mut scheduled = self.scheduled.lock().unwrap_or_else(|e| e.into_inner());
        if reads == 0 {
            *scheduled = None;
            self.time.store(millis, Ordering::SeqCst);
        } else {
            *scheduled = Some((reads, millis));
        }
    }

    /// Returns how often this clock has been read.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }
}

impl Clock for ManualClock {
    fn millis_since_unix(&self) -> Result<u64> {
        let mut scheduled = self.scheduled.lock().unwrap_or_else(|e| e.into_inner());
        self.reads.fetch_add(1, Ordering::SeqCst);
        let time = self.time.load(Ordering::SeqCst);
        match *scheduled {
            Some((1, next)) => {
                *scheduled = None;
                self.time.store(next, Ordering::SeqCst);
            }
            Some((remaining, next)) => *scheduled = Some((remaining - 1, next)),
            None => {}
        }
        Ok(time)
    }
}

// End skip coverage
