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

//! The thread-safe snowflake [`Generator`].

use crate::layout::{self, EPOCH, ID_MODULUS};
#[cfg(feature = "lock-free")]
use crate::sync::atomic::{self, AtomicU64};
use crate::sync::Arc;
#[cfg(feature = "blocking")]
use crate::sync::Mutex;
use crate::{sync, Clock, Error, GeneratorConfig, Result, Snowflake, SystemClock};
use std::cmp;
use std::time::Duration;
#[cfg(feature = "tracing")]
use tracing::instrument;

/// A thread-safe snowflake generator.
///
/// A generator owns the counter state of one snowflake-generating instance: the timestamp and sequence number of the
/// last snowflake it generated. Cloning a generator is cheap and the clone *shares* this state, so the usual setup is
/// to create a single generator at start-up and hand clones of it to every part of your application that needs IDs.
/// Two independent generators with the same worker and process ID will generate colliding snowflakes.
///
/// # Example
///
/// ```
/// use snowflake_codec::Generator;
/// use std::thread;
///
/// let generator = Generator::new(1, 7);
/// let res1 = {
///     let generator = generator.clone();
///     thread::spawn(move || generator.generate().unwrap())
/// };
/// let res2 = {
///     let generator = generator.clone();
///     thread::spawn(move || generator.generate().unwrap())
/// };
/// let (a, b) = (res1.join().unwrap(), res2.join().unwrap());
/// assert_ne!(a, b);
/// assert_eq!((1, 7), (a.get_worker_id(), a.get_process_id()));
/// ```
#[derive(Debug, Clone)]
pub struct Generator<C = SystemClock>
where
    C: Clock,
{
    // We use the regular `Mutex` from the standard library here, as we don't need to hold it across any await points.
    #[cfg(feature = "blocking")]
    last_snowflake_blocking: Arc<Mutex<u64>>,
    #[cfg(feature = "lock-free")]
    last_snowflake_atomic: Arc<AtomicU64>,
    worker_id: u64,
    process_id: u64,
    poll_interval: Option<Duration>,
    clock: C,
}

impl Generator<SystemClock> {
    /// Creates a generator for the given worker and process ID that reads the system clock.
    ///
    /// Both IDs are reduced modulo 32. Use [`GeneratorConfig`] for more control over the generator.
    pub fn new(worker_id: u64, process_id: u64) -> Self {
        GeneratorConfig::default()
            .with_worker_id(worker_id)
            .with_process_id(process_id)
            .build()
    }
}

impl<C> Generator<C>
where
    C: Clock,
{
    /// Creates a generator from the given configuration and clock.
    ///
    /// The generator starts as if it had generated the raw snowflake `0`. If the clock is in the first millisecond of
    /// the epoch, the first snowflake will therefore have the sequence number `1`.
    pub fn with_config(config: GeneratorConfig, clock: C) -> Self {
        Self {
            #[cfg(feature = "blocking")]
            last_snowflake_blocking: Arc::new(Mutex::new(0)),
            #[cfg(feature = "lock-free")]
            last_snowflake_atomic: Arc::new(AtomicU64::new(0)),
            worker_id: config.worker_id % ID_MODULUS,
            process_id: config.process_id % ID_MODULUS,
            poll_interval: config.poll_interval,
            clock,
        }
    }

    /// Returns the worker ID (already reduced modulo 32) included in this generator's snowflakes.
    #[inline]
    pub fn worker_id(&self) -> u8 {
        self.worker_id as u8
    }

    /// Returns the process ID (already reduced modulo 32) included in this generator's snowflakes.
    #[inline]
    pub fn process_id(&self) -> u8 {
        self.process_id as u8
    }

    /// Returns the clock this generator reads.
    #[inline]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Generates a new snowflake.
    ///
    /// This uses the *blocking* implementation if the `blocking` feature is enabled and the *lock-free* implementation
    /// otherwise. Both provide the same guarantees, so you can switch between them by changing crate features without
    /// touching code that calls this method.
    ///
    /// # Errors
    ///
    /// Refer to [`generate_blocking`](Self::generate_blocking).
    #[cfg(feature = "blocking")]
    #[inline]
    pub fn generate(&self) -> Result<Snowflake> {
        self.generate_blocking()
    }

    /// Generates a new snowflake.
    ///
    /// This uses the *lock-free* implementation, as the `blocking` feature is disabled.
    ///
    /// # Errors
    ///
    /// Refer to [`generate_lock_free`](Self::generate_lock_free).
    #[cfg(all(feature = "lock-free", not(feature = "blocking")))]
    #[inline]
    pub fn generate(&self) -> Result<Snowflake> {
        self.generate_lock_free()
    }

    /// Generates a new snowflake and returns its decimal representation.
    ///
    /// # Errors
    ///
    /// Refer to [`generate`](Self::generate).
    pub fn generate_string(&self) -> Result<String> {
        self.generate().map(|snowflake| snowflake.to_string())
    }

    /// Generates a new snowflake while holding a lock on the generator's state.
    ///
    /// Within this generator (and its clones), every returned snowflake is unique, and snowflakes returned later are
    /// larger. If 4096 snowflakes were already generated in the current millisecond, this method blocks until the clock
    /// reaches the next millisecond. Other callers wait for the lock in the meantime.
    ///
    /// # Errors
    ///
    /// If the clock went backwards (before or during the wait for the next millisecond), this returns
    /// [`Error::ClockRegression`]. If the clock is before the snowflake epoch, this returns [`Error::InvalidEpoch`]. If
    /// the timestamp doesn't fit into 42 bits anymore, this returns [`Error::FatalSnowflakeExhaustion`]. Unlike the
    /// other errors, this one means that the generator won't be able to generate snowflakes in the future.
    #[cfg(feature = "blocking")]
    #[cfg_attr(docsrs, doc(cfg(feature = "blocking")))]
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn generate_blocking(&self) -> Result<Snowflake> {
        // The guarded value is a plain integer that's only replaced in one step, so it's consistent even if another
        // thread panicked while holding the lock
        let mut last_snowflake = self
            .last_snowflake_blocking
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        // Acquire the timestamp *after* we got the lock to be more accurate about our clock regression errors
        let snowflake = self.next_snowflake(*last_snowflake)?;
        *last_snowflake = snowflake;
        Ok(Snowflake::from_raw(snowflake))
    }

    /// Generates a new snowflake using a lock-free algorithm.
    ///
    /// This method provides the same guarantees as [`generate_blocking`](Self::generate_blocking). If 4096 snowflakes
    /// were already generated in the current millisecond, this method spins until the clock reaches the next
    /// millisecond.
    ///
    /// # Errors
    ///
    /// Refer to [`generate_blocking`](Self::generate_blocking).
    #[cfg(feature = "lock-free")]
    #[cfg_attr(docsrs, doc(cfg(feature = "lock-free")))]
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn generate_lock_free(&self) -> Result<Snowflake> {
        // We don't have to see all previous threads' modifications here. The CAS operation below only succeeds if we
        // saw the latest value; otherwise, we retry with the value it returned.
        let mut last_snowflake = self.last_snowflake_atomic.load(atomic::Ordering::Relaxed);
        loop {
            let new_snowflake = self.next_snowflake(last_snowflake)?;
            match self.last_snowflake_atomic.compare_exchange_weak(
                last_snowflake,
                new_snowflake,
                atomic::Ordering::AcqRel,
                atomic::Ordering::Relaxed,
            ) {
                Ok(_) => return Ok(Snowflake::from_raw(new_snowflake)),
                Err(current_value) => last_snowflake = current_value,
            }
        }
    }

    /// Computes the snowflake that follows `last_snowflake` at the current time.
    ///
    /// If the sequence number of the current millisecond is exhausted, this waits for the next millisecond and returns
    /// its first snowflake.
    fn next_snowflake(&self, last_snowflake: u64) -> Result<u64> {
        let time = self.get_timestamp()?;
        let last_timestamp = layout::get_timestamp(last_snowflake);
        let (time, sequence_number) = match last_timestamp.cmp(&time) {
            cmp::Ordering::Equal => {
                let sequence_number = layout::get_sequence_number(last_snowflake) + 1;
                if layout::exceeds_sequence_number(sequence_number) {
                    (self.wait_for_next_millisecond(last_timestamp)?, 0)
                } else {
                    (time, sequence_number)
                }
            }
            cmp::Ordering::Less => (time, 0),
            cmp::Ordering::Greater => return Err(clock_regression(last_timestamp, time)),
        };
        Ok(layout::construct_snowflake(
            time,
            self.worker_id,
            self.process_id,
            sequence_number,
        ))
    }

    /// Polls the clock until it's past `last_timestamp` and returns the new timestamp.
    ///
    /// A clock that doesn't advance blocks this forever.
    #[cold]
    fn wait_for_next_millisecond(&self, last_timestamp: u64) -> Result<u64> {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            timestamp = last_timestamp,
            "sequence numbers exhausted, waiting for the next millisecond"
        );
        loop {
            match self.poll_interval {
                Some(interval) => sync::sleep(interval),
                None => sync::spin_loop(),
            }
            let time = self.get_timestamp()?;
            match time.cmp(&last_timestamp) {
                cmp::Ordering::Greater => return Ok(time),
                cmp::Ordering::Equal => {}
                cmp::Ordering::Less => return Err(clock_regression(last_timestamp, time)),
            }
        }
    }

    /// Gets the current timestamp in milliseconds since the snowflake epoch.
    fn get_timestamp(&self) -> Result<u64> {
        let time = self
            .clock
            .millis_since_unix()?
            .checked_sub(EPOCH)
            .ok_or(Error::InvalidEpoch)?;
        if layout::exceeds_timestamp(time) {
            return Err(Error::FatalSnowflakeExhaustion);
        }
        Ok(time)
    }
}

impl Default for Generator<SystemClock> {
    /// Returns a generator for worker `0` and the ID of the current process.
    fn default() -> Self {
        GeneratorConfig::default().build()
    }
}

#[cold]
fn clock_regression(last_timestamp: u64, timestamp: u64) -> Error {
    #[cfg(feature = "tracing")]
    tracing::warn!(last_timestamp, timestamp, "the clock went backwards");
    #[cfg(not(feature = "tracing"))]
    let _ = (last_timestamp, timestamp);
    Error::ClockRegression
}

// Skip coverage: We don't test the coverage of our unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualClock;
    use std::collections::HashSet;
    use std::thread;

    type GenerateFn = fn(&Generator<ManualClock>) -> Result<Snowflake>;

    fn implementations() -> Vec<(&'static str, GenerateFn)> {
        let mut implementations: Vec<(&'static str, GenerateFn)> = Vec::new();
        #[cfg(feature = "blocking")]
        implementations.push(("blocking", Generator::generate_blocking));
        #[cfg(feature = "lock-free")]
        implementations.push(("lock-free", Generator::generate_lock_free));
        implementations
    }

    fn generator(clock: &ManualClock, worker_id: u64, process_id: u64) -> Generator<ManualClock> {
        GeneratorConfig::default()
            .with_worker_id(worker_id)
            .with_process_id(process_id)
            .build_with_clock(clock.clone())
    }

    #[test]
    fn bit_exact() {
        for (name, generate) in implementations() {
            let clock = ManualClock::new(EPOCH + 1);
            let generator = generator(&clock, 1, 1);
            assert_eq!(4329472, generate(&generator).unwrap().get(), "{}", name);
        }
    }

    #[test]
    fn sequence_increments_within_millisecond() {
        for (name, generate) in implementations() {
            let clock = ManualClock::new(EPOCH + 42);
            let generator = generator(&clock, 0, 0);
            for expected in 0..3 {
                let snowflake = generate(&generator).unwrap();
                assert_eq!(42, snowflake.get_timestamp_raw(), "{}", name);
                assert_eq!(expected, snowflake.get_sequence_number(), "{}", name);
            }
        }
    }

    #[test]
    fn sequence_resets_in_new_millisecond() {
        for (name, generate) in implementations() {
            let clock = ManualClock::new(EPOCH + 42);
            let generator = generator(&clock, 0, 0);
            for _ in 0..3 {
                generate(&generator).unwrap();
            }
            clock.advance(1);
            let snowflake = generate(&generator).unwrap();
            assert_eq!(43, snowflake.get_timestamp_raw(), "{}", name);
            assert_eq!(0, snowflake.get_sequence_number(), "{}", name);
            // Skipping milliseconds resets the sequence number as well
            clock.advance(10);
            let snowflake = generate(&generator).unwrap();
            assert_eq!(53, snowflake.get_timestamp_raw(), "{}", name);
            assert_eq!(0, snowflake.get_sequence_number(), "{}", name);
        }
    }

    #[test]
    fn overflow_waits_for_next_millisecond() {
        for (name, generate) in implementations() {
            let clock = ManualClock::new(EPOCH + 42);
            let generator = generator(&clock, 0, 0);
            for expected in 0..=4095 {
                let snowflake = generate(&generator).unwrap();
                assert_eq!(42, snowflake.get_timestamp_raw(), "{}", name);
                assert_eq!(expected, snowflake.get_sequence_number(), "{}", name);
            }
            // The next call has to poll the clock a few times before it sees the next millisecond
            let reads_before = clock.reads();
            clock.advance_after(5, EPOCH + 43);
            let snowflake = generate(&generator).unwrap();
            assert!(clock.reads() - reads_before >= 6, "{}", name);
            assert_eq!(43, snowflake.get_timestamp_raw(), "{}", name);
            assert_eq!(0, snowflake.get_sequence_number(), "{}", name);
            // The generator continues in the new millisecond instead of treating it as a fresh one
            let snowflake = generate(&generator).unwrap();
            assert_eq!(43, snowflake.get_timestamp_raw(), "{}", name);
            assert_eq!(1, snowflake.get_sequence_number(), "{}", name);
        }
    }

    #[test]
    fn overflow_with_poll_interval() {
        for (name, generate) in implementations() {
            let clock = ManualClock::new(EPOCH + 42);
            let generator = GeneratorConfig::default()
                .with_poll_interval(Duration::from_micros(10))
                .build_with_clock(clock.clone());
            for _ in 0..=4095 {
                generate(&generator).unwrap();
            }
            clock.advance_after(3, EPOCH + 44);
            let snowflake = generate(&generator).unwrap();
            assert_eq!(44, snowflake.get_timestamp_raw(), "{}", name);
            assert_eq!(0, snowflake.get_sequence_number(), "{}", name);
        }
    }

    #[test]
    fn clock_regression() {
        for (name, generate) in implementations() {
            let clock = ManualClock::new(EPOCH + 42);
            let generator = generator(&clock, 0, 0);
            generate(&generator).unwrap();
            clock.set(EPOCH + 41);
            assert!(matches!(generate(&generator), Err(Error::ClockRegression)), "{}", name);
            // A failed call doesn't modify the generator's state
            clock.set(EPOCH + 42);
            assert_eq!(1, generate(&generator).unwrap().get_sequence_number(), "{}", name);
        }
    }

    #[test]
    fn clock_regression_while_waiting() {
        for (name, generate) in implementations() {
            let clock = ManualClock::new(EPOCH + 42);
            let generator = generator(&clock, 0, 0);
            for _ in 0..=4095 {
                generate(&generator).unwrap();
            }
            clock.advance_after(2, EPOCH + 40);
            assert!(matches!(generate(&generator), Err(Error::ClockRegression)), "{}", name);
        }
    }

    #[test]
    fn invalid_epoch() {
        for (name, generate) in implementations() {
            let clock = ManualClock::new(EPOCH - 1);
            let generator = generator(&clock, 0, 0);
            assert!(matches!(generate(&generator), Err(Error::InvalidEpoch)), "{}", name);
        }
    }

    #[test]
    fn fatal_exhaustion() {
        for (name, generate) in implementations() {
            let clock = ManualClock::new(EPOCH + (1 << 42) - 1);
            let generator = generator(&clock, 0, 0);
            assert_eq!((1 << 42) - 1, generate(&generator).unwrap().get_timestamp_raw(), "{}", name);
            clock.advance(1);
            assert!(
                matches!(generate(&generator), Err(Error::FatalSnowflakeExhaustion)),
                "{}",
                name
            );
        }
    }

    #[test]
    fn ids_wrap_modulo_32() {
        for (name, generate) in implementations() {
            let clock = ManualClock::new(EPOCH + 42);
            let generator = generator(&clock, 40, 37);
            assert_eq!(8, generator.worker_id());
            assert_eq!(5, generator.process_id());
            let record = generate(&generator).unwrap().deconstruct();
            assert_eq!(8, record.worker_id, "{}", name);
            assert_eq!(5, record.process_id, "{}", name);
        }
    }

    #[test]
    fn first_millisecond_of_epoch() {
        for (name, generate) in implementations() {
            let clock = ManualClock::new(EPOCH);
            let generator = generator(&clock, 0, 0);
            // The initial state counts as a snowflake generated in the first millisecond of the epoch
            assert_eq!(1, generate(&generator).unwrap().get(), "{}", name);
        }
    }

    #[test]
    fn clones_share_state() {
        for (name, generate) in implementations() {
            let clock = ManualClock::new(EPOCH + 42);
            let generator = generator(&clock, 0, 0);
            let clone = generator.clone();
            assert_eq!(0, generate(&generator).unwrap().get_sequence_number(), "{}", name);
            assert_eq!(1, generate(&clone).unwrap().get_sequence_number(), "{}", name);
            assert_eq!(2, generate(&generator).unwrap().get_sequence_number(), "{}", name);
        }
    }

    #[test]
    fn generate_string() {
        let clock = ManualClock::new(EPOCH + 1);
        let generator = generator(&clock, 1, 1);
        assert_eq!("4329472", generator.generate_string().unwrap());
    }

    #[test]
    fn unique_across_threads() {
        for (name, generate) in implementations() {
            let generator = GeneratorConfig::default().build_with_clock(ManualClock::new(EPOCH + 42));
            let clock = generator.clock().clone();
            let threads: Vec<_> = (0..4)
                .map(|_| {
                    let generator = generator.clone();
                    thread::spawn(move || {
                        (0..2000)
                            .map(|_| generate(&generator).unwrap().get())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            // 8000 snowflakes don't fit into one millisecond, so keep the clock moving
            let ticker = {
                let clock = clock.clone();
                thread::spawn(move || {
                    for _ in 0..10 {
                        thread::sleep(Duration::from_millis(1));
                        clock.advance(1);
                    }
                })
            };
            let mut set = HashSet::with_capacity(8000);
            for snowflake in threads.into_iter().flat_map(|thread| thread.join().unwrap()) {
                assert!(set.insert(snowflake), "{}: duplicate snowflake {}", name, snowflake);
            }
            ticker.join().unwrap();
            assert_eq!(8000, set.len());
        }
    }
}
// End skip coverage
