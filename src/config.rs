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

//! Configuration of a [`Generator`].

use crate::{Clock, Generator, SystemClock};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The identity and wait behaviour of a [`Generator`].
///
/// Worker and process IDs are opaque integers supplied by your deployment. Only their remainder modulo 32 ends up in
/// a snowflake, so two instances whose IDs are congruent modulo 32 can generate the same snowflakes. It's your
/// responsibility to hand out distinct IDs to the instances that generate snowflakes concurrently.
///
/// # Example
///
/// ```
/// use snowflake_codec::GeneratorConfig;
/// use std::time::Duration;
///
/// let generator = GeneratorConfig::default()
///     // e.g. the index of this process in a cluster of workers
///     .with_worker_id(3)
///     .with_poll_interval(Duration::from_micros(50))
///     .build();
/// assert_eq!(3, generator.worker_id());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GeneratorConfig {
    /// The ID of the worker within a cluster of cooperating processes. Defaults to `0`.
    pub worker_id: u64,
    /// The ID of the process. Defaults to the ID assigned by the operating system.
    pub process_id: u64,
    /// How long to sleep between two clock reads while waiting for the next millisecond.
    ///
    /// `None` (the default) busy-waits without giving up the CPU. Either way, a generator never returns a snowflake
    /// before the clock advanced past the exhausted millisecond.
    pub poll_interval: Option<Duration>,
}

impl GeneratorConfig {
    /// Sets the worker ID.
    #[must_use]
    pub fn with_worker_id(mut self, worker_id: u64) -> Self {
        self.worker_id = worker_id;
        self
    }

    /// Sets the process ID, overriding the ID assigned by the operating system.
    #[must_use]
    pub fn with_process_id(mut self, process_id: u64) -> Self {
        self.process_id = process_id;
        self
    }

    /// Makes the overflow wait sleep for `interval` between clock reads instead of spinning.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Builds a generator that reads the [system clock](SystemClock).
    pub fn build(self) -> Generator<SystemClock> {
        self.build_with_clock(SystemClock)
    }

    /// Builds a generator that reads the given clock.
    pub fn build_with_clock<C>(self, clock: C) -> Generator<C>
    where
        C: Clock,
    {
        Generator::with_config(self, clock)
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            worker_id: 0,
            process_id: u64::from(std::process::id()),
            poll_interval: None,
        }
    }
}

// End skip coverage
