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

//! The bit layout of a [`Snowflake`](crate::Snowflake).
//!
//! Snowflakes consist of 42 bits for a timestamp in milliseconds since [`EPOCH`], 5 bits for a worker ID, 5 bits for a
//! process ID, and 12 bits for the sequence number (from the most significant bit to the least significant bit):
//!
//! ```text
//! | timestamp (42) | worker ID (5) | process ID (5) | sequence (12) |
//! ```
//!
//! Unlike the classic layout introduced by Twitter, the timestamp uses all remaining bits. I.e., the first bit isn't
//! guaranteed to be `0`, and snowflakes can't be converted to signed 64-bit integers without losing their ordering
//! (starting in 2154).

/// The first millisecond of 2015 (UTC) in milliseconds since the Unix epoch.
pub const EPOCH: u64 = 1_420_070_400_000;

/// The number of bits dedicated to the timestamp.
pub const TIMESTAMP_BITS: u32 = 42;
/// The number of bits dedicated to the worker ID.
pub const WORKER_ID_BITS: u32 = 5;
/// The number of bits dedicated to the process ID.
pub const PROCESS_ID_BITS: u32 = 5;
/// The number of bits dedicated to the sequence number.
pub const SEQUENCE_NUMBER_BITS: u32 = 12;

/// The position of the lowest process ID bit.
pub const PROCESS_ID_SHIFT: u32 = SEQUENCE_NUMBER_BITS;
/// The position of the lowest worker ID bit.
pub const WORKER_ID_SHIFT: u32 = PROCESS_ID_SHIFT + PROCESS_ID_BITS;
/// The position of the lowest timestamp bit.
pub const TIMESTAMP_SHIFT: u32 = WORKER_ID_SHIFT + WORKER_ID_BITS;

/// Selects the worker ID bits of a snowflake (`0x3E0000`).
pub const WORKER_ID_MASK: u64 = ((1 << WORKER_ID_BITS) - 1) << WORKER_ID_SHIFT;
/// Selects the process ID bits of a snowflake (`0x1F000`).
pub const PROCESS_ID_MASK: u64 = ((1 << PROCESS_ID_BITS) - 1) << PROCESS_ID_SHIFT;
/// Selects the sequence number bits of a snowflake (`0xFFF`).
pub const SEQUENCE_NUMBER_MASK: u64 = (1 << SEQUENCE_NUMBER_BITS) - 1;

/// The largest sequence number. Generators block once this many + 1 snowflakes were generated in a millisecond.
pub const MAX_SEQUENCE_NUMBER: u64 = SEQUENCE_NUMBER_MASK;
/// The number of distinct worker (and process) IDs. Raw IDs are reduced modulo this value.
pub const ID_MODULUS: u64 = 1 << WORKER_ID_BITS;

/// The largest integer that a 64-bit float represents exactly (`2^53 - 1`).
///
/// Decimal strings at or below this value are rejected when parsing snowflakes. A snowflake generated after the first
/// ~25 days of the epoch is always larger, so such a small value indicates that the input isn't a genuine snowflake
/// (or that it already went through a lossy floating-point conversion).
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Combines the given components into a 64-bit snowflake integer.
///
/// # Panics
///
/// Panics if any of the components exceeds the number of bits dedicated to it. Callers are expected to check the
/// timestamp with [`exceeds_timestamp`] and to reduce the IDs modulo [`ID_MODULUS`] first.
///
/// # Example
///
/// ```
/// use snowflake_codec::layout;
///
/// // One millisecond after the epoch, worker 1, process 1, sequence 0
/// assert_eq!(4329472, layout::construct_snowflake(1, 1, 1, 0));
/// ```
#[inline]
pub fn construct_snowflake(timestamp: u64, worker_id: u64, process_id: u64, sequence_number: u64) -> u64 {
    assert!(
        !exceeds_timestamp(timestamp)
            && !exceeds_sequence_number(sequence_number)
            && worker_id < ID_MODULUS
            && process_id < ID_MODULUS
    );
    (timestamp << TIMESTAMP_SHIFT)
        | (worker_id << WORKER_ID_SHIFT)
        | (process_id << PROCESS_ID_SHIFT)
        | sequence_number
}

/// Returns the timestamp (milliseconds since [`EPOCH`]) stored in the given snowflake.
#[inline]
pub fn get_timestamp(input: u64) -> u64 {
    input >> TIMESTAMP_SHIFT
}

/// Returns whether the given timestamp exceeds the 42 bits dedicated to it.
#[inline]
pub fn exceeds_timestamp(input: u64) -> bool {
    input >= 1 << TIMESTAMP_BITS
}

/// Returns the worker ID stored in the given snowflake.
#[inline]
pub fn get_worker_id(input: u64) -> u64 {
    (input & WORKER_ID_MASK) >> WORKER_ID_SHIFT
}

/// Returns the process ID stored in the given snowflake.
#[inline]
pub fn get_process_id(input: u64) -> u64 {
    (input & PROCESS_ID_MASK) >> PROCESS_ID_SHIFT
}

/// Returns the sequence number stored in the given snowflake.
#[inline]
pub fn get_sequence_number(input: u64) -> u64 {
    input & SEQUENCE_NUMBER_MASK
}

/// Returns whether the given sequence number exceeds the 12 bits dedicated to it.
#[inline]
pub fn exceeds_sequence_number(input: u64) -> bool {
    input > MAX_SEQUENCE_NUMBER
}

// End skip coverage
