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

#[cfg(not(loom))]
compile_error!("this test requires the `loom` configuration option");

use loom::thread;
use snowflake_codec::layout::EPOCH;
use snowflake_codec::{Generator, GeneratorConfig, ManualClock, Result, Snowflake};
use std::collections::HashSet;

type GenerateFn = fn(&Generator<ManualClock>) -> Result<Snowflake>;

fn unique(generate: GenerateFn) {
    loom::model(move || {
        let clock = ManualClock::new(EPOCH + 5);
        let generator = GeneratorConfig::default().build_with_clock(clock.clone());

        // Create two snowflake generating threads and a thread incrementing the current time
        let snowflakes: Vec<_> = (0..2)
            .map(|_| {
                let generator = generator.clone();
                thread::spawn(move || {
                    // Generate 2 snowflakes and return them
                    (0..2)
                        .map(|_| generate(&generator).unwrap().get())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let time = thread::spawn(move || clock.advance(1));
        let mut set = HashSet::with_capacity(4);
        for snowflake in snowflakes.into_iter().flat_map(|snowflake| snowflake.join().unwrap()) {
            set.insert(snowflake);
        }
        time.join().unwrap();
        assert_eq!(4, set.len());
    });
}

#[cfg(feature = "blocking")]
#[test]
fn unique_blocking() {
    unique(Generator::generate_blocking);
}

#[cfg(feature = "lock-free")]
#[test]
fn unique_lock_free() {
    unique(Generator::generate_lock_free);
}
