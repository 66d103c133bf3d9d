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

//! Serde support for [`Snowflake`]s.
//!
//! Snowflakes are serialized as decimal strings, as many consumers (JavaScript in particular) can't represent every
//! 64-bit integer exactly. Deserialization only accepts strings and validates them with [`Snowflake::parse`].

use crate::{Error, Snowflake};
use serde::de::{self, Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::Formatter;

impl Serialize for Snowflake {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Self-describing formats hand us numbers as well, which lets us report them as the wrong input type rather than
        // as a generic type mismatch
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(SnowflakeVisitor)
        } else {
            deserializer.deserialize_str(SnowflakeVisitor)
        }
    }
}

struct SnowflakeVisitor;

impl SnowflakeVisitor {
    fn invalid_type<E>(unexpected: Unexpected<'_>) -> E
    where
        E: de::Error,
    {
        E::custom(format_args!("{} (found {})", Error::InvalidInputType, unexpected))
    }
}

impl<'de> Visitor<'de> for SnowflakeVisitor {
    type Value = Snowflake;

    fn expecting(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("a snowflake as a decimal string")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Snowflake::parse(v).map_err(|e| E::custom(format_args!("{} (found {:?})", e, v)))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Err(Self::invalid_type(Unexpected::Unsigned(v)))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Err(Self::invalid_type(Unexpected::Signed(v)))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Err(Self::invalid_type(Unexpected::Float(v)))
    }

    fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Err(Self::invalid_type(Unexpected::Bool(v)))
    }
}

// End skip coverage
