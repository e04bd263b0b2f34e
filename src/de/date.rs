//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Dates travel through serde as a struct with one reserved field.
//!
//! Serde's data model has no date type, so the binary deserializer hands a
//! date object out as a map holding `PSEUDO_FIELD` and the absolute time.
//! `Date` and `Node` both look for that field.

use serde::de;

use std::fmt;

use crate::object::{date_from_absolute_time, Date};

/// Struct name requested when deserializing a `Date`.
pub const PSEUDO_STRUCT: &str = "$__plistdoc_private_Date";

/// The only field of the pseudo-struct. Its value is the absolute time.
pub const PSEUDO_FIELD: &str = "$__plistdoc_private_Date_absolute_time";

impl<'de> de::Deserialize<'de> for Date {
    fn deserialize<D>(deserializer: D) -> Result<Date, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        deserializer.deserialize_struct(PSEUDO_STRUCT, &[PSEUDO_FIELD], PseudoStructVisitor)
    }
}

struct PseudoStructVisitor;

impl<'de> de::Visitor<'de> for PseudoStructVisitor {
    type Value = Date;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a date")
    }

    fn visit_map<V>(self, mut map: V) -> Result<Date, V::Error>
    where
        V: de::MapAccess<'de>,
    {
        match map.next_key::<String>()? {
            Some(ref field) if field == PSEUDO_FIELD => {
                let AbsoluteTime(date) = map.next_value()?;
                Ok(date)
            }
            Some(field) => Err(de::Error::unknown_field(&field, &[PSEUDO_FIELD])),
            None => Err(de::Error::missing_field(PSEUDO_FIELD)),
        }
    }
}

/// Seconds relative to 2001-01-01T00:00:00Z, read as a `Date`.
pub struct AbsoluteTime(pub Date);

impl<'de> de::Deserialize<'de> for AbsoluteTime {
    fn deserialize<D>(deserializer: D) -> Result<AbsoluteTime, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        struct SecondsVisitor;

        impl<'de> de::Visitor<'de> for SecondsVisitor {
            type Value = AbsoluteTime;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("seconds since 2001-01-01T00:00:00Z")
            }

            fn visit_f64<E>(self, seconds: f64) -> Result<AbsoluteTime, E>
            where
                E: de::Error,
            {
                match date_from_absolute_time(seconds) {
                    Some(date) => Ok(AbsoluteTime(Date(date))),
                    None => Err(de::Error::invalid_value(de::Unexpected::Float(seconds), &self)),
                }
            }
        }

        deserializer.deserialize_f64(SecondsVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde::de::{value::{Error as ValueError, MapDeserializer}, Deserialize};

    fn date_from_entry(field: &'static str, seconds: f64) -> Result<Date, ValueError> {
        let entries = vec![(field, seconds)];
        Date::deserialize(MapDeserializer::<_, ValueError>::new(entries.into_iter()))
    }

    #[test]
    fn test_pseudo_struct() {
        let date = date_from_entry(PSEUDO_FIELD, 86_400.0).unwrap();
        assert_eq!(date.0.to_rfc3339(), "2001-01-02T00:00:00+00:00");
    }

    #[test]
    fn test_pseudo_struct_rejects_other_fields() {
        assert!(date_from_entry("seconds", 0.0).is_err());
    }

    #[test]
    fn test_absolute_time_must_be_a_number() {
        let entries = vec![(PSEUDO_FIELD, "yesterday")];
        let date = Date::deserialize(MapDeserializer::<_, ValueError>::new(entries.into_iter()));
        assert!(date.is_err());
    }
}
