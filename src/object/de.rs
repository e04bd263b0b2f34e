//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

use indexmap::IndexMap;
use serde::de::{self, Unexpected};

use std::convert::TryFrom;
use std::fmt;

use crate::de::date;
use crate::object::Node;

/// Deserialization of property list nodes.
///
/// This is implemented generically, so any self-describing serde format can
/// produce a node tree, with two restrictions imposed by the plist type system:
/// integers must fit in 32 bits and map keys must be strings. Dates are
/// represented as single-entry maps with a magic key and will only be
/// recognized when coming from a binary property list.
impl<'de> de::Deserialize<'de> for Node {
    fn deserialize<D>(deserializer: D) -> Result<Node, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        struct NodeVisitor;

        impl<'de> de::Visitor<'de> for NodeVisitor {
            type Value = Node;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("any valid property list value")
            }

            #[inline]
            fn visit_bool<E>(self, value: bool) -> Result<Node, E> {
                Ok(Node::boolean(value))
            }

            #[inline]
            fn visit_i64<E>(self, value: i64) -> Result<Node, E>
            where
                E: de::Error,
            {
                i32::try_from(value)
                    .map(Node::number)
                    .map_err(|_| de::Error::invalid_value(Unexpected::Signed(value), &"a 32-bit integer"))
            }

            #[inline]
            fn visit_u64<E>(self, value: u64) -> Result<Node, E>
            where
                E: de::Error,
            {
                i32::try_from(value)
                    .map(Node::number)
                    .map_err(|_| de::Error::invalid_value(Unexpected::Unsigned(value), &"a 32-bit integer"))
            }

            #[inline]
            fn visit_f64<E>(self, value: f64) -> Result<Node, E> {
                Ok(Node::real(value))
            }

            #[inline]
            fn visit_str<E>(self, value: &str) -> Result<Node, E> {
                Ok(Node::string(value))
            }

            #[inline]
            fn visit_string<E>(self, value: String) -> Result<Node, E> {
                Ok(Node::string(value))
            }

            #[inline]
            fn visit_bytes<E>(self, value: &[u8]) -> Result<Node, E> {
                Ok(Node::data(value))
            }

            #[inline]
            fn visit_byte_buf<E>(self, value: Vec<u8>) -> Result<Node, E> {
                Ok(Node::data(value))
            }

            fn visit_seq<V>(self, mut visitor: V) -> Result<Node, V::Error>
            where
                V: de::SeqAccess<'de>,
            {
                let mut items = Vec::with_capacity(visitor.size_hint().unwrap_or(0));
                while let Some(item) = visitor.next_element()? {
                    items.push(item);
                }
                Ok(Node::from_items(items))
            }

            fn visit_map<V>(self, mut visitor: V) -> Result<Node, V::Error>
            where
                V: de::MapAccess<'de>,
            {
                let mut entries = IndexMap::<String, Node>::new();

                // Dates arrive as a pseudo-structure identified by a special key.
                let mut key = visitor.next_key::<String>()?;
                if key.as_deref() == Some(date::PSEUDO_FIELD) {
                    let date::AbsoluteTime(value) = visitor.next_value()?;
                    return Ok(Node::date(value.0));
                }

                // Later duplicates replace the value but keep the first position.
                while let Some(k) = key {
                    let v = visitor.next_value()?;
                    entries.insert(k, v);
                    key = visitor.next_key()?;
                }

                Ok(Node::from_entries(entries))
            }
        }

        deserializer.deserialize_any(NodeVisitor)
    }
}
