//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! The object reference table built before any object is written.

use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;

use std::collections::HashMap;

use crate::object::{Content, Node};

/// The identity of an entry in the object reference table.
///
/// Leaves compare by value and containers by identity. Keys and string
/// leaves share the `String` variant, so equal text shares an entry.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub(crate) enum ObjectKey {
    String(String),
    Number(i32),
    Real(OrderedFloat<f64>),
    Boolean(bool),
    Date(DateTime<Utc>),
    Data(Vec<u8>),
    Container(usize),
}

impl ObjectKey {
    pub(crate) fn of(node: &Node) -> ObjectKey {
        match &*node.content() {
            Content::Dictionary(_) | Content::Array(_) => ObjectKey::Container(node.address()),
            Content::String(value) => ObjectKey::String(value.clone()),
            Content::Number(value) => ObjectKey::Number(*value),
            Content::Real(value) => ObjectKey::Real(OrderedFloat(*value)),
            Content::Boolean(value) => ObjectKey::Boolean(*value),
            Content::Date(value) => ObjectKey::Date(*value),
            Content::Data(value) => ObjectKey::Data(value.clone()),
        }
    }

    /// Booleans, containers and strings with characters above U+00FF get an
    /// entry of their own every time they appear in a tree.
    fn always_appended(&self) -> bool {
        match self {
            ObjectKey::Boolean(_) | ObjectKey::Container(_) => true,
            ObjectKey::String(value) => value.chars().any(|c| c > '\u{FF}'),
            _ => false,
        }
    }
}

/// The ordered list of objects to write, with a cursor that replays it.
#[derive(Debug, Default)]
pub(crate) struct ReferenceTable {
    entries: Vec<ObjectKey>,
    first_index: HashMap<ObjectKey, usize>,
    cursor: usize,
}

impl ReferenceTable {

    /// Walks the tree in pre-order: a container, then its keys, then its values.
    pub(crate) fn build(root: &Node) -> ReferenceTable {
        let mut table = ReferenceTable::default();
        table.visit(root);
        table
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    fn visit(&mut self, node: &Node) {
        self.push(ObjectKey::of(node));
        match &*node.content() {
            Content::Dictionary(entries) => {
                for key in entries.keys() {
                    self.push_key(key);
                }
                for value in entries.values() {
                    self.visit(value);
                }
            }
            Content::Array(items) => {
                for item in items {
                    self.visit(item);
                }
            }
            _ => {}
        }
    }

    fn push(&mut self, key: ObjectKey) {
        if key.always_appended() || !self.first_index.contains_key(&key) {
            let index = self.entries.len();
            self.first_index.entry(key.clone()).or_insert(index);
            self.entries.push(key);
        }
    }

    /// Dictionary keys are deduplicated whatever characters they contain.
    fn push_key(&mut self, key: &str) {
        let key = ObjectKey::String(key.to_owned());
        if !self.first_index.contains_key(&key) {
            self.first_index.insert(key.clone(), self.entries.len());
            self.entries.push(key);
        }
    }

    /// Resolves the reference of an object.
    ///
    /// The entry under the cursor wins when it matches, which keeps objects
    /// that were appended more than once apart. Otherwise the first equal
    /// entry is used.
    pub(crate) fn resolve(&mut self, key: &ObjectKey) -> Option<usize> {
        if self.entries.get(self.cursor) == Some(key) {
            self.cursor += 1;
            return Some(self.cursor - 1);
        }
        self.first_index.get(key).cloned()
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor;
    }

}
