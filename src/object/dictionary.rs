//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

use indexmap::IndexMap;

use std::ops::Deref;

use crate::error::{Error, Result, TreeError};
use crate::object::{Array, ChangeAction, Content, FromNode, Node, NodeType};

/// The opening of an XML plist embedded in a larger blob.
const EMBEDDED_BEGIN_MARKER: &[u8] = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

/// The closing of an XML plist embedded in a larger blob.
const EMBEDDED_END_MARKER: &[u8] = b"</plist>";

/// A handle to a dictionary node.
///
/// Keys keep the order in which they were inserted. Dereferences to `Node`
/// for the operations shared by every kind.
#[derive(Clone, Debug, PartialEq)]
pub struct Dictionary(pub(crate) Node);

impl Deref for Dictionary {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.0
    }
}

impl From<Dictionary> for Node {
    fn from(dictionary: Dictionary) -> Node {
        dictionary.0
    }
}

impl Default for Dictionary {
    fn default() -> Self {
        Dictionary::new()
    }
}

impl Dictionary {

    pub fn new() -> Dictionary {
        Dictionary(Node::new(NodeType::Dictionary))
    }

    /// Returns the underlying node handle.
    pub fn node(&self) -> &Node {
        &self.0
    }

    fn with_entries<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&IndexMap<String, Node>) -> R,
    {
        match &*self.0.content() {
            Content::Dictionary(entries) => f(entries),
            _ => unreachable!("dictionary handle over a non-dictionary node"),
        }
    }

    fn with_entries_mut<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut IndexMap<String, Node>) -> R,
    {
        match &mut *self.0.content_mut() {
            Content::Dictionary(entries) => f(entries),
            _ => unreachable!("dictionary handle over a non-dictionary node"),
        }
    }

    pub fn len(&self) -> usize {
        self.with_entries(|entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.with_entries(|entries| entries.contains_key(key))
    }

    /// Returns the keys in document order.
    pub fn keys(&self) -> Vec<String> {
        self.with_entries(|entries| entries.keys().cloned().collect())
    }

    /// Returns a snapshot of the entries in document order.
    pub fn entries(&self) -> Vec<(String, Node)> {
        self.with_entries(|entries| {
            entries.iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
    }

    pub fn get(&self, key: &str) -> Option<Node> {
        self.with_entries(|entries| entries.get(key).cloned())
    }

    /// Returns the child at `key` viewed as `T`, or `None` when it is absent
    /// or of another kind.
    pub fn get_as<T: FromNode>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|node| T::from_node(&node))
    }

    /// Returns the key under which `node` is stored.
    pub fn get_key(&self, node: &Node) -> Option<String> {
        self.with_entries(|entries| {
            entries.iter()
                .find(|(_, value)| value.ptr_eq(node))
                .map(|(key, _)| key.clone())
        })
    }

    /// Stores `node` under `key`, replacing any existing child in place or
    /// appending a new entry.
    pub fn set<K: Into<String>>(&self, key: K, node: Node) -> Result<()> {
        let key = key.into();
        match self.with_entries(|entries| entries.get_full(&key).map(|(index, _, value)| (index, value.clone()))) {
            Some((_, ref existing)) if existing.ptr_eq(&node) => Ok(()),
            Some((index, existing)) => {
                self.check_attachable(&node)?;
                self.with_entries_mut(|entries| entries.insert(key.clone(), node.clone()));
                Node::orphan(&existing);
                self.adopt(&node);
                self.raise(ChangeAction::Replaced, Some(key), Some(index), Some(existing), Some(node));
                Ok(())
            }
            None => {
                self.check_attachable(&node)?;
                let index = self.with_entries_mut(|entries| {
                    entries.insert(key.clone(), node.clone());
                    entries.len() - 1
                });
                self.adopt(&node);
                self.raise(ChangeAction::Added, Some(key), Some(index), None, Some(node));
                Ok(())
            }
        }
    }

    /// Appends a new entry. Fails if `key` is already present.
    pub fn add<K: Into<String>>(&self, key: K, node: Node) -> Result<()> {
        let key = key.into();
        if self.contains_key(&key) {
            return Err(Error::from(TreeError::DuplicateKey(key)));
        }
        self.set(key, node)
    }

    /// Inserts a new entry directly after `key_before`, or at the front when
    /// `key_before` is not present. Fails if `key` is already present.
    pub fn insert_after<K: Into<String>>(&self, key_before: &str, key: K, node: Node) -> Result<()> {
        let key = key.into();
        if self.contains_key(&key) {
            return Err(Error::from(TreeError::DuplicateKey(key)));
        }
        self.check_attachable(&node)?;
        let index = self.with_entries_mut(|entries| {
            let index = entries.get_index_of(key_before).map(|index| index + 1).unwrap_or(0);
            entries.shift_insert(index, key.clone(), node.clone());
            index
        });
        self.adopt(&node);
        self.raise(ChangeAction::Added, Some(key), Some(index), None, Some(node));
        Ok(())
    }

    /// Detaches and returns the child stored under `key`.
    pub fn remove(&self, key: &str) -> Option<Node> {
        let (index, key, node) = self.with_entries_mut(|entries| entries.shift_remove_full(key))?;
        Node::orphan(&node);
        self.raise(ChangeAction::Removed, Some(key), Some(index), Some(node.clone()), None);
        Some(node)
    }

    /// Detaches every child.
    pub fn clear(&self) {
        let children = self.with_entries_mut(|entries| std::mem::take(entries));
        children.values().for_each(Node::orphan);
        self.raise(ChangeAction::Cleared, None, None, None, None);
    }

    /// Renames the entry holding `node` without moving it.
    ///
    /// Returns `Ok(false)` if `node` is not a child of this dictionary or
    /// `new_key` is already present.
    pub fn change_key(&self, node: &Node, new_key: &str) -> Result<bool> {
        self.change_key_with(node, new_key, None)
    }

    /// Renames the entry holding `node`, optionally swapping in `new_value`.
    pub fn change_key_with(&self, node: &Node, new_key: &str, new_value: Option<Node>) -> Result<bool> {
        let old_key = match self.get_key(node) {
            Some(key) => key,
            None => return Ok(false),
        };
        if self.contains_key(new_key) {
            return Ok(false);
        }
        let value = match new_value {
            Some(value) => {
                if !value.ptr_eq(node) {
                    self.check_attachable(&value)?;
                }
                value
            }
            None => node.clone(),
        };

        let index = self.with_entries_mut(|entries| {
            let (index, _, _) = entries.shift_remove_full(&old_key)?;
            entries.shift_insert(index, new_key.to_owned(), value.clone());
            Some(index)
        });
        let index = match index {
            Some(index) => index,
            None => return Ok(false),
        };

        Node::orphan(node);
        self.raise(ChangeAction::Removed, Some(old_key), Some(index), Some(node.clone()), None);
        self.adopt(&value);
        self.raise(ChangeAction::Added, Some(new_key.to_owned()), Some(index), None, Some(value));
        Ok(true)
    }

    /// Assigns a string value at `key`, reusing an existing string child.
    pub fn set_string<K: Into<String>, S: Into<String>>(&self, key: K, value: S) -> Result<()> {
        let key = key.into();
        match self.get(&key).filter(|node| node.node_type() == NodeType::String) {
            Some(existing) => existing.set_string(value),
            None => self.set(key, Node::string(value)),
        }
    }

    /// Returns the string child at `key`, creating an empty one when the key
    /// is missing or holds another kind.
    pub fn get_string<K: Into<String>>(&self, key: K) -> Result<Node> {
        let key = key.into();
        match self.get(&key).filter(|node| node.node_type() == NodeType::String) {
            Some(existing) => Ok(existing),
            None => {
                let node = Node::string("");
                self.set(key, node.clone())?;
                Ok(node)
            }
        }
    }

    /// Returns the array child at `key`, creating an empty one when the key
    /// is missing or holds another kind.
    pub fn get_array<K: Into<String>>(&self, key: K) -> Result<Array> {
        let key = key.into();
        match self.get_as::<Array>(&key) {
            Some(existing) => Ok(existing),
            None => {
                let array = Array::new();
                self.set(key, array.node().clone())?;
                Ok(array)
            }
        }
    }

    /// Moves the entries of a decoded dictionary into this one, replacing
    /// the current contents and raising a single `Changed` event.
    pub(crate) fn take_contents_of(&self, source: &Dictionary) {
        self.batch(|| {
            self.clear();
            let entries = source.with_entries_mut(|entries| std::mem::take(entries));
            for node in entries.values() {
                Node::orphan(node);
                self.adopt(node);
            }
            self.with_entries_mut(|current| *current = entries);
        })
    }

    /// Locates the XML property list embedded in `bytes`, such as the payload
    /// of a signed provisioning profile, and decodes it.
    pub fn from_embedded_xml(bytes: &[u8]) -> Result<Dictionary> {
        let start = find(bytes, EMBEDDED_BEGIN_MARKER, 0).ok_or(Error::EmbeddedPlistNotFound)?;
        let end = find(bytes, EMBEDDED_END_MARKER, start)
            .filter(|end| *end > start)
            .ok_or(Error::EmbeddedPlistNotFound)?;
        let plist = &bytes[start .. end + EMBEDDED_END_MARKER.len()];
        Node::from_slice(plist)?
            .as_dictionary()
            .ok_or(Error::RootObjectNotDictionary)
    }

}

/// Returns the position of the first occurrence of `needle` at or after `from`.
fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack.get(from ..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|position| position + from)
}
