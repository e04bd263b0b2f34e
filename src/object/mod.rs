//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! # The property list object model.
//!
//! A document is a tree of `Node` handles. Every node is one of the following kinds:
//!
//! 1. Dictionary, an insertion-ordered map from string keys to nodes.
//! 2. Array, an indexable sequence of nodes.
//! 3. String.
//! 4. Number, a 32-bit signed integer.
//! 5. Real, a double-precision floating point value.
//! 6. Boolean.
//! 7. Date, a UTC timestamp.
//! 8. Data, an arbitrary blob of bytes.
//!
//! Nodes are reference counted handles. Cloning a `Node` produces another handle
//! to the same node; use `Node::deep_clone` to copy a subtree. A node belongs to
//! at most one container at a time and holds a weak link back to it, which is
//! used to compute its key and to bubble change notifications towards the root.
//!
//! Nodes are not thread-safe and cannot be sent between threads.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use ordered_float::OrderedFloat;

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::{Error, Result, TreeError};

mod array;
mod date;
mod de;
mod dictionary;
mod event;

pub use array::Array;
pub use date::Date;
pub use dictionary::Dictionary;
pub use event::{ChangeAction, ChangeEvent, SubscriptionId};

pub(crate) use date::{
    absolute_time_from_date,
    date_from_absolute_time,
    parse_date_text,
    whole_seconds,
};

/// The kind of a node.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum NodeType {
    Dictionary,
    Array,
    String,
    Number,
    Real,
    Boolean,
    Date,
    Data,
}

/// The value held by a node. Codecs match on this once per node.
#[derive(Debug)]
pub(crate) enum Content {
    Dictionary(IndexMap<String, Node>),
    Array(Vec<Node>),
    String(String),
    Number(i32),
    Real(f64),
    Boolean(bool),
    Date(DateTime<Utc>),
    Data(Vec<u8>),
}

impl Content {
    fn node_type(&self) -> NodeType {
        match self {
            Content::Dictionary(_) => NodeType::Dictionary,
            Content::Array(_) => NodeType::Array,
            Content::String(_) => NodeType::String,
            Content::Number(_) => NodeType::Number,
            Content::Real(_) => NodeType::Real,
            Content::Boolean(_) => NodeType::Boolean,
            Content::Date(_) => NodeType::Date,
            Content::Data(_) => NodeType::Data,
        }
    }
}

type Observer = Rc<dyn Fn(&ChangeEvent)>;

struct NodeInner {
    content: RefCell<Content>,
    parent: RefCell<Weak<NodeInner>>,
    observers: RefCell<Vec<(SubscriptionId, Observer)>>,
    next_subscription: Cell<u64>,
    suppressed: Cell<u32>,
}

/// A handle to a node in a property list tree.
///
/// Equality (`==`) is structural. Use `Node::ptr_eq` to test whether two
/// handles refer to the same node.
#[derive(Clone)]
pub struct Node(Rc<NodeInner>);

/// Lowers the suppression count of a node when a batch ends, even on unwind.
struct Suppression<'a>(&'a NodeInner);

impl<'a> Drop for Suppression<'a> {
    fn drop(&mut self) {
        self.0.suppressed.set(self.0.suppressed.get().saturating_sub(1));
    }
}

impl Node {

    fn from_content(content: Content) -> Node {
        Node(Rc::new(NodeInner {
            content: RefCell::new(content),
            parent: RefCell::new(Weak::new()),
            observers: RefCell::new(Vec::new()),
            next_subscription: Cell::new(0),
            suppressed: Cell::new(0),
        }))
    }

    /// Builds a dictionary node which takes ownership of freshly decoded children.
    pub(crate) fn from_entries(entries: IndexMap<String, Node>) -> Node {
        let node = Node::from_content(Content::Dictionary(entries));
        node.adopt_children();
        node
    }

    /// Builds an array node which takes ownership of freshly decoded children.
    pub(crate) fn from_items(items: Vec<Node>) -> Node {
        let node = Node::from_content(Content::Array(items));
        node.adopt_children();
        node
    }

    /// Creates a node of the given kind holding its default value.
    ///
    /// Containers are empty, numbers zero, strings and data empty, booleans
    /// `true` and dates the current time.
    pub fn new(kind: NodeType) -> Node {
        Node::from_content(match kind {
            NodeType::Dictionary => Content::Dictionary(IndexMap::new()),
            NodeType::Array => Content::Array(Vec::new()),
            NodeType::String => Content::String(String::new()),
            NodeType::Number => Content::Number(0),
            NodeType::Real => Content::Real(0.0),
            NodeType::Boolean => Content::Boolean(true),
            NodeType::Date => Content::Date(whole_seconds(Utc::now())),
            NodeType::Data => Content::Data(Vec::new()),
        })
    }

    pub fn string<S: Into<String>>(value: S) -> Node {
        Node::from_content(Content::String(value.into()))
    }

    pub fn number(value: i32) -> Node {
        Node::from_content(Content::Number(value))
    }

    pub fn real(value: f64) -> Node {
        Node::from_content(Content::Real(value))
    }

    pub fn boolean(value: bool) -> Node {
        Node::from_content(Content::Boolean(value))
    }

    pub fn date(value: DateTime<Utc>) -> Node {
        Node::from_content(Content::Date(whole_seconds(value)))
    }

    pub fn data<B: Into<Vec<u8>>>(value: B) -> Node {
        Node::from_content(Content::Data(value.into()))
    }

    /// Borrows the value of the node for encoding.
    pub(crate) fn content(&self) -> Ref<'_, Content> {
        self.0.content.borrow()
    }

    fn content_mut(&self) -> RefMut<'_, Content> {
        self.0.content.borrow_mut()
    }

    pub fn node_type(&self) -> NodeType {
        self.0.content.borrow().node_type()
    }

    /// Returns true when both handles refer to the same node.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// An address identifying this node for as long as a handle to it is alive.
    pub(crate) fn address(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    /// Returns the container which currently owns this node.
    pub fn parent(&self) -> Option<Node> {
        self.0.parent.borrow().upgrade().map(Node)
    }

    /// Returns the key of this node within its parent dictionary.
    pub fn key(&self) -> Option<String> {
        self.parent().and_then(|parent| parent.locate(self).0)
    }

    /// Returns the dictionary key and position of a direct child.
    fn locate(&self, child: &Node) -> (Option<String>, Option<usize>) {
        match &*self.0.content.borrow() {
            Content::Dictionary(entries) => {
                entries.iter()
                    .position(|(_, value)| value.ptr_eq(child))
                    .map(|index| (entries.get_index(index).map(|(key, _)| key.clone()), Some(index)))
                    .unwrap_or((None, None))
            }
            Content::Array(items) => {
                (None, items.iter().position(|item| item.ptr_eq(child)))
            }
            _ => (None, None),
        }
    }

    /// Swaps this node for `node` within its parent container.
    ///
    /// Does nothing when this node has no parent.
    pub fn replace(&self, node: Node) -> Result<()> {
        if let Some(parent) = self.parent() {
            if let Some(dictionary) = parent.as_dictionary() {
                if let Some(key) = self.key() {
                    dictionary.set(key, node)?;
                }
            } else if let Some(array) = parent.as_array() {
                array.replace(self, node)?;
            }
        }
        Ok(())
    }

    /// Detaches this node from its parent container.
    pub fn remove(&self) -> Result<()> {
        let parent = self.parent().ok_or(TreeError::NotParented)?;
        if let Some(dictionary) = parent.as_dictionary() {
            if let Some(key) = self.key() {
                dictionary.remove(&key);
            }
        } else if let Some(array) = parent.as_array() {
            array.remove(self);
        }
        Ok(())
    }

    /// Copies this node and all of its descendants into a new, unparented subtree.
    pub fn deep_clone(&self) -> Node {
        let content = match &*self.0.content.borrow() {
            Content::Dictionary(entries) => {
                return Node::from_entries(entries.iter()
                    .map(|(key, value)| (key.clone(), value.deep_clone()))
                    .collect());
            }
            Content::Array(items) => {
                return Node::from_items(items.iter().map(Node::deep_clone).collect());
            }
            Content::String(value) => Content::String(value.clone()),
            Content::Number(value) => Content::Number(*value),
            Content::Real(value) => Content::Real(*value),
            Content::Boolean(value) => Content::Boolean(*value),
            Content::Date(value) => Content::Date(*value),
            Content::Data(value) => Content::Data(value.clone()),
        };
        Node::from_content(content)
    }

    pub fn as_dictionary(&self) -> Option<Dictionary> {
        match self.node_type() {
            NodeType::Dictionary => Some(Dictionary(self.clone())),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<Array> {
        match self.node_type() {
            NodeType::Array => Some(Array(self.clone())),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<String> {
        match &*self.0.content.borrow() {
            Content::String(value) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match &*self.0.content.borrow() {
            Content::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match &*self.0.content.borrow() {
            Content::Real(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match &*self.0.content.borrow() {
            Content::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match &*self.0.content.borrow() {
            Content::Date(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<Vec<u8>> {
        match &*self.0.content.borrow() {
            Content::Data(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Assigns a new leaf value of the same kind and raises `Changed`.
    fn assign(&self, value: Content) -> Result<()> {
        let expected = value.node_type();
        {
            let mut content = self.0.content.borrow_mut();
            let found = content.node_type();
            if found != expected {
                return Err(Error::from(TreeError::KindMismatch { expected, found }));
            }
            *content = value;
        }
        self.raise(ChangeAction::Changed, None, None, None, None);
        Ok(())
    }

    pub fn set_string<S: Into<String>>(&self, value: S) -> Result<()> {
        self.assign(Content::String(value.into()))
    }

    pub fn set_number(&self, value: i32) -> Result<()> {
        self.assign(Content::Number(value))
    }

    pub fn set_real(&self, value: f64) -> Result<()> {
        self.assign(Content::Real(value))
    }

    pub fn set_boolean(&self, value: bool) -> Result<()> {
        self.assign(Content::Boolean(value))
    }

    pub fn set_date(&self, value: DateTime<Utc>) -> Result<()> {
        self.assign(Content::Date(whole_seconds(value)))
    }

    pub fn set_data<B: Into<Vec<u8>>>(&self, value: B) -> Result<()> {
        self.assign(Content::Data(value.into()))
    }

    /// Parses `text` as a value of this node's kind and assigns it.
    ///
    /// Returns false, leaving the node untouched, when the text cannot be
    /// converted. Data and container nodes never accept text.
    pub fn try_set_from_str(&self, text: &str) -> bool {
        let value = match self.node_type() {
            NodeType::String => Some(Content::String(text.to_owned())),
            NodeType::Number => text.trim().parse::<i32>().ok().map(Content::Number),
            NodeType::Real => parse_real_text(text).map(Content::Real),
            NodeType::Boolean => {
                let text = text.trim();
                if text.eq_ignore_ascii_case("true") {
                    Some(Content::Boolean(true))
                } else if text.eq_ignore_ascii_case("false") {
                    Some(Content::Boolean(false))
                } else {
                    None
                }
            }
            NodeType::Date => parse_date_text(text).map(whole_seconds).map(Content::Date),
            NodeType::Data | NodeType::Dictionary | NodeType::Array => None,
        };
        match value {
            Some(value) => self.assign(value).is_ok(),
            None => false,
        }
    }

    /// Registers a callback invoked for every change event raised on this node.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ChangeEvent) + 'static,
    {
        let id = SubscriptionId(self.0.next_subscription.get());
        self.0.next_subscription.set(id.0 + 1);
        self.0.observers.borrow_mut().push((id, Rc::new(callback)));
        id
    }

    /// Removes a previously registered callback. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.0.observers.borrow_mut();
        let count = observers.len();
        observers.retain(|(registered, _)| *registered != id);
        observers.len() != count
    }

    /// Runs `f` with notifications on this node suppressed, then raises a
    /// single `Changed` event once the outermost batch completes.
    pub fn batch<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.0.suppressed.set(self.0.suppressed.get() + 1);
        let result = {
            let _suppression = Suppression(&self.0);
            f()
        };
        if self.0.suppressed.get() == 0 {
            self.raise(ChangeAction::Changed, None, None, None, None);
        }
        result
    }

    /// Notifies the observers of this node, then bubbles a `Changed` event up
    /// through every ancestor.
    pub(crate) fn raise(
        &self,
        action: ChangeAction,
        key: Option<String>,
        index: Option<usize>,
        old_item: Option<Node>,
        new_item: Option<Node>,
    ) {
        if self.0.suppressed.get() > 0 {
            return;
        }

        // Observers may mutate the tree, so no borrow is held while they run.
        let observers = self.0.observers.borrow()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect::<Vec<Observer>>();
        if !observers.is_empty() {
            let event = ChangeEvent {
                source: self.clone(),
                action,
                key,
                index,
                old_item,
                new_item,
            };
            for observer in observers {
                observer(&event);
            }
        }

        if let Some(parent) = self.parent() {
            let (key, index) = parent.locate(self);
            parent.raise(ChangeAction::Changed, key, index, None, Some(self.clone()));
        }
    }

    /// Verifies `child` may be attached beneath this container.
    fn check_attachable(&self, child: &Node) -> Result<()> {
        let mut ancestor = Some(self.clone());
        while let Some(node) = ancestor {
            if node.ptr_eq(child) {
                return Err(Error::from(TreeError::WouldCreateCycle));
            }
            ancestor = node.parent();
        }
        if child.parent().is_some() {
            return Err(Error::from(TreeError::AlreadyParented));
        }
        Ok(())
    }

    fn adopt(&self, child: &Node) {
        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
    }

    fn orphan(child: &Node) {
        *child.0.parent.borrow_mut() = Weak::new();
    }

    fn adopt_children(&self) {
        match &*self.0.content.borrow() {
            Content::Dictionary(entries) => entries.values().for_each(|child| self.adopt(child)),
            Content::Array(items) => items.iter().for_each(|child| self.adopt(child)),
            _ => {}
        }
    }

}

/// Accepts unsigned decimal text with at most one decimal point.
fn parse_real_text(text: &str) -> Option<f64> {
    let well_formed = !text.is_empty()
        && text.chars().all(|c| c.is_ascii_digit() || c == '.')
        && text.matches('.').count() <= 1;
    if well_formed {
        text.parse::<f64>().ok()
    } else {
        None
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Node) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        match (&*self.0.content.borrow(), &*other.0.content.borrow()) {
            (Content::Dictionary(a), Content::Dictionary(b)) =>
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x == y),
            (Content::Array(a), Content::Array(b)) =>
                a == b,
            (Content::String(a), Content::String(b)) =>
                a == b,
            (Content::Number(a), Content::Number(b)) =>
                a == b,
            (Content::Real(a), Content::Real(b)) =>
                OrderedFloat(*a) == OrderedFloat(*b),
            (Content::Boolean(a), Content::Boolean(b)) =>
                a == b,
            (Content::Date(a), Content::Date(b)) =>
                a == b,
            (Content::Data(a), Content::Data(b)) =>
                a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match &*self.0.content.borrow() {
            Content::Dictionary(entries) => {
                write!(formatter, "Dictionary")?;
                formatter.debug_map().entries(entries.iter()).finish()
            }
            Content::Array(items) => {
                write!(formatter, "Array")?;
                formatter.debug_list().entries(items.iter()).finish()
            }
            Content::String(value) => write!(formatter, "String({:?})", value),
            Content::Number(value) => write!(formatter, "Number({})", value),
            Content::Real(value) => write!(formatter, "Real({:?})", value),
            Content::Boolean(value) => write!(formatter, "Boolean({})", value),
            Content::Date(value) => write!(formatter, "Date({})", value.to_rfc3339()),
            Content::Data(value) => write!(formatter, "Data({} bytes)", value.len()),
        }
    }
}

/// Conversion used by `Dictionary::get_as` to view a child as a concrete type.
pub trait FromNode: Sized {
    /// Returns `None` when the node is of another kind.
    fn from_node(node: &Node) -> Option<Self>;
}

impl FromNode for Node {
    fn from_node(node: &Node) -> Option<Self> {
        Some(node.clone())
    }
}

impl FromNode for Dictionary {
    fn from_node(node: &Node) -> Option<Self> {
        node.as_dictionary()
    }
}

impl FromNode for Array {
    fn from_node(node: &Node) -> Option<Self> {
        node.as_array()
    }
}

impl FromNode for String {
    fn from_node(node: &Node) -> Option<Self> {
        node.as_string()
    }
}

impl FromNode for i32 {
    fn from_node(node: &Node) -> Option<Self> {
        node.as_i32()
    }
}

impl FromNode for f64 {
    fn from_node(node: &Node) -> Option<Self> {
        node.as_f64()
    }
}

impl FromNode for bool {
    fn from_node(node: &Node) -> Option<Self> {
        node.as_bool()
    }
}

impl FromNode for DateTime<Utc> {
    fn from_node(node: &Node) -> Option<Self> {
        node.as_date()
    }
}

impl FromNode for Vec<u8> {
    fn from_node(node: &Node) -> Option<Self> {
        node.as_data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_new_defaults() {
        assert_eq!(Node::new(NodeType::Number).as_i32(), Some(0));
        assert_eq!(Node::new(NodeType::Real).as_f64(), Some(0.0));
        assert_eq!(Node::new(NodeType::Boolean).as_bool(), Some(true));
        assert_eq!(Node::new(NodeType::String).as_string(), Some(String::new()));
        assert_eq!(Node::new(NodeType::Data).as_data(), Some(Vec::new()));
        assert_eq!(Node::new(NodeType::Date).node_type(), NodeType::Date);
        assert_eq!(Node::new(NodeType::Array).as_array().map(|a| a.len()), Some(0));
    }

    #[test]
    fn test_setter_kind_mismatch() {
        let node = Node::number(5);
        match node.set_string("five") {
            Err(Error::Tree(TreeError::KindMismatch { expected, found })) => {
                assert_eq!(expected, NodeType::String);
                assert_eq!(found, NodeType::Number);
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(node.as_i32(), Some(5));
    }

    #[test]
    fn test_try_set_from_str_number() {
        let node = Node::number(0);
        assert!(node.try_set_from_str(" -42 "));
        assert_eq!(node.as_i32(), Some(-42));
        assert!(!node.try_set_from_str("4294967296"));
        assert!(!node.try_set_from_str("1.5"));
        assert_eq!(node.as_i32(), Some(-42));
    }

    #[test]
    fn test_try_set_from_str_real() {
        let node = Node::real(0.0);
        assert!(node.try_set_from_str("3.25"));
        assert_eq!(node.as_f64(), Some(3.25));
        assert!(!node.try_set_from_str("-1"));
        assert!(!node.try_set_from_str("1e3"));
        assert!(!node.try_set_from_str("1.2.3"));
        assert!(!node.try_set_from_str(""));
    }

    #[test]
    fn test_try_set_from_str_boolean() {
        let node = Node::boolean(false);
        assert!(node.try_set_from_str(" TRUE "));
        assert_eq!(node.as_bool(), Some(true));
        assert!(!node.try_set_from_str("yes"));
    }

    #[test]
    fn test_try_set_from_str_date() {
        let node = Node::new(NodeType::Date);
        assert!(node.try_set_from_str("2020-02-29T12:30:00Z"));
        assert_eq!(
            node.as_date().map(|date| date.to_rfc3339()),
            Some(String::from("2020-02-29T12:30:00+00:00"))
        );
        assert!(!node.try_set_from_str("yesterday"));
    }

    #[test]
    fn test_try_set_from_str_rejected_kinds() {
        assert!(!Node::data(vec![1]).try_set_from_str("AQ=="));
        assert!(!Node::new(NodeType::Dictionary).try_set_from_str("{}"));
        let string = Node::string("");
        assert!(string.try_set_from_str("  verbatim "));
        assert_eq!(string.as_string(), Some(String::from("  verbatim ")));
    }

    #[test]
    fn test_leaf_change_bubbles_to_root() {
        let root = Dictionary::new();
        let child = Dictionary::new();
        let leaf = Node::string("a");
        child.set("leaf", leaf.clone()).unwrap();
        root.set("child", child.clone().into()).unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        root.subscribe(move |event| {
            sink.borrow_mut().push((event.action, event.key.clone()));
        });

        leaf.set_string("b").unwrap();
        assert_eq!(&*seen.borrow(), &[(ChangeAction::Changed, Some(String::from("child")))]);
    }

    #[test]
    fn test_unsubscribe() {
        let node = Node::number(1);
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        let id = node.subscribe(move |_| counter.set(counter.get() + 1));
        node.set_number(2).unwrap();
        assert!(node.unsubscribe(id));
        assert!(!node.unsubscribe(id));
        node.set_number(3).unwrap();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_batch_raises_once() {
        let array = Array::new();
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        array.subscribe(move |event| {
            assert_eq!(event.action, ChangeAction::Changed);
            counter.set(counter.get() + 1);
        });
        array.batch(|| {
            array.add(Node::number(1)).unwrap();
            array.batch(|| array.add(Node::number(2)).unwrap());
            array.add(Node::number(3)).unwrap();
        });
        assert_eq!(count.get(), 1);
        assert_eq!(array.len(), 3);
    }

    #[test]
    fn test_deep_clone_is_independent() {
        let root = Dictionary::new();
        let list = Array::new();
        list.add(Node::string("x")).unwrap();
        root.set("list", list.clone().into()).unwrap();

        let copy = root.deep_clone();
        assert_eq!(copy, *root);
        assert!(copy.parent().is_none());

        list.add(Node::string("y")).unwrap();
        assert_ne!(copy, *root);

        let copied_list = copy.as_dictionary().and_then(|d| d.get_as::<Array>("list")).unwrap();
        assert!(copied_list.parent().map(|p| p.ptr_eq(&copy)).unwrap_or(false));
    }

    #[test]
    fn test_equality_is_order_sensitive() {
        let a = Dictionary::new();
        a.set("x", Node::number(1)).unwrap();
        a.set("y", Node::number(2)).unwrap();
        let b = Dictionary::new();
        b.set("y", Node::number(2)).unwrap();
        b.set("x", Node::number(1)).unwrap();
        assert_ne!(*a, *b);
        assert_eq!(Node::real(f64::NAN), Node::real(f64::NAN));
    }

    #[test]
    fn test_remove_unparented() {
        match Node::number(1).remove() {
            Err(Error::Tree(TreeError::NotParented)) => {}
            other => panic!("unexpected result {:?}", other),
        }
        assert!(Node::number(1).replace(Node::number(2)).is_ok());
    }

    #[test]
    fn test_replace_and_remove_through_child() {
        let root = Dictionary::new();
        let first = Node::number(1);
        root.set("a", first.clone()).unwrap();
        root.set("b", Node::number(2)).unwrap();

        first.replace(Node::string("one")).unwrap();
        assert!(first.parent().is_none());
        assert_eq!(root.keys(), vec!["a", "b"]);
        assert_eq!(root.get_as::<String>("a"), Some(String::from("one")));

        root.get("b").unwrap().remove().unwrap();
        assert_eq!(root.keys(), vec!["a"]);
    }

    #[test]
    fn test_parent_dropped() {
        let leaf = Node::number(1);
        {
            let root = Array::new();
            root.add(leaf.clone()).unwrap();
            assert!(leaf.parent().is_some());
        }
        assert!(leaf.parent().is_none());
        let other = Array::new();
        assert!(other.add(leaf).is_ok());
    }
}
