//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

use std::cmp::Ordering;
use std::ops::Deref;

use crate::error::{Error, Result, TreeError};
use crate::object::{ChangeAction, Content, Node, NodeType};

/// A handle to an array node. Dereferences to `Node`.
#[derive(Clone, Debug, PartialEq)]
pub struct Array(pub(crate) Node);

impl Deref for Array {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.0
    }
}

impl From<Array> for Node {
    fn from(array: Array) -> Node {
        array.0
    }
}

impl Default for Array {
    fn default() -> Self {
        Array::new()
    }
}

impl Array {

    pub fn new() -> Array {
        Array(Node::new(NodeType::Array))
    }

    /// Returns the underlying node handle.
    pub fn node(&self) -> &Node {
        &self.0
    }

    fn with_items<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&Vec<Node>) -> R,
    {
        match &*self.0.content() {
            Content::Array(items) => f(items),
            _ => unreachable!("array handle over a non-array node"),
        }
    }

    fn with_items_mut<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut Vec<Node>) -> R,
    {
        match &mut *self.0.content_mut() {
            Content::Array(items) => f(items),
            _ => unreachable!("array handle over a non-array node"),
        }
    }

    pub fn len(&self) -> usize {
        self.with_items(|items| items.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a snapshot of the elements.
    pub fn items(&self) -> Vec<Node> {
        self.with_items(|items| items.clone())
    }

    fn out_of_range(&self, index: usize) -> Error {
        Error::from(TreeError::IndexOutOfRange { index, len: self.len() })
    }

    pub fn get(&self, index: usize) -> Result<Node> {
        self.with_items(|items| items.get(index).cloned())
            .ok_or_else(|| self.out_of_range(index))
    }

    /// Replaces the element at `index`.
    pub fn set(&self, index: usize, node: Node) -> Result<()> {
        let existing = self.get(index)?;
        if existing.ptr_eq(&node) {
            return Ok(());
        }
        self.check_attachable(&node)?;
        self.with_items_mut(|items| items[index] = node.clone());
        Node::orphan(&existing);
        self.adopt(&node);
        self.raise(ChangeAction::Replaced, None, Some(index), Some(existing), Some(node));
        Ok(())
    }

    /// Appends an element.
    pub fn add(&self, node: Node) -> Result<()> {
        let index = self.len();
        self.insert(index, node)
    }

    /// Inserts an element at `index`, which may equal the length of the array.
    pub fn insert(&self, index: usize, node: Node) -> Result<()> {
        if index > self.len() {
            return Err(self.out_of_range(index));
        }
        self.check_attachable(&node)?;
        self.with_items_mut(|items| items.insert(index, node.clone()));
        self.adopt(&node);
        self.raise(ChangeAction::Added, None, Some(index), None, Some(node));
        Ok(())
    }

    /// Swaps the element `old` for `node`. Does nothing if `old` is not an element.
    pub fn replace(&self, old: &Node, node: Node) -> Result<()> {
        match self.position(old) {
            Some(index) => self.set(index, node),
            None => Ok(()),
        }
    }

    fn position(&self, node: &Node) -> Option<usize> {
        self.with_items(|items| items.iter().position(|item| item.ptr_eq(node)))
    }

    /// Detaches the element `node`. Returns false if it is not an element.
    pub fn remove(&self, node: &Node) -> bool {
        match self.position(node) {
            Some(index) => self.remove_at(index).is_ok(),
            None => false,
        }
    }

    /// Detaches and returns the element at `index`.
    pub fn remove_at(&self, index: usize) -> Result<Node> {
        if index >= self.len() {
            return Err(self.out_of_range(index));
        }
        let node = self.with_items_mut(|items| items.remove(index));
        Node::orphan(&node);
        self.raise(ChangeAction::Removed, None, Some(index), Some(node.clone()), None);
        Ok(node)
    }

    /// Detaches every element.
    pub fn clear(&self) {
        let items = self.with_items_mut(|items| std::mem::take(items));
        items.iter().for_each(Node::orphan);
        self.raise(ChangeAction::Cleared, None, None, None, None);
    }

    /// Sorts the elements in place with a stable sort and raises `Changed`.
    pub fn sort_by<F>(&self, mut compare: F)
    where
        F: FnMut(&Node, &Node) -> Ordering,
    {
        let mut items = self.items();
        items.sort_by(|a, b| compare(a, b));
        self.with_items_mut(|current| *current = items);
        self.raise(ChangeAction::Changed, None, None, None, None);
    }

    /// Replaces the contents with the non-empty pieces of `list`, split on
    /// commas and spaces, as string elements. Raises a single `Changed`.
    pub fn assign_string_list(&self, list: &str) {
        self.batch(|| {
            self.clear();
            for piece in list.split(|c| c == ',' || c == ' ').filter(|piece| !piece.is_empty()) {
                let node = Node::string(piece);
                self.adopt(&node);
                self.with_items_mut(|items| items.push(node));
            }
        })
    }

    /// Returns the values of the string elements, skipping other kinds.
    pub fn to_string_vec(&self) -> Vec<String> {
        self.with_items(|items| items.iter().filter_map(Node::as_string).collect())
    }

    /// Returns the values of the string elements joined with `", "`.
    pub fn to_string_list(&self) -> String {
        self.to_string_vec().join(", ")
    }

    /// Moves the elements of a decoded array into this one, replacing the
    /// current contents and raising a single `Changed` event.
    pub(crate) fn take_contents_of(&self, source: &Array) {
        self.batch(|| {
            self.clear();
            let items = source.with_items_mut(|items| std::mem::take(items));
            for node in &items {
                Node::orphan(node);
                self.adopt(node);
            }
            self.with_items_mut(|current| *current = items);
        })
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::rc::Rc;

    fn record(node: &Node) -> Rc<RefCell<Vec<(ChangeAction, Option<usize>)>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        node.subscribe(move |event| sink.borrow_mut().push((event.action, event.index)));
        seen
    }

    fn numbers(array: &Array) -> Vec<i32> {
        array.items().iter().filter_map(Node::as_i32).collect()
    }

    #[test]
    fn test_add_insert_get() {
        let array = Array::new();
        array.add(Node::number(1)).unwrap();
        array.add(Node::number(3)).unwrap();
        array.insert(1, Node::number(2)).unwrap();
        array.insert(3, Node::number(4)).unwrap();
        assert_eq!(numbers(&array), vec![1, 2, 3, 4]);
        assert_eq!(array.get(2).unwrap().as_i32(), Some(3));
    }

    #[test]
    fn test_index_out_of_range() {
        let array = Array::new();
        array.add(Node::number(1)).unwrap();
        match array.get(1) {
            Err(Error::Tree(TreeError::IndexOutOfRange { index: 1, len: 1 })) => {}
            other => panic!("unexpected result {:?}", other),
        }
        assert!(array.set(1, Node::number(2)).is_err());
        assert!(array.insert(2, Node::number(2)).is_err());
        assert!(array.remove_at(1).is_err());
    }

    #[test]
    fn test_set_and_replace() {
        let array = Array::new();
        let first = Node::number(1);
        array.add(first.clone()).unwrap();
        array.add(Node::number(2)).unwrap();
        let seen = record(&array);

        array.replace(&first, Node::number(10)).unwrap();
        assert!(first.parent().is_none());
        array.set(1, Node::number(20)).unwrap();
        assert_eq!(numbers(&array), vec![10, 20]);
        assert_eq!(&*seen.borrow(), &[
            (ChangeAction::Replaced, Some(0)),
            (ChangeAction::Replaced, Some(1)),
        ]);
    }

    #[test]
    fn test_remove() {
        let array = Array::new();
        let node = Node::string("a");
        array.add(node.clone()).unwrap();
        array.add(Node::string("b")).unwrap();
        assert!(array.remove(&node));
        assert!(!array.remove(&node));
        assert!(node.parent().is_none());
        let removed = array.remove_at(0).unwrap();
        assert_eq!(removed.as_string(), Some(String::from("b")));
        assert!(array.is_empty());
    }

    #[test]
    fn test_sort_by() {
        let array = Array::new();
        for value in &[3, 1, 2] {
            array.add(Node::number(*value)).unwrap();
        }
        let seen = record(&array);
        array.sort_by(|a, b| a.as_i32().cmp(&b.as_i32()));
        assert_eq!(numbers(&array), vec![1, 2, 3]);
        assert_eq!(&*seen.borrow(), &[(ChangeAction::Changed, None)]);
    }

    #[test]
    fn test_assign_string_list() {
        let array = Array::new();
        array.add(Node::number(1)).unwrap();
        let seen = record(&array);
        array.assign_string_list("armv7, arm64,,x86_64  i386");
        assert_eq!(array.to_string_vec(), vec!["armv7", "arm64", "x86_64", "i386"]);
        assert_eq!(array.to_string_list(), "armv7, arm64, x86_64, i386");
        assert_eq!(seen.borrow().len(), 1);
        assert!(array.get(0).unwrap().parent().is_some());
    }

    #[test]
    fn test_to_string_vec_skips_other_kinds() {
        let array = Array::new();
        array.add(Node::string("a")).unwrap();
        array.add(Node::number(2)).unwrap();
        array.add(Node::string("b")).unwrap();
        assert_eq!(array.to_string_list(), "a, b");
    }

    #[test]
    fn test_element_change_bubbles_with_index() {
        let array = Array::new();
        let leaf = Node::boolean(false);
        array.add(Node::boolean(true)).unwrap();
        array.add(leaf.clone()).unwrap();
        let seen = record(&array);
        leaf.set_boolean(true).unwrap();
        assert_eq!(&*seen.borrow(), &[(ChangeAction::Changed, Some(1))]);
    }
}
