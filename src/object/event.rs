//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

use std::fmt;

use crate::object::Node;

/// The kind of mutation described by a `ChangeEvent`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ChangeAction {
    /// A child was attached to the container.
    Added,
    /// A child was detached from the container.
    Removed,
    /// A child was swapped for another at the same position.
    Replaced,
    /// Every child was detached from the container.
    Cleared,
    /// The node or one of its descendants changed.
    Changed,
}

/// A notification delivered to the observers of a node.
#[derive(Clone)]
pub struct ChangeEvent {
    /// The node the observer is registered on.
    pub source: Node,
    /// What happened.
    pub action: ChangeAction,
    /// The dictionary key of the affected child, if any.
    pub key: Option<String>,
    /// The array index of the affected child, if any.
    pub index: Option<usize>,
    /// The child that was detached or replaced.
    pub old_item: Option<Node>,
    /// The child that was attached, or the descendant that changed.
    pub new_item: Option<Node>,
}

impl fmt::Debug for ChangeEvent {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.debug_struct("ChangeEvent")
            .field("source", &self.source.node_type())
            .field("action", &self.action)
            .field("key", &self.key)
            .field("index", &self.index)
            .field("old_item", &self.old_item.as_ref().map(Node::node_type))
            .field("new_item", &self.new_item.as_ref().map(Node::node_type))
            .finish()
    }
}

/// Handle returned by `Node::subscribe`, used to remove the observer again.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct SubscriptionId(pub(crate) u64);
