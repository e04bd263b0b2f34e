//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! # plistdoc
//!
//! An ordered, observable property list tree with codecs for binary property
//! lists, plist XML and JSON output.
//!
//! ```no_run
//! use plistdoc::{Dictionary, Node, SaveOptions};
//!
//! # fn main() -> plistdoc::Result<()> {
//! let info = Dictionary::from_file("Info.plist")?;
//! info.set_string("CFBundleShortVersionString", "2.1")?;
//! info.get_array("UIBackgroundModes")?.add(Node::string("audio"))?;
//! info.save("Info.plist", SaveOptions::new().atomic(true))?;
//! # Ok(())
//! # }
//! ```

mod de;
mod document;
mod error;
mod format;
mod io;
mod json;
mod ser;
mod xml;

pub mod object;

pub use object::{
    Array,
    ChangeAction,
    ChangeEvent,
    Date,
    Dictionary,
    FromNode,
    Node,
    NodeType,
    SubscriptionId,
};

pub use de::{from_slice, Deserializer};
pub use error::{Error, Result, TreeError};
pub use format::{PropertyListFormat, ReadSession, WriteSession};
pub use io::SaveOptions;
