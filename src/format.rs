//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! # Property list wire formats.
//!
//! Each format hands out read and write sessions. A read session decodes the
//! root object of a document held in memory. A write session encodes a single
//! root object and completes the document when it is finished.

use log::debug;

use std::io::Write;

use crate::de::BinaryReadSession;
use crate::error::{Error, Result};
use crate::json::JsonWriteSession;
use crate::object::Node;
use crate::ser::BinaryWriteSession;
use crate::xml::{XmlReadSession, XmlWriteSession};

/// How many containers deep a document may nest before readers give up.
pub(crate) const MAX_NESTING_DEPTH: usize = 128;

/// Decodes the root object of a recognized document.
pub trait ReadSession {
    fn read_object(&mut self) -> Result<Node>;
}

/// Encodes a root object.
///
/// Nothing is guaranteed to reach the underlying writer until the session
/// is finished.
pub trait WriteSession {
    fn write_object(&mut self, node: &Node) -> Result<()>;

    /// Completes the document and flushes the writer.
    fn finish(self: Box<Self>) -> Result<()>;
}

/// A property list wire format.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum PropertyListFormat {
    /// Binary property list, version 00.
    Binary,
    /// Apple plist XML 1.0.
    Xml,
    /// JSON. Write only.
    Json,
}

impl PropertyListFormat {

    /// Formats probed by detection, in order.
    const DETECTABLE: [PropertyListFormat; 2] = [PropertyListFormat::Binary, PropertyListFormat::Xml];

    /// Starts reading `input` in this format.
    ///
    /// Returns `Ok(None)` when the input does not look like this format.
    pub fn start_reading<'a>(self, input: &'a [u8]) -> Result<Option<Box<dyn ReadSession + 'a>>> {
        match self {
            PropertyListFormat::Binary =>
                Ok(BinaryReadSession::start(input).map(|session| Box::new(session) as Box<dyn ReadSession + 'a>)),
            PropertyListFormat::Xml =>
                Ok(XmlReadSession::start(input).map(|session| Box::new(session) as Box<dyn ReadSession + 'a>)),
            PropertyListFormat::Json =>
                Err(Error::Unsupported("reading JSON property lists")),
        }
    }

    /// Starts writing a document in this format to `writer`.
    pub fn start_writing<'a, W: Write + 'a>(self, writer: W) -> Result<Box<dyn WriteSession + 'a>> {
        debug!("writing {:?} property list", self);
        let session: Box<dyn WriteSession + 'a> = match self {
            PropertyListFormat::Binary => Box::new(BinaryWriteSession::start(writer)?),
            PropertyListFormat::Xml => Box::new(XmlWriteSession::start(writer)?),
            PropertyListFormat::Json => Box::new(JsonWriteSession::start(writer)),
        };
        Ok(session)
    }

    /// Probes the binary format, then XML, and returns the first that accepts the input.
    pub fn create_read_session<'a>(input: &'a [u8]) -> Option<(PropertyListFormat, Box<dyn ReadSession + 'a>)> {
        for format in PropertyListFormat::DETECTABLE.iter() {
            if let Ok(Some(session)) = format.start_reading(input) {
                debug!("detected {:?} property list", format);
                return Some((*format, session));
            }
        }
        debug!("unrecognized property list of {} bytes", input.len());
        None
    }

    /// Returns the format of `input`, if any.
    pub fn detect(input: &[u8]) -> Option<PropertyListFormat> {
        PropertyListFormat::create_read_session(input).map(|(format, _)| format)
    }

}
