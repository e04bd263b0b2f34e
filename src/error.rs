//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

use std;
use std::fmt::{self, Display};
use std::io;

use serde::de;

use crate::object::NodeType;

pub type Result<T> = std::result::Result<T, Error>;

/// Misuse of the node tree.
///
/// These signal a programming error on the caller's side rather than a
/// problem with the data being decoded.
#[derive(Clone, Debug, PartialEq)]
pub enum TreeError {
    /// The node already belongs to a container and must be removed from it first.
    AlreadyParented,
    /// The operation requires the node to belong to a container.
    NotParented,
    /// Attaching the node would make a container its own descendant.
    WouldCreateCycle,
    /// An array index outside of the valid range.
    IndexOutOfRange { index: usize, len: usize },
    /// The key is already present in the dictionary.
    DuplicateKey(String),
    /// The node is not of the kind required by the operation.
    KindMismatch { expected: NodeType, found: NodeType },
}

impl Display for TreeError {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TreeError::AlreadyParented =>
                formatter.write_str("node is already parented"),
            TreeError::NotParented =>
                formatter.write_str("node has no parent container"),
            TreeError::WouldCreateCycle =>
                formatter.write_str("a container cannot be added beneath itself"),
            TreeError::IndexOutOfRange { index, len } =>
                write!(formatter, "index {} is out of range for array of length {}", index, len),
            TreeError::DuplicateKey(key) =>
                write!(formatter, "an item with the key `{}` has already been added", key),
            TreeError::KindMismatch { expected, found } =>
                write!(formatter, "expected {:?} node, found {:?}", expected, found),
        }
    }
}

/// Property list serialization and deserialization error.
#[derive(Debug)]
pub enum Error {
    /// Constructed from serialization and deserialization errors.
    Message(String),
    /// The bplist magic number and version marker is missing or invalid.
    MissingOrInvalidHeader,
    /// The offset table used determine the location of objects in the object table is missing or invalid.
    MissingOrInvalidOffsetTable,
    /// The trailer with the metadata necessary to interpret the offset table and object table is missing or invalid.
    MissingOrInvalidTrailer,
    /// Encountered a reference to an object not in the offset table.
    InvalidObjectReference,
    /// Encountered an offset to an object not in the object table.
    InvalidOffsetToObject,
    /// Encountered a marker byte for an object format not supported by this library.
    InvalidOrUnsupportedObjectFormat,
    /// The root object in the trailer is not in the offset table.
    InvalidRootObject,
    /// The current object was expected to be a valid boolean, but parsing it failed.
    ExpectedBool,
    /// The current object was expected to be a valid fill byte, but parsing it failed.
    ExpectedFill,
    /// The current object was expected to be a valid 8-bit unsigned integer, but parsing it failed.
    ExpectedUInt8,
    /// The current object was expected to be a valid 16-bit unsigned integer, but parsing it failed.
    ExpectedUInt16,
    /// The current object was expected to be a valid 32-bit unsigned integer, but parsing it failed.
    ExpectedUInt32,
    /// The current object was expected to be a valid 64-bit unsigned integer, but parsing it failed.
    ExpectedSInt64,
    /// The current object was expected to be a valid 32-bit single-precision floating point value.
    ExpectedFloat32,
    /// The current object was expected to be a valid 64-bit double-precision floating point value.
    ExpectedFloat64,
    /// The current object was expected to be a valid array, but parsing it failed.
    ExpectedArray,
    /// The current object was expected to be a valid date object, but parsing it failed.
    ExpectedDate,
    /// The current object was expected to be a valid data buffer, but parsing it failed.
    ExpectedData,
    /// The current object was expected to be a valid ASCII string, but parsing it failed.
    ExpectedAsciiString,
    /// The current object was expected to be a valid UTF-16 string, but parsing it failed.
    ExpectedUtf16String,
    /// The current object was expected to be a valid dictionary, but parsing it failed.
    ExpectedDictionary,
    /// Binary property lists are directed acyclic graphs and objects cannot reference each other.
    CycleDetected,
    /// Containers are nested deeper than readers accept.
    NestingTooDeep,
    /// Shared references expand to more objects than the document could hold as a tree.
    TooManyObjects,
    /// Prematurely reached the end of the file.
    Eof,
    /// The XML document is not well formed.
    Xml(quick_xml::Error),
    /// An XML element name which does not correspond to any plist type.
    UnknownElement(String),
    /// A dictionary entry did not start with a `<key>` element.
    ExpectedKey(String),
    /// A dictionary key was not followed by a value before the dictionary closed.
    MissingValueForKey(String),
    /// The text of an `<integer>` element is not a valid 32-bit integer.
    InvalidInteger(String),
    /// The text of a `<real>` element is not a valid floating point value.
    InvalidReal(String),
    /// The text of a `<date>` element is not a valid date.
    InvalidDate(String),
    /// The text of a `<data>` element is not valid base64.
    InvalidData(String),
    /// The input is neither a binary nor an XML property list.
    UnrecognizedFormat,
    /// The requested operation is not supported by the format.
    Unsupported(&'static str),
    /// The root object of the document is not a dictionary.
    RootObjectNotDictionary,
    /// No XML property list could be located inside the buffer.
    EmbeddedPlistNotFound,
    /// The node tree was used incorrectly.
    Tree(TreeError),
    /// Reading or writing the underlying storage failed.
    Io(io::Error),
}

impl de::Error for Error {
    fn custom<T: Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error::Io(error)
    }
}

impl From<quick_xml::Error> for Error {
    fn from(error: quick_xml::Error) -> Self {
        Error::Xml(error)
    }
}

impl From<TreeError> for Error {
    fn from(error: TreeError) -> Self {
        Error::Tree(error)
    }
}

impl Display for Error {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Message(msg) =>
                formatter.write_str(msg),
            Error::MissingOrInvalidHeader =>
                formatter.write_str("missing or invalid bplist header"),
            Error::MissingOrInvalidOffsetTable =>
                formatter.write_str("missing or invalid bplist offset table"),
            Error::MissingOrInvalidTrailer =>
                formatter.write_str("missing or invalid bplist trailer"),
            Error::InvalidObjectReference =>
                formatter.write_str("invalid reference to object not in offset table"),
            Error::InvalidOffsetToObject =>
                formatter.write_str("invalid offset to element in offset table"),
            Error::InvalidOrUnsupportedObjectFormat =>
                formatter.write_str("invalid or unsupported object format encountered"),
            Error::InvalidRootObject =>
                formatter.write_str("invalid root object in document metadata"),
            Error::ExpectedBool =>
                formatter.write_str("expected boolean"),
            Error::ExpectedFill =>
                formatter.write_str("expected fill unit type"),
            Error::ExpectedUInt8 =>
                formatter.write_str("expected 8-bit unsigned integer"),
            Error::ExpectedUInt16 =>
                formatter.write_str("expected 16-bit unsigned integer"),
            Error::ExpectedUInt32 =>
                formatter.write_str("expected 32-bit unsigned integer"),
            Error::ExpectedSInt64 =>
                formatter.write_str("expected 64-bit signed integer"),
            Error::ExpectedFloat32 =>
                formatter.write_str("expected 32-bit single-precision floating point value"),
            Error::ExpectedFloat64 =>
                formatter.write_str("expected 64-bit double-precision floating point value"),
            Error::ExpectedArray =>
                formatter.write_str("expected array of object references"),
            Error::ExpectedDate =>
                formatter.write_str("expected CFAbsoluteTime value"),
            Error::ExpectedData =>
                formatter.write_str("expected data"),
            Error::ExpectedAsciiString =>
                formatter.write_str("expected ASCII string"),
            Error::ExpectedUtf16String =>
                formatter.write_str("expected UTF-16 string"),
            Error::ExpectedDictionary =>
                formatter.write_str("expected dictionary"),
            Error::CycleDetected =>
                formatter.write_str("cycle detected"),
            Error::NestingTooDeep =>
                formatter.write_str("containers nested too deeply"),
            Error::TooManyObjects =>
                formatter.write_str("object references expand to too many objects"),
            Error::Eof =>
                formatter.write_str("unexpected end of input"),
            Error::Xml(error) =>
                write!(formatter, "malformed XML: {}", error),
            Error::UnknownElement(name) =>
                write!(formatter, "failed to parse plist data type: {}", name),
            Error::ExpectedKey(name) =>
                write!(formatter, "expected <key> in dictionary, found <{}>", name),
            Error::MissingValueForKey(key) =>
                write!(formatter, "no value found for key {}", key),
            Error::InvalidInteger(text) =>
                write!(formatter, "invalid integer value `{}`", text),
            Error::InvalidReal(text) =>
                write!(formatter, "invalid real value `{}`", text),
            Error::InvalidDate(text) =>
                write!(formatter, "invalid date value `{}`", text),
            Error::InvalidData(reason) =>
                write!(formatter, "invalid base64 data: {}", reason),
            Error::UnrecognizedFormat =>
                formatter.write_str("unrecognized property list format"),
            Error::Unsupported(what) =>
                write!(formatter, "unsupported operation: {}", what),
            Error::RootObjectNotDictionary =>
                formatter.write_str("root object is not a dictionary"),
            Error::EmbeddedPlistNotFound =>
                formatter.write_str("did not find XML plist in buffer"),
            Error::Tree(error) =>
                error.fmt(formatter),
            Error::Io(error) =>
                error.fmt(formatter),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Xml(error) => Some(error),
            Error::Io(error) => Some(error),
            _ => None,
        }
    }
}
