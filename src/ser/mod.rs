//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Binary property list (bplist00) encoding.
//!
//! Writing happens in two passes. The first walks the tree and builds the
//! object reference table, which fixes the number of objects and therefore
//! the width of an object reference. The second writes every object once,
//! recording its offset, and the offset table and trailer are appended when
//! the session finishes.

mod refs;

use ascii::AsciiStr;
use log::{debug, trace};

use std::io::{self, Write};

use crate::document::{
    min_byte_length,
    ObjectFormat,
    Trailer,
    EXTENDED_LENGTH_NIBBLE,
    HEADER_MAGIC_NUMBER,
    HEADER_VERSION_00,
    MAX_INLINE_LENGTH,
    TRAILER_PADDING_SIZE,
};
use crate::error::{Error, Result};
use crate::format::WriteSession;
use crate::object::{absolute_time_from_date, Content, Node};

use self::refs::{ObjectKey, ReferenceTable};

/// Tracks the number of bytes written so far.
struct PositionWriter<W> {
    inner: W,
    position: usize,
}

impl<W: Write> Write for PositionWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.position += written;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// How an object starts once its offset has been recorded.
enum Head {
    /// A single marker byte.
    Marker(u8),
    /// A marker byte carrying a length, escaped to an integer object when long.
    Sized(ObjectFormat, usize),
    /// Nothing. Numbers write their own marker along with the value.
    Deferred,
}

pub(crate) struct BinaryWriteSession<W: Write> {
    writer: PositionWriter<W>,
    refs: ReferenceTable,
    offsets: Vec<usize>,
    object_reference_size: usize,
    started: bool,
}

impl<W: Write> BinaryWriteSession<W> {

    /// Writes the header and returns a session ready for the root object.
    pub(crate) fn start(writer: W) -> Result<Self> {
        let mut writer = PositionWriter { inner: writer, position: 0 };
        writer.write_all(HEADER_MAGIC_NUMBER)?;
        writer.write_all(&[HEADER_VERSION_00.0, HEADER_VERSION_00.1])?;
        Ok(BinaryWriteSession {
            writer,
            refs: ReferenceTable::default(),
            offsets: Vec::new(),
            object_reference_size: 1,
            started: false,
        })
    }

    fn resolve(&mut self, key: &ObjectKey) -> Result<usize> {
        self.refs.resolve(key).ok_or(Error::InvalidObjectReference)
    }

    /// Records the offset of an object and writes its head.
    ///
    /// Returns false when the object has already been written.
    fn write_head(&mut self, key: &ObjectKey, head: Head) -> Result<bool> {
        let id = self.resolve(key)?;
        let position = self.writer.position;
        let offset = self.offsets.get_mut(id).ok_or(Error::InvalidObjectReference)?;
        if *offset != 0 {
            return Ok(false);
        }
        *offset = position;

        match head {
            Head::Marker(marker) => self.writer.write_all(&[marker])?,
            Head::Sized(format, length) => {
                if length <= MAX_INLINE_LENGTH {
                    self.writer.write_all(&[format.marker(length as u8)])?;
                } else {
                    self.writer.write_all(&[format.marker(EXTENDED_LENGTH_NIBBLE)])?;
                    self.write_integer(length as i64)?;
                }
            }
            Head::Deferred => {}
        }
        Ok(true)
    }

    /// Writes an integer object using the narrowest width the format allows.
    ///
    /// Negative values always take eight bytes.
    fn write_integer(&mut self, value: i64) -> Result<()> {
        if value < 0 {
            self.writer.write_all(&[ObjectFormat::SInt64.marker(0)])?;
            self.writer.write_all(&value.to_be_bytes())?;
        } else if value < 255 {
            self.writer.write_all(&[ObjectFormat::UInt8.marker(0), value as u8])?;
        } else if value < 32767 {
            self.writer.write_all(&[ObjectFormat::UInt16.marker(0)])?;
            self.writer.write_all(&(value as u16).to_be_bytes())?;
        } else if value <= i64::from(u32::max_value()) {
            self.writer.write_all(&[ObjectFormat::UInt32.marker(0)])?;
            self.writer.write_all(&(value as u32).to_be_bytes())?;
        } else {
            self.writer.write_all(&[ObjectFormat::SInt64.marker(0)])?;
            self.writer.write_all(&value.to_be_bytes())?;
        }
        Ok(())
    }

    /// Writes a real object, narrowing to four bytes when nothing is lost.
    fn write_real(&mut self, value: f64) -> Result<()> {
        let narrow = value as f32;
        if f64::from(narrow) == value {
            self.writer.write_all(&[ObjectFormat::Float32.marker(0)])?;
            self.writer.write_all(&narrow.to_be_bytes())?;
        } else {
            self.writer.write_all(&[ObjectFormat::Float64.marker(0)])?;
            self.writer.write_all(&value.to_be_bytes())?;
        }
        Ok(())
    }

    /// Writes the low bytes of an object reference.
    fn write_reference(&mut self, id: usize) -> Result<()> {
        let bytes = (id as u64).to_be_bytes();
        self.writer.write_all(&bytes[8 - self.object_reference_size ..])?;
        Ok(())
    }

    fn write_string(&mut self, key: &ObjectKey, value: &str) -> Result<()> {
        match AsciiStr::from_ascii(value) {
            Ok(ascii) => {
                if self.write_head(key, Head::Sized(ObjectFormat::AsciiString, ascii.len()))? {
                    self.writer.write_all(ascii.as_bytes())?;
                }
            }
            Err(_) => {
                let units = value.encode_utf16().collect::<Vec<u16>>();
                if self.write_head(key, Head::Sized(ObjectFormat::Utf16String, units.len()))? {
                    let bytes = units.iter()
                        .flat_map(|unit| unit.to_be_bytes().to_vec())
                        .collect::<Vec<u8>>();
                    self.writer.write_all(&bytes)?;
                }
            }
        }
        Ok(())
    }

    fn write_node(&mut self, node: &Node) -> Result<()> {
        let key = ObjectKey::of(node);
        let content = node.content();

        match &*content {
            Content::Boolean(value) => {
                self.write_head(&key, Head::Marker(ObjectFormat::Boolean.marker(*value as u8)))?;
            }
            Content::Number(value) => {
                if self.write_head(&key, Head::Deferred)? {
                    self.write_integer(i64::from(*value))?;
                }
            }
            Content::Real(value) => {
                if self.write_head(&key, Head::Deferred)? {
                    self.write_real(*value)?;
                }
            }
            Content::Date(value) => {
                if self.write_head(&key, Head::Marker(ObjectFormat::Date.marker(0)))? {
                    self.writer.write_all(&absolute_time_from_date(value).to_be_bytes())?;
                }
            }
            Content::Data(bytes) => {
                if self.write_head(&key, Head::Sized(ObjectFormat::Data, bytes.len()))? {
                    self.writer.write_all(bytes)?;
                }
            }
            Content::String(value) => {
                self.write_string(&key, value)?;
            }
            Content::Array(items) => {
                if !self.write_head(&key, Head::Sized(ObjectFormat::Array, items.len()))? {
                    return Ok(());
                }

                // References first, then the bodies from the same cursor.
                let cursor = self.refs.cursor();
                for item in items {
                    let id = self.resolve(&ObjectKey::of(item))?;
                    self.write_reference(id)?;
                }
                self.refs.set_cursor(cursor);

                for item in items {
                    self.write_node(item)?;
                }
            }
            Content::Dictionary(entries) => {
                if !self.write_head(&key, Head::Sized(ObjectFormat::Dictionary, entries.len()))? {
                    return Ok(());
                }

                // All key references, all value references, then the bodies in the same order.
                let cursor = self.refs.cursor();
                for name in entries.keys() {
                    let id = self.resolve(&ObjectKey::String(name.clone()))?;
                    self.write_reference(id)?;
                }
                for value in entries.values() {
                    let id = self.resolve(&ObjectKey::of(value))?;
                    self.write_reference(id)?;
                }
                self.refs.set_cursor(cursor);

                for name in entries.keys() {
                    self.write_string(&ObjectKey::String(name.clone()), name)?;
                }
                for value in entries.values() {
                    self.write_node(value)?;
                }
            }
        }
        Ok(())
    }

}

impl<W: Write> WriteSession for BinaryWriteSession<W> {

    fn write_object(&mut self, node: &Node) -> Result<()> {
        if self.started {
            return Err(Error::Message(String::from("a binary property list holds a single root object")));
        }
        self.started = true;

        self.refs = ReferenceTable::build(node);
        self.offsets = vec![0; self.refs.len()];
        self.object_reference_size = min_byte_length(self.refs.len());
        trace!("{} objects, {}-byte references", self.refs.len(), self.object_reference_size);

        self.write_node(node)
    }

    fn finish(mut self: Box<Self>) -> Result<()> {
        if self.started {
            let offset_table_offset = self.writer.position;
            let offset_table_entry_size = min_byte_length(offset_table_offset);
            trace!("offset table at {}, {}-byte entries", offset_table_offset, offset_table_entry_size);

            let mut table = Vec::with_capacity(self.offsets.len() * offset_table_entry_size);
            for offset in &self.offsets {
                let bytes = (*offset as u64).to_be_bytes();
                table.extend_from_slice(&bytes[8 - offset_table_entry_size ..]);
            }
            self.writer.write_all(&table)?;
            self.writer.write_all(&[0; TRAILER_PADDING_SIZE])?;

            let trailer = Trailer {
                offset_table_entry_size,
                object_reference_size: self.object_reference_size,
                number_of_objects: self.offsets.len(),
                root_object: 0,
                offset_table_offset,
            };
            self.writer.write_all(&trailer.to_bytes())?;
        }
        self.writer.flush()?;
        debug!("finished binary property list, {} bytes", self.writer.position);
        Ok(())
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::object::{Array, Dictionary};

    fn encode(node: &Node) -> Vec<u8> {
        let mut output = Vec::new();
        let mut session = Box::new(BinaryWriteSession::start(&mut output).unwrap());
        session.write_object(node).unwrap();
        session.finish().unwrap();
        output
    }

    /// Returns the object table, between the header and the offset table.
    fn objects(document: &[u8], offset_table_offset: usize) -> &[u8] {
        &document[8 .. offset_table_offset]
    }

    #[test]
    fn test_integer_list() {
        let array = Array::new();
        for value in 1 ..= 5 {
            array.add(Node::number(value)).unwrap();
        }
        let document = encode(&array);
        assert_eq!(document, vec![
            // Header
            0x62, 0x70, 0x6C, 0x69, 0x73, 0x74, 0x30, 0x30,
            // Array(length = 5) -> [1, 2, 3, 4, 5]
            0xA5, 0x01, 0x02, 0x03, 0x04, 0x05,
            // UInt8(1) .. UInt8(5)
            0x10, 0x01, 0x10, 0x02, 0x10, 0x03, 0x10, 0x04, 0x10, 0x05,
            // Offset table
            0x08, 0x0E, 0x10, 0x12, 0x14, 0x16,
            // Padding
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            // Trailer
            0x01, 0x01,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x06,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x18,
        ]);
    }

    #[test]
    fn test_equal_strings_written_once() {
        let array = Array::new();
        array.add(Node::string("x")).unwrap();
        array.add(Node::string("x")).unwrap();
        let document = encode(&array);
        assert_eq!(objects(&document, 13), &[
            // Array(length = 2) -> [1, 1]
            0xA2, 0x01, 0x01,
            // AsciiString("x")
            0x51, 0x78,
        ]);
        assert_eq!(&document[13 .. 15], &[0x08, 0x0B]);
        assert_eq!(document.len(), 13 + 2 + 6 + 26);
    }

    #[test]
    fn test_booleans_written_every_time() {
        let array = Array::new();
        array.add(Node::boolean(true)).unwrap();
        array.add(Node::boolean(true)).unwrap();
        let document = encode(&array);
        assert_eq!(objects(&document, 13), &[
            // Array(length = 2) -> [1, 2]
            0xA2, 0x01, 0x02,
            // Boolean(true), Boolean(true)
            0x09, 0x09,
        ]);
        assert_eq!(&document[13 .. 16], &[0x08, 0x0B, 0x0C]);
    }

    #[test]
    fn test_dictionary_key_shared_with_value() {
        let dictionary = Dictionary::new();
        dictionary.set("name", Node::string("name")).unwrap();
        let document = encode(&dictionary);
        assert_eq!(objects(&document, 16), &[
            // Dictionary(length = 1) -> { 1: 1 }
            0xD1, 0x01, 0x01,
            // AsciiString("name")
            0x54, 0x6E, 0x61, 0x6D, 0x65,
        ]);
    }

    #[test]
    fn test_integer_widths() {
        let cases: Vec<(i32, Vec<u8>)> = vec![
            (-1, vec![0x13, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]),
            (0, vec![0x10, 0x00]),
            (200, vec![0x10, 0xC8]),
            (255, vec![0x11, 0x00, 0xFF]),
            (40000, vec![0x12, 0x00, 0x00, 0x9C, 0x40]),
        ];
        for (value, expected) in cases {
            let document = encode(&Node::number(value));
            assert_eq!(objects(&document, 8 + expected.len()), &expected[..], "value {}", value);
        }
    }

    #[test]
    fn test_real_widths() {
        let document = encode(&Node::real(0.5));
        assert_eq!(objects(&document, 13), &[0x22, 0x3F, 0x00, 0x00, 0x00]);
        let document = encode(&Node::real(0.1));
        assert_eq!(objects(&document, 17)[0], 0x23);
        assert_eq!(&objects(&document, 17)[1 ..], &0.1f64.to_be_bytes());
    }

    #[test]
    fn test_epoch_date() {
        let epoch = chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2001, 1, 1, 0, 0, 0).unwrap();
        let document = encode(&Node::date(epoch));
        assert_eq!(objects(&document, 17), &[0x33, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_long_and_wide_strings() {
        let document = encode(&Node::string("abcdefghijklmno"));
        assert_eq!(&objects(&document, 26)[.. 3], &[0x5F, 0x10, 0x0F]);

        let document = encode(&Node::string("h\u{E9}"));
        assert_eq!(objects(&document, 13), &[0x62, 0x00, 0x68, 0x00, 0xE9]);
    }

    #[test]
    fn test_second_root_rejected() {
        let mut output = Vec::new();
        let mut session = BinaryWriteSession::start(&mut output).unwrap();
        session.write_object(&Node::number(1)).unwrap();
        match session.write_object(&Node::number(2)) {
            Err(Error::Message(_)) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_nothing_written() {
        let mut output = Vec::new();
        Box::new(BinaryWriteSession::start(&mut output).unwrap()).finish().unwrap();
        assert_eq!(output, b"bplist00".to_vec());
    }

    #[test]
    fn test_round_trip_through_reader() {
        let root = Dictionary::new();
        root.set("name", Node::string("Example")).unwrap();
        root.set("flags", Array::new().into()).unwrap();
        root.get_array("flags").unwrap().add(Node::boolean(false)).unwrap();
        root.set("blob", Node::data(vec![0u8; 20])).unwrap();
        root.set("ratio", Node::real(-2.75)).unwrap();
        let document = encode(&root);
        let decoded = crate::de::from_slice::<Node>(&document).unwrap();
        assert_eq!(decoded, *root.node());
    }
}
