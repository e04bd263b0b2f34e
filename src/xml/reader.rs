//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use indexmap::IndexMap;
use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};
use crate::format::{ReadSession, MAX_NESTING_DEPTH};
use crate::object::{parse_date_text, Node};

const BYTE_ORDER_MARK: &[u8] = &[0xEF, 0xBB, 0xBF];

/// An element which opens a value, and whether it was self-closing.
type Opening<'a> = (BytesStart<'a>, bool);

fn element_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

/// A read session positioned at the first element inside `<plist>`.
pub(crate) struct XmlReadSession<'a> {
    reader: Reader<&'a [u8]>,
    root: Option<Opening<'a>>,
    /// Containers currently open.
    depth: usize,
}

impl<'a> XmlReadSession<'a> {

    /// Returns a session if the input holds a `<plist>` element with a child.
    ///
    /// Malformed markup before the first child means the input is not XML
    /// as far as detection is concerned.
    pub(crate) fn start(input: &'a [u8]) -> Option<Self> {
        let input = input.strip_prefix(BYTE_ORDER_MARK).unwrap_or(input);
        let mut session = XmlReadSession {
            reader: Reader::from_reader(input),
            root: None,
            depth: 0,
        };
        match session.find_root() {
            Ok(Some(root)) => {
                session.root = Some(root);
                Some(session)
            }
            Ok(None) => None,
            Err(error) => {
                debug!("not an xml property list: {}", error);
                None
            }
        }
    }

    fn find_root(&mut self) -> Result<Option<Opening<'a>>> {
        loop {
            match self.next_event()? {
                Event::Start(element) if element.local_name().as_ref() == b"plist" => break,
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
        loop {
            match self.next_event()? {
                Event::Start(element) => return Ok(Some((element, false))),
                Event::Empty(element) => return Ok(Some((element, true))),
                Event::End(_) | Event::Eof => return Ok(None),
                _ => {}
            }
        }
    }

    /// Returns the next event which carries structure, skipping whitespace,
    /// comments and declarations.
    fn next_event(&mut self) -> Result<Event<'a>> {
        loop {
            match self.reader.read_event()? {
                Event::Text(text) if text.iter().all(u8::is_ascii_whitespace) => {}
                Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
                event => return Ok(event),
            }
        }
    }

    /// Reads the character content of an element up to and including its end tag.
    fn read_text(&mut self, empty: bool) -> Result<String> {
        let mut text = String::new();
        if empty {
            return Ok(text);
        }
        loop {
            match self.reader.read_event()? {
                Event::Text(content) => text.push_str(&content.unescape()?),
                Event::CData(content) => text.push_str(&String::from_utf8_lossy(&content)),
                Event::End(_) => return Ok(text),
                Event::Start(element) | Event::Empty(element) =>
                    return Err(Error::UnknownElement(element_name(&element))),
                Event::Eof => return Err(Error::Eof),
                _ => {}
            }
        }
    }

    fn enter_container(&mut self) -> Result<()> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(Error::NestingTooDeep);
        }
        self.depth += 1;
        Ok(())
    }

    fn read_element(&mut self, element: &BytesStart<'a>, empty: bool) -> Result<Node> {
        match element.local_name().as_ref() {
            b"dict" => self.read_dictionary(empty),
            b"array" => self.read_array(empty),
            b"string" => Ok(Node::string(self.read_text(empty)?)),
            b"integer" => {
                let text = self.read_text(empty)?;
                text.trim().parse::<i32>()
                    .map(Node::number)
                    .map_err(|_| Error::InvalidInteger(text))
            }
            b"real" => {
                let text = self.read_text(empty)?;
                text.trim().parse::<f64>()
                    .map(Node::real)
                    .map_err(|_| Error::InvalidReal(text))
            }
            b"date" => {
                let text = self.read_text(empty)?;
                parse_date_text(text.trim())
                    .map(Node::date)
                    .ok_or(Error::InvalidDate(text))
            }
            b"data" => {
                let text = self.read_text(empty)?;
                let encoded = text.chars().filter(|c| !c.is_whitespace()).collect::<String>();
                STANDARD.decode(encoded.as_bytes())
                    .map(Node::data)
                    .map_err(|_| Error::InvalidData(text))
            }
            b"true" => {
                self.read_text(empty)?;
                Ok(Node::boolean(true))
            }
            b"false" => {
                self.read_text(empty)?;
                Ok(Node::boolean(false))
            }
            _ => Err(Error::UnknownElement(element_name(element))),
        }
    }

    /// Reads the value following a key, or fails if the dictionary ends first.
    fn read_value(&mut self, key: String) -> Result<(String, Node)> {
        let value = match self.next_event()? {
            Event::Start(element) => self.read_element(&element, false)?,
            Event::Empty(element) => self.read_element(&element, true)?,
            Event::Eof => return Err(Error::Eof),
            _ => return Err(Error::MissingValueForKey(key)),
        };
        Ok((key, value))
    }

    fn read_dictionary(&mut self, empty: bool) -> Result<Node> {
        self.enter_container()?;
        let mut entries = IndexMap::new();
        if !empty {
            loop {
                let key = match self.next_event()? {
                    Event::End(_) => break,
                    Event::Start(element) if element.local_name().as_ref() == b"key" =>
                        self.read_text(false)?,
                    Event::Empty(element) if element.local_name().as_ref() == b"key" =>
                        String::new(),
                    Event::Start(element) | Event::Empty(element) =>
                        return Err(Error::ExpectedKey(element_name(&element))),
                    Event::Eof => return Err(Error::Eof),
                    _ => return Err(Error::ExpectedKey(String::from("text"))),
                };

                // A repeated key keeps its first position and takes the last value.
                let (key, value) = self.read_value(key)?;
                entries.insert(key, value);
            }
        }
        self.depth -= 1;
        Ok(Node::from_entries(entries))
    }

    fn read_array(&mut self, empty: bool) -> Result<Node> {
        self.enter_container()?;
        let mut items = Vec::new();
        if !empty {
            loop {
                let item = match self.next_event()? {
                    Event::End(_) => break,
                    Event::Start(element) => self.read_element(&element, false)?,
                    Event::Empty(element) => self.read_element(&element, true)?,
                    Event::Eof => return Err(Error::Eof),
                    _ => return Err(Error::Message(String::from("unexpected text in array"))),
                };
                items.push(item);
            }
        }
        self.depth -= 1;
        Ok(Node::from_items(items))
    }

}

impl<'a> ReadSession for XmlReadSession<'a> {
    fn read_object(&mut self) -> Result<Node> {
        let (element, empty) = self.root.take().ok_or(Error::Eof)?;
        self.read_element(&element, empty)
    }
}
