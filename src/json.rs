//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! JSON output with the same shape as the XML writer.
//!
//! Only backslashes and double quotes are escaped in strings. JSON has no
//! spelling for NaN or the infinities, so those reals are written as `null`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use std::io::Write;

use crate::error::Result;
use crate::format::WriteSession;
use crate::object::{Content, Node};
use crate::xml::{format_real, DATE_FORMAT};

const INDENT: &str = "  ";

fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        if c == '\\' || c == '"' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

pub(crate) struct JsonWriteSession<W: Write> {
    writer: W,
}

impl<W: Write> JsonWriteSession<W> {

    pub(crate) fn start(writer: W) -> Self {
        JsonWriteSession { writer }
    }

    /// Appends the text of a node, whose first line is already indented.
    fn encode(output: &mut String, node: &Node, depth: usize) {
        match &*node.content() {
            Content::Dictionary(entries) if entries.is_empty() => output.push_str("{}"),
            Content::Dictionary(entries) => {
                output.push_str("{\n");
                let indent = INDENT.repeat(depth + 1);
                for (index, (key, value)) in entries.iter().enumerate() {
                    output.push_str(&indent);
                    output.push_str(&quote(key));
                    output.push_str(": ");
                    Self::encode(output, value, depth + 1);
                    if index + 1 < entries.len() {
                        output.push(',');
                    }
                    output.push('\n');
                }
                output.push_str(&INDENT.repeat(depth));
                output.push('}');
            }
            Content::Array(items) if items.is_empty() => output.push_str("[]"),
            Content::Array(items) => {
                output.push_str("[\n");
                let indent = INDENT.repeat(depth + 1);
                for (index, item) in items.iter().enumerate() {
                    output.push_str(&indent);
                    Self::encode(output, item, depth + 1);
                    if index + 1 < items.len() {
                        output.push(',');
                    }
                    output.push('\n');
                }
                output.push_str(&INDENT.repeat(depth));
                output.push(']');
            }
            Content::String(value) => output.push_str(&quote(value)),
            Content::Number(value) => output.push_str(&value.to_string()),
            Content::Real(value) if !value.is_finite() => output.push_str("null"),
            Content::Real(value) => output.push_str(&format_real(*value)),
            Content::Boolean(value) => output.push_str(if *value { "true" } else { "false" }),
            Content::Date(value) => output.push_str(&format!("\"{}\"", value.format(DATE_FORMAT))),
            Content::Data(value) => output.push_str(&quote(&STANDARD.encode(value))),
        }
    }

}

impl<W: Write> WriteSession for JsonWriteSession<W> {

    fn write_object(&mut self, node: &Node) -> Result<()> {
        let mut output = String::new();
        Self::encode(&mut output, node, 0);
        self.writer.write_all(output.as_bytes())?;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<()> {
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

}
