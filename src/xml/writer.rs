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
use quick_xml::escape::escape;

use std::io::Write;

use crate::error::Result;
use crate::format::WriteSession;
use crate::object::{Content, Node};
use crate::xml::{format_real, DATE_FORMAT};

const HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n\
<plist version=\"1.0\">\n";

const FOOTER: &str = "</plist>\n";

pub(crate) struct XmlWriteSession<W: Write> {
    writer: W,
}

impl<W: Write> XmlWriteSession<W> {

    /// Writes the declaration, doctype and opening `<plist>` tag.
    pub(crate) fn start(mut writer: W) -> Result<Self> {
        writer.write_all(HEADER.as_bytes())?;
        Ok(XmlWriteSession { writer })
    }

    fn write_line(&mut self, depth: usize, text: &str) -> Result<()> {
        let mut line = "\t".repeat(depth);
        line.push_str(text);
        line.push('\n');
        self.writer.write_all(line.as_bytes())?;
        Ok(())
    }

    fn write_node(&mut self, node: &Node, depth: usize) -> Result<()> {
        match &*node.content() {
            Content::Dictionary(entries) if entries.is_empty() => self.write_line(depth, "<dict/>"),
            Content::Dictionary(entries) => {
                self.write_line(depth, "<dict>")?;
                for (key, value) in entries {
                    self.write_line(depth + 1, &format!("<key>{}</key>", escape(key)))?;
                    self.write_node(value, depth + 1)?;
                }
                self.write_line(depth, "</dict>")
            }
            Content::Array(items) if items.is_empty() => self.write_line(depth, "<array/>"),
            Content::Array(items) => {
                self.write_line(depth, "<array>")?;
                for item in items {
                    self.write_node(item, depth + 1)?;
                }
                self.write_line(depth, "</array>")
            }
            Content::String(value) =>
                self.write_line(depth, &format!("<string>{}</string>", escape(value))),
            Content::Number(value) =>
                self.write_line(depth, &format!("<integer>{}</integer>", value)),
            Content::Real(value) =>
                self.write_line(depth, &format!("<real>{}</real>", format_real(*value))),
            Content::Boolean(value) =>
                self.write_line(depth, if *value { "<true/>" } else { "<false/>" }),
            Content::Date(value) =>
                self.write_line(depth, &format!("<date>{}</date>", value.format(DATE_FORMAT))),
            Content::Data(value) =>
                self.write_line(depth, &format!("<data>{}</data>", STANDARD.encode(value))),
        }
    }

}

impl<W: Write> WriteSession for XmlWriteSession<W> {

    fn write_object(&mut self, node: &Node) -> Result<()> {
        self.write_node(node, 0)
    }

    fn finish(mut self: Box<Self>) -> Result<()> {
        self.writer.write_all(FOOTER.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{TimeZone, Utc};

    use crate::object::{Array, Dictionary};
    use crate::format::ReadSession;
    use crate::xml::XmlReadSession;

    fn encode(node: &Node) -> String {
        let mut output = Vec::new();
        let mut session = Box::new(XmlWriteSession::start(&mut output).unwrap());
        session.write_object(node).unwrap();
        session.finish().unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_layout() {
        let root = Dictionary::new();
        root.set("CFBundleName", Node::string("Tom & Jerry's <App>")).unwrap();
        root.set("Version", Node::number(3)).unwrap();
        let modes = Array::new();
        modes.add(Node::string("audio")).unwrap();
        modes.add(Node::boolean(false)).unwrap();
        root.set("Modes", modes.into()).unwrap();
        root.set("Empty", Dictionary::new().into()).unwrap();
        root.set("None", Array::new().into()).unwrap();

        assert_eq!(encode(&root), "\
<?xml version=\"1.0\" encoding=\"UTF-8\"?>
<!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">
<plist version=\"1.0\">
<dict>
\t<key>CFBundleName</key>
\t<string>Tom &amp; Jerry&apos;s &lt;App&gt;</string>
\t<key>Version</key>
\t<integer>3</integer>
\t<key>Modes</key>
\t<array>
\t\t<string>audio</string>
\t\t<false/>
\t</array>
\t<key>Empty</key>
\t<dict/>
\t<key>None</key>
\t<array/>
</dict>
</plist>
");
    }

    #[test]
    fn test_leaf_root() {
        let date = Utc.with_ymd_and_hms(2020, 2, 29, 12, 30, 5).unwrap();
        assert!(encode(&Node::date(date)).contains("\n<date>2020-02-29T12:30:05Z</date>\n"));
        assert!(encode(&Node::data(vec![0, 1, 2, 3])).contains("\n<data>AAECAw==</data>\n"));
        assert!(encode(&Node::real(f64::INFINITY)).contains("\n<real>+infinity</real>\n"));
    }

    #[test]
    fn test_round_trip() {
        let root = Dictionary::new();
        root.set("text", Node::string("  spaced\tout  ")).unwrap();
        root.set("empty", Node::string("")).unwrap();
        root.set("blob", Node::data(Vec::new())).unwrap();
        root.set("ratio", Node::real(0.1)).unwrap();
        root.set("when", Node::date(Utc.with_ymd_and_hms(1999, 12, 31, 23, 59, 59).unwrap())).unwrap();
        let document = encode(&root);
        let decoded = XmlReadSession::start(document.as_bytes()).unwrap().read_object().unwrap();
        assert_eq!(decoded, *root.node());
    }
}
