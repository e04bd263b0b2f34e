//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Loading and saving documents.
//!
//! The format of a document is detected when loading, trying the binary
//! format first and XML second. Saving writes XML unless told otherwise.
//!
//! The async variants only move file access onto the tokio blocking pool.
//! Nodes cannot leave the calling thread, so decoding and encoding happen on
//! the calling task and the returned futures are not `Send`.

use log::debug;
use tempfile::Builder;

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::format::PropertyListFormat;
use crate::object::{Array, Dictionary, Node};

/// How a document is written to disk.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct SaveOptions {
    /// Write to a temporary sibling file and rename it over the target.
    pub atomic: bool,
    /// The format of the document.
    pub format: PropertyListFormat,
}

impl Default for SaveOptions {
    fn default() -> Self {
        SaveOptions {
            atomic: false,
            format: PropertyListFormat::Xml,
        }
    }
}

impl SaveOptions {

    pub fn new() -> Self {
        SaveOptions::default()
    }

    pub fn atomic(mut self, atomic: bool) -> Self {
        self.atomic = atomic;
        self
    }

    pub fn format(mut self, format: PropertyListFormat) -> Self {
        self.format = format;
        self
    }

    /// Selects the binary format, or XML when `binary` is false.
    pub fn binary(self, binary: bool) -> Self {
        self.format(if binary { PropertyListFormat::Binary } else { PropertyListFormat::Xml })
    }

}

/// Creates `path` and hands a buffered writer for it to `write`.
///
/// Missing parent directories are created. An atomic write goes to a
/// temporary file in the same directory which is synced and then renamed
/// over `path`. The temporary file is removed if anything fails before the
/// rename, leaving an existing file at `path` untouched.
pub(crate) fn write_file<F>(path: &Path, atomic: bool, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&directory)?;

    if atomic {
        let name = path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temporary = Builder::new()
            .prefix(&format!(".{}", name))
            .suffix(".tmp")
            .tempfile_in(&directory)?;
        debug!("writing {} through {}", path.display(), temporary.path().display());

        let mut writer = BufWriter::new(temporary);
        write(&mut writer)?;
        let temporary = writer.into_inner().map_err(io::Error::from)?;
        temporary.as_file().sync_all()?;
        temporary.persist(path).map_err(|error| error.error)?;
    } else {
        debug!("writing {}", path.display());
        let mut writer = BufWriter::new(File::create(path)?);
        write(&mut writer)?;
        writer.flush()?;
    }
    Ok(())
}

/// Runs blocking file work on the tokio blocking pool.
async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|error| Error::Io(io::Error::new(io::ErrorKind::Other, error)))?
}

async fn read_file_async(path: &Path) -> Result<Vec<u8>> {
    let path = path.to_path_buf();
    run_blocking(move || fs::read(&path).map_err(Error::from)).await
}

impl Node {

    /// Decodes a document of any readable format.
    pub fn from_slice(bytes: &[u8]) -> Result<Node> {
        Node::from_slice_with_format(bytes).map(|(node, _)| node)
    }

    /// Decodes a document and reports the format it was detected as.
    pub fn from_slice_with_format(bytes: &[u8]) -> Result<(Node, PropertyListFormat)> {
        let (format, mut session) = PropertyListFormat::create_read_session(bytes)
            .ok_or(Error::UnrecognizedFormat)?;
        let node = session.read_object()?;
        Ok((node, format))
    }

    /// Reads `reader` to the end and decodes the document.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Node> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Node::from_slice(&bytes)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Node> {
        Node::from_file_with_format(path).map(|(node, _)| node)
    }

    pub fn from_file_with_format<P: AsRef<Path>>(path: P) -> Result<(Node, PropertyListFormat)> {
        let bytes = fs::read(path.as_ref())?;
        debug!("loading {}", path.as_ref().display());
        Node::from_slice_with_format(&bytes)
    }

    pub async fn from_file_async<P: AsRef<Path>>(path: P) -> Result<Node> {
        let bytes = read_file_async(path.as_ref()).await?;
        Node::from_slice(&bytes)
    }

    /// Encodes this node as the root of a document.
    pub fn to_bytes(&self, format: PropertyListFormat) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        let mut session = format.start_writing(&mut bytes)?;
        session.write_object(self)?;
        session.finish()?;
        Ok(bytes)
    }

    pub fn to_xml(&self) -> Result<String> {
        String::from_utf8(self.to_bytes(PropertyListFormat::Xml)?)
            .map_err(|error| Error::Message(error.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        String::from_utf8(self.to_bytes(PropertyListFormat::Json)?)
            .map_err(|error| Error::Message(error.to_string()))
    }

    /// Writes this node as the root of a document at `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P, options: SaveOptions) -> Result<()> {
        write_file(path.as_ref(), options.atomic, |writer| {
            let mut session = options.format.start_writing(writer)?;
            session.write_object(self)?;
            session.finish()
        })
    }

    /// Encodes this node, then writes the file on the blocking pool.
    pub async fn save_async<P: AsRef<Path>>(&self, path: P, options: SaveOptions) -> Result<()> {
        let bytes = self.to_bytes(options.format)?;
        let path = path.as_ref().to_path_buf();
        run_blocking(move || {
            write_file(&path, options.atomic, |writer| {
                writer.write_all(&bytes)?;
                Ok(())
            })
        }).await
    }

}

impl FromStr for Node {
    type Err = Error;

    fn from_str(text: &str) -> Result<Node> {
        Node::from_slice(text.as_bytes())
    }
}

fn expect_dictionary(node: Node) -> Result<Dictionary> {
    node.as_dictionary().ok_or(Error::RootObjectNotDictionary)
}

impl Dictionary {

    pub fn from_slice(bytes: &[u8]) -> Result<Dictionary> {
        Node::from_slice(bytes).and_then(expect_dictionary)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Dictionary> {
        Node::from_reader(reader).and_then(expect_dictionary)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Dictionary> {
        Node::from_file(path).and_then(expect_dictionary)
    }

    pub fn from_file_with_format<P: AsRef<Path>>(path: P) -> Result<(Dictionary, PropertyListFormat)> {
        let (node, format) = Node::from_file_with_format(path)?;
        Ok((expect_dictionary(node)?, format))
    }

    pub async fn from_file_async<P: AsRef<Path>>(path: P) -> Result<Dictionary> {
        Node::from_file_async(path).await.and_then(expect_dictionary)
    }

    /// Reads a file which embeds an XML property list, such as a provisioning profile.
    pub fn from_embedded_xml_file<P: AsRef<Path>>(path: P) -> Result<Dictionary> {
        Dictionary::from_embedded_xml(&fs::read(path)?)
    }

    /// Replaces the contents of this dictionary with those of the file at `path`.
    ///
    /// Returns false, leaving the dictionary untouched, when the file is not a
    /// property list or its root is not a dictionary.
    pub fn reload<P: AsRef<Path>>(&self, path: P) -> Result<bool> {
        match load_for_reload(path.as_ref())?.and_then(|node| node.as_dictionary()) {
            Some(loaded) => {
                self.take_contents_of(&loaded);
                Ok(true)
            }
            None => Ok(false),
        }
    }

}

impl FromStr for Dictionary {
    type Err = Error;

    fn from_str(text: &str) -> Result<Dictionary> {
        Dictionary::from_slice(text.as_bytes())
    }
}

impl Array {

    /// Replaces the contents of this array with those of the file at `path`.
    ///
    /// Returns false, leaving the array untouched, when the file is not a
    /// property list or its root is not an array.
    pub fn reload<P: AsRef<Path>>(&self, path: P) -> Result<bool> {
        match load_for_reload(path.as_ref())?.and_then(|node| node.as_array()) {
            Some(loaded) => {
                self.take_contents_of(&loaded);
                Ok(true)
            }
            None => Ok(false),
        }
    }

}

/// Loads a document, treating an unrecognized format as absent.
fn load_for_reload(path: &Path) -> Result<Option<Node>> {
    match Node::from_file(path) {
        Ok(node) => Ok(Some(node)),
        Err(Error::UnrecognizedFormat) => {
            debug!("{} is not a property list", path.display());
            Ok(None)
        }
        Err(error) => Err(error),
    }
}
