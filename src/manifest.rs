//! Line-oriented `key: value` manifest naming the classifier builder of a
//! model package.
//!
//! The format follows JAR manifests: CRLF line endings, at most 70 bytes of
//! content per line, and long values continued on lines starting with a
//! single space.

use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{Error, IoContext, Result};
use crate::package::{write_atomically, MANIFEST_FILE_NAME};

pub const MANIFEST_VERSION_KEY: &str = "Manifest-Version";
pub const MANIFEST_VERSION: &str = "1.0";
pub const CLASSIFIER_BUILDER_KEY: &str = "classifierBuilderClass";
/// Builder of the inner package of a sequential model
pub const DELEGATED_CLASSIFIER_BUILDER_KEY: &str = "delegatedClassifierBuilderClass";

const MAX_LINE_BYTES: usize = 70;

/// Main attributes of a model package manifest, in insertion order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierManifest {
    attributes: Vec<(String, String)>,
}

impl ClassifierManifest {
    pub fn new() -> Self {
        Self {
            attributes: vec![(MANIFEST_VERSION_KEY.to_string(), MANIFEST_VERSION.to_string())],
        }
    }

    /// Create a manifest naming `builder` as the reload handler
    pub fn for_builder(builder: &str) -> Result<Self> {
        let mut manifest = Self::new();
        manifest.set_classifier_builder(builder)?;
        Ok(manifest)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Insert or replace an attribute. Keys are limited to ASCII
    /// alphanumerics, `-` and `_`.
    pub fn insert(&mut self, key: &str, value: &str) -> Result<()> {
        if !is_valid_key(key) {
            return Err(Error::configuration(
                "manifest insert",
                format!("invalid manifest key `{}`", key),
            ));
        }
        if value.contains(['\r', '\n']) {
            return Err(Error::configuration(
                "manifest insert",
                format!("manifest value for `{}` contains a line break", key),
            ));
        }
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.attributes.push((key.to_string(), value.to_string())),
        }
        Ok(())
    }

    pub fn classifier_builder(&self) -> Option<&str> {
        self.get(CLASSIFIER_BUILDER_KEY)
    }

    /// Same validation as [`Self::insert`]
    pub fn set_classifier_builder(&mut self, builder: &str) -> Result<()> {
        self.insert(CLASSIFIER_BUILDER_KEY, builder)
    }

    /// Parse manifest text, joining continuation lines
    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        let mut logical: Vec<String> = Vec::new();
        for (lineno, line) in text.split('\n').enumerate() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if let Some(rest) = line.strip_prefix(' ') {
                match logical.last_mut() {
                    Some(last) => last.push_str(rest),
                    None => return Err(format!("line {}: continuation without header", lineno + 1)),
                }
            } else if line.is_empty() {
                // A blank line ends the main section.
                break;
            } else {
                logical.push(line.to_string());
            }
        }

        let mut attributes = Vec::with_capacity(logical.len());
        for line in logical {
            let (key, value) = line
                .split_once(": ")
                .ok_or_else(|| format!("malformed manifest line `{}`", line))?;
            if !is_valid_key(key) {
                return Err(format!("invalid manifest key `{}`", key));
            }
            attributes.push((key.to_string(), value.to_string()));
        }
        match attributes.first() {
            Some((key, _)) if key == MANIFEST_VERSION_KEY => {}
            _ => return Err(format!("manifest must start with {}", MANIFEST_VERSION_KEY)),
        }
        Ok(Self { attributes })
    }

    /// Write `MANIFEST.MF` into `dir`, replacing any previous manifest
    pub fn write(&self, dir: &Path) -> Result<()> {
        write_atomically(&dir.join(MANIFEST_FILE_NAME), self.to_string().as_bytes())
    }

    /// Read `MANIFEST.MF` from `dir`
    pub fn read(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE_NAME);
        if !path.is_file() {
            return Err(Error::model_load(
                dir,
                format!("missing {}, the package was never sealed", MANIFEST_FILE_NAME),
            ));
        }
        let text = fs::read_to_string(&path).at("read manifest", &path)?;
        Self::parse(&text).map_err(|message| Error::model_load(&path, message))
    }
}

impl Default for ClassifierManifest {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClassifierManifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.attributes {
            write_wrapped(f, &format!("{}: {}", key, value))?;
        }
        f.write_str("\r\n")
    }
}

/// Write one logical line, splitting it at char boundaries so that no
/// physical line carries more than 70 bytes of content.
fn write_wrapped(f: &mut fmt::Formatter<'_>, line: &str) -> fmt::Result {
    let mut rest = line;
    let mut limit = MAX_LINE_BYTES;
    let mut first = true;
    loop {
        if !first {
            f.write_str(" ")?;
        }
        if rest.len() <= limit {
            f.write_str(rest)?;
            return f.write_str("\r\n");
        }
        let mut split = limit;
        while !rest.is_char_boundary(split) {
            split -= 1;
        }
        f.write_str(&rest[..split])?;
        f.write_str("\r\n")?;
        rest = &rest[split..];
        // Continuation lines spend one byte on the leading space.
        limit = MAX_LINE_BYTES - 1;
        first = false;
    }
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
