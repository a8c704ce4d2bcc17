//! Binary layout of `model.perceptron`
//!
//! ```text
//! magic     "lPCT"
//! size      u32   total file size
//! version   u32
//! labels    u32   number of labels
//! attrs     u32   number of attributes
//! off_w     u32   offset of the weight matrix
//! off_attrs u32   offset of the attribute dictionary
//! weights   f64 * attrs * labels, attribute-major
//! attribute dictionary (CQDB)
//! ```
//!
//! All integers and floats are little-endian.

use std::collections::HashMap;
use std::convert::TryFrom;
use std::fs::{self, File};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

use bstr::ByteSlice;
use cqdb::{CQDBWriter, CQDB};

use crate::encoder::Dictionary;
use crate::error::{Error, IoContext, Result};

const MAGIC: &[u8; 4] = b"lPCT";
const VERSION: u32 = 1;
const HEADER_SIZE: usize = 28;

#[inline]
fn unpack_u32(buf: &[u8]) -> io::Result<u32> {
    if buf.len() < 4 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "not enough data for unpacking u32",
        ));
    }
    Ok(u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]))
}

#[inline]
fn unpack_f64(buf: &[u8]) -> io::Result<f64> {
    if buf.len() < 8 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "not enough data for unpacking f64",
        ));
    }
    Ok(f64::from_le_bytes([
        buf[0], buf[1], buf[2], buf[3], buf[4], buf[5], buf[6], buf[7],
    ]))
}

fn write_header(
    file: &mut File,
    size: u32,
    num_labels: u32,
    num_attrs: u32,
    off_weights: u32,
    off_attrs: u32,
) -> io::Result<()> {
    file.write_all(MAGIC)?;
    file.write_all(&size.to_le_bytes())?;
    file.write_all(&VERSION.to_le_bytes())?;
    file.write_all(&num_labels.to_le_bytes())?;
    file.write_all(&num_attrs.to_le_bytes())?;
    file.write_all(&off_weights.to_le_bytes())?;
    file.write_all(&off_attrs.to_le_bytes())?;
    Ok(())
}

fn write_model_file(
    path: &Path,
    weights: &[f64],
    num_labels: usize,
    attrs: &Dictionary,
) -> io::Result<()> {
    let to_u32 = |value: u64| -> io::Result<u32> {
        u32::try_from(value).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidData, "model exceeds u32::MAX bytes")
        })
    };
    let num_labels = to_u32(num_labels as u64)?;
    let num_attrs = to_u32(attrs.len() as u64)?;

    let mut file = File::create(path)?;
    write_header(&mut file, 0, num_labels, num_attrs, 0, 0)?;

    let off_weights = to_u32(file.stream_position()?)?;
    for weight in weights {
        file.write_all(&weight.to_le_bytes())?;
    }

    let off_attrs = to_u32(file.stream_position()?)?;
    {
        // The database is flushed when the writer drops.
        let mut writer = CQDBWriter::new(&mut file)?;
        for (name, id) in attrs.iter() {
            writer.put(name, id)?;
        }
    }

    let size = to_u32(file.stream_position()?)?;
    file.seek(SeekFrom::Start(0))?;
    write_header(&mut file, size, num_labels, num_attrs, off_weights, off_attrs)?;
    file.sync_all()
}

/// Write trained weights and their attribute dictionary to `path`.
pub(crate) fn write_model(
    path: &Path,
    weights: &[f64],
    num_labels: usize,
    attrs: &Dictionary,
) -> Result<()> {
    if weights.len() != attrs.len() * num_labels {
        return Err(Error::configuration(
            "write perceptron model",
            format!(
                "{} weights do not match {} attributes x {} labels",
                weights.len(),
                attrs.len(),
                num_labels
            ),
        ));
    }
    write_model_file(path, weights, num_labels, attrs).at("write perceptron model", path)
}

/// A trained perceptron loaded into memory
#[derive(Debug, Clone, PartialEq)]
pub struct PerceptronModel {
    num_labels: usize,
    attrs: HashMap<String, u32>,
    weights: Vec<f64>,
}

impl PerceptronModel {
    pub fn open(path: &Path) -> Result<Self> {
        let buf = fs::read(path).at("read perceptron model", path)?;
        Self::from_bytes(&buf).map_err(|message| Error::model_load(path, message))
    }

    fn from_bytes(buf: &[u8]) -> std::result::Result<Self, String> {
        let corrupt = |e: io::Error| format!("corrupt perceptron model: {}", e);
        if buf.len() < HEADER_SIZE {
            return Err("invalid perceptron model, file too short".to_string());
        }
        if &buf[0..4] != MAGIC {
            return Err("invalid file format, magic mismatch".to_string());
        }
        let size = unpack_u32(&buf[4..]).map_err(corrupt)? as usize;
        let version = unpack_u32(&buf[8..]).map_err(corrupt)?;
        let num_labels = unpack_u32(&buf[12..]).map_err(corrupt)? as usize;
        let num_attrs = unpack_u32(&buf[16..]).map_err(corrupt)?;
        let off_weights = unpack_u32(&buf[20..]).map_err(corrupt)? as usize;
        let off_attrs = unpack_u32(&buf[24..]).map_err(corrupt)? as usize;

        if version > VERSION {
            return Err(format!("unsupported perceptron model version {}", version));
        }
        if size != buf.len() {
            return Err(format!(
                "truncated perceptron model, expected {} bytes, found {}",
                size,
                buf.len()
            ));
        }
        if num_labels == 0 {
            return Err("invalid perceptron model, no labels".to_string());
        }
        let bad_offsets = || "corrupt perceptron model, bad section offsets".to_string();
        let num_weights = (num_attrs as usize)
            .checked_mul(num_labels)
            .ok_or_else(bad_offsets)?;
        let end_weights = num_weights
            .checked_mul(8)
            .and_then(|len| len.checked_add(off_weights))
            .ok_or_else(bad_offsets)?;
        if end_weights > off_attrs || off_attrs > size {
            return Err(bad_offsets());
        }

        let mut weights = Vec::with_capacity(num_weights);
        for chunk in buf[off_weights..end_weights].chunks_exact(8) {
            weights.push(unpack_f64(chunk).map_err(corrupt)?);
        }

        let db = CQDB::new(&buf[off_attrs..size]).map_err(corrupt)?;
        let mut attrs = HashMap::with_capacity(num_attrs as usize);
        for id in 0..num_attrs {
            let name = db
                .to_str(id)
                .and_then(|s| s.to_str().ok())
                .ok_or_else(|| format!("attribute {} missing from dictionary", id))?;
            attrs.insert(name.to_string(), id);
        }

        Ok(Self {
            num_labels,
            attrs,
            weights,
        })
    }

    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    pub fn num_attrs(&self) -> usize {
        self.attrs.len()
    }

    pub fn attr_id(&self, name: &str) -> Option<u32> {
        self.attrs.get(name).copied()
    }

    pub(crate) fn weights(&self) -> &[f64] {
        &self.weights
    }
}
