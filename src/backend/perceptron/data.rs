//! Line format of `training-data.perceptron`
//!
//! One instance per line: the encoded label followed by `name:value` pairs,
//! separated by single spaces. Backslash, space, colon and line breaks in
//! names are escaped.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use crate::encoder::{Dictionary, NameNumber};
use crate::error::{Error, IoContext, Result};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TrainingInstance {
    /// Attribute id and value pairs
    pub features: Vec<(u32, f64)>,
    pub label: u32,
}

#[derive(Debug, Default)]
pub(crate) struct TrainingData {
    pub attrs: Dictionary,
    pub instances: Vec<TrainingInstance>,
    pub num_labels: usize,
}

fn escape(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            ' ' => escaped.push_str("\\s"),
            ':' => escaped.push_str("\\c"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn unescape(token: &str) -> Option<String> {
    let mut name = String::with_capacity(token.len());
    let mut chars = token.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            name.push(c);
            continue;
        }
        match chars.next()? {
            '\\' => name.push('\\'),
            's' => name.push(' '),
            'c' => name.push(':'),
            'n' => name.push('\n'),
            'r' => name.push('\r'),
            _ => return None,
        }
    }
    Some(name)
}

pub(crate) fn write_instance<W: Write>(
    writer: &mut W,
    features: &[NameNumber],
    label: u32,
) -> io::Result<()> {
    write!(writer, "{}", label)?;
    for feature in features {
        write!(writer, " {}:{}", escape(&feature.name), feature.number)?;
    }
    writeln!(writer)
}

fn parse_line(line: &str, attrs: &mut Dictionary) -> std::result::Result<TrainingInstance, String> {
    let mut fields = line.split(' ');
    let label = fields
        .next()
        .and_then(|f| f.parse::<u32>().ok())
        .ok_or_else(|| "missing label".to_string())?;
    let mut features = Vec::new();
    for field in fields {
        let (name, value) = field
            .split_once(':')
            .ok_or_else(|| format!("malformed feature `{}`", field))?;
        let name = unescape(name).ok_or_else(|| format!("bad escape in `{}`", field))?;
        let value: f64 = value
            .parse()
            .map_err(|_| format!("bad value in `{}`", field))?;
        features.push((attrs.get_or_insert(&name), value));
    }
    Ok(TrainingInstance { features, label })
}

/// Parse a training data file, assigning attribute ids in first-seen order.
pub(crate) fn read_training_data(path: &Path) -> Result<TrainingData> {
    let file = File::open(path).at("open training data", path)?;
    let mut data = TrainingData::default();
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line.at("read training data", path)?;
        if line.is_empty() {
            continue;
        }
        let instance = parse_line(&line, &mut data.attrs).map_err(|message| {
            Error::encoding(
                format!("{}:{}", path.display(), lineno + 1),
                message,
            )
        })?;
        data.num_labels = data.num_labels.max(instance.label as usize + 1);
        data.instances.push(instance);
    }
    Ok(data)
}
