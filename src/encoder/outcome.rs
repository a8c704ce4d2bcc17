use serde::{Deserialize, Serialize};

use super::{Dictionary, OutcomeEncoder};
use crate::error::{Error, Result};

/// Identity outcome encoder for backends that consume string labels directly
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringToStringOutcomeEncoder;

impl StringToStringOutcomeEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl OutcomeEncoder<String> for StringToStringOutcomeEncoder {
    type Encoded = String;

    const KIND: &'static str = "string-to-string";

    fn encode(&mut self, outcome: &String) -> Result<String> {
        Ok(outcome.clone())
    }

    fn decode(&self, encoded: &String) -> Result<String> {
        Ok(encoded.clone())
    }
}

/// Maps string labels to dense integer ids in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StringToIntegerOutcomeEncoder {
    labels: Dictionary,
}

impl StringToIntegerOutcomeEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct outcomes encoded so far
    pub fn num_labels(&self) -> usize {
        self.labels.len()
    }
}

impl OutcomeEncoder<String> for StringToIntegerOutcomeEncoder {
    type Encoded = u32;

    const KIND: &'static str = "string-to-integer";

    fn encode(&mut self, outcome: &String) -> Result<u32> {
        Ok(self.labels.get_or_insert(outcome))
    }

    fn decode(&self, encoded: &u32) -> Result<String> {
        self.labels
            .name(*encoded)
            .map(str::to_string)
            .ok_or_else(|| Error::encoding(encoded.to_string(), "unknown outcome id"))
    }
}
