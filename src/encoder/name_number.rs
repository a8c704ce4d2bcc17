use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{Dictionary, FeaturesEncoder};
use crate::error::{Error, Result};
use crate::feature::{Feature, FeatureValue};

bitflags! {
    /// Options for [`NameNumberFeaturesEncoder`]
    #[derive(Default)]
    pub struct EncodeFlags: u32 {
        /// Replace feature names by compact vocabulary ids
        const COMPRESS = 0x01;
        /// Sort encoded pairs by name
        const SORT = 0x02;
    }
}

impl Serialize for EncodeFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EncodeFlags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let bits = u32::deserialize(deserializer)?;
        EncodeFlags::from_bits(bits)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown encoder flags {:#x}", bits)))
    }
}

/// A feature name with a numeric weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameNumber {
    pub name: String,
    pub number: f64,
}

impl NameNumber {
    pub fn new<T: Into<String>>(name: T, number: f64) -> Self {
        Self {
            name: name.into(),
            number,
        }
    }
}

/// Encodes features as `name → number` pairs.
///
/// String features become `name_value → 1.0`, numbers keep their name and
/// value, booleans map to `1.0`/`0.0`. With [`EncodeFlags::COMPRESS`] the full
/// names are replaced by base-36 ids from a growing vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NameNumberFeaturesEncoder {
    flags: EncodeFlags,
    #[serde(default)]
    vocabulary: Dictionary,
}

impl NameNumberFeaturesEncoder {
    pub fn new(flags: EncodeFlags) -> Self {
        Self {
            flags,
            vocabulary: Dictionary::new(),
        }
    }

    pub fn flags(&self) -> EncodeFlags {
        self.flags
    }

    /// Number of distinct feature names seen while compressing
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    fn encode_with<F>(&self, features: &[Feature], mut lookup: F) -> Result<Vec<NameNumber>>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut encoded = Vec::with_capacity(features.len());
        for feature in features {
            let (full_name, number) = expand(feature)?;
            if let Some(name) = lookup(&full_name) {
                encoded.push(NameNumber::new(name, number));
            }
        }
        if self.flags.contains(EncodeFlags::SORT) {
            encoded.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Ok(encoded)
    }
}

impl FeaturesEncoder for NameNumberFeaturesEncoder {
    type Encoded = Vec<NameNumber>;

    const KIND: &'static str = "name-number";

    fn encode(&mut self, features: &[Feature]) -> Result<Vec<NameNumber>> {
        if !self.flags.contains(EncodeFlags::COMPRESS) {
            return self.encode_with(features, |name| Some(name.to_string()));
        }
        // Expand first so a failing feature leaves the vocabulary untouched.
        let mut expanded = Vec::with_capacity(features.len());
        for feature in features {
            expanded.push(expand(feature)?);
        }
        let mut encoded: Vec<NameNumber> = expanded
            .into_iter()
            .map(|(full_name, number)| {
                let id = self.vocabulary.get_or_insert(&full_name);
                NameNumber::new(to_base36(id), number)
            })
            .collect();
        if self.flags.contains(EncodeFlags::SORT) {
            encoded.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Ok(encoded)
    }

    fn encode_known(&self, features: &[Feature]) -> Result<Vec<NameNumber>> {
        if self.flags.contains(EncodeFlags::COMPRESS) {
            self.encode_with(features, |name| self.vocabulary.get(name).map(to_base36))
        } else {
            self.encode_with(features, |name| Some(name.to_string()))
        }
    }
}

fn expand(feature: &Feature) -> Result<(String, f64)> {
    let join = |value: &str| {
        if feature.name.is_empty() {
            value.to_string()
        } else {
            format!("{}_{}", feature.name, value)
        }
    };
    match &feature.value {
        FeatureValue::String(s) => Ok((join(s), 1.0)),
        FeatureValue::Number(n) => {
            if feature.name.is_empty() {
                return Err(Error::encoding(n.to_string(), "numeric features require a name"));
            }
            if !n.is_finite() {
                return Err(Error::encoding(
                    feature.name.clone(),
                    format!("numeric value {} is not finite", n),
                ));
            }
            Ok((feature.name.clone(), *n))
        }
        FeatureValue::Boolean(b) => {
            if feature.name.is_empty() {
                return Err(Error::encoding(
                    b.to_string(),
                    "boolean features require a name",
                ));
            }
            Ok((feature.name.clone(), if *b { 1.0 } else { 0.0 }))
        }
    }
}

fn to_base36(mut id: u32) -> String {
    let mut digits = Vec::new();
    loop {
        digits.push(std::char::from_digit(id % 36, 36).unwrap_or('0'));
        id /= 36;
        if id == 0 {
            break;
        }
    }
    digits.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_value_types() {
        let mut encoder = NameNumberFeaturesEncoder::new(EncodeFlags::empty());
        let features = vec![
            Feature::new("word", "dog"),
            Feature::new("length", 3.0),
            Feature::new("capitalized", false),
            Feature::new("", "bare"),
        ];
        let encoded = encoder.encode(&features).unwrap();
        assert_eq!(
            encoded,
            vec![
                NameNumber::new("word_dog", 1.0),
                NameNumber::new("length", 3.0),
                NameNumber::new("capitalized", 0.0),
                NameNumber::new("bare", 1.0),
            ]
        );
    }

    #[test]
    fn test_encode_sorted() {
        let mut encoder = NameNumberFeaturesEncoder::new(EncodeFlags::SORT);
        let encoded = encoder
            .encode(&[Feature::new("z", 1.0), Feature::new("a", 2.0)])
            .unwrap();
        assert_eq!(encoded[0].name, "a");
        assert_eq!(encoded[1].name, "z");
    }

    #[test]
    fn test_compress_assigns_stable_ids() {
        let mut encoder = NameNumberFeaturesEncoder::new(EncodeFlags::COMPRESS);
        let first = encoder.encode(&[Feature::new("word", "dog")]).unwrap();
        let second = encoder
            .encode(&[Feature::new("word", "cat"), Feature::new("word", "dog")])
            .unwrap();
        assert_eq!(first, vec![NameNumber::new("0", 1.0)]);
        assert_eq!(
            second,
            vec![NameNumber::new("1", 1.0), NameNumber::new("0", 1.0)]
        );
        assert_eq!(encoder.vocabulary_size(), 2);
    }

    #[test]
    fn test_encode_known_drops_unseen_names() {
        let mut encoder = NameNumberFeaturesEncoder::new(EncodeFlags::COMPRESS);
        encoder.encode(&[Feature::new("word", "dog")]).unwrap();
        let encoded = encoder
            .encode_known(&[Feature::new("word", "dog"), Feature::new("word", "emu")])
            .unwrap();
        assert_eq!(encoded, vec![NameNumber::new("0", 1.0)]);
        assert_eq!(encoder.vocabulary_size(), 1);
    }

    #[test]
    fn test_non_finite_number_is_rejected() {
        let mut encoder = NameNumberFeaturesEncoder::new(EncodeFlags::COMPRESS);
        let result = encoder.encode(&[Feature::new("a", "x"), Feature::new("score", f64::NAN)]);
        assert!(matches!(result, Err(Error::Encoding { .. })));
        // A failed encode must not leak names into the vocabulary.
        assert_eq!(encoder.vocabulary_size(), 0);
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(1295), "zz");
    }

    #[test]
    fn test_flags_serde() {
        let encoder = NameNumberFeaturesEncoder::new(EncodeFlags::COMPRESS | EncodeFlags::SORT);
        let json = serde_json::to_string(&encoder).unwrap();
        assert_eq!(json, r#"{"flags":3,"vocabulary":[]}"#);
        let restored: NameNumberFeaturesEncoder = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, encoder);

        let bad = serde_json::from_str::<NameNumberFeaturesEncoder>(r#"{"flags":64}"#);
        assert!(bad.is_err());
    }
}
