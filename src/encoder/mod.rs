//! Feature and outcome encoders
//!
//! Encoders turn symbolic instances into the representation a backend
//! consumes and turn backend predictions back into outcomes. Their state is
//! persisted into the model package as a versioned JSON snapshot.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, IoContext, Result};
use crate::feature::Feature;
use crate::package::{write_atomically, ENCODERS_FILE_NAME};

mod dictionary;
mod name_number;
mod outcome;

pub use self::dictionary::Dictionary;
pub use self::name_number::{EncodeFlags, NameNumber, NameNumberFeaturesEncoder};
pub use self::outcome::{StringToIntegerOutcomeEncoder, StringToStringOutcomeEncoder};

/// Current version of the encoder snapshot format
pub const ENCODERS_FORMAT_VERSION: u32 = 1;

/// Turns a feature list into a backend-specific encoded record.
pub trait FeaturesEncoder: Serialize + DeserializeOwned {
    type Encoded;

    /// Stable identifier stored next to the serialized state.
    const KIND: &'static str;

    /// Encode features for training. May grow internal state.
    fn encode(&mut self, features: &[Feature]) -> Result<Self::Encoded>;

    /// Encode features for classification without touching internal state.
    ///
    /// Features the encoder has never seen are dropped.
    fn encode_known(&self, features: &[Feature]) -> Result<Self::Encoded>;
}

/// Maps outcomes to and from their encoded form.
///
/// `decode(encode(o)) == o` for every outcome ever passed to `encode`.
pub trait OutcomeEncoder<O>: Serialize + DeserializeOwned {
    type Encoded;

    const KIND: &'static str;

    fn encode(&mut self, outcome: &O) -> Result<Self::Encoded>;

    fn decode(&self, encoded: &Self::Encoded) -> Result<O>;
}

#[derive(Debug, Serialize, Deserialize)]
struct EncoderState {
    kind: String,
    state: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct EncodersSnapshot {
    version: u32,
    features: EncoderState,
    outcome: EncoderState,
}

/// Serialize both encoders into `encoders.json` inside `dir`.
pub fn write_encoders<FE, OE, O>(dir: &Path, features: &FE, outcome: &OE) -> Result<()>
where
    FE: FeaturesEncoder,
    OE: OutcomeEncoder<O>,
{
    let path = dir.join(ENCODERS_FILE_NAME);
    let to_value = |value: serde_json::Result<serde_json::Value>| {
        value.map_err(|e| Error::encoding(path.display().to_string(), e.to_string()))
    };
    let snapshot = EncodersSnapshot {
        version: ENCODERS_FORMAT_VERSION,
        features: EncoderState {
            kind: FE::KIND.to_string(),
            state: to_value(serde_json::to_value(features))?,
        },
        outcome: EncoderState {
            kind: OE::KIND.to_string(),
            state: to_value(serde_json::to_value(outcome))?,
        },
    };
    let bytes = serde_json::to_vec_pretty(&snapshot)
        .map_err(|e| Error::encoding(path.display().to_string(), e.to_string()))?;
    write_atomically(&path, &bytes)
}

/// Restore the encoders written by [`write_encoders`].
pub fn read_encoders<FE, OE, O>(dir: &Path) -> Result<(FE, OE)>
where
    FE: FeaturesEncoder,
    OE: OutcomeEncoder<O>,
{
    let path = dir.join(ENCODERS_FILE_NAME);
    if !path.is_file() {
        return Err(Error::model_load(dir, format!("missing {}", ENCODERS_FILE_NAME)));
    }
    let bytes = fs::read(&path).at("read encoders", &path)?;
    let snapshot: EncodersSnapshot = serde_json::from_slice(&bytes)
        .map_err(|e| Error::model_load(&path, format!("corrupt encoder snapshot: {}", e)))?;
    if snapshot.version > ENCODERS_FORMAT_VERSION {
        return Err(Error::model_load(
            &path,
            format!("unsupported encoder snapshot version {}", snapshot.version),
        ));
    }
    check_kind(&path, FE::KIND, &snapshot.features.kind)?;
    check_kind(&path, OE::KIND, &snapshot.outcome.kind)?;

    let features = serde_json::from_value(snapshot.features.state)
        .map_err(|e| Error::model_load(&path, format!("corrupt features encoder: {}", e)))?;
    let outcome = serde_json::from_value(snapshot.outcome.state)
        .map_err(|e| Error::model_load(&path, format!("corrupt outcome encoder: {}", e)))?;
    Ok((features, outcome))
}

fn check_kind(path: &Path, expected: &str, found: &str) -> Result<()> {
    if expected != found {
        return Err(Error::model_load(
            path,
            format!("expected encoder `{}`, package holds `{}`", expected, found),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::Instance;

    fn sentence() -> Vec<Instance<String>> {
        vec![
            Instance::with_features(vec![("word", "The"), ("suffix", "he")], "DT".to_string()),
            Instance::with_features(vec![("word", "dog"), ("suffix", "og")], "NN".to_string()),
            Instance::with_features(vec![("word", "barks"), ("suffix", "ks")], "VBZ".to_string()),
        ]
    }

    #[test]
    fn test_snapshot_restores_identical_encodings() {
        let dir = tempfile::tempdir().unwrap();
        let mut features = NameNumberFeaturesEncoder::new(EncodeFlags::COMPRESS | EncodeFlags::SORT);
        let mut outcomes = StringToIntegerOutcomeEncoder::new();

        let mut expected = Vec::new();
        for instance in sentence() {
            expected.push((
                features.encode(&instance.features).unwrap(),
                outcomes.encode(&instance.outcome).unwrap(),
            ));
        }
        write_encoders::<_, _, String>(dir.path(), &features, &outcomes).unwrap();

        let (mut restored_features, mut restored_outcomes): (
            NameNumberFeaturesEncoder,
            StringToIntegerOutcomeEncoder,
        ) = read_encoders::<_, _, String>(dir.path()).unwrap();
        for (instance, (encoded, label)) in sentence().into_iter().zip(expected) {
            assert_eq!(restored_features.encode(&instance.features).unwrap(), encoded);
            assert_eq!(restored_outcomes.encode(&instance.outcome).unwrap(), label);
        }
    }

    #[test]
    fn test_read_encoders_rejects_kind_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let features = NameNumberFeaturesEncoder::new(EncodeFlags::empty());
        let outcomes = StringToStringOutcomeEncoder::new();
        write_encoders::<_, _, String>(dir.path(), &features, &outcomes).unwrap();

        let result = read_encoders::<NameNumberFeaturesEncoder, StringToIntegerOutcomeEncoder, String>(
            dir.path(),
        );
        assert!(matches!(result, Err(Error::ModelLoad { .. })));
    }

    #[test]
    fn test_read_encoders_rejects_newer_version() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"{"version": 99,
            "features": {"kind": "name-number", "state": {}},
            "outcome": {"kind": "string-to-string", "state": null}}"#;
        fs::write(dir.path().join(ENCODERS_FILE_NAME), json).unwrap();

        let err = read_encoders::<NameNumberFeaturesEncoder, StringToStringOutcomeEncoder, String>(
            dir.path(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("version 99"));
    }

    #[test]
    fn test_read_encoders_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_encoders::<NameNumberFeaturesEncoder, StringToStringOutcomeEncoder, String>(
            dir.path(),
        );
        assert!(matches!(result, Err(Error::ModelLoad { .. })));
    }
}
