use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, IoContext, Result};
use crate::feature::{Feature, Outcome};
use crate::package::{write_atomically, OUTCOME_FEATURE_EXTRACTOR_FILE_NAME};

/// Current version of the extractor snapshot format
pub const EXTRACTORS_FORMAT_VERSION: u32 = 1;

/// Derives features from the outcomes already assigned in a sequence.
///
/// Implementations must be stateless: the same history always yields the
/// same features.
pub trait OutcomeFeatureExtractor<O> {
    /// Registry key used to rebuild the extractor from a package
    fn kind(&self) -> &'static str;

    /// Features for the next instance given the outcomes before it, oldest
    /// first.
    fn extract_features(&self, previous_outcomes: &[O]) -> Vec<Feature>;

    /// Parameters needed to rebuild this extractor
    fn config(&self) -> Result<serde_json::Value>;
}

/// Serialized form of one extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorSnapshot {
    pub kind: String,
    pub config: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct ExtractorsFile {
    version: u32,
    extractors: Vec<ExtractorSnapshot>,
}

/// Append the features every extractor derives from `history`, in order.
pub(crate) fn extend_with_history<O>(
    features: &mut Vec<Feature>,
    extractors: &[Box<dyn OutcomeFeatureExtractor<O>>],
    history: &[O],
) {
    for extractor in extractors {
        features.extend(extractor.extract_features(history));
    }
}

pub(crate) fn write_extractors<O>(
    dir: &Path,
    extractors: &[Box<dyn OutcomeFeatureExtractor<O>>],
) -> Result<()> {
    let path = dir.join(OUTCOME_FEATURE_EXTRACTOR_FILE_NAME);
    let mut snapshots = Vec::with_capacity(extractors.len());
    for extractor in extractors {
        snapshots.push(ExtractorSnapshot {
            kind: extractor.kind().to_string(),
            config: extractor.config()?,
        });
    }
    let file = ExtractorsFile {
        version: EXTRACTORS_FORMAT_VERSION,
        extractors: snapshots,
    };
    let bytes = serde_json::to_vec_pretty(&file)
        .map_err(|e| Error::encoding(path.display().to_string(), e.to_string()))?;
    write_atomically(&path, &bytes)
}

pub(crate) fn read_extractors(dir: &Path) -> Result<Vec<ExtractorSnapshot>> {
    let path = dir.join(OUTCOME_FEATURE_EXTRACTOR_FILE_NAME);
    if !path.is_file() {
        return Err(Error::model_load(
            dir,
            format!("missing {}", OUTCOME_FEATURE_EXTRACTOR_FILE_NAME),
        ));
    }
    let bytes = fs::read(&path).at("read outcome feature extractors", &path)?;
    let file: ExtractorsFile = serde_json::from_slice(&bytes)
        .map_err(|e| Error::model_load(&path, format!("corrupt extractor snapshot: {}", e)))?;
    if file.version > EXTRACTORS_FORMAT_VERSION {
        return Err(Error::model_load(
            &path,
            format!("unsupported extractor snapshot version {}", file.version),
        ));
    }
    Ok(file.extractors)
}

/// Previous-outcome features and outcome n-grams
///
/// For every lag `i` in `most_recent_outcome..=least_recent_outcome` that
/// the history covers, emits `PreviousOutcome_L{i}` with that outcome.
/// Optionally emits `PreviousOutcomes_L1_{n}gram_L2R` joining the last `n`
/// outcomes left to right with `_`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultOutcomeFeatureExtractor {
    most_recent_outcome: usize,
    least_recent_outcome: usize,
    use_bigram: bool,
    use_trigram: bool,
    use_4gram: bool,
}

impl Default for DefaultOutcomeFeatureExtractor {
    fn default() -> Self {
        Self {
            most_recent_outcome: 1,
            least_recent_outcome: 3,
            use_bigram: true,
            use_trigram: true,
            use_4gram: false,
        }
    }
}

impl DefaultOutcomeFeatureExtractor {
    pub const KIND: &'static str = "default-outcome";

    pub fn new(
        most_recent_outcome: usize,
        least_recent_outcome: usize,
        use_bigram: bool,
        use_trigram: bool,
        use_4gram: bool,
    ) -> Result<Self> {
        let extractor = Self {
            most_recent_outcome,
            least_recent_outcome,
            use_bigram,
            use_trigram,
            use_4gram,
        };
        extractor.validate()?;
        Ok(extractor)
    }

    fn validate(&self) -> Result<()> {
        if self.most_recent_outcome < 1 {
            return Err(Error::configuration(
                "outcome feature extractor",
                "most_recent_outcome must be at least 1",
            ));
        }
        if self.least_recent_outcome < self.most_recent_outcome {
            return Err(Error::configuration(
                "outcome feature extractor",
                "least_recent_outcome must not be smaller than most_recent_outcome",
            ));
        }
        Ok(())
    }

    /// Rebuild from a snapshot config
    pub fn from_config(config: &serde_json::Value) -> Result<Self> {
        let extractor: Self = serde_json::from_value(config.clone()).map_err(|e| {
            Error::configuration("outcome feature extractor", format!("invalid config: {}", e))
        })?;
        extractor.validate()?;
        Ok(extractor)
    }

    fn ngram<O: Outcome>(previous_outcomes: &[O], n: usize) -> Option<Feature> {
        if previous_outcomes.len() < n {
            return None;
        }
        let value = previous_outcomes[previous_outcomes.len() - n..]
            .iter()
            .map(|o| o.to_feature_value().to_string())
            .collect::<Vec<_>>()
            .join("_");
        Some(Feature::new(format!("PreviousOutcomes_L1_{}gram_L2R", n), value))
    }
}

impl<O: Outcome> OutcomeFeatureExtractor<O> for DefaultOutcomeFeatureExtractor {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn extract_features(&self, previous_outcomes: &[O]) -> Vec<Feature> {
        let mut features = Vec::new();
        if previous_outcomes.is_empty() {
            return features;
        }
        for lag in self.most_recent_outcome..=self.least_recent_outcome {
            if lag > previous_outcomes.len() {
                break;
            }
            let outcome = &previous_outcomes[previous_outcomes.len() - lag];
            features.push(Feature::new(
                format!("PreviousOutcome_L{}", lag),
                outcome.to_feature_value(),
            ));
        }
        let ngrams = [(2, self.use_bigram), (3, self.use_trigram), (4, self.use_4gram)];
        for (n, enabled) in ngrams {
            if enabled {
                features.extend(Self::ngram(previous_outcomes, n));
            }
        }
        features
    }

    fn config(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self)
            .map_err(|e| Error::encoding("outcome feature extractor", e.to_string()))
    }
}
