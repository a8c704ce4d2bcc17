use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Value carried by a feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FeatureValue {
    String(String),
    Number(f64),
    Boolean(bool),
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::String(s) => f.write_str(s),
            FeatureValue::Number(n) => write!(f, "{}", n),
            FeatureValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<String> for FeatureValue {
    fn from(value: String) -> Self {
        FeatureValue::String(value)
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        FeatureValue::String(value.to_string())
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        FeatureValue::Number(value)
    }
}

impl From<i64> for FeatureValue {
    fn from(value: i64) -> Self {
        FeatureValue::Number(value as f64)
    }
}

impl From<i32> for FeatureValue {
    fn from(value: i32) -> Self {
        FeatureValue::Number(f64::from(value))
    }
}

impl From<bool> for FeatureValue {
    fn from(value: bool) -> Self {
        FeatureValue::Boolean(value)
    }
}

/// A named feature value
///
/// Features are used for both training and classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Feature name, may be empty for value-only features
    pub name: String,
    /// Value of the feature
    pub value: FeatureValue,
}

impl Feature {
    /// Create a new feature with a name and value
    pub fn new<N: Into<String>, V: Into<FeatureValue>>(name: N, value: V) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl<S: Into<String>, V: Into<FeatureValue>> From<(S, V)> for Feature {
    fn from((name, value): (S, V)) -> Self {
        Self::new(name, value)
    }
}

/// Outcome types a classifier can be trained to predict.
///
/// Outcomes must round-trip through serde so encoders holding them can be
/// snapshotted, and must be expressible as a feature value so that
/// outcome-history features can be derived from them.
pub trait Outcome: Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + 'static {
    fn to_feature_value(&self) -> FeatureValue;
}

impl Outcome for String {
    fn to_feature_value(&self) -> FeatureValue {
        FeatureValue::String(self.clone())
    }
}

impl Outcome for i64 {
    fn to_feature_value(&self) -> FeatureValue {
        FeatureValue::Number(*self as f64)
    }
}

impl Outcome for bool {
    fn to_feature_value(&self) -> FeatureValue {
        FeatureValue::Boolean(*self)
    }
}

/// A labeled training example: ordered features plus one outcome
#[derive(Debug, Clone, PartialEq)]
pub struct Instance<O> {
    /// Features in insertion order
    pub features: Vec<Feature>,
    /// Gold outcome
    pub outcome: O,
}

impl<O> Instance<O> {
    pub fn new(outcome: O) -> Self {
        Self {
            features: Vec::new(),
            outcome,
        }
    }

    pub fn with_features<I, F>(features: I, outcome: O) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Feature>,
    {
        Self {
            features: features.into_iter().map(Into::into).collect(),
            outcome,
        }
    }

    pub fn add(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn add_all<I: IntoIterator<Item = Feature>>(&mut self, features: I) {
        self.features.extend(features);
    }
}
