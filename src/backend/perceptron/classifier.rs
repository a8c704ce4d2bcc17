use std::cmp::Ordering;

use super::model::PerceptronModel;
use super::trainer::{argmax, label_scores};
use super::MODEL_FILE_NAME;
use crate::builder::{ClassifierBuilder, Registry};
use crate::classifier::{Classifier, ScoredOutcome};
use crate::encoder::{
    read_encoders, FeaturesEncoder, NameNumber, NameNumberFeaturesEncoder, OutcomeEncoder,
    StringToIntegerOutcomeEncoder,
};
use crate::error::{Error, Result};
use crate::feature::Feature;
use crate::package::ModelPackage;

/// Classifier backed by a trained averaged perceptron
#[derive(Debug, Clone)]
pub struct PerceptronClassifier {
    features_encoder: NameNumberFeaturesEncoder,
    outcome_encoder: StringToIntegerOutcomeEncoder,
    model: PerceptronModel,
}

impl PerceptronClassifier {
    pub fn new(
        features_encoder: NameNumberFeaturesEncoder,
        outcome_encoder: StringToIntegerOutcomeEncoder,
        model: PerceptronModel,
    ) -> Self {
        Self {
            features_encoder,
            outcome_encoder,
            model,
        }
    }

    /// Load a package written by a
    /// [`PerceptronDataWriter`](super::PerceptronDataWriter).
    pub fn open(package: &ModelPackage) -> Result<Self> {
        let model = PerceptronModel::open(&package.require_file(MODEL_FILE_NAME)?)?;
        let (features_encoder, outcome_encoder) = read_encoders::<
            NameNumberFeaturesEncoder,
            StringToIntegerOutcomeEncoder,
            String,
        >(package.dir())?;
        Ok(Self::new(features_encoder, outcome_encoder, model))
    }

    pub fn model(&self) -> &PerceptronModel {
        &self.model
    }

    /// Label scores for already encoded features, indexed by label id
    pub fn score_encoded(&self, features: &[NameNumber]) -> Vec<f64> {
        let attrs = features
            .iter()
            .filter_map(|f| self.model.attr_id(&f.name).map(|id| (id, f.number)));
        label_scores(attrs, self.model.weights(), self.model.num_labels())
    }

    /// Best label id for already encoded features
    pub fn classify_encoded(&self, features: &[NameNumber]) -> Result<u32> {
        argmax(&self.score_encoded(features))
            .map(|label| label as u32)
            .ok_or_else(|| Error::configuration("classify", "model has no labels"))
    }
}

impl Classifier<String> for PerceptronClassifier {
    fn classify(&self, features: &[Feature]) -> Result<String> {
        let encoded = self.features_encoder.encode_known(features)?;
        let label = self.classify_encoded(&encoded)?;
        self.outcome_encoder.decode(&label)
    }

    fn score(&self, features: &[Feature], max_results: usize) -> Result<Vec<ScoredOutcome<String>>> {
        let encoded = self.features_encoder.encode_known(features)?;
        let mut ranked: Vec<(u32, f64)> = self
            .score_encoded(&encoded)
            .into_iter()
            .enumerate()
            .map(|(label, score)| (label as u32, score))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        ranked
            .into_iter()
            .take(max_results)
            .map(|(label, score)| Ok(ScoredOutcome::new(self.outcome_encoder.decode(&label)?, score)))
            .collect()
    }
}

/// Rebuilds a [`PerceptronClassifier`] from its package
#[derive(Debug, Clone, Copy, Default)]
pub struct PerceptronClassifierBuilder;

impl ClassifierBuilder<String> for PerceptronClassifierBuilder {
    fn build(
        &self,
        package: &ModelPackage,
        _registry: &Registry<String>,
    ) -> Result<Box<dyn Classifier<String>>> {
        Ok(Box::new(PerceptronClassifier::open(package)?))
    }
}
