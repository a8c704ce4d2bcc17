use std::cmp::Ordering;
use std::path::Path;

use tracing::debug;

use super::extractor::{extend_with_history, read_extractors, OutcomeFeatureExtractor};
use crate::builder::{Registry, SequentialClassifierBuilder};
use crate::classifier::{Classifier, SequentialClassifier};
use crate::error::{Error, Result};
use crate::feature::{Feature, Outcome};
use crate::manifest::DELEGATED_CLASSIFIER_BUILDER_KEY;
use crate::package::{ModelPackage, DELEGATED_MODEL_DIRECTORY_NAME};

/// Tags a sequence item by item, feeding earlier predictions back through
/// the outcome feature extractors.
///
/// With a stack size of 1 each item gets the delegate's best outcome. A
/// larger stack keeps that many partial taggings, ranked by the sum of the
/// delegate's scores, and returns the best complete one.
pub struct ViterbiClassifier<O> {
    delegate: Box<dyn Classifier<O>>,
    extractors: Vec<Box<dyn OutcomeFeatureExtractor<O>>>,
    stack_size: usize,
}

impl<O: Outcome> ViterbiClassifier<O> {
    pub fn new(
        delegate: Box<dyn Classifier<O>>,
        extractors: Vec<Box<dyn OutcomeFeatureExtractor<O>>>,
    ) -> Self {
        Self {
            delegate,
            extractors,
            stack_size: 1,
        }
    }

    /// Number of partial taggings kept while decoding
    pub fn with_stack_size(mut self, stack_size: usize) -> Result<Self> {
        if stack_size < 1 {
            return Err(Error::configuration(
                "with_stack_size",
                "stack_size must be at least 1",
            ));
        }
        self.stack_size = stack_size;
        Ok(self)
    }

    pub fn stack_size(&self) -> usize {
        self.stack_size
    }

    /// Load a sequential package written by a
    /// [`ViterbiDataWriter`](super::ViterbiDataWriter).
    pub fn open<P: AsRef<Path>>(dir: P, registry: &Registry<O>) -> Result<Self> {
        let package = ModelPackage::open(dir)?;
        Self::from_package(&package, registry)
    }

    fn from_package(package: &ModelPackage, registry: &Registry<O>) -> Result<Self> {
        let snapshots = read_extractors(package.dir())?;
        let extractors = registry.build_extractors(package.dir(), &snapshots)?;
        let key = package
            .manifest()
            .get(DELEGATED_CLASSIFIER_BUILDER_KEY)
            .ok_or_else(|| {
                Error::model_load(package.dir(), "manifest names no delegated classifier builder")
            })?;
        let delegated = package.require_dir(DELEGATED_MODEL_DIRECTORY_NAME)?;
        let delegate = registry.build_classifier(&ModelPackage::open_nested(delegated, key)?)?;
        Ok(Self::new(delegate, extractors))
    }

    fn features_for(&self, item: &[Feature], history: &[O]) -> Vec<Feature> {
        let mut features = item.to_vec();
        extend_with_history(&mut features, &self.extractors, history);
        features
    }

    fn classify_greedy(&self, sequence: &[Vec<Feature>]) -> Result<Vec<O>> {
        let mut history = Vec::with_capacity(sequence.len());
        for item in sequence {
            let features = self.features_for(item, &history);
            history.push(self.delegate.classify(&features)?);
        }
        Ok(history)
    }

    fn classify_beam(&self, sequence: &[Vec<Feature>]) -> Result<Vec<O>> {
        let mut paths: Vec<(Vec<O>, f64)> = vec![(Vec::with_capacity(sequence.len()), 0.0)];
        for item in sequence {
            let mut candidates = Vec::with_capacity(paths.len() * self.stack_size);
            for (history, total) in &paths {
                let features = self.features_for(item, history);
                let scored = self.delegate.score(&features, self.stack_size)?;
                if scored.is_empty() {
                    return Err(Error::configuration(
                        "classify_sequence",
                        "delegate classifier returned no outcomes",
                    ));
                }
                for candidate in scored {
                    let mut extended = history.clone();
                    extended.push(candidate.outcome);
                    candidates.push((extended, total + candidate.score));
                }
            }
            candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
            candidates.truncate(self.stack_size);
            paths = candidates;
        }
        Ok(paths
            .into_iter()
            .next()
            .map(|(outcomes, _)| outcomes)
            .unwrap_or_default())
    }
}

impl<O: Outcome> SequentialClassifier<O> for ViterbiClassifier<O> {
    fn classify_sequence(&self, sequence: &[Vec<Feature>]) -> Result<Vec<O>> {
        if self.stack_size == 1 {
            self.classify_greedy(sequence)
        } else {
            self.classify_beam(sequence)
        }
    }
}

/// Rebuilds a [`ViterbiClassifier`] from its package
#[derive(Debug, Clone, Copy, Default)]
pub struct ViterbiClassifierBuilder;

impl<O: Outcome> SequentialClassifierBuilder<O> for ViterbiClassifierBuilder {
    fn build(
        &self,
        package: &ModelPackage,
        registry: &Registry<O>,
    ) -> Result<Box<dyn SequentialClassifier<O>>> {
        let classifier = ViterbiClassifier::from_package(package, registry)?;
        debug!(
            dir = %package.dir().display(),
            extractors = classifier.extractors.len(),
            "built viterbi classifier"
        );
        Ok(Box::new(classifier))
    }
}
