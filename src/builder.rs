//! Reloading trained classifiers from their packages
//!
//! A package manifest names its classifier builder by a stable string key.
//! A [`Registry`] maps those keys, and the kinds of persisted outcome feature
//! extractors, back to code.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::backend::perceptron::{PerceptronClassifierBuilder, PERCEPTRON_CLASSIFIER_BUILDER};
use crate::classifier::{Classifier, SequentialClassifier};
use crate::error::{Error, Result};
use crate::feature::Outcome;
use crate::package::ModelPackage;
use crate::viterbi::{
    DefaultOutcomeFeatureExtractor, ExtractorSnapshot, OutcomeFeatureExtractor,
    ViterbiClassifierBuilder, VITERBI_CLASSIFIER_BUILDER,
};

/// Constructs a classifier from an opened package
pub trait ClassifierBuilder<O> {
    fn build(&self, package: &ModelPackage, registry: &Registry<O>)
        -> Result<Box<dyn Classifier<O>>>;
}

/// Constructs a sequential classifier from an opened package
pub trait SequentialClassifierBuilder<O> {
    fn build(
        &self,
        package: &ModelPackage,
        registry: &Registry<O>,
    ) -> Result<Box<dyn SequentialClassifier<O>>>;
}

/// Rebuilds an outcome feature extractor from its persisted config
pub type ExtractorFactory<O> =
    fn(&serde_json::Value) -> Result<Box<dyn OutcomeFeatureExtractor<O>>>;

fn default_extractor<O: Outcome>(
    config: &serde_json::Value,
) -> Result<Box<dyn OutcomeFeatureExtractor<O>>> {
    Ok(Box::new(DefaultOutcomeFeatureExtractor::from_config(config)?))
}

/// Builder keys and extractor kinds known to this process
pub struct Registry<O> {
    classifiers: HashMap<String, Box<dyn ClassifierBuilder<O>>>,
    sequential: HashMap<String, Box<dyn SequentialClassifierBuilder<O>>>,
    extractors: HashMap<String, ExtractorFactory<O>>,
}

impl<O: Outcome> Registry<O> {
    /// A registry knowing the sequential builder and the default extractor
    pub fn new() -> Self {
        let mut registry = Self {
            classifiers: HashMap::new(),
            sequential: HashMap::new(),
            extractors: HashMap::new(),
        };
        registry.register_sequential(VITERBI_CLASSIFIER_BUILDER, ViterbiClassifierBuilder);
        registry.register_extractor(DefaultOutcomeFeatureExtractor::KIND, default_extractor::<O>);
        registry
    }

    /// Register a builder under `key`, replacing any previous one
    pub fn register_classifier<B>(&mut self, key: &str, builder: B)
    where
        B: ClassifierBuilder<O> + 'static,
    {
        self.classifiers.insert(key.to_string(), Box::new(builder));
    }

    pub fn register_sequential<B>(&mut self, key: &str, builder: B)
    where
        B: SequentialClassifierBuilder<O> + 'static,
    {
        self.sequential.insert(key.to_string(), Box::new(builder));
    }

    pub fn register_extractor(&mut self, kind: &str, factory: ExtractorFactory<O>) {
        self.extractors.insert(kind.to_string(), factory);
    }

    /// Load the single-instance classifier stored in `dir`.
    pub fn load_classifier<P: AsRef<Path>>(&self, dir: P) -> Result<Box<dyn Classifier<O>>> {
        let package = ModelPackage::open(dir)?;
        self.build_classifier(&package)
    }

    /// Build the classifier of an already opened package
    pub fn build_classifier(&self, package: &ModelPackage) -> Result<Box<dyn Classifier<O>>> {
        let key = package.classifier_builder();
        let builder = match self.classifiers.get(key) {
            Some(builder) => builder,
            None if self.sequential.contains_key(key) => {
                return Err(Error::model_load(
                    package.dir(),
                    format!("`{}` builds a sequential classifier", key),
                ))
            }
            None => {
                return Err(Error::model_load(
                    package.dir(),
                    format!("unknown classifier builder `{}`", key),
                ))
            }
        };
        let classifier = builder.build(package, self)?;
        info!(dir = %package.dir().display(), builder = key, "loaded classifier");
        Ok(classifier)
    }

    /// Load the sequential classifier stored in `dir`.
    pub fn load_sequential_classifier<P: AsRef<Path>>(
        &self,
        dir: P,
    ) -> Result<Box<dyn SequentialClassifier<O>>> {
        let package = ModelPackage::open(dir)?;
        let key = package.classifier_builder();
        let builder = match self.sequential.get(key) {
            Some(builder) => builder,
            None if self.classifiers.contains_key(key) => {
                return Err(Error::model_load(
                    package.dir(),
                    format!("`{}` builds a single-instance classifier", key),
                ))
            }
            None => {
                return Err(Error::model_load(
                    package.dir(),
                    format!("unknown classifier builder `{}`", key),
                ))
            }
        };
        let classifier = builder.build(&package, self)?;
        info!(dir = %package.dir().display(), builder = key, "loaded sequential classifier");
        Ok(classifier)
    }

    /// Rebuild persisted extractors in their original order.
    pub fn build_extractors(
        &self,
        package_dir: &Path,
        snapshots: &[ExtractorSnapshot],
    ) -> Result<Vec<Box<dyn OutcomeFeatureExtractor<O>>>> {
        let mut extractors = Vec::with_capacity(snapshots.len());
        for snapshot in snapshots {
            let factory = self.extractors.get(&snapshot.kind).ok_or_else(|| {
                Error::model_load(
                    package_dir,
                    format!("unknown outcome feature extractor `{}`", snapshot.kind),
                )
            })?;
            let extractor = factory(&snapshot.config)
                .map_err(|e| Error::model_load(package_dir, e.to_string()))?;
            debug!(kind = %snapshot.kind, "rebuilt outcome feature extractor");
            extractors.push(extractor);
        }
        Ok(extractors)
    }
}

impl<O: Outcome> Default for Registry<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry<String> {
    /// A registry knowing every builder this crate ships
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_classifier(PERCEPTRON_CLASSIFIER_BUILDER, PerceptronClassifierBuilder);
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ClassifierManifest;

    #[test]
    fn test_unknown_builder() {
        let dir = tempfile::tempdir().unwrap();
        ClassifierManifest::for_builder("com.example.Missing").unwrap().write(dir.path()).unwrap();
        let registry = Registry::<String>::with_defaults();
        let err = registry.load_classifier(dir.path()).err().unwrap();
        assert!(matches!(err, Error::ModelLoad { .. }));
        assert!(err.to_string().contains("com.example.Missing"));
    }

    #[test]
    fn test_builder_kind_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        ClassifierManifest::for_builder(VITERBI_CLASSIFIER_BUILDER)
            .unwrap()
            .write(dir.path())
            .unwrap();
        let registry = Registry::<String>::with_defaults();
        let err = registry.load_classifier(dir.path()).err().unwrap();
        assert!(err.to_string().contains("sequential"));

        ClassifierManifest::for_builder(PERCEPTRON_CLASSIFIER_BUILDER)
            .unwrap()
            .write(dir.path())
            .unwrap();
        let err = registry.load_sequential_classifier(dir.path()).err().unwrap();
        assert!(err.to_string().contains("single-instance"));
    }

    #[test]
    fn test_unsealed_package() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::<String>::with_defaults();
        assert!(matches!(
            registry.load_sequential_classifier(dir.path()),
            Err(Error::ModelLoad { .. })
        ));
    }

    #[test]
    fn test_build_extractors() {
        let registry = Registry::<String>::new();
        let snapshots = vec![ExtractorSnapshot {
            kind: DefaultOutcomeFeatureExtractor::KIND.to_string(),
            config: serde_json::json!({"most_recent_outcome": 1, "least_recent_outcome": 1}),
        }];
        let extractors = registry.build_extractors(Path::new("pkg"), &snapshots).unwrap();
        let history = vec!["A".to_string(), "B".to_string()];
        let names: Vec<String> = extractors[0]
            .extract_features(&history)
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, ["PreviousOutcome_L1", "PreviousOutcomes_L1_2gram_L2R"]);

        let unknown = vec![ExtractorSnapshot {
            kind: "nope".to_string(),
            config: serde_json::Value::Null,
        }];
        assert!(matches!(
            registry.build_extractors(Path::new("pkg"), &unknown),
            Err(Error::ModelLoad { .. })
        ));
    }
}
