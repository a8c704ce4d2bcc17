#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tagpack::encoder::{
    read_encoders, EncodeFlags, FeaturesEncoder, NameNumber, NameNumberFeaturesEncoder,
    StringToStringOutcomeEncoder,
};
use tagpack::viterbi::OutcomeFeatureExtractor;
use tagpack::{
    Classifier, ClassifierBuilder, DataWriter, Error, Feature, Instance, ModelPackage,
    PackageDataWriter, PackageWriter, Registry, Result, ScoredOutcome, TrainingBackend,
};

pub const LOOKUP_CLASSIFIER_BUILDER: &str = "tests::LookupClassifierBuilder";
pub const LOOKUP_MODEL_FILE_NAME: &str = "model.lookup";

fn lookup_key(features: &[NameNumber]) -> String {
    features
        .iter()
        .map(|f| format!("{}={}", f.name, f.number))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Memorizes the last outcome seen for every exact feature set
pub struct LookupBackend {
    table: BTreeMap<String, String>,
}

impl TrainingBackend for LookupBackend {
    type Features = Vec<NameNumber>;
    type Outcome = String;
    type Config = ();

    const CLASSIFIER_BUILDER: &'static str = LOOKUP_CLASSIFIER_BUILDER;
    const FILE_NAMES: &'static [&'static str] = &[LOOKUP_MODEL_FILE_NAME];

    fn open(_dir: &Path, _config: ()) -> Result<Self> {
        Ok(Self {
            table: BTreeMap::new(),
        })
    }

    fn write_encoded(&mut self, features: Vec<NameNumber>, outcome: String) -> Result<()> {
        self.table.insert(lookup_key(&features), outcome);
        Ok(())
    }

    fn train(&mut self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(LOOKUP_MODEL_FILE_NAME);
        fs::write(&path, serde_json::to_vec(&self.table).unwrap()).unwrap();
        Ok(path)
    }
}

pub type LookupDataWriter =
    PackageDataWriter<String, LookupBackend, NameNumberFeaturesEncoder, StringToStringOutcomeEncoder>;

pub fn lookup_writer(dir: &Path) -> LookupDataWriter {
    PackageDataWriter::create(
        dir,
        (),
        NameNumberFeaturesEncoder::new(EncodeFlags::SORT),
        StringToStringOutcomeEncoder::new(),
    )
    .unwrap()
}

/// Accepts every instance but fails to train
pub struct FailingBackend;

impl TrainingBackend for FailingBackend {
    type Features = Vec<NameNumber>;
    type Outcome = String;
    type Config = ();

    const CLASSIFIER_BUILDER: &'static str = LOOKUP_CLASSIFIER_BUILDER;
    const FILE_NAMES: &'static [&'static str] = &[];

    fn open(_dir: &Path, _config: ()) -> Result<Self> {
        Ok(Self)
    }

    fn write_encoded(&mut self, _features: Vec<NameNumber>, _outcome: String) -> Result<()> {
        Ok(())
    }

    fn train(&mut self, _dir: &Path) -> Result<PathBuf> {
        Err(Error::Configuration {
            operation: "train",
            message: "solver diverged".to_string(),
        })
    }
}

pub type FailingDataWriter =
    PackageDataWriter<String, FailingBackend, NameNumberFeaturesEncoder, StringToStringOutcomeEncoder>;

pub fn failing_writer(dir: &Path) -> FailingDataWriter {
    PackageDataWriter::create(
        dir,
        (),
        NameNumberFeaturesEncoder::new(EncodeFlags::SORT),
        StringToStringOutcomeEncoder::new(),
    )
    .unwrap()
}

pub struct LookupClassifier {
    encoder: NameNumberFeaturesEncoder,
    table: BTreeMap<String, String>,
}

impl Classifier<String> for LookupClassifier {
    fn classify(&self, features: &[Feature]) -> Result<String> {
        let key = lookup_key(&self.encoder.encode_known(features)?);
        self.table
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::Configuration {
                operation: "classify",
                message: format!("no outcome for `{}`", key),
            })
    }

    fn score(&self, features: &[Feature], max_results: usize) -> Result<Vec<ScoredOutcome<String>>> {
        let mut scored = vec![ScoredOutcome::new(self.classify(features)?, 1.0)];
        scored.truncate(max_results);
        Ok(scored)
    }
}

pub struct LookupClassifierBuilder;

impl ClassifierBuilder<String> for LookupClassifierBuilder {
    fn build(
        &self,
        package: &ModelPackage,
        _registry: &Registry<String>,
    ) -> Result<Box<dyn Classifier<String>>> {
        let (encoder, _outcomes) = read_encoders::<
            NameNumberFeaturesEncoder,
            StringToStringOutcomeEncoder,
            String,
        >(package.dir())?;
        let bytes = fs::read(package.require_file(LOOKUP_MODEL_FILE_NAME)?).unwrap();
        let table = serde_json::from_slice(&bytes).unwrap();
        Ok(Box::new(LookupClassifier { encoder, table }))
    }
}

pub fn registry() -> Registry<String> {
    let mut registry = Registry::with_defaults();
    registry.register_classifier(LOOKUP_CLASSIFIER_BUILDER, LookupClassifierBuilder);
    registry
}

/// Emits `prev=<last outcome>` when a previous outcome exists
pub struct PrevExtractor;

impl PrevExtractor {
    pub const KIND: &'static str = "tests-prev";
}

impl OutcomeFeatureExtractor<String> for PrevExtractor {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn extract_features(&self, previous_outcomes: &[String]) -> Vec<Feature> {
        previous_outcomes
            .last()
            .map(|o| Feature::new("prev", o.as_str()))
            .into_iter()
            .collect()
    }

    fn config(&self) -> Result<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }
}

pub fn prev_extractor(_config: &serde_json::Value) -> Result<Box<dyn OutcomeFeatureExtractor<String>>> {
    Ok(Box::new(PrevExtractor))
}

/// Package writer that keeps everything it receives in memory
pub struct RecordingWriter {
    pub dir: PathBuf,
    pub written: Vec<Instance<String>>,
    pub finished: bool,
    pub writes_manifest: bool,
}

impl RecordingWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            written: Vec::new(),
            finished: false,
            writes_manifest: true,
        }
    }
}

impl DataWriter<String> for RecordingWriter {
    fn write(&mut self, instance: &Instance<String>) -> Result<()> {
        self.written.push(instance.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

impl PackageWriter<String> for RecordingWriter {
    fn output_directory(&self) -> &Path {
        &self.dir
    }

    fn classifier_builder(&self) -> &str {
        "tests::RecordingClassifierBuilder"
    }

    fn set_writes_manifest(&mut self, enabled: bool) {
        self.writes_manifest = enabled;
    }
}

pub fn instance(features: &[(&str, &str)], outcome: &str) -> Instance<String> {
    Instance::with_features(features.iter().copied(), outcome.to_string())
}
