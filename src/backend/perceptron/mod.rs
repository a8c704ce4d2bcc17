//! Multiclass averaged perceptron
//!
//! Instances are streamed to `training-data.perceptron` while they are
//! written. Training happens once the data writer finishes and produces
//! `model.perceptron` next to the training data.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::encoder::{
    EncodeFlags, NameNumber, NameNumberFeaturesEncoder, StringToIntegerOutcomeEncoder,
};
use crate::error::{Error, IoContext, Result};
use crate::writer::{PackageDataWriter, TrainingBackend};

mod classifier;
mod data;
mod model;
mod params;
mod trainer;

pub use self::classifier::{PerceptronClassifier, PerceptronClassifierBuilder};
pub use self::model::PerceptronModel;
pub use self::params::PerceptronParams;

/// Builder key recorded in the manifest of perceptron packages
pub const PERCEPTRON_CLASSIFIER_BUILDER: &str =
    "tagpack::backend::perceptron::PerceptronClassifierBuilder";

pub const TRAINING_DATA_FILE_NAME: &str = "training-data.perceptron";
pub const MODEL_FILE_NAME: &str = "model.perceptron";

/// Data writer producing perceptron packages from string outcomes
pub type PerceptronDataWriter = PackageDataWriter<
    String,
    PerceptronBackend,
    NameNumberFeaturesEncoder,
    StringToIntegerOutcomeEncoder,
>;

#[derive(Debug)]
pub struct PerceptronBackend {
    params: PerceptronParams,
    data_path: PathBuf,
    writer: Option<BufWriter<File>>,
    num_instances: usize,
}

impl PerceptronBackend {
    /// Open a data writer with the encoders perceptron packages use
    pub fn data_writer<P: AsRef<Path>>(
        dir: P,
        params: PerceptronParams,
    ) -> Result<PerceptronDataWriter> {
        PackageDataWriter::create(
            dir,
            params,
            NameNumberFeaturesEncoder::new(EncodeFlags::COMPRESS | EncodeFlags::SORT),
            StringToIntegerOutcomeEncoder::new(),
        )
    }

    pub fn params(&self) -> &PerceptronParams {
        &self.params
    }

    /// Instances written so far
    pub fn num_instances(&self) -> usize {
        self.num_instances
    }
}

impl TrainingBackend for PerceptronBackend {
    type Features = Vec<NameNumber>;
    type Outcome = u32;
    type Config = PerceptronParams;

    const CLASSIFIER_BUILDER: &'static str = PERCEPTRON_CLASSIFIER_BUILDER;
    const FILE_NAMES: &'static [&'static str] = &[TRAINING_DATA_FILE_NAME, MODEL_FILE_NAME];

    fn open(dir: &Path, params: PerceptronParams) -> Result<Self> {
        params.validate()?;
        let data_path = dir.join(TRAINING_DATA_FILE_NAME);
        let file = File::create(&data_path).at("create training data", &data_path)?;
        Ok(Self {
            params,
            data_path,
            writer: Some(BufWriter::new(file)),
            num_instances: 0,
        })
    }

    fn write_encoded(&mut self, features: Vec<NameNumber>, outcome: u32) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::lifecycle("write", "perceptron backend is already trained"))?;
        data::write_instance(writer, &features, outcome)
            .at("write training data", &self.data_path)?;
        self.num_instances += 1;
        Ok(())
    }

    fn train(&mut self, dir: &Path) -> Result<PathBuf> {
        let mut writer = self
            .writer
            .take()
            .ok_or_else(|| Error::lifecycle("train", "perceptron backend is already trained"))?;
        writer.flush().at("flush training data", &self.data_path)?;
        drop(writer);

        let data = data::read_training_data(&self.data_path)?;
        debug!(
            path = %self.data_path.display(),
            instances = data.instances.len(),
            "read training data"
        );
        if data.num_labels == 0 {
            return Err(Error::configuration(
                "train",
                "no training instances were written",
            ));
        }
        let weights = trainer::train(&data, &self.params);

        let model_path = dir.join(MODEL_FILE_NAME);
        model::write_model(&model_path, &weights, data.num_labels, &data.attrs)?;
        Ok(model_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Registry;
    use crate::classifier::Classifier;
    use crate::feature::{Feature, Instance};
    use crate::writer::DataWriter;

    #[test]
    fn test_train_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let params = PerceptronParams::default().with_shuffle_seed(1);
        let mut writer = PerceptronBackend::data_writer(dir.path(), params).unwrap();
        let data = [("the", "DT"), ("a", "DT"), ("dog", "NN"), ("cat", "NN"), ("runs", "VBZ")];
        for (word, tag) in data {
            writer
                .write(&Instance::with_features(vec![("word", word)], tag.to_string()))
                .unwrap();
        }
        assert_eq!(writer.backend().num_instances(), 5);
        writer.finish().unwrap();
        assert!(dir.path().join(MODEL_FILE_NAME).is_file());

        let classifier = Registry::with_defaults().load_classifier(dir.path()).unwrap();
        for (word, tag) in data {
            assert_eq!(classifier.classify(&[Feature::new("word", word)]).unwrap(), tag);
        }

        let top = classifier.score(&[Feature::new("word", "dog")], 2).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].outcome, "NN");
        assert!(top[0].score >= top[1].score);
    }

    #[test]
    fn test_finish_without_instances_leaves_package_unsealed() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer =
            PerceptronBackend::data_writer(dir.path(), PerceptronParams::default()).unwrap();
        assert!(matches!(writer.finish(), Err(Error::Configuration { .. })));
        assert!(!dir.path().join(MODEL_FILE_NAME).exists());
        assert!(matches!(
            Registry::with_defaults().load_classifier(dir.path()),
            Err(Error::ModelLoad { .. })
        ));
    }

    #[test]
    fn test_invalid_params_rejected_at_open() {
        let dir = tempfile::tempdir().unwrap();
        let params: PerceptronParams = serde_json::from_str(r#"{"epsilon": -1.0}"#).unwrap();
        assert!(matches!(
            PerceptronBackend::data_writer(dir.path(), params),
            Err(Error::Configuration { .. })
        ));
    }
}
