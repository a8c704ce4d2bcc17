//! Training, packaging and reloading of statistical classifiers
//!
//! Training instances are symbolic: a list of named [`Feature`]s and an
//! outcome. A [`DataWriter`] encodes them, streams them to a training
//! backend and, on `finish`, seals the result into a self-describing model
//! package directory. A [`Registry`] turns such a directory back into a
//! classifier.
//!
//! Sequence taggers are built by wrapping a package writer in a
//! [`ViterbiDataWriter`], which derives extra features from the outcomes
//! earlier in the sequence.
//!
//! # Examples
//!
//! ## Training
//!
//! ```no_run
//! use tagpack::backend::{PerceptronBackend, PerceptronDataWriter, PerceptronParams};
//! use tagpack::viterbi::{DefaultOutcomeFeatureExtractor, SequentialDataWriter, ViterbiDataWriter};
//! use tagpack::Instance;
//!
//! let mut writer = ViterbiDataWriter::<String, PerceptronDataWriter>::new(
//!     "pos-model",
//!     vec![Box::new(DefaultOutcomeFeatureExtractor::default())],
//! )?;
//! let delegate = PerceptronBackend::data_writer(
//!     writer.delegated_model_directory(),
//!     PerceptronParams::default(),
//! )?;
//! writer.set_delegate(delegate)?;
//!
//! let mut sentence = vec![
//!     Instance::with_features(vec![("word", "The")], "DT".to_string()),
//!     Instance::with_features(vec![("word", "dog")], "NN".to_string()),
//! ];
//! writer.write_sequence(&mut sentence)?;
//! writer.finish()?;
//! # Ok::<(), tagpack::Error>(())
//! ```
//!
//! ## Tagging
//!
//! ```no_run
//! use tagpack::{Feature, Registry, SequentialClassifier};
//!
//! let registry = Registry::with_defaults();
//! let tagger = registry.load_sequential_classifier("pos-model")?;
//! let tags = tagger.classify_sequence(&[
//!     vec![Feature::new("word", "The")],
//!     vec![Feature::new("word", "cat")],
//! ])?;
//! # Ok::<(), tagpack::Error>(())
//! ```

mod error;
mod feature;

pub mod backend;
pub mod builder;
pub mod classifier;
pub mod encoder;
pub mod manifest;
pub mod package;
pub mod viterbi;
pub mod writer;

pub use self::builder::{ClassifierBuilder, Registry, SequentialClassifierBuilder};
pub use self::classifier::{Classifier, ScoredOutcome, SequentialClassifier};
pub use self::error::{Error, Result};
pub use self::feature::{Feature, FeatureValue, Instance, Outcome};
pub use self::manifest::ClassifierManifest;
pub use self::package::ModelPackage;
pub use self::viterbi::{SequentialDataWriter, ViterbiClassifier, ViterbiDataWriter};
pub use self::writer::{AuxWriter, DataWriter, PackageDataWriter, PackageWriter, TrainingBackend};
