//! Sequence tagging on top of a single-instance classifier
//!
//! Training wraps a [`PackageWriter`](crate::writer::PackageWriter): every
//! instance of a sequence receives features computed from the gold outcomes
//! before it. At inference time the same features are computed from the
//! classifier's own predictions.

mod classifier;
mod extractor;
mod writer;

pub use self::classifier::{ViterbiClassifier, ViterbiClassifierBuilder};
pub use self::extractor::{
    DefaultOutcomeFeatureExtractor, ExtractorSnapshot, OutcomeFeatureExtractor,
    EXTRACTORS_FORMAT_VERSION,
};
pub use self::writer::{SequentialDataWriter, ViterbiDataWriter};

/// Builder key recorded in the manifest of sequential packages
pub const VITERBI_CLASSIFIER_BUILDER: &str = "tagpack::viterbi::ViterbiClassifierBuilder";
