use crate::error::Result;
use crate::feature::Feature;

/// An outcome with the score the classifier assigned to it
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredOutcome<O> {
    pub outcome: O,
    pub score: f64,
}

impl<O> ScoredOutcome<O> {
    pub fn new(outcome: O, score: f64) -> Self {
        Self { outcome, score }
    }
}

/// A trained single-instance classifier
pub trait Classifier<O> {
    /// Predict the best outcome for one instance
    fn classify(&self, features: &[Feature]) -> Result<O>;

    /// The `max_results` best outcomes, best first
    fn score(&self, features: &[Feature], max_results: usize) -> Result<Vec<ScoredOutcome<O>>>;
}

/// A trained classifier over whole sequences
pub trait SequentialClassifier<O> {
    /// Predict one outcome per item, in input order
    fn classify_sequence(&self, sequence: &[Vec<Feature>]) -> Result<Vec<O>>;
}
