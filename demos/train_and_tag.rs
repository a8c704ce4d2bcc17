//! Train a tiny part-of-speech tagger and tag a new sentence with it.
//!
//! Usage: `cargo run --example train_and_tag [output-dir]`

use std::env;
use std::io::Write;
use std::path::PathBuf;

use tagpack::backend::{PerceptronBackend, PerceptronDataWriter, PerceptronParams};
use tagpack::viterbi::{
    DefaultOutcomeFeatureExtractor, OutcomeFeatureExtractor, SequentialDataWriter,
    ViterbiDataWriter,
};
use tagpack::{Feature, Instance, Registry};

const CORPUS: &[&[(&str, &str)]] = &[
    &[("The", "DT"), ("dog", "NN"), ("barks", "VBZ")],
    &[("A", "DT"), ("small", "JJ"), ("cat", "NN"), ("sleeps", "VBZ")],
    &[("The", "DT"), ("old", "JJ"), ("dog", "NN"), ("sleeps", "VBZ")],
    &[("A", "DT"), ("cat", "NN"), ("runs", "VBZ")],
];

fn word_features(word: &str) -> Vec<Feature> {
    let lower = word.to_lowercase();
    let suffix: String = lower.chars().rev().take(2).collect::<Vec<_>>().into_iter().rev().collect();
    vec![
        Feature::new("word", lower.as_str()),
        Feature::new("suffix", suffix),
        Feature::new("capitalized", word.starts_with(char::is_uppercase)),
    ]
}

fn main() -> tagpack::Result<()> {
    let dir = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| env::temp_dir().join("tagpack-pos-model"));

    let extractors: Vec<Box<dyn OutcomeFeatureExtractor<String>>> =
        vec![Box::new(DefaultOutcomeFeatureExtractor::default())];
    let mut writer: ViterbiDataWriter<String, PerceptronDataWriter> =
        ViterbiDataWriter::new(&dir, extractors)?;
    let params = PerceptronParams::default().with_shuffle_seed(42);
    let mut delegate = PerceptronBackend::data_writer(writer.delegated_model_directory(), params)?;
    let mut vocabulary = delegate.print_writer("vocabulary.txt")?;
    writer.set_delegate(delegate)?;

    for sentence in CORPUS {
        let mut sequence: Vec<Instance<String>> = sentence
            .iter()
            .map(|&(word, tag)| Instance {
                features: word_features(word),
                outcome: tag.to_string(),
            })
            .collect();
        for (word, _) in sentence.iter() {
            writeln!(vocabulary, "{}", word).map_err(|e| tagpack::Error::Io {
                operation: "write vocabulary",
                path: vocabulary.path().to_path_buf(),
                source: e,
            })?;
        }
        writer.write_sequence(&mut sequence)?;
    }
    writer.finish()?;
    println!("model written to {}", dir.display());

    let tagger = Registry::with_defaults().load_sequential_classifier(&dir)?;
    let words = ["The", "small", "dog", "runs"];
    let input: Vec<Vec<Feature>> = words.iter().map(|w| word_features(w)).collect();
    let tags = tagger.classify_sequence(&input)?;
    for (word, tag) in words.iter().zip(&tags) {
        println!("{}\t{}", word, tag);
    }
    Ok(())
}
