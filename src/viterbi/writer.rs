use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use tracing::info;

use super::extractor::{extend_with_history, write_extractors, OutcomeFeatureExtractor};
use super::VITERBI_CLASSIFIER_BUILDER;
use crate::error::{Error, Result};
use crate::feature::{Instance, Outcome};
use crate::manifest::{ClassifierManifest, DELEGATED_CLASSIFIER_BUILDER_KEY};
use crate::package::{prepare_output_directory, DELEGATED_MODEL_DIRECTORY_NAME};
use crate::writer::PackageWriter;

/// Sink for whole training sequences
pub trait SequentialDataWriter<O> {
    fn write_sequence(&mut self, instances: &mut [Instance<O>]) -> Result<()>;

    fn finish(&mut self) -> Result<()>;
}

/// Sequential data writer that adds outcome-history features to each
/// instance before handing it to a delegate [`PackageWriter`].
///
/// The delegate packages its model in `<dir>/delegated-model` but never
/// writes a manifest. This writer writes the only manifest, in `<dir>`,
/// naming both its own builder and the delegate's.
pub struct ViterbiDataWriter<O, W> {
    dir: PathBuf,
    extractors: Vec<Box<dyn OutcomeFeatureExtractor<O>>>,
    delegate: Option<W>,
    finished: bool,
    _outcome: PhantomData<fn(&O)>,
}

impl<O, W> ViterbiDataWriter<O, W>
where
    O: Outcome,
    W: PackageWriter<O>,
{
    pub fn new<P: AsRef<Path>>(
        dir: P,
        extractors: Vec<Box<dyn OutcomeFeatureExtractor<O>>>,
    ) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        prepare_output_directory(&dir)?;
        Ok(Self {
            dir,
            extractors,
            delegate: None,
            finished: false,
            _outcome: PhantomData,
        })
    }

    pub fn output_directory(&self) -> &Path {
        &self.dir
    }

    /// Directory the delegate writer must package its model into
    pub fn delegated_model_directory(&self) -> PathBuf {
        self.dir.join(DELEGATED_MODEL_DIRECTORY_NAME)
    }

    /// Attach the writer that receives the augmented instances.
    ///
    /// The delegate must write into [`Self::delegated_model_directory`].
    pub fn set_delegate(&mut self, mut delegate: W) -> Result<()> {
        if self.finished {
            return Err(Error::lifecycle("set_delegate", "data writer is already finished"));
        }
        let expected = self.delegated_model_directory();
        if delegate.output_directory() != expected {
            return Err(Error::configuration(
                "set_delegate",
                format!(
                    "delegate writes to {}, expected {}",
                    delegate.output_directory().display(),
                    expected.display()
                ),
            ));
        }
        delegate.set_writes_manifest(false);
        self.delegate = Some(delegate);
        Ok(())
    }

    pub fn delegate(&self) -> Option<&W> {
        self.delegate.as_ref()
    }

    pub fn extractors(&self) -> &[Box<dyn OutcomeFeatureExtractor<O>>] {
        &self.extractors
    }
}

impl<O, W> SequentialDataWriter<O> for ViterbiDataWriter<O, W>
where
    O: Outcome,
    W: PackageWriter<O>,
{
    /// Write one sequence.
    ///
    /// The outcome-history features are appended to the caller's instances
    /// in place. History is built from the gold outcomes and starts empty
    /// for every call.
    fn write_sequence(&mut self, instances: &mut [Instance<O>]) -> Result<()> {
        if self.finished {
            return Err(Error::lifecycle(
                "write_sequence",
                "data writer is already finished",
            ));
        }
        let delegate = self.delegate.as_mut().ok_or_else(|| {
            Error::configuration(
                "write_sequence",
                "a delegate data writer must be set before writing sequences",
            )
        })?;

        let mut history: Vec<O> = Vec::with_capacity(instances.len());
        for instance in instances.iter_mut() {
            extend_with_history(&mut instance.features, &self.extractors, &history);
            history.push(instance.outcome.clone());
            delegate.write(instance)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Err(Error::lifecycle("finish", "data writer is already finished"));
        }
        let delegate = self.delegate.as_mut().ok_or_else(|| {
            Error::configuration(
                "finish",
                "a delegate data writer must be set before finishing",
            )
        })?;
        self.finished = true;

        delegate.finish()?;
        write_extractors(&self.dir, &self.extractors)?;

        let mut manifest = ClassifierManifest::for_builder(VITERBI_CLASSIFIER_BUILDER)?;
        manifest.insert(DELEGATED_CLASSIFIER_BUILDER_KEY, delegate.classifier_builder())?;
        manifest.write(&self.dir)?;
        info!(
            dir = %self.dir.display(),
            extractors = self.extractors.len(),
            "sealed sequential model package"
        );
        Ok(())
    }
}
