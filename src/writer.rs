use std::cell::RefCell;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, info};

use crate::encoder::{write_encoders, FeaturesEncoder, OutcomeEncoder};
use crate::error::{Error, IoContext, Result};
use crate::feature::{Instance, Outcome};
use crate::manifest::ClassifierManifest;
use crate::package::{prepare_output_directory, RESERVED_FILE_NAMES};

/// Sink for single training instances
pub trait DataWriter<O> {
    /// Encode `instance` and append it to the training data.
    fn write(&mut self, instance: &Instance<O>) -> Result<()>;

    /// Flush, train and seal the model package. May only be called once.
    fn finish(&mut self) -> Result<()>;
}

/// A data writer that produces a model package in its own directory
pub trait PackageWriter<O>: DataWriter<O> {
    fn output_directory(&self) -> &Path;

    /// Builder key written to the manifest by `finish`
    fn classifier_builder(&self) -> &str;

    /// Whether `finish` writes the manifest. An enclosing writer that owns
    /// the package manifest turns this off.
    fn set_writes_manifest(&mut self, enabled: bool);
}

/// The learning algorithm behind a [`PackageDataWriter`]
///
/// A backend receives encoded instances in call order and, once the writer
/// finishes, trains and stores its model inside the package directory.
pub trait TrainingBackend: Sized {
    type Features;
    type Outcome;
    type Config;

    /// Registry key of the builder able to reload this backend's packages
    const CLASSIFIER_BUILDER: &'static str;

    /// Files this backend creates in the package directory
    const FILE_NAMES: &'static [&'static str];

    fn open(dir: &Path, config: Self::Config) -> Result<Self>;

    fn write_encoded(&mut self, features: Self::Features, outcome: Self::Outcome) -> Result<()>;

    /// Train on everything written so far and return the model artifact path.
    fn train(&mut self, dir: &Path) -> Result<PathBuf>;
}

/// Auxiliary output file handed out by [`PackageDataWriter::print_writer`]
///
/// The handle is closed when the writer finishes; writing afterwards fails.
#[derive(Debug, Clone)]
pub struct AuxWriter {
    path: PathBuf,
    inner: Rc<RefCell<Option<BufWriter<File>>>>,
}

impl AuxWriter {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.inner.borrow().is_none()
    }

    fn close(&self) -> Result<()> {
        if let Some(mut writer) = self.inner.borrow_mut().take() {
            writer.flush().at("close auxiliary output", &self.path)?;
        }
        Ok(())
    }
}

fn closed_error() -> io::Error {
    io::Error::new(
        io::ErrorKind::BrokenPipe,
        "auxiliary output was closed when the data writer finished",
    )
}

impl Write for AuxWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.inner.borrow_mut().as_mut() {
            Some(writer) => writer.write(buf),
            None => Err(closed_error()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner.borrow_mut().as_mut() {
            Some(writer) => writer.flush(),
            None => Err(closed_error()),
        }
    }
}

/// Data writer that encodes instances, streams them to a backend and seals
/// the result as a model package.
pub struct PackageDataWriter<O, B, FE, OE> {
    dir: PathBuf,
    backend: B,
    features_encoder: FE,
    outcome_encoder: OE,
    classifier_builder: String,
    writes_manifest: bool,
    aux_writers: Vec<AuxWriter>,
    finished: bool,
    _outcome: PhantomData<fn(&O)>,
}

impl<O, B, FE, OE> PackageDataWriter<O, B, FE, OE>
where
    O: Outcome,
    B: TrainingBackend,
    FE: FeaturesEncoder<Encoded = B::Features>,
    OE: OutcomeEncoder<O, Encoded = B::Outcome>,
{
    /// Create the package directory and open the backend inside it
    pub fn create<P: AsRef<Path>>(
        dir: P,
        config: B::Config,
        features_encoder: FE,
        outcome_encoder: OE,
    ) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        prepare_output_directory(&dir)?;
        let backend = B::open(&dir, config)?;
        debug!(dir = %dir.display(), builder = B::CLASSIFIER_BUILDER, "opened data writer");
        Ok(Self {
            dir,
            backend,
            features_encoder,
            outcome_encoder,
            classifier_builder: B::CLASSIFIER_BUILDER.to_string(),
            writes_manifest: true,
            aux_writers: Vec::new(),
            finished: false,
            _outcome: PhantomData,
        })
    }

    /// Record a different classifier builder in the manifest
    pub fn with_classifier_builder<S: Into<String>>(mut self, builder: S) -> Self {
        self.classifier_builder = builder.into();
        self
    }

    pub fn features_encoder(&self) -> &FE {
        &self.features_encoder
    }

    pub fn outcome_encoder(&self) -> &OE {
        &self.outcome_encoder
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Open an auxiliary output file inside the package directory.
    ///
    /// The name must be a plain file name that is neither reserved by the
    /// package layout nor already in use; otherwise an I/O error is returned
    /// and nothing is created.
    pub fn print_writer(&mut self, name: &str) -> Result<AuxWriter> {
        if self.finished {
            return Err(Error::lifecycle(
                "print_writer",
                "data writer is already finished",
            ));
        }
        let path = self.dir.join(name);
        let reject = |kind: io::ErrorKind, message: String| -> Result<AuxWriter> {
            Err(Error::io("open auxiliary output", &path, io::Error::new(kind, message)))
        };
        if name.is_empty() || name.contains(['/', '\\']) {
            return reject(
                io::ErrorKind::InvalidInput,
                format!("`{}` is not a plain file name", name),
            );
        }
        if path.is_dir() {
            return reject(
                io::ErrorKind::AlreadyExists,
                format!("`{}` collides with an existing directory", name),
            );
        }
        if RESERVED_FILE_NAMES.contains(&name) || B::FILE_NAMES.contains(&name) {
            return reject(
                io::ErrorKind::AlreadyExists,
                format!("`{}` is reserved by the model package", name),
            );
        }
        if self.aux_writers.iter().any(|w| w.path == path) {
            return reject(
                io::ErrorKind::AlreadyExists,
                format!("`{}` is already open", name),
            );
        }

        let file = File::create(&path).at("open auxiliary output", &path)?;
        let writer = AuxWriter {
            path,
            inner: Rc::new(RefCell::new(Some(BufWriter::new(file)))),
        };
        self.aux_writers.push(writer.clone());
        Ok(writer)
    }
}

impl<O, B, FE, OE> DataWriter<O> for PackageDataWriter<O, B, FE, OE>
where
    O: Outcome,
    B: TrainingBackend,
    FE: FeaturesEncoder<Encoded = B::Features>,
    OE: OutcomeEncoder<O, Encoded = B::Outcome>,
{
    fn write(&mut self, instance: &Instance<O>) -> Result<()> {
        if self.finished {
            return Err(Error::lifecycle("write", "data writer is already finished"));
        }
        let features = self.features_encoder.encode(&instance.features)?;
        let outcome = self.outcome_encoder.encode(&instance.outcome)?;
        self.backend.write_encoded(features, outcome)
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Err(Error::lifecycle("finish", "data writer is already finished"));
        }
        // Mark first: a failed finish leaves an unsealed package that must not
        // be finished again.
        self.finished = true;

        for writer in self.aux_writers.drain(..) {
            writer.close()?;
        }

        let artifact = self.backend.train(&self.dir)?;
        if !artifact.starts_with(&self.dir) {
            return Err(Error::configuration(
                "finish",
                format!(
                    "backend model {} lies outside the package directory {}",
                    artifact.display(),
                    self.dir.display()
                ),
            ));
        }
        debug!(artifact = %artifact.display(), "backend trained");

        write_encoders::<FE, OE, O>(&self.dir, &self.features_encoder, &self.outcome_encoder)?;

        if self.writes_manifest {
            ClassifierManifest::for_builder(&self.classifier_builder)?.write(&self.dir)?;
            info!(
                dir = %self.dir.display(),
                builder = %self.classifier_builder,
                "sealed model package"
            );
        }
        Ok(())
    }
}

impl<O, B, FE, OE> PackageWriter<O> for PackageDataWriter<O, B, FE, OE>
where
    O: Outcome,
    B: TrainingBackend,
    FE: FeaturesEncoder<Encoded = B::Features>,
    OE: OutcomeEncoder<O, Encoded = B::Outcome>,
{
    fn output_directory(&self) -> &Path {
        &self.dir
    }

    fn classifier_builder(&self) -> &str {
        &self.classifier_builder
    }

    fn set_writes_manifest(&mut self, enabled: bool) {
        self.writes_manifest = enabled;
    }
}
