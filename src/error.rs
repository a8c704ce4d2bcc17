use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while training, packaging or reloading a classifier.
#[derive(Debug, Error)]
pub enum Error {
    /// A collaborator required by the operation has not been configured.
    #[error("{operation}: {message}")]
    Configuration {
        operation: &'static str,
        message: String,
    },

    /// The operation was invoked out of the allowed order.
    #[error("{operation}: {message}")]
    Lifecycle {
        operation: &'static str,
        message: String,
    },

    /// A feature or outcome value is incompatible with the encoder.
    #[error("cannot encode `{subject}`: {message}")]
    Encoding { subject: String, message: String },

    #[error("{operation} failed for {}: {source}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The model package is incomplete, corrupt or names an unknown builder.
    #[error("cannot load model from {}: {message}", path.display())]
    ModelLoad { path: PathBuf, message: String },
}

impl Error {
    pub(crate) fn configuration(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Configuration {
            operation,
            message: message.into(),
        }
    }

    pub(crate) fn lifecycle(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Lifecycle {
            operation,
            message: message.into(),
        }
    }

    pub(crate) fn encoding(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Encoding {
            subject: subject.into(),
            message: message.into(),
        }
    }

    pub(crate) fn io(operation: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn model_load(path: &Path, message: impl Into<String>) -> Self {
        Self::ModelLoad {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

/// Attach an operation name and a path to a raw I/O result.
pub(crate) trait IoContext<T> {
    fn at(self, operation: &'static str, path: &Path) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at(self, operation: &'static str, path: &Path) -> Result<T> {
        self.map_err(|e| Error::io(operation, path, e))
    }
}
