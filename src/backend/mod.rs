//! Training backends
//!
//! A backend is the learning algorithm behind a
//! [`PackageDataWriter`](crate::writer::PackageDataWriter). It receives
//! encoded instances and turns them into a model artifact inside the
//! package directory.

pub mod perceptron;

pub use self::perceptron::{
    PerceptronBackend, PerceptronClassifier, PerceptronClassifierBuilder, PerceptronDataWriter,
    PerceptronParams,
};
