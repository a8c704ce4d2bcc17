//! On-disk layout of a model package
//!
//! ```text
//! <package>/
//!   MANIFEST.MF                      written last, marks the package as sealed
//!   encoders.json                    features/outcome encoder snapshot
//!   <backend artifacts>              e.g. training-data.perceptron, model.perceptron
//!   outcome-feature-extractors.json  sequential packages only
//!   delegated-model/                 sequential packages only: the inner package
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, IoContext, Result};
use crate::manifest::ClassifierManifest;

pub const MANIFEST_FILE_NAME: &str = "MANIFEST.MF";
pub const ENCODERS_FILE_NAME: &str = "encoders.json";
pub const OUTCOME_FEATURE_EXTRACTOR_FILE_NAME: &str = "outcome-feature-extractors.json";
pub const DELEGATED_MODEL_DIRECTORY_NAME: &str = "delegated-model";

/// File names owned by the packaging layer. Auxiliary outputs may not use them.
pub(crate) const RESERVED_FILE_NAMES: &[&str] = &[
    MANIFEST_FILE_NAME,
    ENCODERS_FILE_NAME,
    OUTCOME_FEATURE_EXTRACTOR_FILE_NAME,
    DELEGATED_MODEL_DIRECTORY_NAME,
];

/// Create the output directory of a training run.
///
/// A manifest left behind by an earlier run is removed so that the directory
/// only looks sealed again once the new run finishes.
pub fn prepare_output_directory(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).at("create output directory", dir)?;
    let manifest = dir.join(MANIFEST_FILE_NAME);
    if manifest.exists() {
        fs::remove_file(&manifest).at("remove stale manifest", &manifest)?;
    }
    Ok(())
}

/// Write `bytes` to a temporary sibling and rename it over `path`, so
/// readers never observe a half-written file.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));
    {
        let mut file = fs::File::create(&tmp).at("create temporary file", &tmp)?;
        file.write_all(bytes).at("write temporary file", &tmp)?;
        file.sync_all().at("sync temporary file", &tmp)?;
    }
    fs::rename(&tmp, path).at("rename into place", path)
}

/// A sealed model package opened for reading
#[derive(Debug, Clone)]
pub struct ModelPackage {
    dir: PathBuf,
    manifest: ClassifierManifest,
}

impl ModelPackage {
    /// Open a package directory. Fails unless the manifest is present and
    /// names a classifier builder.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Error::model_load(dir, "not a directory"));
        }
        let manifest = ClassifierManifest::read(dir)?;
        if manifest.classifier_builder().is_none() {
            return Err(Error::model_load(dir, "manifest names no classifier builder"));
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            manifest,
        })
    }

    /// Open the inner package of a sequential model.
    ///
    /// Inner packages carry no manifest of their own; the enclosing
    /// manifest names their builder.
    pub fn open_nested<P: AsRef<Path>>(dir: P, builder: &str) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Error::model_load(dir, "not a directory"));
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            manifest: ClassifierManifest::for_builder(builder)
                .map_err(|e| Error::model_load(dir, e.to_string()))?,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn manifest(&self) -> &ClassifierManifest {
        &self.manifest
    }

    pub fn classifier_builder(&self) -> &str {
        self.manifest.classifier_builder().unwrap_or_default()
    }

    /// Path of a file that must exist inside the package
    pub fn require_file(&self, name: &str) -> Result<PathBuf> {
        let path = self.dir.join(name);
        if !path.is_file() {
            return Err(Error::model_load(&self.dir, format!("missing {}", name)));
        }
        Ok(path)
    }

    /// Path of a sub-directory that must exist inside the package
    pub fn require_dir(&self, name: &str) -> Result<PathBuf> {
        let path = self.dir.join(name);
        if !path.is_dir() {
            return Err(Error::model_load(&self.dir, format!("missing {}/", name)));
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_removes_stale_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("model");
        fs::create_dir_all(&out).unwrap();
        ClassifierManifest::for_builder("X").unwrap().write(&out).unwrap();
        assert!(ModelPackage::open(&out).is_ok());

        prepare_output_directory(&out).unwrap();
        assert!(!out.join(MANIFEST_FILE_NAME).exists());
        assert!(matches!(
            ModelPackage::open(&out),
            Err(Error::ModelLoad { .. })
        ));
    }

    #[test]
    fn test_write_atomically_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        write_atomically(&path, b"{}").unwrap();
        write_atomically(&path, b"[]").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"[]");
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_open_requires_builder() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE_NAME), "Manifest-Version: 1.0\r\n\r\n").unwrap();
        let err = ModelPackage::open(dir.path()).unwrap_err();
        assert!(err.to_string().contains("no classifier builder"));
    }

    #[test]
    fn test_require_file() {
        let dir = tempfile::tempdir().unwrap();
        ClassifierManifest::for_builder("X").unwrap().write(dir.path()).unwrap();
        let package = ModelPackage::open(dir.path()).unwrap();
        assert_eq!(package.classifier_builder(), "X");
        assert!(package.require_file(MANIFEST_FILE_NAME).is_ok());
        assert!(matches!(
            package.require_file("model.bin"),
            Err(Error::ModelLoad { .. })
        ));
    }
}
