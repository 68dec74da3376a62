//! Speech model discovery.
//!
//! Models are directories under a configured models folder; each directory
//! is one model. Startup picks the smallest model by on-disk size so the
//! app comes up fast, and the user can switch to a larger one afterwards.

use std::fs;
use std::path::{Path, PathBuf};

use voxkey_core::error::{Result, VoxkeyError};

/// A discovered speech model directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    /// Directory name, used as the model's display name.
    pub name: String,
    pub path: PathBuf,
    /// Recursive size of the model directory in bytes.
    pub size_bytes: u64,
}

/// List every model directory under `models_dir`, sorted by size ascending.
///
/// # Errors
/// Returns `VoxkeyError::NoModel` when the directory is missing or contains
/// no subdirectories. A dictation session cannot start without a model.
pub fn available_models(models_dir: &Path) -> Result<Vec<ModelInfo>> {
    if !models_dir.is_dir() {
        tracing::error!(dir = %models_dir.display(), "Models directory not found");
        return Err(VoxkeyError::NoModel);
    }

    let mut models = Vec::new();
    for entry in fs::read_dir(models_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let size_bytes = dir_size(&path)?;
        models.push(ModelInfo {
            name,
            path,
            size_bytes,
        });
    }

    if models.is_empty() {
        tracing::error!(dir = %models_dir.display(), "No models found");
        return Err(VoxkeyError::NoModel);
    }

    models.sort_by_key(|m| m.size_bytes);
    tracing::debug!(count = models.len(), "Discovered speech models");
    Ok(models)
}

/// The smallest model under `models_dir`.
pub fn smallest_model(models_dir: &Path) -> Result<ModelInfo> {
    let mut models = available_models(models_dir)?;
    // Sorted ascending, so the first entry is the smallest.
    Ok(models.remove(0))
}

/// Recursive directory size in bytes.
fn dir_size(dir: &Path) -> Result<u64> {
    let mut total = 0u64;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            total += dir_size(&path)?;
        } else {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(path: &Path, bytes: usize) {
        let mut f = fs::File::create(path).unwrap();
        f.write_all(&vec![0u8; bytes]).unwrap();
    }

    #[test]
    fn test_missing_dir_is_no_model() {
        let result = available_models(Path::new("/nonexistent/models"));
        assert!(matches!(result, Err(VoxkeyError::NoModel)));
    }

    #[test]
    fn test_empty_dir_is_no_model() {
        let dir = tempfile::tempdir().unwrap();
        let result = available_models(dir.path());
        assert!(matches!(result, Err(VoxkeyError::NoModel)));
    }

    #[test]
    fn test_files_are_not_models() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir.path().join("readme.txt"), 10);
        assert!(matches!(
            available_models(dir.path()),
            Err(VoxkeyError::NoModel)
        ));
    }

    #[test]
    fn test_models_sorted_by_size() {
        let dir = tempfile::tempdir().unwrap();
        let big = dir.path().join("vosk-model-en-us-0.22");
        let small = dir.path().join("vosk-model-small-en-us-0.15");
        fs::create_dir(&big).unwrap();
        fs::create_dir(&small).unwrap();
        write_file(&big.join("am.bin"), 4096);
        write_file(&small.join("am.bin"), 128);

        let models = available_models(dir.path()).unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].name, "vosk-model-small-en-us-0.15");
        assert_eq!(models[0].size_bytes, 128);
        assert_eq!(models[1].size_bytes, 4096);
    }

    #[test]
    fn test_size_is_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model");
        let nested = model.join("graph");
        fs::create_dir_all(&nested).unwrap();
        write_file(&model.join("am.bin"), 100);
        write_file(&nested.join("hclg.fst"), 200);

        let models = available_models(dir.path()).unwrap();
        assert_eq!(models[0].size_bytes, 300);
    }

    #[test]
    fn test_smallest_model() {
        let dir = tempfile::tempdir().unwrap();
        for (name, size) in [("alpha", 500), ("beta", 50), ("gamma", 5000)] {
            let path = dir.path().join(name);
            fs::create_dir(&path).unwrap();
            write_file(&path.join("data"), size);
        }
        let model = smallest_model(dir.path()).unwrap();
        assert_eq!(model.name, "beta");
    }
}
