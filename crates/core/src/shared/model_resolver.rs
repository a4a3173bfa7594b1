use std::path::{Path, PathBuf};

use thiserror::Error;

const APP_DIR: &str = "Facemarks";

#[derive(Error, Debug, PartialEq)]
pub enum ModelResolveError {
    #[error("model file does not exist: {0}")]
    MissingExplicit(PathBuf),
    #[error("model `{name}` not found; searched {}", join_paths(.searched))]
    NotFound { name: String, searched: Vec<PathBuf> },
}

fn join_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "nothing".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolve a model file by name.
///
/// Resolution order:
/// 1. Explicit path (must exist when given)
/// 2. User model directory (platform-specific)
/// 3. Bundled directory (development checkouts, packaged installs)
pub fn resolve(
    name: &str,
    explicit: Option<&Path>,
    bundled_dir: Option<&Path>,
) -> Result<PathBuf, ModelResolveError> {
    resolve_in(name, explicit, model_dir().as_deref(), bundled_dir)
}

/// Platform-specific user model directory.
///
/// - macOS: `~/Library/Application Support/Facemarks/models/`
/// - Linux: `$XDG_DATA_HOME/Facemarks/models/` or `~/.local/share/Facemarks/models/`
/// - Windows: `%APPDATA%/Facemarks/models/`
pub fn model_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join(APP_DIR).join("models"))
}

fn resolve_in(
    name: &str,
    explicit: Option<&Path>,
    user_dir: Option<&Path>,
    bundled_dir: Option<&Path>,
) -> Result<PathBuf, ModelResolveError> {
    if let Some(path) = explicit {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(ModelResolveError::MissingExplicit(path.to_path_buf()))
        };
    }

    let mut searched = Vec::new();
    for dir in [user_dir, bundled_dir].into_iter().flatten() {
        let candidate = dir.join(name);
        if candidate.is_file() {
            log::debug!("Resolved model {name} at {}", candidate.display());
            return Ok(candidate);
        }
        searched.push(candidate);
    }

    Err(ModelResolveError::NotFound {
        name: name.to_string(),
        searched,
    })
}
