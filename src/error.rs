// src/error.rs
// ============================================================================
// ERRORES - Tipo de error de la librería
// ============================================================================

use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use thiserror::Error;

/// Error principal del wrapper
#[derive(Debug, Error)]
pub enum QuantError {
    #[error("Cannot read settings file {path}: {source}")]
    SettingsIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings file {path}: {source}")]
    SettingsParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot derive a model name from {0}")]
    ModelName(PathBuf),

    #[error("IO error while {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    ExitStatus { program: String, status: ExitStatus },

    #[error("Invalid safetensors file {path}: {reason}")]
    Safetensors { path: PathBuf, reason: String },
}

impl QuantError {
    /// Atajo para errores de IO con la ruta afectada
    pub fn io(action: &'static str, path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, QuantError>;
