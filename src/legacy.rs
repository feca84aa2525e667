// src/legacy.rs
// ============================================================================
// LEGACY - Conversión previa .bin -> .safetensors
// ============================================================================
//
// convert.py solo lee safetensors. Para modelos antiguos (pytorch_model*.bin)
// se llama a util/convert_safetensors.py archivo por archivo.
//
// - Si ya existe <stem>.safetensors -> se salta
// - Un fallo en un archivo NO aborta la ejecución
//
// ============================================================================

use std::path::{Path, PathBuf};

use log::{error, info, warn};

use crate::error::{QuantError, Result};
use crate::runner::{CommandRunner, Invocation};
use crate::safetensor;

/// Script helper, relativo al root
pub const HELPER_SCRIPT: &str = "./util/convert_safetensors.py";

/// Extensión de pesos legacy
pub const LEGACY_EXTENSION: &str = "bin";

/// Estadísticas de la conversión previa
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LegacyReport {
    pub converted: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

impl LegacyReport {
    pub fn total(&self) -> usize {
        self.converted.len() + self.skipped.len() + self.failed.len()
    }
}

/// Un `.bin` del directorio del modelo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyFile {
    pub path: PathBuf,
    pub target: PathBuf,
}

impl LegacyFile {
    pub fn already_converted(&self) -> bool {
        self.target.exists()
    }
}

/// Lista los `.bin` del directorio (ordenados) con su destino safetensors
pub fn scan(model_dir: &Path) -> Result<Vec<LegacyFile>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(model_dir)
        .map_err(|e| QuantError::io("listing", model_dir, e))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| p.extension().map_or(false, |e| e == LEGACY_EXTENSION))
        .collect();

    paths.sort();

    Ok(paths
        .into_iter()
        .map(|path| LegacyFile {
            target: path.with_extension("safetensors"),
            path,
        })
        .collect())
}

/// Invocación del helper para un archivo
pub fn helper_invocation(python: &str, tool_root: &Path, file: &Path) -> Invocation {
    Invocation::new(python, tool_root)
        .arg(HELPER_SCRIPT)
        .arg(file)
}

/// Convierte todos los `.bin` pendientes
pub fn convert_legacy_weights(
    model_dir: &Path,
    tool_root: &Path,
    python: &str,
    runner: &mut dyn CommandRunner,
) -> Result<LegacyReport> {
    let mut report = LegacyReport::default();

    for file in scan(model_dir)? {
        if file.already_converted() {
            info!(
                "Skipping {} ({} already exists)",
                file.path.display(),
                file.target.display()
            );
            report.skipped.push(file.path);
            continue;
        }

        info!("Converting {} to safetensors", file.path.display());
        let invocation = helper_invocation(python, tool_root, &file.path);

        if let Err(e) = runner.run(&invocation) {
            error!("Failed to convert {}: {}", file.path.display(), e);
            report.failed.push(file.path);
            continue;
        }

        // El helper puede terminar con 0 sin haber escrito nada útil
        match safetensor::inspect(&file.target) {
            Ok(summary) => {
                info!(
                    "  -> {} ({} tensors)",
                    summary.path.display(),
                    summary.tensor_count()
                );
                report.converted.push(file.path);
            }
            Err(e) => {
                warn!(
                    "Conversion output for {} is not usable: {}",
                    file.path.display(),
                    e
                );
                report.failed.push(file.path);
            }
        }
    }

    Ok(report)
}
