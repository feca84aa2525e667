// src/postprocess.rs
// ============================================================================
// POSTPROCESS - Pasos tras una cuantización correcta
// ============================================================================
//
// 1. Copiar *.json y tokenizer.* del modelo al quant dir (sobrescribe)
// 2. Guardar measurement.json en <root>/measurement-<name>.json (NUNCA sobrescribe)
// 3. Borrar temporales de convert.py
//
// Solo se ejecuta si convert.py terminó bien.
//
// ============================================================================

use std::path::{Path, PathBuf};

use log::{error, info};

use crate::error::{QuantError, Result};
use crate::layout::QuantLayout;

/// Subdirectorio temporal de convert.py
pub const TEMP_DIR: &str = "out_tensor";

/// Archivos temporales de convert.py
pub const TEMP_FILES: [&str; 4] = [
    "cal_data.safetensors",
    "job.json",
    "input_states.safetensors",
    "output_states.safetensors",
];

/// Qué pasó con el measurement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeasurementOutcome {
    /// Copiado al cache del root
    Saved(PathBuf),
    /// Ya existía, no se toca
    AlreadyPresent(PathBuf),
    /// convert.py no dejó measurement.json
    MissingOutput(PathBuf),
}

/// Archivos de config/tokenizer que acompañan al modelo cuantizado
pub fn is_model_config(file_name: &str) -> bool {
    file_name.ends_with(".json") || file_name.starts_with("tokenizer.")
}

/// Copia config y tokenizer del modelo al quant dir. Devuelve los copiados.
pub fn copy_model_config(model_dir: &Path, quant_dir: &Path) -> Result<Vec<PathBuf>> {
    info!("Copying config files to quant directory...");

    let mut files: Vec<PathBuf> = std::fs::read_dir(model_dir)
        .map_err(|e| QuantError::io("listing", model_dir, e))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map_or(false, is_model_config)
        })
        .collect();
    files.sort();

    let mut copied = Vec::with_capacity(files.len());
    for src in files {
        let Some(name) = src.file_name() else { continue };
        let dst = quant_dir.join(name);
        std::fs::copy(&src, &dst).map_err(|e| QuantError::io("copying", &src, e))?;
        copied.push(dst);
    }

    Ok(copied)
}

/// Guarda el measurement del quant dir en el cache del root.
/// Si el cache ya existe no se sobrescribe.
pub fn save_measurement_file(layout: &QuantLayout) -> Result<MeasurementOutcome> {
    let target = &layout.measurement_file;

    if layout.has_previous_measurement() {
        info!("Keeping existing measurement file: {}", target.display());
        return Ok(MeasurementOutcome::AlreadyPresent(target.clone()));
    }

    let source = layout.measurement_output();
    if !source.is_file() {
        error!("Failed to find 'measurement.json' in {}.", layout.quant_dir.display());
        return Ok(MeasurementOutcome::MissingOutput(source));
    }

    info!("Copying measurement file to {}", target.display());
    std::fs::copy(&source, target).map_err(|e| QuantError::io("copying", &source, e))?;
    Ok(MeasurementOutcome::Saved(target.clone()))
}

/// Borra out_tensor/ y los temporales. Devuelve lo que realmente existía.
pub fn clean_up_leftovers(quant_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();

    let temp_dir = quant_dir.join(TEMP_DIR);
    if temp_dir.is_dir() {
        info!("Removing {}/", TEMP_DIR);
        std::fs::remove_dir_all(&temp_dir).map_err(|e| QuantError::io("removing", &temp_dir, e))?;
        removed.push(temp_dir);
    }

    for name in TEMP_FILES {
        let path = quant_dir.join(name);
        if path.exists() {
            info!("Removing {}", name);
            std::fs::remove_file(&path).map_err(|e| QuantError::io("removing", &path, e))?;
            removed.push(path);
        }
    }

    Ok(removed)
}
