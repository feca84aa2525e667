// src/layout.rs
// ============================================================================
// LAYOUT - Rutas derivadas de un modelo + settings
// ============================================================================
//
//   <model_dir>/<model_name>-<bpw>bpw-h<head_bits>-exl2    (quant dir)
//   <tool_root>/measurement-<model_name>.json              (measurement cache)
//
// Todo es determinista: mismas entradas, mismas rutas.
//
// ============================================================================

use std::path::{Path, PathBuf};

use crate::error::{QuantError, Result};
use crate::settings::Settings;

/// Nombre del measurement que produce convert.py dentro del quant dir
pub const MEASUREMENT_OUTPUT: &str = "measurement.json";

/// Rutas de una ejecución
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantLayout {
    pub model_dir: PathBuf,
    pub model_name: String,
    pub quant_dir: PathBuf,
    pub tool_root: PathBuf,
    pub measurement_file: PathBuf,
}

impl QuantLayout {
    pub fn derive(model_dir: &Path, tool_root: &Path, settings: &Settings) -> Result<Self> {
        let model_name = model_name(model_dir)?;

        let quant_dir = model_dir.join(quant_dir_name(&model_name, settings));
        let measurement_file = tool_root.join(format!("measurement-{}.json", model_name));

        Ok(Self {
            model_dir: model_dir.to_path_buf(),
            model_name,
            quant_dir,
            tool_root: tool_root.to_path_buf(),
            measurement_file,
        })
    }

    /// measurement.json que deja convert.py en el quant dir
    pub fn measurement_output(&self) -> PathBuf {
        self.quant_dir.join(MEASUREMENT_OUTPUT)
    }

    /// Hay un measurement previo reutilizable?
    ///
    /// Única comprobación del cache: decide `-m` y también si se guarda.
    pub fn has_previous_measurement(&self) -> bool {
        self.measurement_file.exists()
    }
}

/// `<name>-<bpw>bpw-h<head_bits>-exl2`
pub fn quant_dir_name(model_name: &str, settings: &Settings) -> String {
    format!(
        "{}-{}bpw-h{}-exl2",
        model_name, settings.bits_per_weight, settings.head_bits
    )
}

/// Nombre base del directorio del modelo. `foo/` y `foo` dan lo mismo.
pub fn model_name(model_dir: &Path) -> Result<String> {
    model_dir
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .ok_or_else(|| QuantError::ModelName(model_dir.to_path_buf()))
}
