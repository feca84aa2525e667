// src/settings.rs
// ============================================================================
// SETTINGS - Lee util/settings.json
// ============================================================================
//
// Formato:
//   {
//     "cal_dataset": "datasets/wikitext.parquet",
//     "bits_per_weight": 4.65,
//     "head_bits": 6,
//     "gpu_rows": 0,
//     "token_length": 2048,
//     "measurement_length": 2048,
//     "rope_alpha": 1.0                  (opcional)
//     "convert_legacy_weights": false    (opcional)
//     "python": "python3"                (opcional)
//   }
//
// ============================================================================

use std::fmt;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;

use crate::error::{QuantError, Result};

/// Ruta del settings relativa al root de la herramienta
pub const SETTINGS_RELATIVE_PATH: &str = "util/settings.json";

/// Valor de un parámetro numérico.
///
/// Se pasa tal cual al programa externo, así que se conserva la forma
/// textual del JSON: `4.65` sigue siendo "4.65" y `6` sigue siendo "6".
/// También se aceptan strings (`"4.65"`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s.trim()),
        }
    }
}

/// Parámetros de cuantización, inmutables durante la ejecución
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Dataset de calibración, relativo al root
    pub cal_dataset: String,
    pub bits_per_weight: ParamValue,
    pub head_bits: ParamValue,
    pub gpu_rows: ParamValue,
    pub token_length: ParamValue,
    pub measurement_length: ParamValue,
    /// Escalado RoPE; si falta no se pasa `-ra`
    #[serde(default)]
    pub rope_alpha: Option<ParamValue>,
    /// Convierte `.bin` a `.safetensors` antes de cuantizar
    #[serde(default)]
    pub convert_legacy_weights: bool,
    /// Intérprete para los scripts externos
    #[serde(default = "default_python")]
    pub python: String,
}

fn default_python() -> String {
    "python".to_string()
}

impl Settings {
    /// Ruta por defecto dentro del root de la herramienta
    pub fn default_path(tool_root: &Path) -> PathBuf {
        tool_root.join(SETTINGS_RELATIVE_PATH)
    }

    /// Carga settings desde disco
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| QuantError::SettingsIo {
            path: path.to_path_buf(),
            source,
        })?;

        let settings = Self::parse(&data).map_err(|source| QuantError::SettingsParse {
            path: path.to_path_buf(),
            source,
        })?;

        debug!("Loaded settings from {}: {:?}", path.display(), settings);
        Ok(settings)
    }

    pub fn parse(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"{
        "cal_dataset": "wikitext.parquet",
        "bits_per_weight": 4.65,
        "head_bits": 6,
        "gpu_rows": 0,
        "token_length": 2048,
        "measurement_length": 2048
    }"#;

    #[test]
    fn test_numbers_keep_json_text() {
        let s = Settings::parse(BASE).unwrap();
        assert_eq!(s.bits_per_weight.to_string(), "4.65");
        assert_eq!(s.head_bits.to_string(), "6");
        assert_eq!(s.token_length.to_string(), "2048");
        assert!(s.rope_alpha.is_none());
        assert!(!s.convert_legacy_weights);
        assert_eq!(s.python, "python");
    }

    #[test]
    fn test_string_values_accepted() {
        let json = r#"{
            "cal_dataset": "c.parquet",
            "bits_per_weight": "5.0",
            "head_bits": "8",
            "gpu_rows": "16",
            "token_length": "4096",
            "measurement_length": "4096",
            "rope_alpha": "2.5",
            "convert_legacy_weights": true,
            "python": "python3"
        }"#;
        let s = Settings::parse(json).unwrap();
        assert_eq!(s.bits_per_weight.to_string(), "5.0");
        assert_eq!(s.rope_alpha.unwrap().to_string(), "2.5");
        assert!(s.convert_legacy_weights);
        assert_eq!(s.python, "python3");
    }

    #[test]
    fn test_float_with_zero_fraction() {
        let json = BASE.replace("\"head_bits\": 6", "\"head_bits\": 6.0");
        let s = Settings::parse(&json).unwrap();
        assert_eq!(s.head_bits.to_string(), "6.0");
    }

    #[test]
    fn test_missing_key_is_error() {
        let json = r#"{ "cal_dataset": "c.parquet", "bits_per_weight": 4 }"#;
        assert!(Settings::parse(json).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, QuantError::SettingsIo { .. }));
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, QuantError::SettingsParse { .. }));
    }
}
