// src/safetensor/mod.rs
// ============================================================================
// SAFETENSOR - Inspección de headers
// ============================================================================
//
// No leemos tensores, solo validamos que el archivo tiene un header sano:
//   [u64 LE header_size][header JSON][datos]
//
// Se usa para comprobar la salida de convert_safetensors.py y para resumir
// los shards cuantizados del quant dir.
//
// ============================================================================

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt};
use serde::Deserialize;

use crate::error::{QuantError, Result};

/// Límite del header JSON (igual que la implementación de referencia de safetensors)
pub const MAX_HEADER_SIZE: u64 = 100_000_000;

/// Información de un tensor en el header
#[derive(Debug, Clone, Deserialize)]
pub struct TensorInfo {
    pub dtype: String,
    pub shape: Vec<usize>,
    pub data_offsets: [u64; 2],
}

/// Header del archivo safetensor
#[derive(Debug, Deserialize)]
pub struct SafetensorHeader {
    #[serde(flatten)]
    pub tensors: HashMap<String, TensorInfo>,
    #[serde(rename = "__metadata__")]
    pub metadata: Option<HashMap<String, String>>,
}

/// Resultado de inspeccionar un archivo
#[derive(Debug)]
pub struct SafetensorSummary {
    pub path: PathBuf,
    /// 8 + longitud del JSON
    pub header_size: u64,
    pub file_size: u64,
    pub header: SafetensorHeader,
}

impl SafetensorSummary {
    pub fn tensor_count(&self) -> usize {
        self.header.tensors.len()
    }
}

/// Lee y valida el header de un safetensors
pub fn inspect(path: impl AsRef<Path>) -> Result<SafetensorSummary> {
    let path = path.as_ref();
    let invalid = |reason: String| QuantError::Safetensors {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|e| QuantError::io("opening", path, e))?;
    let file_size = file
        .metadata()
        .map_err(|e| QuantError::io("reading metadata of", path, e))?
        .len();

    if file_size < 8 {
        return Err(invalid(format!("file too small ({} bytes)", file_size)));
    }

    let mut reader = BufReader::new(file);
    let json_size = reader
        .read_u64::<LittleEndian>()
        .map_err(|e| QuantError::io("reading", path, e))?;

    if json_size > MAX_HEADER_SIZE {
        return Err(invalid(format!("header too large ({} bytes)", json_size)));
    }
    if 8 + json_size > file_size {
        return Err(invalid(format!(
            "header size {} exceeds file size {}",
            json_size, file_size
        )));
    }

    let mut header_bytes = vec![0u8; json_size as usize];
    reader
        .read_exact(&mut header_bytes)
        .map_err(|e| QuantError::io("reading", path, e))?;

    let header: SafetensorHeader = serde_json::from_slice(&header_bytes)
        .map_err(|e| invalid(format!("invalid header JSON: {}", e)))?;

    // Los offsets son relativos al inicio de los datos
    let data_len = file_size - 8 - json_size;
    for (name, info) in &header.tensors {
        let [start, end] = info.data_offsets;
        if start > end || end > data_len {
            return Err(invalid(format!(
                "tensor '{}' offsets [{}, {}] outside data section ({} bytes)",
                name, start, end, data_len
            )));
        }
    }

    Ok(SafetensorSummary {
        path: path.to_path_buf(),
        header_size: 8 + json_size,
        file_size,
        header,
    })
}

/// Resumen de los shards de un directorio
#[derive(Debug, Default)]
pub struct ShardSummary {
    pub files: Vec<PathBuf>,
    pub tensor_count: usize,
    pub total_bytes: u64,
}

/// Inspecciona todos los `.safetensors` de un directorio (no recursivo).
/// Los nombres en `exclude` se ignoran.
pub fn summarize_dir(dir: impl AsRef<Path>, exclude: &[&str]) -> Result<ShardSummary> {
    let dir = dir.as_ref();

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| QuantError::io("listing", dir, e))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| p.extension().map_or(false, |e| e == "safetensors"))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map_or(true, |n| !exclude.contains(&n))
        })
        .collect();

    // Ordenar para consistencia
    paths.sort();

    let mut summary = ShardSummary::default();
    for path in paths {
        let file = inspect(&path)?;
        summary.tensor_count += file.tensor_count();
        summary.total_bytes += file.file_size;
        summary.files.push(path);
    }

    Ok(summary)
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::path::Path;

    /// Escribe un safetensors mínimo con `n` tensores F16 de 2 elementos
    pub fn write_safetensors(path: &Path, n: usize) {
        let mut entries = Vec::new();
        for i in 0..n {
            entries.push(format!(
                r#""t{}":{{"dtype":"F16","shape":[2],"data_offsets":[{},{}]}}"#,
                i,
                i * 4,
                i * 4 + 4
            ));
        }
        entries.push(r#""__metadata__":{"format":"pt"}"#.to_string());
        let header = format!("{{{}}}", entries.join(","));

        let mut bytes = (header.len() as u64).to_le_bytes().to_vec();
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend(std::iter::repeat(0u8).take(n * 4));
        std::fs::write(path, bytes).unwrap();
    }
}
