// src/pipeline.rs
// ============================================================================
// PIPELINE - Orquestador de la conversión
// ============================================================================
//
// El pipeline es LINEAL:
//   settings -> layout -> [legacy .bin] -> mkdir -> convert.py -> postprocess
//
// - NO cuantiza nada (lo hace convert.py)
// - Si convert.py falla, NO hay postprocess: el quant dir queda como esté
// - Sin reintentos, sin timeout
//
// ============================================================================

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use log::{error, info, warn};

use crate::error::{QuantError, Result};
use crate::layout::QuantLayout;
use crate::legacy::{self, LegacyFile, LegacyReport};
use crate::postprocess::{self, MeasurementOutcome, TEMP_FILES};
use crate::quantize;
use crate::runner::{CommandRunner, Invocation};
use crate::safetensor::{self, ShardSummary};
use crate::settings::Settings;

/// Entradas de una ejecución (lo que llega del CLI)
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub model_dir: PathBuf,
    pub tool_root: PathBuf,
    /// None -> <tool_root>/util/settings.json
    pub settings_path: Option<PathBuf>,
    /// Fuerza la conversión .bin aunque settings no la pida
    pub force_legacy: bool,
}

impl RunConfig {
    pub fn new(model_dir: impl Into<PathBuf>, tool_root: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            tool_root: tool_root.into(),
            settings_path: None,
            force_legacy: false,
        }
    }

    pub fn settings_path(&self) -> PathBuf {
        self.settings_path
            .clone()
            .unwrap_or_else(|| Settings::default_path(&self.tool_root))
    }

    fn legacy_enabled(&self, settings: &Settings) -> bool {
        self.force_legacy || settings.convert_legacy_weights
    }
}

/// Settings + rutas ya resueltas
#[derive(Debug, Clone)]
pub struct Prepared {
    pub settings: Settings,
    pub layout: QuantLayout,
}

/// Carga settings y deriva el layout con rutas absolutas.
///
/// convert.py corre con cwd = root, así que model/quant dir no pueden
/// quedar relativos al cwd del usuario.
pub fn prepare(config: &RunConfig) -> Result<Prepared> {
    let settings = Settings::load(config.settings_path())?;

    let model_dir = absolute(&config.model_dir)?;
    let tool_root = absolute(&config.tool_root)?;
    let layout = QuantLayout::derive(&model_dir, &tool_root, &settings)?;

    Ok(Prepared { settings, layout })
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| QuantError::io("resolving", path, e))
}

/// Crea el quant dir si no existe. true si se creó.
pub fn ensure_quant_dir(quant_dir: &Path) -> Result<bool> {
    if quant_dir.exists() {
        info!("Target output directory already exists: {}", quant_dir.display());
        return Ok(false);
    }

    info!("Creating directory {}", quant_dir.display());
    std::fs::create_dir_all(quant_dir).map_err(|e| QuantError::io("creating", quant_dir, e))?;
    Ok(true)
}

// ============================================================================
// DRY RUN
// ============================================================================

/// Lo que haría `run` sin tocar nada
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub layout: QuantLayout,
    pub legacy_enabled: bool,
    /// .bin sin safetensors (solo si legacy_enabled)
    pub legacy_pending: Vec<LegacyFile>,
    pub invocation: Invocation,
}

pub fn plan(config: &RunConfig) -> Result<RunPlan> {
    let Prepared { settings, layout } = prepare(config)?;

    let legacy_enabled = config.legacy_enabled(&settings);
    let legacy_pending = if legacy_enabled {
        legacy::scan(&layout.model_dir)?
            .into_iter()
            .filter(|f| !f.already_converted())
            .collect()
    } else {
        Vec::new()
    };

    let invocation = quantize::convert_invocation(&layout, &settings);

    Ok(RunPlan {
        layout,
        legacy_enabled,
        legacy_pending,
        invocation,
    })
}

// ============================================================================
// RUN
// ============================================================================

/// Resultado del postprocess
#[derive(Debug)]
pub struct PostProcessReport {
    pub copied: Vec<PathBuf>,
    pub measurement: MeasurementOutcome,
    pub removed: Vec<PathBuf>,
    /// None si algún shard no se pudo leer
    pub shards: Option<ShardSummary>,
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed(PostProcessReport),
    QuantizeFailed(String),
}

/// Resumen de una ejecución
#[derive(Debug)]
pub struct RunReport {
    pub started_at: DateTime<Local>,
    pub layout: QuantLayout,
    pub reused_measurement: bool,
    pub legacy: Option<LegacyReport>,
    pub outcome: RunOutcome,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, RunOutcome::Completed(_))
    }
}

/// Ejecuta la conversión completa.
///
/// Err solo para errores de configuración o de filesystem. Un fallo de
/// convert.py se devuelve como `RunOutcome::QuantizeFailed`.
pub fn run(config: &RunConfig, runner: &mut dyn CommandRunner) -> Result<RunReport> {
    let started_at = Local::now();
    let Prepared { settings, layout } = prepare(config)?;

    let legacy = if config.legacy_enabled(&settings) {
        let report = legacy::convert_legacy_weights(
            &layout.model_dir,
            &layout.tool_root,
            &settings.python,
            runner,
        )?;
        if !report.failed.is_empty() {
            warn!("{} legacy file(s) could not be converted", report.failed.len());
        }
        Some(report)
    } else {
        None
    };

    ensure_quant_dir(&layout.quant_dir)?;

    let reused_measurement = layout.has_previous_measurement();
    if reused_measurement {
        info!("Using previous measurement.json file: {}", layout.measurement_file.display());
    } else {
        info!("No previous measurement.json file found");
    }

    let invocation = quantize::convert_invocation(&layout, &settings);
    info!("Running {}", invocation);

    let outcome = match runner.run(&invocation) {
        Ok(()) => RunOutcome::Completed(post_process(&layout)?),
        Err(e) => {
            error!("### ERROR ###");
            error!("{}", e);
            RunOutcome::QuantizeFailed(e.to_string())
        }
    };

    Ok(RunReport {
        started_at,
        layout,
        reused_measurement,
        legacy,
        outcome,
    })
}

fn post_process(layout: &QuantLayout) -> Result<PostProcessReport> {
    let copied = postprocess::copy_model_config(&layout.model_dir, &layout.quant_dir)?;
    let measurement = postprocess::save_measurement_file(layout)?;
    let removed = postprocess::clean_up_leftovers(&layout.quant_dir)?;

    let shards = match safetensor::summarize_dir(&layout.quant_dir, &TEMP_FILES) {
        Ok(summary) => Some(summary),
        Err(e) => {
            warn!("Could not summarize quantized output: {}", e);
            None
        }
    };

    Ok(PostProcessReport {
        copied,
        measurement,
        removed,
        shards,
    })
}
