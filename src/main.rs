// src/main.rs
// ============================================================================
// EXL2-QUANT CLI
// ============================================================================
//
// Uso simple (binario instalado en <root>/util/):
//   exl2-quant /models/Llama-2-7b
//
// Con root explícito:
//   exl2-quant /models/Llama-2-7b --root /workspace/exllamav2
//
// Ver qué se ejecutaría:
//   exl2-quant /models/Llama-2-7b --dry-run
//
// ============================================================================

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;

use exl2_quant::{
    pipeline::{PostProcessReport, RunConfig, RunOutcome, RunPlan, RunReport},
    postprocess::MeasurementOutcome,
    SystemRunner,
};

#[derive(Parser, Debug)]
#[command(name = "exl2-quant")]
#[command(about = "Convert and quantize FP16 models to EXL2")]
#[command(version)]
struct Args {
    /// Path to FP16 model directory
    #[arg(value_name = "MODEL_PATH")]
    model_path: PathBuf,

    /// Tool root (directory with convert.py and util/).
    /// Defaults to the parent of the directory holding this binary.
    #[arg(long)]
    root: Option<PathBuf>,

    /// Settings file (default: <root>/util/settings.json)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Convert legacy .bin weights to safetensors before quantizing
    #[arg(long)]
    convert_bin: bool,

    /// Print the plan without running anything
    #[arg(long)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    match execute(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Ok(false) si convert.py falló
fn execute(args: Args) -> Result<bool> {
    let tool_root = match args.root {
        Some(root) => root,
        None => default_tool_root()?,
    };

    let config = RunConfig {
        model_dir: args.model_path,
        tool_root,
        settings_path: args.settings,
        force_legacy: args.convert_bin,
    };

    if args.dry_run {
        let plan = exl2_quant::plan(&config).context("Failed to plan conversion")?;
        print_plan(&plan);
        return Ok(true);
    }

    let start = Instant::now();
    let report = exl2_quant::run(&config, &mut SystemRunner)
        .with_context(|| format!("Conversion of {} failed", config.model_dir.display()))?;

    print_summary(&report, start.elapsed().as_secs_f64());
    Ok(report.succeeded())
}

/// El binario vive en <root>/util/, igual que los scripts
fn default_tool_root() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Cannot locate current executable")?;
    exe.parent()
        .and_then(|util_dir| util_dir.parent())
        .map(|root| root.to_path_buf())
        .ok_or_else(|| {
            anyhow::anyhow!("Cannot derive tool root from {}; use --root", exe.display())
        })
}

fn print_plan(plan: &RunPlan) {
    let measurement = if plan.layout.has_previous_measurement() {
        "reuse"
    } else {
        "new"
    };

    println!("═══════════════════════════════════════════════════════════════");
    println!("  EXL2-QUANT - DRY RUN");
    println!("═══════════════════════════════════════════════════════════════");
    println!("  Model:        {}", plan.layout.model_dir.display());
    println!("  Quant dir:    {}", plan.layout.quant_dir.display());
    println!(
        "  Measurement:  {} ({})",
        plan.layout.measurement_file.display(),
        measurement
    );
    if plan.legacy_enabled {
        println!("  Legacy .bin:  {} to convert", plan.legacy_pending.len());
        for file in &plan.legacy_pending {
            println!("    - {}", file.path.display());
        }
    }
    println!("  Working dir:  {}", plan.invocation.cwd.display());
    println!("  Command:      {}", plan.invocation);
    println!("═══════════════════════════════════════════════════════════════");
}

fn print_summary(report: &RunReport, elapsed: f64) {
    let measurement = if report.reused_measurement {
        "reused"
    } else {
        "computed"
    };

    println!("\n═══════════════════════════════════════════════════════════════");
    match &report.outcome {
        RunOutcome::Completed(_) => println!("  CONVERSION COMPLETE"),
        RunOutcome::QuantizeFailed(_) => println!("  CONVERSION FAILED"),
    }
    println!("═══════════════════════════════════════════════════════════════");
    println!("  Started:      {}", report.started_at.format("%Y-%m-%d %H:%M:%S"));
    println!("  Time:         {:.1}s", elapsed);
    println!("  Quant dir:    {}", report.layout.quant_dir.display());
    println!("  Measurement:  {}", measurement);

    if let Some(legacy) = &report.legacy {
        println!(
            "  Legacy .bin:  {} found ({} converted, {} skipped, {} failed)",
            legacy.total(),
            legacy.converted.len(),
            legacy.skipped.len(),
            legacy.failed.len()
        );
    }

    match &report.outcome {
        RunOutcome::Completed(post) => print_post_process(post),
        RunOutcome::QuantizeFailed(reason) => {
            println!("  Error:        {}", reason);
            println!("  Output left as-is (no config copy, no cleanup)");
        }
    }
    println!("═══════════════════════════════════════════════════════════════");
}

fn print_post_process(post: &PostProcessReport) {
    println!("  Configs:      {} copied", post.copied.len());
    match &post.measurement {
        MeasurementOutcome::Saved(path) => {
            println!("  Cached:       {}", path.display());
        }
        MeasurementOutcome::AlreadyPresent(path) => {
            println!("  Cached:       {} (kept)", path.display());
        }
        MeasurementOutcome::MissingOutput(_) => {
            println!("  Cached:       ⚠ no measurement.json produced");
        }
    }
    println!("  Cleaned:      {} temporary item(s)", post.removed.len());
    if let Some(shards) = &post.shards {
        println!(
            "  Output:       {} shard(s), {} tensors, {:.1} MB",
            shards.files.len(),
            shards.tensor_count,
            shards.total_bytes as f64 / 1024.0 / 1024.0
        );
    }
}
