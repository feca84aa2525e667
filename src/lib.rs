// src/lib.rs
// ============================================================================
// EXL2-QUANT - Wrapper de cuantización EXL2 (convert.py)
// ============================================================================

pub mod error;
pub mod settings;
pub mod layout;
pub mod runner;
pub mod legacy;
pub mod quantize;
pub mod postprocess;
pub mod safetensor;
pub mod pipeline;

// Re-exports principales
pub use error::{QuantError, Result};
pub use settings::{ParamValue, Settings};
pub use layout::QuantLayout;
pub use runner::{CommandRunner, Invocation, SystemRunner};
pub use pipeline::{plan, run, RunConfig, RunOutcome, RunPlan, RunReport};
