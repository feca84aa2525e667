// src/quantize.rs
// ============================================================================
// QUANTIZE - Línea de comandos de convert.py
// ============================================================================
//
//   python ./convert.py -i <model> -o <quant> -c ./<cal_dataset>
//       -b <bpw> -hb <head_bits> -gr <gpu_rows> -l <token_length>
//       -ml <measurement_length> [-ra <rope_alpha>] [-m <measurement>]
//
// Se ejecuta con cwd = root, por eso el script y el dataset van relativos.
//
// ============================================================================

use crate::layout::QuantLayout;
use crate::runner::Invocation;
use crate::settings::Settings;

/// Entry point del cuantizador, relativo al root
pub const CONVERT_SCRIPT: &str = "./convert.py";

/// Construye la invocación completa de convert.py
pub fn convert_invocation(layout: &QuantLayout, settings: &Settings) -> Invocation {
    let mut inv = Invocation::new(&settings.python, &layout.tool_root)
        .arg(CONVERT_SCRIPT)
        .flag("-i", &layout.model_dir)
        .flag("-o", &layout.quant_dir)
        .flag("-c", format!("./{}", settings.cal_dataset))
        .flag("-b", settings.bits_per_weight.to_string())
        .flag("-hb", settings.head_bits.to_string())
        .flag("-gr", settings.gpu_rows.to_string())
        .flag("-l", settings.token_length.to_string())
        .flag("-ml", settings.measurement_length.to_string());

    if let Some(rope_alpha) = &settings.rope_alpha {
        inv = inv.flag("-ra", rope_alpha.to_string());
    }

    // Reusar measurement evita recalibrar
    if layout.has_previous_measurement() {
        inv = inv.flag("-m", &layout.measurement_file);
    }

    inv
}
