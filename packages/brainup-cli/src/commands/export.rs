use super::{load_signal, report};
use crate::cli::ExportArgs;
use crate::exit_codes;
use crate::output;
use brainup_rs::{compute_psd, export_power_bands, extract_canonical_bands};

pub fn execute(args: ExportArgs, sample_rate: Option<f64>) -> i32 {
    let signal = match load_signal(&args.file, sample_rate, args.filter) {
        Ok(signal) => signal,
        Err(code) => return code,
    };

    let csv = match compute_psd(&signal)
        .map(|spectrum| extract_canonical_bands(&spectrum))
        .and_then(|bands| export_power_bands(&bands))
    {
        Ok(csv) => csv,
        Err(e) => return report(&e),
    };

    if let Err(e) = output::write_output(&csv, args.output.as_deref()) {
        eprintln!("Error: {}", e);
        return exit_codes::EXECUTION_ERROR;
    }

    if let Some(path) = args.output {
        eprintln!("Wrote power bands to {}", path);
    }
    exit_codes::SUCCESS
}
