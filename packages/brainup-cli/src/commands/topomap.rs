use super::{load_signal, report};
use crate::cli::TopomapArgs;
use crate::exit_codes;
use brainup_rs::{attach_positions_with, project_topography, FrequencyBand, TopographyOptions};

pub fn execute(args: TopomapArgs, sample_rate: Option<f64>) -> i32 {
    let signal = match load_signal(&args.file, sample_rate, args.filter) {
        Ok(signal) => signal,
        Err(code) => return code,
    };

    let options = TopographyOptions {
        resolution: args.resolution,
    };
    let image = match attach_positions_with(signal.channels(), &args.template)
        .and_then(|montage| project_topography(&signal, &montage, &FrequencyBand::canonical(), &options))
    {
        Ok(image) => image,
        Err(e) => return report(&e),
    };

    if let Err(e) = std::fs::write(&args.output, &image.png) {
        eprintln!("Error: failed to write '{}': {}", args.output, e);
        return exit_codes::EXECUTION_ERROR;
    }

    eprintln!(
        "Wrote {}x{} topography ({}) to {}",
        image.width,
        image.height,
        image.bands.join(", "),
        args.output
    );
    exit_codes::SUCCESS
}
