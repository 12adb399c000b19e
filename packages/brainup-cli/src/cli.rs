use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "brainup",
    version,
    about = "EEG band power and scalp topography command-line tool",
    long_about = "Decode EEG recordings (CSV, XLS/XLSX, EDF, XDF), compute Welch band power\n\
                  and render scalp topographies. Storage settings come from $BRAINUP_* variables."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Sample rate assumed for CSV/Excel input, in Hz
    #[arg(long, global = true, env = "BRAINUP_TABULAR_SAMPLE_RATE")]
    pub sample_rate: Option<f64>,
}

#[derive(Subcommand)]
pub enum Command {
    /// List electrode layout templates
    Layouts(LayoutsArgs),
    /// Print mean power per channel and frequency band
    Bands(BandsArgs),
    /// Write the power-band CSV export
    Export(ExportArgs),
    /// Render a band-power topography PNG
    Topomap(TopomapArgs),
    /// Remove expired temporary files from the session store
    Sweep(SweepArgs),
}

#[derive(Args)]
pub struct LayoutsArgs {
    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

/// Optional Butterworth band applied before analysis.
#[derive(Args, Clone, Copy)]
pub struct FilterArgs {
    /// High-pass cutoff in Hz
    #[arg(long)]
    pub low: Option<f64>,

    /// Low-pass cutoff in Hz
    #[arg(long)]
    pub high: Option<f64>,
}

#[derive(Args)]
pub struct BandsArgs {
    /// Input recording (CSV, XLS, XLSX, EDF, XDF)
    pub file: String,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Only report this channel
    #[arg(long)]
    pub channel: Option<String>,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Input recording (CSV, XLS, XLSX, EDF, XDF)
    pub file: String,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Output CSV path (default: stdout)
    #[arg(short, long)]
    pub output: Option<String>,
}

#[derive(Args)]
pub struct TopomapArgs {
    /// Input recording (CSV, XLS, XLSX, EDF, XDF)
    pub file: String,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Output PNG path
    #[arg(short, long)]
    pub output: String,

    /// Position template: standard_1020 or a layout name
    #[arg(long, default_value = "standard_1020")]
    pub template: String,

    /// Panel edge in pixels (8-2048)
    #[arg(long, default_value_t = 128)]
    pub resolution: u32,
}

#[derive(Args)]
pub struct SweepArgs {
    /// Store root (overrides $BRAINUP_DATA_DIR)
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Keep sweeping on the configured interval until Ctrl-C
    #[arg(long, default_value_t = false)]
    pub watch: bool,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
