use clap::Parser;

mod cli;
mod commands;
mod exit_codes;
mod output;

use cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let sample_rate = cli.sample_rate;
    let exit_code = match cli.command {
        cli::Command::Layouts(args) => commands::layouts::execute(args),
        cli::Command::Bands(args) => commands::bands::execute(args, sample_rate),
        cli::Command::Export(args) => commands::export::execute(args, sample_rate),
        cli::Command::Topomap(args) => commands::topomap::execute(args, sample_rate),
        cli::Command::Sweep(args) => commands::sweep::execute(args).await,
    };

    std::process::exit(exit_code);
}
