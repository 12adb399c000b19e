use super::{load_signal, report};
use crate::cli::BandsArgs;
use crate::exit_codes;
use crate::output;
use brainup_rs::{compute_psd, extract_canonical_bands, BrainupError};
use serde::Serialize;

#[derive(Serialize)]
struct ChannelBandPower {
    channel: String,
    band: String,
    low_hz: f64,
    high_hz: f64,
    mean_power: f64,
}

pub fn execute(args: BandsArgs, sample_rate: Option<f64>) -> i32 {
    let signal = match load_signal(&args.file, sample_rate, args.filter) {
        Ok(signal) => signal,
        Err(code) => return code,
    };

    if let Some(ref channel) = args.channel {
        if signal.channel_index(channel).is_none() {
            return report(&BrainupError::ChannelNotFound(channel.clone()));
        }
    }

    let spectrum = match compute_psd(&signal) {
        Ok(spectrum) => spectrum,
        Err(e) => return report(&e),
    };
    let bands = extract_canonical_bands(&spectrum);

    let mut rows = Vec::new();
    for band in &bands.bands {
        let means = band.mean_power();
        for (idx, channel) in bands.channels.iter().enumerate() {
            if args.channel.as_ref().is_some_and(|c| c != channel) {
                continue;
            }
            rows.push(ChannelBandPower {
                channel: channel.clone(),
                band: band.band.name.clone(),
                low_hz: band.band.low,
                high_hz: band.band.high,
                mean_power: means[idx],
            });
        }
    }

    if args.json {
        return output::print_json(&rows);
    }

    println!("  {:<12} {:<8} {:>14}", "Channel", "Band", "Power (uV^2/Hz)");
    println!("  {}", "-".repeat(36));
    for row in &rows {
        println!("  {:<12} {:<8} {:>14.6}", row.channel, row.band, row.mean_power);
    }

    exit_codes::SUCCESS
}
