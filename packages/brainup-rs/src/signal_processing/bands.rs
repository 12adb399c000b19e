use crate::types::{BandPower, FrequencyBand, PowerBands, RawSpectrum};

/// Restrict `spectrum` to each band window. Bands that select no bins come
/// back empty rather than failing.
pub fn extract_bands(spectrum: &RawSpectrum, bands: &[FrequencyBand]) -> PowerBands {
    let bands = bands
        .iter()
        .map(|band| {
            let bins: Vec<usize> = spectrum
                .frequencies
                .iter()
                .enumerate()
                .filter(|(_, &f)| band.contains(f))
                .map(|(i, _)| i)
                .collect();

            if bins.is_empty() {
                log::debug!("Band {} selects no frequency bins", band.name);
            }

            BandPower {
                band: band.clone(),
                frequencies: bins.iter().map(|&i| spectrum.frequencies[i]).collect(),
                power: spectrum
                    .power
                    .iter()
                    .map(|row| bins.iter().map(|&i| row[i]).collect())
                    .collect(),
            }
        })
        .collect();

    PowerBands {
        channels: spectrum.channels.clone(),
        bands,
    }
}

/// Delta, Theta, Alpha, Beta and Gamma.
pub fn extract_canonical_bands(spectrum: &RawSpectrum) -> PowerBands {
    extract_bands(spectrum, &FrequencyBand::canonical())
}
