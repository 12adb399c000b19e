//! Scalp maps of band power.
//!
//! Each band becomes one square panel: mean band power per electrode (dB)
//! interpolated over the head disk with a thin-plate spline, drawn with a
//! diverging colormap, a head outline and electrode markers.

use super::Montage;
use crate::error::{BrainupError, Result};
use crate::signal_processing::{compute_psd, extract_bands};
use crate::types::{FrequencyBand, SignalMatrix};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

pub const DEFAULT_RESOLUTION: u32 = 128;
pub const MIN_RESOLUTION: u32 = 8;
pub const MAX_RESOLUTION: u32 = 2048;
pub const MIN_ELECTRODES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopographyOptions {
    /// Panel edge in pixels.
    pub resolution: u32,
}

impl TopographyOptions {
    pub fn validate(&self) -> Result<()> {
        if !(MIN_RESOLUTION..=MAX_RESOLUTION).contains(&self.resolution) {
            return Err(BrainupError::InvalidOption(format!(
                "topography resolution must be {}-{} px, got {}",
                MIN_RESOLUTION, MAX_RESOLUTION, self.resolution
            )));
        }
        Ok(())
    }
}

impl Default for TopographyOptions {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
        }
    }
}

/// Rendered topography, one panel per band from left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct Topography {
    pub width: u32,
    pub height: u32,
    pub bands: Vec<String>,
    pub png: Vec<u8>,
}

/// Electrode value at a projected head position.
#[derive(Debug, Clone, Copy)]
struct Sample {
    x: f64,
    y: f64,
    value: f64,
}

enum Interpolator {
    ThinPlate { samples: Vec<Sample>, weights: DVector<f64> },
    InverseDistance { samples: Vec<Sample> },
}

fn tps_kernel(r2: f64) -> f64 {
    if r2 <= 0.0 {
        0.0
    } else {
        0.5 * r2 * r2.ln()
    }
}

impl Interpolator {
    fn fit(samples: Vec<Sample>) -> Self {
        let n = samples.len();
        let size = n + 3;
        let mut a = DMatrix::<f64>::zeros(size, size);
        let mut b = DVector::<f64>::zeros(size);

        for (i, si) in samples.iter().enumerate() {
            for (j, sj) in samples.iter().enumerate() {
                let r2 = (si.x - sj.x).powi(2) + (si.y - sj.y).powi(2);
                a[(i, j)] = tps_kernel(r2);
            }
            for (k, p) in [1.0, si.x, si.y].into_iter().enumerate() {
                a[(i, n + k)] = p;
                a[(n + k, i)] = p;
            }
            b[i] = si.value;
        }

        match a.lu().solve(&b) {
            Some(weights) if weights.iter().all(|w| w.is_finite()) => {
                Interpolator::ThinPlate { samples, weights }
            }
            _ => {
                log::warn!("Thin-plate system is singular, using inverse-distance weighting");
                Interpolator::InverseDistance { samples }
            }
        }
    }

    fn eval(&self, x: f64, y: f64) -> f64 {
        match self {
            Interpolator::ThinPlate { samples, weights } => {
                let n = samples.len();
                let radial: f64 = samples
                    .iter()
                    .zip(weights.iter())
                    .map(|(s, w)| w * tps_kernel((x - s.x).powi(2) + (y - s.y).powi(2)))
                    .sum();
                radial + weights[n] + weights[n + 1] * x + weights[n + 2] * y
            }
            Interpolator::InverseDistance { samples } => {
                let mut num = 0.0;
                let mut den = 0.0;
                for s in samples {
                    let d2 = (x - s.x).powi(2) + (y - s.y).powi(2);
                    if d2 < 1e-12 {
                        return s.value;
                    }
                    let w = 1.0 / d2;
                    num += w * s.value;
                    den += w;
                }
                num / den
            }
        }
    }
}

/// Diverging blue-white-red map for `t` in [0, 1].
fn colormap(t: f64) -> [u8; 3] {
    const BLUE: [f64; 3] = [59.0, 76.0, 192.0];
    const WHITE: [f64; 3] = [247.0, 247.0, 247.0];
    const RED: [f64; 3] = [180.0, 4.0, 38.0];

    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.5 };
    let (from, to, u) = if t < 0.5 {
        (BLUE, WHITE, t * 2.0)
    } else {
        (WHITE, RED, (t - 0.5) * 2.0)
    };
    let mix = |k: usize| (from[k] + (to[k] - from[k]) * u).round() as u8;
    [mix(0), mix(1), mix(2)]
}

fn render_panel(samples: &[Sample], resolution: u32) -> Vec<u8> {
    let res = resolution as usize;
    let mut pixels = vec![0u8; res * res * 4];

    let extent = samples
        .iter()
        .map(|s| s.x.hypot(s.y))
        .fold(1.0_f64, f64::max);
    // Leave room for the outline around the mask.
    let half = extent * 1.08;
    let pixel = 2.0 * half / res as f64;

    let finite: Vec<Sample> = samples.iter().copied().filter(|s| s.value.is_finite()).collect();
    let interpolator = (finite.len() >= MIN_ELECTRODES).then(|| Interpolator::fit(finite.clone()));

    let (vmin, vmax) = finite
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| (lo.min(s.value), hi.max(s.value)));
    let span = vmax - vmin;

    for row in 0..res {
        let y = half - (row as f64 + 0.5) * pixel;
        for col in 0..res {
            let x = -half + (col as f64 + 0.5) * pixel;
            let r = x.hypot(y);
            let idx = (row * res + col) * 4;

            let rgba = if (r - 1.0).abs() <= pixel * 0.75 {
                [0, 0, 0, 255]
            } else if r <= extent {
                let t = match &interpolator {
                    Some(f) if span > 0.0 => (f.eval(x, y) - vmin) / span,
                    _ => 0.5,
                };
                let [red, green, blue] = colormap(t);
                [red, green, blue, 255]
            } else {
                [255, 255, 255, 0]
            };
            pixels[idx..idx + 4].copy_from_slice(&rgba);
        }
    }

    for s in samples {
        let col = ((s.x + half) / pixel).floor();
        let row = ((half - s.y) / pixel).floor();
        if col >= 0.0 && row >= 0.0 && (col as usize) < res && (row as usize) < res {
            let idx = (row as usize * res + col as usize) * 4;
            pixels[idx..idx + 4].copy_from_slice(&[0, 0, 0, 255]);
        }
    }

    pixels
}

fn encode_png(width: u32, height: u32, rgba: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(rgba)?;
        writer.finish()?;
    }
    Ok(out)
}

/// Render `bands` of `signal` over `montage`. The spectrum is recomputed from
/// the signal as given, so a filtered signal yields a filtered map.
pub fn project_topography(
    signal: &SignalMatrix,
    montage: &Montage,
    bands: &[FrequencyBand],
    options: &TopographyOptions,
) -> Result<Topography> {
    let positioned: Vec<(usize, [f64; 2])> = montage
        .electrodes
        .iter()
        .filter_map(|e| signal.channel_index(&e.label).map(|i| (i, e.projected)))
        .collect();

    if positioned.len() < MIN_ELECTRODES {
        return Err(BrainupError::InsufficientElectrodes {
            found: positioned.len(),
            required: MIN_ELECTRODES,
        });
    }
    if bands.is_empty() {
        return Err(BrainupError::UnknownBand("no bands requested".to_string()));
    }
    options.validate()?;
    let width = u32::try_from(bands.len())
        .ok()
        .and_then(|n| options.resolution.checked_mul(n))
        .ok_or_else(|| {
            BrainupError::InvalidOption(format!("{} bands do not fit in one image", bands.len()))
        })?;

    let spectrum = compute_psd(signal)?;
    let power = extract_bands(&spectrum, bands);

    let panels: Vec<Vec<u8>> = power
        .bands
        .par_iter()
        .map(|band| {
            let means = band.mean_power();
            let samples: Vec<Sample> = positioned
                .iter()
                .map(|&(ch, [x, y])| Sample {
                    x,
                    y,
                    value: 10.0 * means[ch].log10(),
                })
                .collect();
            render_panel(&samples, options.resolution)
        })
        .collect();

    let res = options.resolution as usize;
    let height = options.resolution;
    let mut rgba = vec![0u8; width as usize * res * 4];
    for (p, panel) in panels.iter().enumerate() {
        for row in 0..res {
            let src = &panel[row * res * 4..(row + 1) * res * 4];
            let dst = (row * width as usize + p * res) * 4;
            rgba[dst..dst + res * 4].copy_from_slice(src);
        }
    }

    log::info!(
        "Rendered topography: {} bands, {} electrodes, {}x{} px",
        panels.len(),
        positioned.len(),
        width,
        height
    );

    Ok(Topography {
        width,
        height,
        bands: bands.iter().map(|b| b.name.clone()).collect(),
        png: encode_png(width, height, &rgba)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::montage::attach_positions;
    use std::f64::consts::PI;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn recording(labels: &[&str]) -> SignalMatrix {
        let fs = 128.0;
        let data = labels
            .iter()
            .enumerate()
            .map(|(c, _)| {
                (0..1024)
                    .map(|i| {
                        let t = i as f64 / fs;
                        (c as f64 + 1.0) * (2.0 * PI * 10.0 * t).sin() + (2.0 * PI * 3.0 * t).cos()
                    })
                    .collect()
            })
            .collect();
        SignalMatrix::new(labels.iter().map(|s| s.to_string()).collect(), fs, data).unwrap()
    }

    fn png_size(png: &[u8]) -> (u32, u32) {
        let w = u32::from_be_bytes([png[16], png[17], png[18], png[19]]);
        let h = u32::from_be_bytes([png[20], png[21], png[22], png[23]]);
        (w, h)
    }

    #[test]
    fn test_renders_one_panel_per_band() {
        let signal = recording(&["Fp1", "Fp2", "C3", "C4", "O1", "O2", "Cz"]);
        let montage = attach_positions(signal.channels()).unwrap();
        let topo = project_topography(
            &signal,
            &montage,
            &FrequencyBand::canonical(),
            &TopographyOptions { resolution: 32 },
        )
        .unwrap();

        assert_eq!(topo.png[..8], PNG_SIGNATURE);
        assert_eq!((topo.width, topo.height), (160, 32));
        assert_eq!(png_size(&topo.png), (160, 32));
        assert_eq!(topo.bands.len(), 5);
    }

    #[test]
    fn test_unpositioned_channels_are_skipped() {
        let signal = recording(&["Fp1", "X1", "Cz", "EOG", "O2"]);
        let montage = attach_positions(signal.channels()).unwrap();
        let topo = project_topography(&signal, &montage, &[FrequencyBand::alpha()], &TopographyOptions::default());
        assert!(topo.is_ok());
    }

    #[test]
    fn test_too_few_electrodes() {
        let signal = recording(&["Fp1", "Cz", "EOG"]);
        let montage = attach_positions(signal.channels()).unwrap();
        let err = project_topography(&signal, &montage, &[FrequencyBand::alpha()], &TopographyOptions::default());
        assert!(matches!(
            err,
            Err(BrainupError::InsufficientElectrodes { found: 2, required: 3 })
        ));
    }

    #[test]
    fn test_resolution_bounds() {
        let signal = recording(&["Fp1", "Fp2", "C3", "C4"]);
        let montage = attach_positions(signal.channels()).unwrap();
        for resolution in [0, MIN_RESOLUTION - 1, MAX_RESOLUTION + 1, u32::MAX] {
            let err = project_topography(
                &signal,
                &montage,
                &FrequencyBand::canonical(),
                &TopographyOptions { resolution },
            );
            assert!(matches!(err, Err(BrainupError::InvalidOption(_))), "resolution {}", resolution);
        }
        assert!(TopographyOptions { resolution: MAX_RESOLUTION }.validate().is_ok());
    }

    #[test]
    fn test_thin_plate_reproduces_electrode_values() {
        let samples = vec![
            Sample { x: 0.0, y: 0.0, value: 1.0 },
            Sample { x: 0.5, y: 0.1, value: -2.0 },
            Sample { x: -0.4, y: 0.6, value: 3.0 },
            Sample { x: 0.1, y: -0.7, value: 0.5 },
        ];
        let f = Interpolator::fit(samples.clone());
        assert!(matches!(f, Interpolator::ThinPlate { .. }));
        for s in &samples {
            assert!((f.eval(s.x, s.y) - s.value).abs() < 1e-8);
        }
    }

    #[test]
    fn test_colormap_endpoints() {
        assert_eq!(colormap(0.0), [59, 76, 192]);
        assert_eq!(colormap(0.5), [247, 247, 247]);
        assert_eq!(colormap(1.0), [180, 4, 38]);
    }
}
