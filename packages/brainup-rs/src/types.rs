use crate::error::{BrainupError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Multichannel recording in physical units (µV).
///
/// Rows follow `channels` order; `data[channel][sample]`. Values are never
/// mutated in place: renaming and filtering build a new matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalMatrix {
    channels: Vec<String>,
    sample_rate: f64,
    data: Vec<Vec<f64>>,
}

impl SignalMatrix {
    pub fn new(channels: Vec<String>, sample_rate: f64, data: Vec<Vec<f64>>) -> Result<Self> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(BrainupError::InvalidSignal(format!(
                "sample rate must be positive, got {}",
                sample_rate
            )));
        }
        if channels.len() != data.len() {
            return Err(BrainupError::InvalidSignal(format!(
                "{} channel labels for {} data rows",
                channels.len(),
                data.len()
            )));
        }
        let mut seen = HashSet::with_capacity(channels.len());
        for name in &channels {
            if !seen.insert(name.as_str()) {
                return Err(BrainupError::DuplicateChannel(name.clone()));
            }
        }
        if let Some(first) = data.first() {
            let n = first.len();
            if let Some((idx, row)) = data.iter().enumerate().find(|(_, row)| row.len() != n) {
                return Err(BrainupError::InvalidSignal(format!(
                    "channel '{}' has {} samples, expected {}",
                    channels[idx],
                    row.len(),
                    n
                )));
            }
        }

        Ok(Self {
            channels,
            sample_rate,
            data,
        })
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn data(&self) -> &[Vec<f64>] {
        &self.data
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn num_samples(&self) -> usize {
        self.data.first().map(|row| row.len()).unwrap_or(0)
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.num_samples() as f64 / self.sample_rate
    }

    pub fn channel_index(&self, name: &str) -> Option<usize> {
        self.channels.iter().position(|c| c == name)
    }

    pub fn channel(&self, name: &str) -> Option<&[f64]> {
        self.channel_index(name).map(|i| self.data[i].as_slice())
    }

    /// Sub-matrix with the named channels, in the requested order.
    /// Unknown names are skipped; nothing left is an error.
    pub fn select(&self, names: &[String]) -> Result<SignalMatrix> {
        let indices: Vec<usize> = names
            .iter()
            .filter_map(|name| self.channel_index(name))
            .collect();

        if indices.is_empty() {
            return Err(BrainupError::EmptyChannelSelection);
        }

        SignalMatrix::new(
            indices.iter().map(|&i| self.channels[i].clone()).collect(),
            self.sample_rate,
            indices.iter().map(|&i| self.data[i].clone()).collect(),
        )
    }

    /// Same samples under new channel labels.
    pub fn with_channels(&self, channels: Vec<String>) -> Result<SignalMatrix> {
        SignalMatrix::new(channels, self.sample_rate, self.data.clone())
    }

    /// Same labels and rate over new sample rows.
    pub fn with_data(&self, data: Vec<Vec<f64>>) -> Result<SignalMatrix> {
        SignalMatrix::new(self.channels.clone(), self.sample_rate, data)
    }

    /// Sample times in seconds.
    pub fn times(&self) -> Vec<f64> {
        (0..self.num_samples())
            .map(|i| i as f64 / self.sample_rate)
            .collect()
    }
}

/// Named frequency interval. `closed` includes the upper edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    pub name: String,
    pub low: f64,
    pub high: f64,
    #[serde(default)]
    pub closed: bool,
}

impl FrequencyBand {
    /// Half-open band `[low, high)`.
    pub fn custom(name: impl Into<String>, low: f64, high: f64) -> Self {
        Self {
            name: name.into(),
            low,
            high,
            closed: false,
        }
    }

    pub fn contains(&self, freq: f64) -> bool {
        if self.low >= self.high {
            return false;
        }
        freq >= self.low && (freq < self.high || (self.closed && freq == self.high))
    }

    pub fn delta() -> Self {
        Self::custom("Delta", 0.5, 4.0)
    }

    pub fn theta() -> Self {
        Self::custom("Theta", 4.0, 8.0)
    }

    pub fn alpha() -> Self {
        Self::custom("Alpha", 8.0, 13.0)
    }

    pub fn beta() -> Self {
        Self::custom("Beta", 13.0, 30.0)
    }

    pub fn gamma() -> Self {
        Self {
            closed: true,
            ..Self::custom("Gamma", 30.0, 100.0)
        }
    }

    /// The five canonical bands in display/export order.
    pub fn canonical() -> Vec<FrequencyBand> {
        vec![
            Self::delta(),
            Self::theta(),
            Self::alpha(),
            Self::beta(),
            Self::gamma(),
        ]
    }
}

/// Case-insensitive lookup among the canonical bands.
pub fn band_by_name(name: &str) -> Result<FrequencyBand> {
    FrequencyBand::canonical()
        .into_iter()
        .find(|b| b.name.eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| BrainupError::UnknownBand(name.to_string()))
}

/// One-sided power spectral density, `power[channel][freq]` in µV²/Hz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSpectrum {
    pub channels: Vec<String>,
    pub frequencies: Vec<f64>,
    pub power: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandPower {
    pub band: FrequencyBand,
    pub frequencies: Vec<f64>,
    pub power: Vec<Vec<f64>>,
}

impl BandPower {
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Mean power of each channel over the band window.
    pub fn mean_power(&self) -> Vec<f64> {
        self.power
            .iter()
            .map(|row| {
                if row.is_empty() {
                    f64::NAN
                } else {
                    row.iter().sum::<f64>() / row.len() as f64
                }
            })
            .collect()
    }
}

/// Which channels a band query covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSelection {
    All,
    One(String),
}

impl ChannelSelection {
    /// `"all"` (any case) selects every channel.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("all") {
            ChannelSelection::All
        } else {
            ChannelSelection::One(value.to_string())
        }
    }
}

/// Per-band trace of one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelTrace {
    pub label: String,
    pub frequencies: Vec<f64>,
    pub power: Vec<f64>,
}

/// Band powers aligned with the signal's channel order at computation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerBands {
    pub channels: Vec<String>,
    pub bands: Vec<BandPower>,
}

impl PowerBands {
    pub fn band(&self, name: &str) -> Result<&BandPower> {
        self.bands
            .iter()
            .find(|b| b.band.name.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| BrainupError::UnknownBand(name.to_string()))
    }

    fn channel_position(&self, channel: &str) -> Result<usize> {
        self.channels
            .iter()
            .position(|c| c == channel)
            .ok_or_else(|| BrainupError::ChannelNotFound(channel.to_string()))
    }

    /// One channel across every band, labelled by band name.
    pub fn channel_bands(&self, channel: &str) -> Result<Vec<ChannelTrace>> {
        let idx = self.channel_position(channel)?;
        Ok(self
            .bands
            .iter()
            .map(|b| ChannelTrace {
                label: b.band.name.clone(),
                frequencies: b.frequencies.clone(),
                power: b.power.get(idx).cloned().unwrap_or_default(),
            })
            .collect())
    }

    /// One band for all channels or a single channel, labelled by channel.
    pub fn band_channels(&self, band: &str, selection: &ChannelSelection) -> Result<Vec<ChannelTrace>> {
        let band = self.band(band)?;
        let trace = |idx: usize| ChannelTrace {
            label: self.channels[idx].clone(),
            frequencies: band.frequencies.clone(),
            power: band.power.get(idx).cloned().unwrap_or_default(),
        };

        match selection {
            ChannelSelection::All => Ok((0..self.channels.len()).map(trace).collect()),
            ChannelSelection::One(name) => Ok(vec![trace(self.channel_position(name)?)]),
        }
    }
}

/// Raw samples of selected channels with their time axis.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTrace {
    pub times: Vec<f64>,
    pub channels: Vec<String>,
    pub data: Vec<Vec<f64>>,
}
