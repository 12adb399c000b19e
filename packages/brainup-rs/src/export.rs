//! Power-band CSV export.
//!
//! One row per frequency sample index. For each band in order the columns are
//! `{Band}_freq` followed by `{Channel}({Band})_power` per channel. Bands with
//! fewer frequency samples than the longest one are padded with empty cells.

use crate::error::{BrainupError, Result};
use crate::types::PowerBands;
use std::path::Path;

pub fn freq_column(band: &str) -> String {
    format!("{}_freq", band)
}

pub fn power_column(channel: &str, band: &str) -> String {
    format!("{}({})_power", channel, band)
}

pub fn export_power_bands(bands: &PowerBands) -> Result<String> {
    let mut columns: Vec<(String, &[f64])> = Vec::new();
    for band in &bands.bands {
        let name = &band.band.name;
        columns.push((freq_column(name), band.frequencies.as_slice()));
        for (idx, channel) in bands.channels.iter().enumerate() {
            let power = band.power.get(idx).map(Vec::as_slice).unwrap_or(&[]);
            columns.push((power_column(channel, name), power));
        }
    }

    let rows = columns.iter().map(|(_, c)| c.len()).max().unwrap_or(0);
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(columns.iter().map(|(h, _)| h.as_str()))?;

    for row in 0..rows {
        let record: Vec<String> = columns
            .iter()
            .map(|(_, values)| values.get(row).map(|v| v.to_string()).unwrap_or_default())
            .collect();
        writer.write_record(&record)?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e).into())
}

pub fn write_power_bands(bands: &PowerBands, path: &Path) -> Result<()> {
    let text = export_power_bands(bands)?;
    std::fs::write(path, text)?;
    log::info!("Wrote power-band export to {}", path.display());
    Ok(())
}

/// A parsed export with padding removed.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportTable {
    pub headers: Vec<String>,
    pub columns: Vec<Vec<f64>>,
}

impl ExportTable {
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.headers
            .iter()
            .position(|h| h == name)
            .map(|idx| self.columns[idx].as_slice())
    }

    pub fn num_rows(&self) -> usize {
        self.columns.iter().map(Vec::len).max().unwrap_or(0)
    }
}

pub fn parse_export(text: &str) -> Result<ExportTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(str::to_string)
        .collect();
    let mut columns = vec![Vec::new(); headers.len()];

    for (line, record) in reader.records().enumerate() {
        let record = record?;
        for (idx, cell) in record.iter().enumerate().take(headers.len()) {
            let cell = cell.trim();
            if cell.is_empty() {
                continue;
            }
            let value = cell.parse::<f64>().map_err(|_| {
                BrainupError::MalformedExport(format!("row {}: '{}' is not numeric", line + 2, cell))
            })?;
            columns[idx].push(value);
        }
    }

    Ok(ExportTable { headers, columns })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BandPower, FrequencyBand};

    fn bands() -> PowerBands {
        PowerBands {
            channels: vec!["Fz".into(), "Cz".into()],
            bands: vec![
                BandPower {
                    band: FrequencyBand::delta(),
                    frequencies: vec![0.5, 1.0, 1.5],
                    power: vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
                },
                BandPower {
                    band: FrequencyBand::theta(),
                    frequencies: vec![4.0],
                    power: vec![vec![0.25], vec![0.125]],
                },
            ],
        }
    }

    #[test]
    fn test_header_layout() {
        let text = export_power_bands(&bands()).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(
            header,
            "Delta_freq,Fz(Delta)_power,Cz(Delta)_power,Theta_freq,Fz(Theta)_power,Cz(Theta)_power"
        );
        assert_eq!(text.lines().count(), 4);
        assert_eq!(text.lines().nth(2).unwrap(), "1,2,5,,,");
    }

    #[test]
    fn test_round_trip_strips_padding() {
        let original = bands();
        let table = parse_export(&export_power_bands(&original).unwrap()).unwrap();

        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.column("Delta_freq").unwrap(), &[0.5, 1.0, 1.5]);
        assert_eq!(table.column("Cz(Delta)_power").unwrap(), &[4.0, 5.0, 6.0]);
        assert_eq!(table.column("Theta_freq").unwrap(), &[4.0]);
        assert_eq!(table.column("Fz(Theta)_power").unwrap(), &[0.25]);
        assert!(table.column("Alpha_freq").is_none());
    }

    #[test]
    fn test_empty_band_exports_header_only_column() {
        let mut empty = bands();
        empty.bands[1].frequencies.clear();
        empty.bands[1].power = vec![vec![], vec![]];

        let table = parse_export(&export_power_bands(&empty).unwrap()).unwrap();
        assert_eq!(table.column("Theta_freq").unwrap(), &[] as &[f64]);
        assert_eq!(table.column("Fz(Delta)_power").unwrap().len(), 3);
    }

    #[test]
    fn test_malformed_export_is_rejected() {
        let err = parse_export("Delta_freq,Fz(Delta)_power\n0.5,abc\n").unwrap_err();
        assert!(matches!(err, BrainupError::MalformedExport(_)));
    }

    #[test]
    fn test_write_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bands.csv");
        write_power_bands(&bands(), &path).unwrap();
        let table = parse_export(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(table.headers.len(), 6);
    }
}
