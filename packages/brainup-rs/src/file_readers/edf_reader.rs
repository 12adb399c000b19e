// EDF (European Data Format) reader
// Specification: https://www.edfplus.info/specs/edf.html

use super::{FileReaderError, FileResult, FormatReader};
use crate::types::SignalMatrix;
use byteorder::{LittleEndian, ReadBytesExt};
use rayon::prelude::*;
use std::io::{Cursor, Read, Seek, SeekFrom};

const ANNOTATIONS_LABEL: &str = "EDF Annotations";

#[derive(Debug, Clone)]
pub struct EdfHeader {
    pub version: String,              // 8 bytes
    pub patient_id: String,           // 80 bytes
    pub recording_id: String,         // 80 bytes
    pub start_date: String,           // 8 bytes: dd.mm.yy
    pub start_time: String,           // 8 bytes: hh.mm.ss
    pub header_bytes: usize,          // 8 bytes
    pub reserved: String,             // 44 bytes: "EDF+C"/"EDF+D" for EDF+
    pub num_data_records: i64,        // 8 bytes: -1 if unknown
    pub duration_of_data_record: f64, // 8 bytes: seconds
    pub num_signals: usize,           // 4 bytes
}

#[derive(Debug, Clone)]
pub struct EdfSignalHeader {
    pub label: String,                 // 16 bytes
    pub transducer_type: String,       // 80 bytes
    pub physical_dimension: String,    // 8 bytes
    pub physical_minimum: f64,         // 8 bytes
    pub physical_maximum: f64,         // 8 bytes
    pub digital_minimum: i64,          // 8 bytes
    pub digital_maximum: i64,          // 8 bytes
    pub prefiltering: String,          // 80 bytes
    pub num_samples_per_record: usize, // 8 bytes
}

impl EdfSignalHeader {
    pub fn sample_frequency(&self, record_duration: f64) -> f64 {
        self.num_samples_per_record as f64 / record_duration
    }

    pub fn gain(&self) -> f64 {
        let span = (self.digital_maximum - self.digital_minimum) as f64;
        if span == 0.0 {
            1.0
        } else {
            (self.physical_maximum - self.physical_minimum) / span
        }
    }

    pub fn offset(&self) -> f64 {
        self.physical_maximum - self.gain() * self.digital_maximum as f64
    }

    /// Factor taking this signal's physical dimension to µV. Dimensions that
    /// are not voltages are left as recorded.
    pub fn microvolt_scale(&self) -> f64 {
        match self.physical_dimension.trim() {
            "" | "uV" | "µV" | "μV" | "uv" => 1.0,
            "nV" => 1e-3,
            "mV" => 1e3,
            "V" => 1e6,
            other => {
                log::warn!("Signal '{}' has non-voltage dimension '{}'", self.label, other);
                1.0
            }
        }
    }

    pub fn is_annotation(&self) -> bool {
        self.label == ANNOTATIONS_LABEL
    }
}

/// EDF/EDF+ reader over an in-memory payload.
pub struct EdfFileReader;

fn read_fixed_string<R: Read>(reader: &mut R, size: usize) -> FileResult<String> {
    let mut buffer = vec![0u8; size];
    reader
        .read_exact(&mut buffer)
        .map_err(|e| FileReaderError::Parse(format!("truncated header: {}", e)))?;
    Ok(String::from_utf8_lossy(&buffer).trim().to_string())
}

fn read_number<R: Read, T: std::str::FromStr>(reader: &mut R, size: usize, field: &str) -> FileResult<T>
where
    T::Err: std::fmt::Display,
{
    let s = read_fixed_string(reader, size)?;
    s.parse::<T>()
        .map_err(|e| FileReaderError::Parse(format!("invalid {} '{}': {}", field, s, e)))
}

fn read_column<R: Read, T: std::str::FromStr>(
    reader: &mut R,
    count: usize,
    size: usize,
    field: &str,
) -> FileResult<Vec<T>>
where
    T::Err: std::fmt::Display,
{
    (0..count).map(|_| read_number(reader, size, field)).collect()
}

fn read_text_column<R: Read>(reader: &mut R, count: usize, size: usize) -> FileResult<Vec<String>> {
    (0..count).map(|_| read_fixed_string(reader, size)).collect()
}

pub fn read_header<R: Read>(reader: &mut R) -> FileResult<EdfHeader> {
    let header = EdfHeader {
        version: read_fixed_string(reader, 8)?,
        patient_id: read_fixed_string(reader, 80)?,
        recording_id: read_fixed_string(reader, 80)?,
        start_date: read_fixed_string(reader, 8)?,
        start_time: read_fixed_string(reader, 8)?,
        header_bytes: read_number(reader, 8, "header bytes")?,
        reserved: read_fixed_string(reader, 44)?,
        num_data_records: read_number(reader, 8, "number of data records")?,
        duration_of_data_record: read_number(reader, 8, "record duration")?,
        num_signals: read_number(reader, 4, "number of signals")?,
    };

    log::debug!(
        "EDF header parsed: num_data_records={}, duration_of_data_record={}, num_signals={}",
        header.num_data_records,
        header.duration_of_data_record,
        header.num_signals
    );

    Ok(header)
}

/// Signal headers are stored field-major: every label, then every
/// transducer, and so on.
pub fn read_signal_headers<R: Read>(reader: &mut R, n: usize) -> FileResult<Vec<EdfSignalHeader>> {
    let labels = read_text_column(reader, n, 16)?;
    let transducers = read_text_column(reader, n, 80)?;
    let dimensions = read_text_column(reader, n, 8)?;
    let physical_min: Vec<f64> = read_column(reader, n, 8, "physical minimum")?;
    let physical_max: Vec<f64> = read_column(reader, n, 8, "physical maximum")?;
    let digital_min: Vec<i64> = read_column(reader, n, 8, "digital minimum")?;
    let digital_max: Vec<i64> = read_column(reader, n, 8, "digital maximum")?;
    let prefiltering = read_text_column(reader, n, 80)?;
    let samples: Vec<usize> = read_column(reader, n, 8, "samples per record")?;
    read_text_column(reader, n, 32)?;

    Ok((0..n)
        .map(|i| EdfSignalHeader {
            label: labels[i].clone(),
            transducer_type: transducers[i].clone(),
            physical_dimension: dimensions[i].clone(),
            physical_minimum: physical_min[i],
            physical_maximum: physical_max[i],
            digital_minimum: digital_min[i],
            digital_maximum: digital_max[i],
            prefiltering: prefiltering[i].clone(),
            num_samples_per_record: samples[i],
        })
        .collect())
}

impl EdfFileReader {
    fn read_from<R: Read + Seek>(reader: &mut R, payload_len: u64) -> FileResult<SignalMatrix> {
        let header = read_header(reader)?;
        let signal_headers = read_signal_headers(reader, header.num_signals)?;

        if !(header.duration_of_data_record > 0.0) {
            return Err(FileReaderError::InvalidData(format!(
                "record duration must be positive, got {}",
                header.duration_of_data_record
            )));
        }

        let record_samples: usize = signal_headers.iter().map(|s| s.num_samples_per_record).sum();
        if record_samples == 0 {
            return Err(FileReaderError::InvalidData("records hold no samples".to_string()));
        }
        let record_bytes = (record_samples * 2) as u64;
        let available = payload_len.saturating_sub(header.header_bytes as u64) / record_bytes;

        let num_records: u64 = if header.num_data_records < 0 {
            log::warn!("EDF record count unknown, recovered {} from payload size", available);
            available
        } else {
            let declared = header.num_data_records as u64;
            if declared > available {
                return Err(FileReaderError::Parse(format!(
                    "header declares {} records, payload holds {}",
                    declared, available
                )));
            }
            declared
        };
        let num_records = num_records as usize;

        let data_signals: Vec<usize> = signal_headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !h.is_annotation())
            .map(|(i, _)| i)
            .collect();
        if data_signals.is_empty() {
            return Err(FileReaderError::InvalidData("no data signals".to_string()));
        }

        let sample_rate = signal_headers[data_signals[0]].sample_frequency(header.duration_of_data_record);
        if let Some(&odd) = data_signals.iter().find(|&&i| {
            (signal_headers[i].sample_frequency(header.duration_of_data_record) - sample_rate).abs() > 1e-9
        }) {
            return Err(FileReaderError::InvalidData(format!(
                "signal '{}' is sampled at {} Hz, expected {} Hz",
                signal_headers[odd].label,
                signal_headers[odd].sample_frequency(header.duration_of_data_record),
                sample_rate
            )));
        }

        reader.seek(SeekFrom::Start(header.header_bytes as u64))?;

        let mut digital: Vec<Vec<i16>> = signal_headers
            .iter()
            .map(|h| Vec::with_capacity(h.num_samples_per_record * num_records))
            .collect();
        for _ in 0..num_records {
            for (signal, h) in digital.iter_mut().zip(&signal_headers) {
                for _ in 0..h.num_samples_per_record {
                    signal.push(reader.read_i16::<LittleEndian>()?);
                }
            }
        }

        let data: Vec<Vec<f64>> = data_signals
            .par_iter()
            .map(|&i| {
                let h = &signal_headers[i];
                let (gain, offset, scale) = (h.gain(), h.offset(), h.microvolt_scale());
                digital[i].iter().map(|&d| (gain * d as f64 + offset) * scale).collect()
            })
            .collect();

        let labels = data_signals
            .iter()
            .map(|&i| signal_headers[i].label.clone())
            .collect();

        SignalMatrix::new(labels, sample_rate, data)
            .map_err(|e| FileReaderError::InvalidData(e.to_string()))
    }
}

impl FormatReader for EdfFileReader {
    fn read(&self, bytes: &[u8]) -> FileResult<SignalMatrix> {
        let mut cursor = Cursor::new(bytes);
        Self::read_from(&mut cursor, bytes.len() as u64)
    }

    fn format_name(&self) -> &str {
        "EDF"
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Minimal EDF: 1 s records, `samples_per_record` samples per signal,
    /// 0.1 µV per digital unit.
    pub fn edf_bytes(labels: &[&str], samples_per_record: usize, records: &[Vec<Vec<i16>>], declared_records: i64) -> Vec<u8> {
        edf_bytes_in(labels, "uV", samples_per_record, records, declared_records)
    }

    /// Same layout with every signal recorded in `unit`.
    pub fn edf_bytes_in(
        labels: &[&str],
        unit: &str,
        samples_per_record: usize,
        records: &[Vec<Vec<i16>>],
        declared_records: i64,
    ) -> Vec<u8> {
        fn field(out: &mut Vec<u8>, value: &str, width: usize) {
            let mut s = value.as_bytes().to_vec();
            s.resize(width, b' ');
            out.extend_from_slice(&s[..width]);
        }

        let n = labels.len();
        let header_bytes = 256 + 256 * n;
        let mut out = Vec::new();
        field(&mut out, "0", 8);
        field(&mut out, "patient", 80);
        field(&mut out, "recording", 80);
        field(&mut out, "01.01.24", 8);
        field(&mut out, "10.00.00", 8);
        field(&mut out, &header_bytes.to_string(), 8);
        field(&mut out, "", 44);
        field(&mut out, &declared_records.to_string(), 8);
        field(&mut out, "1", 8);
        field(&mut out, &n.to_string(), 4);

        for l in labels {
            field(&mut out, l, 16);
        }
        for _ in 0..n {
            field(&mut out, "AgAgCl", 80);
        }
        for _ in 0..n {
            field(&mut out, unit, 8);
        }
        for _ in 0..n {
            field(&mut out, "-3276.8", 8);
        }
        for _ in 0..n {
            field(&mut out, "3276.7", 8);
        }
        for _ in 0..n {
            field(&mut out, "-32768", 8);
        }
        for _ in 0..n {
            field(&mut out, "32767", 8);
        }
        for _ in 0..n {
            field(&mut out, "", 80);
        }
        for _ in 0..n {
            field(&mut out, &samples_per_record.to_string(), 8);
        }
        for _ in 0..n {
            field(&mut out, "", 32);
        }

        for record in records {
            for signal in record {
                for s in signal {
                    out.extend_from_slice(&s.to_le_bytes());
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{edf_bytes, edf_bytes_in};
    use super::*;

    fn records() -> Vec<Vec<Vec<i16>>> {
        vec![
            vec![vec![0, 10, 20, 30], vec![-10, -20, -30, -40]],
            vec![vec![40, 50, 60, 70], vec![-50, -60, -70, -80]],
        ]
    }

    #[test]
    fn test_reads_physical_values() {
        let bytes = edf_bytes(&["Fp1", "Fp2"], 4, &records(), 2);
        let sig = EdfFileReader.read(&bytes).unwrap();

        assert_eq!(sig.channels(), &["Fp1".to_string(), "Fp2".to_string()]);
        assert_eq!(sig.sample_rate(), 4.0);
        assert_eq!(sig.num_samples(), 8);
        // gain 0.1 µV per digital unit, zero offset
        assert!((sig.data()[0][1] - 1.0).abs() < 1e-9);
        assert!((sig.data()[1][7] + 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_record_count_is_recovered() {
        let bytes = edf_bytes(&["Cz"], 4, &[vec![vec![1, 2, 3, 4]], vec![vec![5, 6, 7, 8]]], -1);
        let sig = EdfFileReader.read(&bytes).unwrap();
        assert_eq!(sig.num_samples(), 8);
    }

    #[test]
    fn test_annotations_are_skipped() {
        let recs = vec![vec![vec![1, 2, 3, 4], vec![0, 0, 0, 0]]];
        let bytes = edf_bytes(&["Cz", "EDF Annotations"], 4, &recs, 1);
        let sig = EdfFileReader.read(&bytes).unwrap();
        assert_eq!(sig.channels(), &["Cz".to_string()]);
    }

    #[test]
    fn test_truncated_payload_is_error() {
        let mut bytes = edf_bytes(&["Fp1", "Fp2"], 4, &records(), 2);
        bytes.truncate(bytes.len() - 5);
        assert!(EdfFileReader.read(&bytes).is_err());
        assert!(EdfFileReader.read(&bytes[..100]).is_err());
    }

    #[test]
    fn test_millivolt_signals_are_scaled_to_microvolts() {
        let bytes = edf_bytes_in(&["Fp1", "Fp2"], "mV", 4, &records(), 2);
        let sig = EdfFileReader.read(&bytes).unwrap();
        assert!((sig.data()[0][1] - 1000.0).abs() < 1e-6);

        let bytes = edf_bytes_in(&["Fp1", "Fp2"], "V", 4, &records(), 2);
        let sig = EdfFileReader.read(&bytes).unwrap();
        assert!((sig.data()[1][7] + 8.0e6).abs() < 1e-3);
    }
}
