use super::{FileReaderError, FileResult, FormatReader, NumericTable};
use crate::types::SignalMatrix;

/// CSV File Reader
///
/// Delimited text with an optional header row. CSV carries no timing, so
/// the configured tabular sample rate applies.
pub struct CsvFileReader {
    sample_rate: f64,
}

impl CsvFileReader {
    pub fn new(sample_rate: f64) -> Self {
        Self { sample_rate }
    }
}

impl FormatReader for CsvFileReader {
    fn read(&self, bytes: &[u8]) -> FileResult<SignalMatrix> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let mut table = NumericTable::default();
        for record in reader.records() {
            let record = record?;
            table.push_row(record.iter().map(str::to_string).collect());
        }

        table.into_signal(self.sample_rate).map_err(|e| match e {
            FileReaderError::InvalidData(msg) => FileReaderError::InvalidData(format!("CSV: {}", msg)),
            other => other,
        })
    }

    fn format_name(&self) -> &str {
        "CSV"
    }
}
