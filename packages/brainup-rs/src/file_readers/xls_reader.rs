use super::{FileReaderError, FileResult, FormatReader, NumericTable};
use crate::types::SignalMatrix;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;

/// Excel workbook reader (.xls / .xlsx). Only the first worksheet is read.
pub struct XlsFileReader {
    sample_rate: f64,
}

impl XlsFileReader {
    pub fn new(sample_rate: f64) -> Self {
        Self { sample_rate }
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Float(v) => v.to_string(),
        Data::Int(v) => v.to_string(),
        other => other.to_string(),
    }
}

impl FormatReader for XlsFileReader {
    fn read(&self, bytes: &[u8]) -> FileResult<SignalMatrix> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| FileReaderError::Spreadsheet(e.to_string()))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| FileReaderError::InvalidData("workbook has no worksheets".to_string()))?
            .map_err(|e| FileReaderError::Spreadsheet(e.to_string()))?;

        log::debug!("Worksheet range: {:?}", range.get_size());

        let rows = range
            .rows()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();

        NumericTable::new(rows).into_signal(self.sample_rate)
    }

    fn format_name(&self) -> &str {
        "Excel"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Empty), "");
        assert_eq!(cell_text(&Data::Float(1.5)), "1.5");
        assert_eq!(cell_text(&Data::Int(-3)), "-3");
        assert_eq!(cell_text(&Data::String("Cz".into())), "Cz");
    }

    #[test]
    fn test_garbage_is_rejected() {
        let err = XlsFileReader::new(256.0).read(b"definitely not a workbook");
        assert!(matches!(err, Err(FileReaderError::Spreadsheet(_))));
    }

    #[test]
    fn test_reads_first_worksheet() {
        let bytes = include_bytes!("../../tests/fixtures/recording.xlsx");
        let sig = XlsFileReader::new(128.0).read(bytes).unwrap();

        assert_eq!(sig.channels(), &["Fz".to_string(), "Cz".to_string(), "Pz".to_string()]);
        assert_eq!(sig.sample_rate(), 128.0);
        assert_eq!(sig.num_samples(), 4);
        assert_eq!(sig.data()[0], vec![1.0, 4.0, 7.0, 10.0]);
        assert_eq!(sig.data()[1][3], 11.5);
        assert_eq!(sig.data()[2][0], -3.0);
    }
}
