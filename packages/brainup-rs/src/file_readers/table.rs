//! Shared logic for tabular uploads (CSV and spreadsheets).

use super::{FileReaderError, FileResult};
use crate::channels::resolve_ambiguous;
use crate::types::SignalMatrix;

/// Rows of raw cells with the first row treated as the header row.
#[derive(Debug, Clone, Default)]
pub struct NumericTable {
    rows: Vec<Vec<String>>,
}

fn parse_cell(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        Some(f64::NAN)
    } else {
        cell.parse::<f64>().ok()
    }
}

impl NumericTable {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Keep the numeric columns and resolve their labels.
    ///
    /// A column is numeric when every data cell parses as a number or is
    /// blank (read as NaN); wholly blank columns are dropped.
    pub fn into_signal(self, sample_rate: f64) -> FileResult<SignalMatrix> {
        let mut rows = self
            .rows
            .into_iter()
            .filter(|row| row.iter().any(|c| !c.trim().is_empty()));

        let header = rows
            .next()
            .ok_or_else(|| FileReaderError::InvalidData("table is empty".to_string()))?;
        let body: Vec<Vec<String>> = rows.collect();

        if let Some((idx, row)) = body.iter().enumerate().find(|(_, r)| r.len() < header.len()) {
            return Err(FileReaderError::Parse(format!(
                "row {} has {} cells, header has {}",
                idx + 2,
                row.len(),
                header.len()
            )));
        }

        let numeric: Vec<usize> = (0..header.len())
            .filter(|&col| {
                body.iter().all(|row| parse_cell(&row[col]).is_some())
                    && (body.iter().any(|row| !row[col].trim().is_empty())
                        || (body.is_empty() && parse_cell(&header[col]).is_some()))
            })
            .collect();

        if numeric.is_empty() {
            return Err(FileReaderError::InvalidData(
                "no numeric columns found".to_string(),
            ));
        }

        let kept_headers: Vec<String> = numeric.iter().map(|&c| header[c].clone()).collect();
        let resolution = resolve_ambiguous(&kept_headers);

        let mut data: Vec<Vec<f64>> = numeric
            .iter()
            .map(|_| Vec::with_capacity(body.len() + 1))
            .collect();

        if resolution.header_is_data {
            for (column, &c) in data.iter_mut().zip(&numeric) {
                column.push(parse_cell(&header[c]).unwrap_or(f64::NAN));
            }
        }
        for row in &body {
            for (column, &c) in data.iter_mut().zip(&numeric) {
                column.push(parse_cell(&row[c]).unwrap_or(f64::NAN));
            }
        }

        log::debug!(
            "Table: kept {} of {} columns, header {} data",
            numeric.len(),
            header.len(),
            if resolution.header_is_data { "is" } else { "is not" }
        );

        SignalMatrix::new(resolution.labels, sample_rate, data)
            .map_err(|e| FileReaderError::InvalidData(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[&[&str]]) -> NumericTable {
        NumericTable::new(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_labelled_header() {
        let sig = table(&[&["Fp1", "Fp2"], &["1", "2"], &["3", "4"]])
            .into_signal(256.0)
            .unwrap();
        assert_eq!(sig.channels(), &["Fp1".to_string(), "Fp2".to_string()]);
        assert_eq!(sig.data()[1], vec![2.0, 4.0]);
        assert_eq!(sig.sample_rate(), 256.0);
    }

    #[test]
    fn test_numeric_header_becomes_data() {
        let sig = table(&[&["1", "2", "3"], &["4", "5", "6"]])
            .into_signal(256.0)
            .unwrap();
        assert_eq!(sig.channels(), &["0".to_string(), "1".to_string(), "2".to_string()]);
        assert_eq!(sig.num_samples(), 2);
        assert_eq!(sig.data()[0], vec![1.0, 4.0]);
    }

    #[test]
    fn test_non_numeric_columns_dropped() {
        let sig = table(&[&["time", "Cz", "note"], &["0.0", "1.5", "ok"], &["0.1", "2.5", "ok"]])
            .into_signal(256.0)
            .unwrap();
        assert_eq!(sig.channels(), &["time".to_string(), "Cz".to_string()]);
    }

    #[test]
    fn test_blank_cells_are_nan() {
        let sig = table(&[&["A", "B"], &["1", ""], &["2", "3"]])
            .into_signal(100.0)
            .unwrap();
        assert!(sig.data()[1][0].is_nan());
        assert_eq!(sig.data()[1][1], 3.0);
    }

    #[test]
    fn test_short_row_is_error() {
        let err = table(&[&["A", "B"], &["1"]]).into_signal(100.0);
        assert!(matches!(err, Err(FileReaderError::Parse(_))));
    }

    #[test]
    fn test_empty_table_is_error() {
        assert!(table(&[]).into_signal(100.0).is_err());
        assert!(table(&[&["a", "b"], &["x", "y"]]).into_signal(100.0).is_err());
    }
}
