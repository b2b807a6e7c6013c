//! Column tables written as CSV.
//!
//! Layout:
//!
//! ```text
//! # Diramics 2F200 IV Curve
//! VDS (V),VGS=-0.200,VGS=-0.150
//! 0,0.0012,0.0031
//! 0.01,0.0101,0.0248
//! ```
//!
//! Values use the shortest representation that parses back to the same
//! `f64`.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::analysis::MeasurementMatrix;
use crate::error::{AppResult, BenchError};

/// An axis column followed by one column per series.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvTable {
    /// Text of the leading `#` comment line
    pub description: String,
    /// Header of the first column
    pub axis_label: String,
    /// First column values
    pub axis: Vec<f64>,
    /// Headers of the data columns
    pub labels: Vec<String>,
    /// Data columns, each as long as `axis`
    pub columns: Vec<Vec<f64>>,
}

impl CsvTable {
    /// Table from explicit columns; every column must match the axis length.
    pub fn new(
        description: impl Into<String>,
        axis_label: impl Into<String>,
        axis: Vec<f64>,
        labels: Vec<String>,
        columns: Vec<Vec<f64>>,
    ) -> AppResult<Self> {
        if labels.len() != columns.len() {
            return Err(BenchError::ShapeMismatch {
                expected: columns.len(),
                found: labels.len(),
            });
        }
        if let Some(column) = columns.iter().find(|c| c.len() != axis.len()) {
            return Err(BenchError::ShapeMismatch {
                expected: axis.len(),
                found: column.len(),
            });
        }
        Ok(Self {
            description: description.into(),
            axis_label: axis_label.into(),
            axis,
            labels,
            columns,
        })
    }

    /// One column per matrix series, rows along `axis`.
    pub fn from_matrix(
        description: impl Into<String>,
        axis_label: impl Into<String>,
        axis: &[f64],
        labels: Vec<String>,
        matrix: &MeasurementMatrix,
    ) -> AppResult<Self> {
        let columns = matrix.iter_series().map(<[f64]>::to_vec).collect();
        Self::new(description, axis_label, axis.to_vec(), labels, columns)
    }

    /// Number of data rows.
    pub fn rows(&self) -> usize {
        self.axis.len()
    }

    /// Write to `path`, creating the parent directory if needed.
    pub fn write(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        writeln!(file, "# {}", self.description)?;

        let mut writer = csv::Writer::from_writer(file);
        let mut header = Vec::with_capacity(self.labels.len() + 1);
        header.push(self.axis_label.as_str());
        header.extend(self.labels.iter().map(String::as_str));
        writer.write_record(&header)?;

        for (row, x) in self.axis.iter().enumerate() {
            let mut record = Vec::with_capacity(self.columns.len() + 1);
            record.push(x.to_string());
            record.extend(self.columns.iter().map(|c| c[row].to_string()));
            writer.write_record(&record)?;
        }
        writer.flush()?;

        info!(path = %path.display(), rows = self.rows(), columns = self.columns.len(), "CSV written");
        Ok(())
    }

    /// Read a table written by [`CsvTable::write`].
    pub fn read(path: &Path) -> AppResult<Self> {
        let text = fs::read_to_string(path)?;
        let description = text
            .lines()
            .next()
            .and_then(|line| line.strip_prefix('#'))
            .map(|d| d.trim().to_string())
            .unwrap_or_default();

        let mut reader = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .from_reader(text.as_bytes());
        let headers = reader.headers()?.clone();
        let mut names = headers.iter();
        let axis_label = names
            .next()
            .ok_or_else(|| BenchError::Parse(format!("{}: missing header", path.display())))?
            .to_string();
        let labels: Vec<String> = names.map(str::to_string).collect();

        let mut axis = Vec::new();
        let mut columns = vec![Vec::new(); labels.len()];
        for record in reader.records() {
            let record = record?;
            let mut fields = record.iter().map(|field| {
                field.trim().parse::<f64>().map_err(|e| {
                    BenchError::Parse(format!("{}: '{}': {}", path.display(), field, e))
                })
            });
            if let Some(x) = fields.next() {
                axis.push(x?);
            }
            for column in columns.iter_mut() {
                let value = fields.next().ok_or_else(|| {
                    BenchError::Parse(format!("{}: short row", path.display()))
                })??;
                column.push(value);
            }
        }

        Self::new(description, axis_label, axis, labels, columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_preserves_values_and_labels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("table.csv");
        let table = CsvTable::new(
            "Diramics 2F200 IV Curve",
            "VDS (V)",
            vec![0.0, 0.01, 0.1 + 0.2],
            vec!["VGS=-0.200".to_string(), "VGS=-0.150".to_string()],
            vec![vec![1e-3, 2.5e-3, -3.75e-7], vec![0.0, 1.0 / 3.0, 12.5]],
        )
        .unwrap();

        table.write(&path).unwrap();
        let back = CsvTable::read(&path).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.csv");
        CsvTable::new(
            "amp TEFF",
            "Frequency (Hz)",
            vec![1e9, 2e9],
            vec!["TEFF".to_string()],
            vec![vec![290.11, 288.03]],
        )
        .unwrap()
        .write(&path)
        .unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "# amp TEFF",
                "Frequency (Hz),TEFF",
                "1000000000,290.11",
                "2000000000,288.03"
            ]
        );
    }

    #[test]
    fn test_ragged_columns_rejected() {
        let result = CsvTable::new(
            "x",
            "x",
            vec![0.0, 1.0],
            vec!["a".to_string()],
            vec![vec![1.0]],
        );
        assert!(matches!(result, Err(BenchError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_from_matrix_uses_series_as_columns() {
        let matrix = MeasurementMatrix::from_flat(vec![1.0, 2.0, 3.0, 4.0], 2, 2).unwrap();
        let table = CsvTable::from_matrix(
            "d",
            "VDS (V)",
            &[0.0, 1.0],
            vec!["VGS=0.000".to_string(), "VGS=0.100".to_string()],
            &matrix,
        )
        .unwrap();
        assert_eq!(table.columns, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }
}
