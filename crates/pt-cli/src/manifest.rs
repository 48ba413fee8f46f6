//! GenPipes manifest files
//!
//! Digest responses are lists of JSON objects; each object becomes one row of
//! a readset file (TSV, with header) or a pair file (CSV, no header).

use crate::error::{CliError, Result};
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Readset file columns, in GenPipes order
pub const READSET_HEADER: [&str; 13] = [
    "Sample",
    "Readset",
    "LibraryType",
    "RunType",
    "Run",
    "Lane",
    "Adapter1",
    "Adapter2",
    "QualityOffset",
    "BED",
    "FASTQ1",
    "FASTQ2",
    "BAM",
];

/// Pair file columns
pub const PAIR_HEADER: [&str; 3] = ["Patient", "Sample_N", "Sample_T"];

/// Kind of manifest written from a digest response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    Readset,
    Pair,
}

impl ManifestKind {
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Self::Readset => &READSET_HEADER,
            Self::Pair => &PAIR_HEADER,
        }
    }

    fn delimiter(&self) -> u8 {
        match self {
            Self::Readset => b'\t',
            Self::Pair => b',',
        }
    }

    fn has_header(&self) -> bool {
        matches!(self, Self::Readset)
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Readset => "Readset",
            Self::Pair => "Pair",
        }
    }

    /// Write `rows` to `writer`, returning how many rows were written.
    ///
    /// Missing keys give empty cells; keys outside the columns are ignored.
    pub fn write<W: Write>(&self, rows: &Value, writer: W) -> Result<usize> {
        let rows = rows
            .as_array()
            .ok_or_else(|| CliError::bad_request(format!("expected a list of rows, got {}", rows)))?;

        let mut out = csv::WriterBuilder::new()
            .delimiter(self.delimiter())
            .has_headers(false)
            .from_writer(writer);

        if self.has_header() {
            out.write_record(self.columns())?;
        }

        for row in rows {
            out.write_record(self.cells(row)?)?;
        }
        out.flush()?;

        Ok(rows.len())
    }

    /// Write `rows` to a file at `path`
    pub fn save(&self, rows: &Value, path: &Path) -> Result<usize> {
        let file = std::fs::File::create(path)?;
        let count = self.write(rows, std::io::BufWriter::new(file))?;
        info!("{} file written to {}", self.label(), path.display());
        Ok(count)
    }

    fn cells(&self, row: &Value) -> Result<Vec<String>> {
        let object = row
            .as_object()
            .ok_or_else(|| CliError::bad_request(format!("expected an object per row, got {}", row)))?;

        Ok(self
            .columns()
            .iter()
            .map(|column| object.get(*column).map(cell).unwrap_or_default())
            .collect())
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
