//! Header-addressed access to the reference CSV tables.

use std::str::FromStr;

use csv::StringRecord;

use crate::error::ReconError;

/// A CSV table read fully into memory, addressed by column name.
pub struct CsvTable {
    name: String,
    headers: Vec<String>,
    records: Vec<StringRecord>,
}

impl CsvTable {
    /// `name` is only used in error messages.
    pub fn parse(name: &str, csv_data: &str) -> Result<Self, ReconError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(csv_data.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect();

        let records = reader.records().collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: name.to_string(),
            headers,
            records,
        })
    }

    pub fn column(&self, column: &str) -> Result<usize, ReconError> {
        self.headers.iter().position(|h| h == column).ok_or_else(|| {
            ReconError::MissingColumn {
                file: self.name.clone(),
                column: column.into(),
            }
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.records.iter().enumerate().map(move |(i, record)| Row {
            table: self,
            // 1-based, counting the header line
            line: i + 2,
            record,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub struct Row<'a> {
    table: &'a CsvTable,
    line: usize,
    record: &'a StringRecord,
}

impl Row<'_> {
    /// Trimmed cell text; missing trailing cells read as empty.
    pub fn text(&self, idx: usize) -> &str {
        self.record.get(idx).unwrap_or("").trim()
    }

    /// Parse a numeric cell. Spreadsheet exports sometimes write integers
    /// as `101.0`, which is accepted.
    pub fn parse<T: FromStr>(&self, idx: usize) -> Result<T, ReconError> {
        let raw = self.text(idx);
        let digits = raw.strip_suffix(".0").unwrap_or(raw);
        digits.parse().map_err(|_| ReconError::FieldParse {
            file: self.table.name.clone(),
            row: self.line,
            column: self.table.headers.get(idx).cloned().unwrap_or_default(),
            value: raw.into(),
        })
    }
}
