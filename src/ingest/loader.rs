// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Edaflow-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Edaflow and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Reader as _};

use crate::model::{Column, Table, TableError};

/// Cell spellings read as missing values (the usual spreadsheet/pandas set).
const NULL_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Turns an uploaded file into a [`Table`].
pub trait TabularLoader: Send + Sync {
    fn load(&self, filename: &str, payload: &[u8]) -> Result<Table, LoadError>;
}

#[derive(Debug)]
pub enum LoadError {
    UnsupportedFormat { filename: String },
    EmptyInput,
    NoColumns,
    Csv { source: csv::Error },
    Workbook { source: calamine::Error },
    NoSheets,
    RaggedRow { line: u64, expected: usize, found: usize },
    Table { source: TableError },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedFormat { filename } => write!(
                f,
                "unsupported file type for {filename:?} (expected .csv, .tsv, .txt, .xlsx, .xls or .ods)"
            ),
            Self::EmptyInput => f.write_str("file contains no data"),
            Self::NoColumns => f.write_str("file has no header row"),
            Self::Csv { source } => write!(f, "cannot parse CSV: {source}"),
            Self::Workbook { source } => write!(f, "cannot read workbook: {source}"),
            Self::NoSheets => f.write_str("workbook has no worksheets"),
            Self::RaggedRow {
                line,
                expected,
                found,
            } => write!(f, "line {line} has {found} fields, expected at most {expected}"),
            Self::Table { source } => write!(f, "inconsistent table: {source}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Csv { source } => Some(source),
            Self::Workbook { source } => Some(source),
            Self::Table { source } => Some(source),
            _ => None,
        }
    }
}

impl From<csv::Error> for LoadError {
    fn from(source: csv::Error) -> Self {
        Self::Csv { source }
    }
}

impl From<calamine::Error> for LoadError {
    fn from(source: calamine::Error) -> Self {
        Self::Workbook { source }
    }
}

fn extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// Picks [`CsvLoader`] or [`ExcelLoader`] from the upload's file extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct UploadLoader;

impl TabularLoader for UploadLoader {
    fn load(&self, filename: &str, payload: &[u8]) -> Result<Table, LoadError> {
        match extension(filename).as_deref() {
            Some(ext) if ExcelLoader::EXTENSIONS.contains(&ext) => {
                ExcelLoader.load(filename, payload)
            }
            _ => CsvLoader.load(filename, payload),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Windows1252,
}

/// Decodes uploaded text, falling back to Windows-1252 when the bytes are not valid UTF-8.
///
/// Detection never fails: a wrong guess yields mojibake in labels, not a rejected upload.
pub fn decode_text(bytes: &[u8]) -> (Cow<'_, str>, TextEncoding) {
    if let Some(rest) = bytes.strip_prefix(b"\xEF\xBB\xBF") {
        return (String::from_utf8_lossy(rest), TextEncoding::Utf8);
    }
    if let Some(rest) = bytes.strip_prefix(b"\xFF\xFE") {
        return (Cow::Owned(decode_utf16(rest, u16::from_le_bytes)), TextEncoding::Utf16Le);
    }
    if let Some(rest) = bytes.strip_prefix(b"\xFE\xFF") {
        return (Cow::Owned(decode_utf16(rest, u16::from_be_bytes)), TextEncoding::Utf16Be);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => (Cow::Borrowed(text), TextEncoding::Utf8),
        Err(_) => (
            Cow::Owned(bytes.iter().map(|&byte| windows_1252_char(byte)).collect()),
            TextEncoding::Windows1252,
        ),
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let units = bytes.chunks_exact(2).map(|pair| unit([pair[0], pair[1]]));
    char::decode_utf16(units)
        .map(|ch| ch.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

fn windows_1252_char(byte: u8) -> char {
    const HIGH: [char; 32] = [
        '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}',
        '\u{2021}', '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}',
        '\u{017D}', '\u{008F}', '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}',
        '\u{2022}', '\u{2013}', '\u{2014}', '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}',
        '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
    ];
    match byte {
        0x80..=0x9F => HIGH[usize::from(byte - 0x80)],
        _ => char::from(byte),
    }
}

/// Delimited-text loader. The delimiter is picked from the file extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvLoader;

impl CsvLoader {
    fn delimiter_for(filename: &str) -> Option<u8> {
        match extension(filename)?.as_str() {
            "csv" | "txt" => Some(b','),
            "tsv" | "tab" => Some(b'\t'),
            _ => None,
        }
    }
}

impl TabularLoader for CsvLoader {
    fn load(&self, filename: &str, payload: &[u8]) -> Result<Table, LoadError> {
        let delimiter = Self::delimiter_for(filename).ok_or_else(|| LoadError::UnsupportedFormat {
            filename: filename.to_owned(),
        })?;

        let (text, encoding) = decode_text(payload);
        if encoding != TextEncoding::Utf8 {
            tracing::debug!(?encoding, filename, "upload is not UTF-8, using fallback decoding");
        }
        if text.trim().is_empty() {
            return Err(LoadError::EmptyInput);
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let raw_headers = reader.headers()?.iter().map(str::to_owned).collect::<Vec<_>>();
        let headers = column_names(&raw_headers);
        if headers.is_empty() {
            return Err(LoadError::NoColumns);
        }

        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        for record in reader.records() {
            let record = record?;
            if record.len() > headers.len() {
                return Err(LoadError::RaggedRow {
                    line: record.position().map_or(0, |pos| pos.line()),
                    expected: headers.len(),
                    found: record.len(),
                });
            }
            // Short rows are padded with missing values.
            for (index, column) in cells.iter_mut().enumerate() {
                column.push(record.get(index).and_then(cell_value));
            }
        }

        let columns = headers
            .into_iter()
            .zip(cells)
            .map(|(name, values)| infer_column(name, values))
            .collect();
        Table::new(columns).map_err(|source| LoadError::Table { source })
    }
}

fn cell_value(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if NULL_TOKENS.contains(&trimmed) {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

/// Spreadsheet loader for the first worksheet of a workbook. The first row holds the headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExcelLoader;

impl ExcelLoader {
    pub const EXTENSIONS: &'static [&'static str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];
}

impl TabularLoader for ExcelLoader {
    fn load(&self, filename: &str, payload: &[u8]) -> Result<Table, LoadError> {
        if payload.is_empty() {
            return Err(LoadError::EmptyInput);
        }
        let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(payload))?;
        let range = workbook.worksheet_range_at(0).ok_or(LoadError::NoSheets)??;
        tracing::debug!(filename, rows = range.height(), columns = range.width(), "read worksheet");

        let mut rows = range.rows();
        let Some(header_row) = rows.next() else {
            return Err(LoadError::EmptyInput);
        };
        let raw_headers = header_row.iter().map(|cell| cell.to_string()).collect::<Vec<_>>();
        let headers = column_names(&raw_headers);
        if headers.is_empty() {
            return Err(LoadError::NoColumns);
        }

        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        for row in rows {
            for (index, column) in cells.iter_mut().enumerate() {
                column.push(row.get(index).and_then(sheet_cell_value));
            }
        }

        let columns = headers
            .into_iter()
            .zip(cells)
            .map(|(name, values)| infer_column(name, values))
            .collect();
        Table::new(columns).map_err(|source| LoadError::Table { source })
    }
}

fn sheet_cell_value(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::Int(value) => Some(value.to_string()),
        Data::Float(value) => Some(value.to_string()),
        Data::Bool(value) => Some(if *value { "True" } else { "False" }.to_owned()),
        // Serial day number, as stored in the sheet.
        Data::DateTime(value) => Some(value.as_f64().to_string()),
        Data::String(text) => cell_value(text),
        other => cell_value(&other.to_string()),
    }
}

fn column_names(headers: &[String]) -> Vec<String> {
    if headers.len() == 1 && headers[0].trim().is_empty() {
        return Vec::new();
    }

    let mut seen: HashMap<String, usize> = HashMap::new();
    headers
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            let base = match raw.trim() {
                "" => format!("Unnamed: {index}"),
                name => name.to_owned(),
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 {
                base
            } else {
                format!("{base}.{count}")
            };
            *count += 1;
            name
        })
        .collect()
}

/// A column is numeric when every present cell parses as a float. A column with no present
/// cells counts as numeric, matching how spreadsheet tools type an all-blank column.
fn infer_column(name: String, values: Vec<Option<String>>) -> Column {
    let numbers = values
        .iter()
        .map(|value| match value {
            Some(raw) => raw.parse::<f64>().ok().map(Some),
            None => Some(None),
        })
        .collect::<Option<Vec<Option<f64>>>>();

    match numbers {
        Some(numbers) => Column::numeric(name, numbers),
        None => Column::text(name, values),
    }
}
