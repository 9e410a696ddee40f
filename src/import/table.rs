//! Uploaded spreadsheet or CSV reduced to a header row and string cells.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use tracing::debug;

use crate::error::{AppError, AppResult};

const SPREADSHEET_MIMES: [&str; 3] = [
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-excel",
    "application/vnd.oasis.opendocument.spreadsheet",
];

const SPREADSHEET_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xls", "ods"];

/// First sheet of an uploaded file. Every row has `headers.len()` cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .filter(|row| row.iter().any(|c| !c.trim().is_empty()))
            .collect();
        Self { headers, rows }
    }

    /// Parse a spreadsheet (xlsx, xls, ods) or CSV from raw bytes.
    ///
    /// The format comes from the content; the filename extension is only a
    /// hint for containers the sniffer reports as plain zip.
    pub fn from_bytes(bytes: &[u8], filename: Option<&str>) -> AppResult<Self> {
        let sniffed = infer::get(bytes).map(|t| t.mime_type());
        let extension = filename
            .and_then(|f| f.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase());
        let spreadsheet = match sniffed {
            Some(mime) if SPREADSHEET_MIMES.contains(&mime) => true,
            Some("application/zip") | Some("application/x-ole-storage") | None => extension
                .as_deref()
                .is_some_and(|ext| SPREADSHEET_EXTENSIONS.contains(&ext)),
            Some(_) => false,
        };
        debug!(
            "Reading upload {:?} as {} (sniffed {:?})",
            filename,
            if spreadsheet { "spreadsheet" } else { "csv" },
            sniffed
        );

        let table = if spreadsheet {
            Self::from_spreadsheet(bytes)?
        } else {
            Self::from_csv(bytes)?
        };
        if table.headers.iter().all(|h| h.trim().is_empty()) {
            return Err(AppError::InputFormat(
                "Uploaded file has no header row".to_string(),
            ));
        }
        Ok(table)
    }

    fn from_spreadsheet(bytes: &[u8]) -> AppResult<Self> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| AppError::InputFormat(format!("Unreadable spreadsheet: {}", e)))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| AppError::InputFormat("Spreadsheet has no sheets".to_string()))?
            .map_err(|e| AppError::InputFormat(format!("Unreadable sheet: {}", e)))?;

        let mut rows = range
            .rows()
            .map(|row| row.iter().map(cell_text).collect::<Vec<String>>());
        let headers = rows.next().unwrap_or_default();
        Ok(Self::new(headers, rows.collect()))
    }

    fn from_csv(bytes: &[u8]) -> AppResult<Self> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(true)
            .from_reader(bytes);

        let headers = reader
            .headers()
            .map_err(|e| AppError::InputFormat(format!("Unreadable CSV header: {}", e)))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record =
                record.map_err(|e| AppError::InputFormat(format!("Unreadable CSV row: {}", e)))?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self::new(headers, rows))
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Render a cell the way it reads in the sheet: whole numbers lose the `.0`.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}
