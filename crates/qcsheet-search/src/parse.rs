use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use thiserror::Error;

use crate::table::{CellValue, ParsedTable, Sheet, SheetRange};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("workbook has no sheets")]
    NoSheets,
    #[error("malformed workbook: {0}")]
    Malformed(#[from] calamine::Error),
    #[error("failed to read sheet `{sheet}`: {source}")]
    Sheet {
        sheet: String,
        #[source]
        source: calamine::Error,
    },
}

/// Decodes raw workbook bytes into a [`ParsedTable`].
///
/// Parsing is CPU-bound; the engine runs it on the blocking pool.
pub trait TableParser: Send + Sync + 'static {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedTable, ParseError>;
}

/// Spreadsheet container parser backed by `calamine` (xlsx, xlsm, xlsb, xls, ods).
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxParser;

impl TableParser for XlsxParser {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedTable, ParseError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
        let names = workbook.sheet_names().to_owned();
        if names.is_empty() {
            return Err(ParseError::NoSheets);
        }

        let mut sheets = Vec::with_capacity(names.len());
        for name in names {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|source| ParseError::Sheet {
                    sheet: name.clone(),
                    source,
                })?;

            let mut sheet = Sheet::new(name);
            let Some(start) = range.start() else {
                sheets.push(sheet);
                continue;
            };

            for (row, col, value) in range.used_cells() {
                let Some(value) = convert(value) else {
                    continue;
                };
                sheet.set_cell(start.0 + row as u32, start.1 + col as u32, value);
            }
            if let Some(end) = range.end() {
                sheet.set_range(Some(SheetRange { start, end }));
            }
            sheets.push(sheet);
        }

        Ok(ParsedTable::new(sheets))
    }
}

fn convert(value: &Data) -> Option<CellValue> {
    match value {
        Data::Empty => None,
        Data::String(s) => Some(CellValue::Text(s.clone())),
        Data::Float(f) => Some(CellValue::Number(*f)),
        Data::Int(i) => Some(CellValue::Number(*i as f64)),
        Data::Bool(b) => Some(CellValue::Bool(*b)),
        Data::DateTime(dt) => Some(CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(CellValue::Text(s.clone())),
        Data::Error(e) => {
            log::warn!("cell error value {e}");
            Some(CellValue::Error(e.to_string()))
        }
    }
}
