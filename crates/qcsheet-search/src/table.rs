use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::ops::RangeInclusive;

/// A scalar cell value as decoded from a register workbook.
///
/// Date cells are carried as their serial day number (`Number`), which is what the test log's
/// date slots are interpreted from.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Error(String),
}

impl CellValue {
    /// Text used both for matching and for search output.
    ///
    /// Values the registers treat as blank (empty text, `0`, `false`, `NaN`) render as `""`, so
    /// they never match a search and come back as empty target cells.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) if *n == 0.0 || n.is_nan() => String::new(),
            // `Display` for f64 prints integral values without a fractional part (45625, not
            // 45625.0), matching how the registers show them.
            CellValue::Number(n) => format!("{n}"),
            CellValue::Bool(true) => "true".to_string(),
            CellValue::Bool(false) => String::new(),
            CellValue::Error(e) => e.clone(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

/// Inclusive occupied range of a sheet, in absolute 0-based coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetRange {
    pub start: (u32, u32),
    pub end: (u32, u32),
}

impl SheetRange {
    pub fn rows(&self) -> RangeInclusive<u32> {
        self.start.0..=self.end.0
    }

    fn include(&mut self, row: u32, col: u32) {
        self.start = (self.start.0.min(row), self.start.1.min(col));
        self.end = (self.end.0.max(row), self.end.1.max(col));
    }
}

/// One worksheet: a sparse grid keyed by absolute `(row, col)`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    pub name: String,
    range: Option<SheetRange>,
    cells: HashMap<(u32, u32), CellValue>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            range: None,
            cells: HashMap::new(),
        }
    }

    /// Declared occupied range, or `None` for a sheet without any cells.
    pub fn range(&self) -> Option<SheetRange> {
        self.range
    }

    /// Override the declared range. Workbook parsers use this to keep the range the file
    /// declares even when it is wider than the stored cells.
    pub fn set_range(&mut self, range: Option<SheetRange>) {
        self.range = range;
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<&CellValue> {
        self.cells.get(&(row, col))
    }

    /// Insert a cell, widening the declared range to cover it.
    pub fn set_cell(&mut self, row: u32, col: u32, value: impl Into<CellValue>) {
        match self.range.as_mut() {
            Some(range) => range.include(row, col),
            None => {
                self.range = Some(SheetRange {
                    start: (row, col),
                    end: (row, col),
                })
            }
        }
        self.cells.insert((row, col), value.into());
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Stringified value at `(row, col)`, or `""` when absent.
    pub fn text(&self, row: u32, col: u32) -> String {
        self.cell(row, col).map(CellValue::to_text).unwrap_or_default()
    }
}

/// A decoded workbook: sheets in declared order. Never mutated after construction; a refresh
/// builds a new table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedTable {
    sheets: Vec<Sheet>,
}

impl ParsedTable {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(|s| s.name.as_str())
    }

    /// Rows whose `search_column` cell contains `search_value` (case-sensitive substring).
    ///
    /// Sheets are visited in declared order and rows top to bottom. An empty `search_value`
    /// matches every non-blank cell in the column.
    pub fn search(
        &self,
        search_value: &str,
        search_column: u32,
        target_columns: &[u32],
    ) -> Vec<SearchRow> {
        let mut results = Vec::new();
        for sheet in &self.sheets {
            let Some(range) = sheet.range() else {
                log::debug!("sheet `{}` is empty, skipping", sheet.name);
                continue;
            };

            for row in range.rows() {
                let Some(cell) = sheet.cell(row, search_column) else {
                    continue;
                };
                let text = cell.to_text();
                if text.is_empty() || !text.contains(search_value) {
                    continue;
                }

                let cells = target_columns
                    .iter()
                    .map(|&col| (col, sheet.text(row, col)))
                    .collect();
                results.push(SearchRow { cells });
            }
        }
        results
    }
}

/// One search hit: requested column index → stringified cell (`""` when absent).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct SearchRow {
    cells: BTreeMap<u32, String>,
}

impl SearchRow {
    pub fn get(&self, col: u32) -> &str {
        self.cells.get(&col).map(String::as_str).unwrap_or("")
    }

    pub fn columns(&self) -> impl Iterator<Item = (u32, &str)> {
        self.cells.iter().map(|(c, v)| (*c, v.as_str()))
    }
}

impl<S: Into<String>> FromIterator<(u32, S)> for SearchRow {
    fn from_iter<T: IntoIterator<Item = (u32, S)>>(iter: T) -> Self {
        Self {
            cells: iter.into_iter().map(|(c, v)| (c, v.into())).collect(),
        }
    }
}
