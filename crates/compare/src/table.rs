use serde::Serialize;

use crate::error::CompareError;
use crate::model::CellValue;

static EMPTY_CELL: CellValue = CellValue::Empty;

/// Generic in-memory table: ordered headers plus rows of cells.
///
/// Column order is preserved exactly as read; the value blocks are located
/// by position relative to an anchor header, so nothing here may reorder.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Build a table, renaming repeated headers `name.1`, `name.2`, ...
    pub fn new(headers: Vec<String>) -> Self {
        let mut seen: Vec<String> = Vec::with_capacity(headers.len());
        for header in headers {
            let mut name = header.clone();
            let mut n = 1;
            while seen.contains(&name) {
                name = format!("{header}.{n}");
                n += 1;
            }
            seen.push(name);
        }
        Self { headers: seen, rows: Vec::new() }
    }

    /// Append a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut row: Vec<CellValue>) {
        row.resize(self.headers.len(), CellValue::Empty);
        self.rows.push(row);
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Parse delimited text with a header row. Fields stay text; numeric
    /// coercion happens after the merge.
    pub fn from_csv_str(data: &str, delimiter: u8) -> Result<Table, CompareError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(data.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| CompareError::Io(e.to_string()))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut table = Table::new(headers);
        for record in reader.records() {
            let record = record.map_err(|e| CompareError::Io(e.to_string()))?;
            let row = record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::Text(field.to_string())
                    }
                })
                .collect();
            table.push_row(row);
        }

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_csv_keeps_column_order() {
        let csv = "spec_number,cm_summary,b,c,limits,x,y\n100,1,2,3,0,5,10\n";
        let table = Table::from_csv_str(csv, b',').unwrap();
        assert_eq!(table.headers, vec!["spec_number", "cm_summary", "b", "c", "limits", "x", "y"]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.cell(0, 4), &CellValue::Text("0".into()));
    }

    #[test]
    fn short_rows_are_padded() {
        let csv = "a,b,c\n1\n";
        let table = Table::from_csv_str(csv, b',').unwrap();
        assert_eq!(table.rows[0].len(), 3);
        assert!(table.cell(0, 2).is_empty());
        assert!(table.cell(5, 5).is_empty());
    }

    #[test]
    fn duplicate_headers_are_suffixed() {
        let table = Table::new(vec!["a".into(), "a".into(), "a".into()]);
        assert_eq!(table.headers, vec!["a", "a.1", "a.2"]);
    }

    #[test]
    fn bom_is_stripped_from_first_header() {
        let table = Table::from_csv_str("\u{feff}spec_number,x\n1,2\n", b',').unwrap();
        assert_eq!(table.column_index("spec_number"), Some(0));
    }
}
