// File I/O operations

pub mod csv;
pub mod json;
pub mod xlsx;

use std::path::Path;

use clcompare_engine::Table;

/// Extensions read through the spreadsheet importer.
pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb", "ods"];

/// Load one input file as a [`Table`], dispatching on its extension.
///
/// `.tsv` is always tab-separated; `.csv`, `.txt` and anything unknown are
/// sniffed for their delimiter.
pub fn load_table(path: &Path) -> Result<Table, String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let table = if SPREADSHEET_EXTENSIONS.contains(&ext.as_str()) {
        xlsx::import_table(path)?
    } else if ext == "tsv" {
        csv::import_with_delimiter(path, b'\t')?
    } else {
        csv::import(path)?
    };

    log::debug!(
        "loaded {}: {} columns, {} rows",
        path.display(),
        table.headers.len(),
        table.len()
    );
    Ok(table)
}
