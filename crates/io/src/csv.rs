// CSV/TSV import

use std::io::Read;
use std::path::Path;

use clcompare_engine::engine::load_csv_table;
use clcompare_engine::key::SPEC_NUMBER;
use clcompare_engine::Table;

pub fn import(path: &Path) -> Result<Table, String> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    import_from_string(&content, delimiter)
}

pub fn import_with_delimiter(path: &Path, delimiter: u8) -> Result<Table, String> {
    let content = read_file_as_utf8(path)?;
    import_from_string(&content, delimiter)
}

/// Separators CL exports are seen with, in tie-break order.
const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Pick the field separator of a CL export.
///
/// A header that splits into a `spec_number` field settles it. Failing that,
/// the separator giving the widest split that holds across the first lines wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let sample: Vec<&str> = content.lines().take(10).collect();
    let Some(header) = sample.first() else {
        return b',';
    };

    let keyed = DELIMITERS.into_iter().find(|&delim| {
        let fields = split_line(header, delim);
        fields.len() > 1 && fields.iter().any(|f| f.trim().eq_ignore_ascii_case(SPEC_NUMBER))
    });
    if let Some(delim) = keyed {
        return delim;
    }

    let mut best = (0usize, b',');
    for delim in DELIMITERS {
        let widths: Vec<usize> = sample.iter().map(|line| split_line(line, delim).len()).collect();
        let header_width = widths[0];
        if header_width <= 1 {
            continue;
        }
        let score = widths.iter().filter(|&&w| w == header_width).count() * header_width;
        if score > best.0 {
            best = (score, delim);
        }
    }
    best.1
}

/// Fields of one line under `delim`, honouring quotes.
fn split_line(line: &str, delim: u8) -> Vec<String> {
    csv::ReaderBuilder::new()
        .delimiter(delim)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes())
        .records()
        .next()
        .and_then(|r| r.ok())
        .map(|r| r.iter().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Read file and convert to UTF-8 if needed (Excel-exported CSVs are often Windows-1252)
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| format!("{}: {e}", path.display()))?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            log::debug!("{}: not UTF-8, decoding as Windows-1252", path.display());
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

fn import_from_string(content: &str, delimiter: u8) -> Result<Table, String> {
    load_csv_table(content, delimiter).map_err(|e| e.to_string())
}
