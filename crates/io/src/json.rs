// JSON export

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use clcompare_engine::CompareResult;

/// Write the full comparison result as pretty-printed JSON.
pub fn export(result: &CompareResult, path: &Path) -> Result<(), String> {
    let file = File::create(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, result).map_err(|e| e.to_string())?;
    Ok(())
}
