//! Column Mapper: positional discovery of the 3-wide value blocks.
//!
//! A block is "the columns starting at a named anchor", read in a fixed
//! field order. The source files do not label these columns themselves.

use serde::{Deserialize, Serialize};

use crate::error::CompareError;
use crate::model::{Bound, Bounds, CellValue};
use crate::table::Table;

/// Label used for the reference file's limits block.
pub const LIMITS_LABEL: &str = "Limits1";

/// Default anchor of the measured (CL) value block.
pub const DEFAULT_VALUE_ANCHOR: &str = "cm_summary";

/// Default anchor of the limits block.
pub const DEFAULT_LIMITS_ANCHOR: &str = "limits";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BlockSpec {
    pub anchor: String,
    #[serde(default = "default_fields")]
    pub fields: Vec<Bound>,
}

fn default_fields() -> Vec<Bound> {
    Bound::ALL.to_vec()
}

impl BlockSpec {
    pub fn new(anchor: impl Into<String>) -> Self {
        Self { anchor: anchor.into(), fields: default_fields() }
    }

    pub fn width(&self) -> usize {
        self.fields.len()
    }

    /// Fields must be a permutation of Minimum/Typical/Maximum.
    pub fn validate(&self) -> Result<(), CompareError> {
        if self.anchor.trim().is_empty() {
            return Err(CompareError::ConfigValidation("block anchor must not be empty".into()));
        }
        let complete = self.fields.len() == 3
            && Bound::ALL.iter().all(|b| self.fields.contains(b));
        if !complete {
            return Err(CompareError::ConfigValidation(format!(
                "block \"{}\": fields must list minimum, typical and maximum exactly once",
                self.anchor
            )));
        }
        Ok(())
    }
}

/// A located block: source column index per bound, plus its canonical label.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedBlock {
    pub label: String,
    pub columns: Bounds<usize>,
    pub source_headers: Vec<String>,
}

impl MappedBlock {
    pub fn canonical_name(&self, bound: Bound) -> String {
        bound.column(&self.label)
    }

    pub fn read(&self, row: &[CellValue]) -> Bounds<CellValue> {
        self.columns.map(|_, &col| row.get(col).cloned().unwrap_or_default())
    }
}

/// Locate `spec` in `table` and name it under `label`.
///
/// `file` describes the input for error messages.
pub fn map_block(
    table: &Table,
    spec: &BlockSpec,
    label: &str,
    file: &str,
) -> Result<MappedBlock, CompareError> {
    let start = table
        .column_index(&spec.anchor)
        .ok_or_else(|| CompareError::MissingColumn {
            file: file.into(),
            column: spec.anchor.clone(),
        })?;

    let available = table.headers.len() - start;
    if available < spec.width() {
        return Err(CompareError::TruncatedBlock {
            file: file.into(),
            anchor: spec.anchor.clone(),
            width: spec.width(),
            found: available,
        });
    }

    let mut columns = Bounds::<usize>::default();
    for (offset, bound) in spec.fields.iter().enumerate() {
        let col = start + offset;
        match bound {
            Bound::Minimum => columns.minimum = col,
            Bound::Typical => columns.typical = col,
            Bound::Maximum => columns.maximum = col,
        }
    }

    log::debug!(
        "{file}: block \"{}\" at columns {}..{} -> {label}",
        spec.anchor,
        start,
        start + spec.width()
    );

    Ok(MappedBlock {
        label: label.to_string(),
        columns,
        source_headers: table.headers[start..start + spec.width()].to_vec(),
    })
}
