use std::fmt;

use serde::{Deserialize, Serialize};

use crate::evaluate::{CellClassification, FileCells, Verdict};
use crate::key::SpecKey;
use crate::presence::PresenceTag;
use crate::report::Report;
use crate::chart::ChartData;

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

/// A single cell of a generic in-memory table.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn from_option(value: Option<f64>) -> Self {
        value.map(Self::Number).unwrap_or(Self::Empty)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            // Integers without decimals
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bound {
    Minimum,
    Typical,
    Maximum,
}

impl Bound {
    pub const ALL: [Bound; 3] = [Bound::Minimum, Bound::Typical, Bound::Maximum];

    /// Column-name prefix, e.g. `Minimum` in `Minimum_Limits1`.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Minimum => "Minimum",
            Self::Typical => "Typical",
            Self::Maximum => "Maximum",
        }
    }

    /// Canonical column name for this bound under `label`.
    pub fn column(&self, label: &str) -> String {
        format!("{}_{label}", self.prefix())
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// A Minimum/Typical/Maximum triple.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Bounds<T> {
    pub minimum: T,
    pub typical: T,
    pub maximum: T,
}

impl<T> Bounds<T> {
    pub fn get(&self, bound: Bound) -> &T {
        match bound {
            Bound::Minimum => &self.minimum,
            Bound::Typical => &self.typical,
            Bound::Maximum => &self.maximum,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(Bound, &T) -> U) -> Bounds<U> {
        Bounds {
            minimum: f(Bound::Minimum, &self.minimum),
            typical: f(Bound::Typical, &self.typical),
            maximum: f(Bound::Maximum, &self.maximum),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-file canonical projection
// ---------------------------------------------------------------------------

/// One source row reduced to its composite key and canonical value blocks.
#[derive(Debug, Clone)]
pub struct CanonicalRow {
    pub key: SpecKey,
    pub values: Bounds<CellValue>,
    /// Only populated for the reference (first) file.
    pub limits: Option<Bounds<CellValue>>,
}

#[derive(Debug, Clone)]
pub struct CanonicalTable {
    /// 1-based position in the input set.
    pub index: usize,
    pub label: String,
    pub rows: Vec<CanonicalRow>,
}

// ---------------------------------------------------------------------------
// Unified records
// ---------------------------------------------------------------------------

/// One record per distinct composite key across all inputs, values coerced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnifiedRecord {
    pub key: SpecKey,
    pub limits: Bounds<Option<f64>>,
    /// Indexed by file position; `None` iff that file lacked the key.
    pub values: Vec<Option<Bounds<Option<f64>>>>,
}

/// A value cell that could not be read as a number. Non-fatal: the value
/// becomes null and comparisons involving it are skipped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoercionWarning {
    pub column: String,
    pub spec_number: String,
    pub spec_id_expansion: String,
    pub value: String,
}

/// A unified record with its presence tag and evaluation attached.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluatedRecord {
    #[serde(flatten)]
    pub record: UnifiedRecord,
    pub presence: PresenceTag,
    pub verdict: Verdict,
    pub cells: Vec<FileCells>,
}

impl EvaluatedRecord {
    pub fn key(&self) -> &SpecKey {
        &self.record.key
    }

    /// Classification of a measured cell for the file at `position` (0-based).
    pub fn cell(&self, position: usize, bound: Bound) -> CellClassification {
        self.cells
            .get(position)
            .map(|c| *c.get(bound))
            .unwrap_or(CellClassification::Unknown)
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Pre-loaded tables in file order. File 1 is the reference file.
pub struct CompareInput {
    pub tables: Vec<crate::table::Table>,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct CompareSummary {
    pub total_records: usize,
    pub passed: usize,
    pub failed: usize,
    pub in_all_files: usize,
    pub in_single_file: usize,
    pub in_some_files: usize,
    pub report_rows: usize,
    pub coercion_warnings: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompareMeta {
    pub config_name: String,
    pub file_count: usize,
    pub labels: Vec<String>,
    pub key_shape: crate::key::KeyShape,
    pub track_typical: bool,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompareResult {
    pub meta: CompareMeta,
    pub summary: CompareSummary,
    pub records: Vec<EvaluatedRecord>,
    pub report: Report,
    pub warnings: Vec<CoercionWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartData>,
}
