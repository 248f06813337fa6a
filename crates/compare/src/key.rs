//! Key Extractor: composite join keys and the per-file canonical projection.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::CompareError;
use crate::mapper::{map_block, BlockSpec, MappedBlock, LIMITS_LABEL};
use crate::model::{CanonicalRow, CanonicalTable, CellValue};
use crate::table::Table;

pub const SPEC_NUMBER: &str = "spec_number";
pub const SPEC_ID_EXPANSION: &str = "spec_id_expansion";
pub const SPEC_ITEM_CATEGORY: &str = "spec_item_category";
pub const SPEC_ITEM_OLD_NAME: &str = "spec_item_old_name";

/// Which fields make up the composite key. One shape per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyShape {
    /// spec_number + spec_id_expansion
    Basic,
    /// spec_number + spec_id_expansion + spec_item_category + spec_item_old_name
    #[default]
    Extended,
}

impl std::fmt::Display for KeyShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic => write!(f, "basic"),
            Self::Extended => write!(f, "extended"),
        }
    }
}

/// Composite key. Blank components are empty strings, never absent; under
/// [`KeyShape::Basic`] category and old name are always blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SpecKey {
    pub spec_number: String,
    pub spec_id_expansion: String,
    pub spec_item_category: String,
    pub spec_item_old_name: String,
}

impl SpecKey {
    pub fn basic(spec_number: &str, expansion: &str) -> Self {
        Self {
            spec_number: canonical_id(spec_number),
            spec_id_expansion: canonical_id(expansion),
            spec_item_category: String::new(),
            spec_item_old_name: String::new(),
        }
    }

    pub fn extended(spec_number: &str, expansion: &str, category: &str, old_name: &str) -> Self {
        Self {
            spec_item_category: category.trim().to_string(),
            spec_item_old_name: old_name.trim().to_string(),
            ..Self::basic(spec_number, expansion)
        }
    }

    /// Report ordering: spec number (numerically when both parse), then
    /// expansion with blank first, then category, then old name.
    pub fn display_cmp(&self, other: &Self) -> Ordering {
        natural_cmp(&self.spec_number, &other.spec_number)
            .then_with(|| {
                let a = &self.spec_id_expansion;
                let b = &other.spec_id_expansion;
                (!a.is_empty()).cmp(&!b.is_empty()).then_with(|| natural_cmp(a, b))
            })
            .then_with(|| self.spec_item_category.cmp(&other.spec_item_category))
            .then_with(|| self.spec_item_old_name.cmp(&other.spec_item_old_name))
    }
}

impl std::fmt::Display for SpecKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.spec_number)?;
        if !self.spec_id_expansion.is_empty() {
            write!(f, "/{}", self.spec_id_expansion)?;
        }
        Ok(())
    }
}

fn natural_cmp(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Canonical text form of an id: integral numbers lose their decimals
/// (`1.0` -> `1`), `nan` and whitespace become blank.
pub fn canonical_id(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return String::new();
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        Ok(f) if f.is_finite() => format!("{f}"),
        _ => trimmed.to_string(),
    }
}

/// Column positions of the key fields in one table.
#[derive(Debug, Clone)]
pub struct KeyColumns {
    pub shape: KeyShape,
    spec_number: usize,
    expansion: Option<usize>,
    category: Option<usize>,
    old_name: Option<usize>,
}

impl KeyColumns {
    /// `spec_number` is always required; category and old name are required
    /// under the extended shape. A missing expansion column reads as blank.
    pub fn locate(table: &Table, shape: KeyShape, file: &str) -> Result<Self, CompareError> {
        let require = |name: &str| {
            table.column_index(name).ok_or_else(|| CompareError::MissingColumn {
                file: file.into(),
                column: name.into(),
            })
        };

        let spec_number = require(SPEC_NUMBER)?;
        let (category, old_name) = match shape {
            KeyShape::Basic => (None, None),
            KeyShape::Extended => (Some(require(SPEC_ITEM_CATEGORY)?), Some(require(SPEC_ITEM_OLD_NAME)?)),
        };
        let expansion = table.column_index(SPEC_ID_EXPANSION);
        if expansion.is_none() {
            log::debug!("{file}: no {SPEC_ID_EXPANSION} column, treating expansion as blank");
        }

        Ok(Self { shape, spec_number, expansion, category, old_name })
    }

    pub fn extract(&self, row: &[CellValue]) -> SpecKey {
        let text = |col: Option<usize>| {
            col.and_then(|c| row.get(c)).map(|v| v.to_string()).unwrap_or_default()
        };
        let spec_number = text(Some(self.spec_number));
        let expansion = text(self.expansion);
        match self.shape {
            KeyShape::Basic => SpecKey::basic(&spec_number, &expansion),
            KeyShape::Extended => {
                SpecKey::extended(&spec_number, &expansion, &text(self.category), &text(self.old_name))
            }
        }
    }
}

/// What to project out of one input file.
pub struct Projection<'a> {
    pub index: usize,
    pub label: &'a str,
    pub shape: KeyShape,
    pub values: &'a BlockSpec,
    /// Set for the reference file only.
    pub limits: Option<&'a BlockSpec>,
}

impl Projection<'_> {
    pub fn describe(&self) -> String {
        format!("file {} ({})", self.index, self.label)
    }
}

/// Project `table` to composite keys plus canonical value (and limit) blocks.
pub fn project(table: &Table, projection: &Projection<'_>) -> Result<CanonicalTable, CompareError> {
    let file = projection.describe();
    let keys = KeyColumns::locate(table, projection.shape, &file)?;
    let values: MappedBlock = map_block(table, projection.values, projection.label, &file)?;
    let limits = projection
        .limits
        .map(|spec| map_block(table, spec, LIMITS_LABEL, &file))
        .transpose()?;

    let rows = table
        .rows
        .iter()
        .map(|row| CanonicalRow {
            key: keys.extract(row),
            values: values.read(row),
            limits: limits.as_ref().map(|block| block.read(row)),
        })
        .collect();

    Ok(CanonicalTable {
        index: projection.index,
        label: projection.label.to_string(),
        rows,
    })
}
