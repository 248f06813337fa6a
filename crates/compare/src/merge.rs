//! Merge Engine: sequential full outer join of the per-file canonical tables.

use std::collections::HashMap;

use crate::coerce::{coerce_cell, is_lossy, to_number};
use crate::key::SpecKey;
use crate::mapper::LIMITS_LABEL;
use crate::model::{Bound, Bounds, CanonicalTable, CellValue, CoercionWarning, UnifiedRecord};

/// A joined row before numeric coercion.
#[derive(Debug, Clone)]
pub struct MergedRecord {
    pub key: SpecKey,
    pub limits: Option<Bounds<CellValue>>,
    pub values: Vec<Option<Bounds<CellValue>>>,
}

/// Accumulator of the sequential join. Records keep first-seen order.
#[derive(Debug, Clone)]
pub struct MergedTable {
    pub labels: Vec<String>,
    pub records: Vec<MergedRecord>,
    index: HashMap<SpecKey, usize>,
}

impl MergedTable {
    /// Empty accumulator sized for `file_count` inputs.
    pub fn new(file_count: usize) -> Self {
        Self {
            labels: vec![String::new(); file_count],
            records: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Join one more canonical table onto the accumulator.
///
/// Keys already present gain this file's values; new keys are appended with
/// nulls for every other file. A key repeated inside `next` keeps its first
/// occurrence.
pub fn outer_join(mut acc: MergedTable, next: &CanonicalTable) -> MergedTable {
    let position = next.index - 1;
    if position >= acc.labels.len() {
        acc.labels.resize(position + 1, String::new());
        for record in &mut acc.records {
            record.values.resize(position + 1, None);
        }
    }
    acc.labels[position] = next.label.clone();
    let width = acc.labels.len();

    let mut duplicates = 0usize;
    for row in &next.rows {
        match acc.index.get(&row.key) {
            Some(&i) => {
                let record = &mut acc.records[i];
                if record.values[position].is_some() {
                    duplicates += 1;
                    continue;
                }
                record.values[position] = Some(row.values.clone());
                if record.limits.is_none() {
                    record.limits = row.limits.clone();
                }
            }
            None => {
                let mut values = vec![None; width];
                values[position] = Some(row.values.clone());
                acc.index.insert(row.key.clone(), acc.records.len());
                acc.records.push(MergedRecord {
                    key: row.key.clone(),
                    limits: row.limits.clone(),
                    values,
                });
            }
        }
    }

    if duplicates > 0 {
        log::warn!(
            "file {} ({}): {duplicates} duplicate key row(s) ignored, first occurrence kept",
            next.index,
            next.label
        );
    }
    log::debug!("after joining file {}: {} unified keys", next.index, acc.len());
    acc
}

/// Fold every table, in file order, into one merged table.
pub fn merge_all(tables: &[CanonicalTable]) -> MergedTable {
    tables
        .iter()
        .fold(MergedTable::new(tables.len()), outer_join)
}

/// Coerce every value and limit cell to a number, sort records for display,
/// and collect a warning for each discarded non-numeric cell.
pub fn coerce(merged: MergedTable) -> (Vec<UnifiedRecord>, Vec<CoercionWarning>) {
    let mut warnings = Vec::new();
    let MergedTable { labels, records, .. } = merged;

    let mut unified: Vec<UnifiedRecord> = records
        .into_iter()
        .map(|record| {
            let mut coerce_block = |label: &str, block: &Bounds<CellValue>| {
                block.map(|bound: Bound, cell| {
                    if is_lossy(cell) {
                        warnings.push(CoercionWarning {
                            column: bound.column(label),
                            spec_number: record.key.spec_number.clone(),
                            spec_id_expansion: record.key.spec_id_expansion.clone(),
                            value: cell.to_string(),
                        });
                    }
                    to_number(&coerce_cell(cell))
                })
            };

            let limits = record
                .limits
                .as_ref()
                .map(|l| coerce_block(LIMITS_LABEL, l))
                .unwrap_or_default();
            let values = record
                .values
                .iter()
                .zip(&labels)
                .map(|(v, label)| v.as_ref().map(|b| coerce_block(label, b)))
                .collect();

            UnifiedRecord { key: record.key, limits, values }
        })
        .collect();

    unified.sort_by(|a, b| a.key.display_cmp(&b.key));

    for w in &warnings {
        log::warn!(
            "{} for spec {} expansion '{}': non-numeric value '{}' treated as empty",
            w.column,
            w.spec_number,
            w.spec_id_expansion,
            w.value
        );
    }

    (unified, warnings)
}
