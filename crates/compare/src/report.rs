//! Report Assembler: evaluation results joined back onto the reference
//! file's own rows.
//!
//! Every original column of file 1 is kept in order. Computed columns are
//! appended, or moved to sit right after the first original column whose
//! first data row holds the sentinel text (case-insensitive, trimmed).

use std::collections::HashMap;

use serde::Serialize;

use crate::config::ExpansionFilter;
use crate::evaluate::{CellClassification, PassFail};
use crate::key::{KeyColumns, SpecKey};
use crate::mapper::LIMITS_LABEL;
use crate::model::{Bound, CellValue, EvaluatedRecord};
use crate::table::Table;

pub const PRESENCE_COLUMN: &str = "File Presence";
pub const PASS_FAIL_COLUMN: &str = "Pass or Fail";
pub const WHY_FAILED_COLUMN: &str = "Why Failed";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportCell {
    pub value: CellValue,
    /// `None` for cells that are never styled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<CellClassification>,
}

impl ReportCell {
    fn plain(value: CellValue) -> Self {
        Self { value, class: None }
    }

    fn classified(value: CellValue, class: CellClassification) -> Self {
        Self { value, class: Some(class) }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<ReportCell>>,
    /// Original column the computed columns were moved after, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relocated_after: Option<String>,
}

impl Report {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

pub struct ReportOptions<'a> {
    pub labels: &'a [String],
    pub track_typical: bool,
    pub sentinel: Option<&'a str>,
    pub expansion: &'a ExpansionFilter,
}

/// What one computed column shows.
#[derive(Debug, Clone, Copy)]
enum Computed {
    Presence,
    Limit(Bound),
    Measured(usize, Bound),
    PassFail,
    WhyFailed,
}

fn computed_columns(options: &ReportOptions<'_>) -> Vec<(String, Computed)> {
    let mut cols = vec![(PRESENCE_COLUMN.to_string(), Computed::Presence)];
    for bound in Bound::ALL {
        cols.push((bound.column(LIMITS_LABEL), Computed::Limit(bound)));
    }
    for (position, label) in options.labels.iter().enumerate() {
        for bound in Bound::ALL {
            if bound == Bound::Typical && !options.track_typical {
                continue;
            }
            cols.push((bound.column(label), Computed::Measured(position, bound)));
        }
    }
    cols.push((PASS_FAIL_COLUMN.to_string(), Computed::PassFail));
    cols.push((WHY_FAILED_COLUMN.to_string(), Computed::WhyFailed));
    cols
}

fn computed_cell(what: Computed, record: Option<&EvaluatedRecord>) -> ReportCell {
    let Some(record) = record else {
        return ReportCell::plain(CellValue::Empty);
    };
    match what {
        Computed::Presence => ReportCell::plain(CellValue::Text(record.presence.to_string())),
        Computed::Limit(bound) => ReportCell::plain(CellValue::from_option(*record.record.limits.get(bound))),
        Computed::Measured(position, bound) => {
            let value = record
                .record
                .values
                .get(position)
                .and_then(|v| v.as_ref())
                .and_then(|v| *v.get(bound));
            let class = record.cell(position, bound);
            if class == CellClassification::Unknown {
                ReportCell::plain(CellValue::from_option(value))
            } else {
                ReportCell::classified(CellValue::from_option(value), class)
            }
        }
        Computed::PassFail => {
            let class = match record.verdict.pass_fail {
                PassFail::Pass => CellClassification::Compliant,
                PassFail::Fail => CellClassification::Violating,
            };
            ReportCell::classified(CellValue::Text(record.verdict.pass_fail.to_string()), class)
        }
        Computed::WhyFailed => ReportCell::plain(CellValue::Text(record.verdict.joined_reasons())),
    }
}

/// Left-join `records` onto the rows of `base` (the reference file).
pub fn assemble(
    base: &Table,
    keys: &KeyColumns,
    records: &[EvaluatedRecord],
    options: &ReportOptions<'_>,
) -> Report {
    let by_key: HashMap<&SpecKey, &EvaluatedRecord> = records.iter().map(|r| (r.key(), r)).collect();
    let computed = computed_columns(options);
    let original_width = base.headers.len();

    let mut headers = base.headers.clone();
    for (name, _) in &computed {
        if base.headers.contains(name) {
            headers.push(format!("{name} (computed)"));
        } else {
            headers.push(name.clone());
        }
    }

    let mut rows = Vec::new();
    for row in &base.rows {
        let key = keys.extract(row);
        if !options.expansion.matches(&key.spec_id_expansion) {
            continue;
        }
        let record = by_key.get(&key).copied();
        let mut cells: Vec<ReportCell> = row.iter().cloned().map(ReportCell::plain).collect();
        cells.extend(computed.iter().map(|(_, what)| computed_cell(*what, record)));
        rows.push(cells);
    }

    let mut report = Report { headers, rows, relocated_after: None };

    if let Some(sentinel) = options.sentinel {
        if let Some(anchor) = find_sentinel_column(&report, original_width, sentinel) {
            relocate(&mut report, original_width, anchor);
            report.relocated_after = Some(report.headers[anchor].clone());
        } else {
            log::debug!("sentinel '{sentinel}' not found in first row, computed columns appended");
        }
    }

    report
}

/// First original column whose first data row equals `sentinel`.
fn find_sentinel_column(report: &Report, original_width: usize, sentinel: &str) -> Option<usize> {
    let needle = sentinel.trim().to_lowercase();
    let first = report.rows.first()?;
    first[..original_width]
        .iter()
        .position(|cell| cell.value.to_string().trim().to_lowercase() == needle)
}

/// Move the computed block (columns `original_width..`) to follow `anchor`.
fn relocate(report: &mut Report, original_width: usize, anchor: usize) {
    let total = report.headers.len();
    let order: Vec<usize> = (0..=anchor)
        .chain(original_width..total)
        .chain(anchor + 1..original_width)
        .collect();

    report.headers = order.iter().map(|&i| report.headers[i].clone()).collect();
    for row in &mut report.rows {
        *row = order.iter().map(|&i| row[i].clone()).collect();
    }
    log::debug!("computed columns moved after '{}'", report.headers[anchor]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::Verdict;
    use crate::key::KeyShape;
    use crate::model::{Bounds, UnifiedRecord};
    use crate::presence::PresenceTag;

    fn base(csv: &str) -> Table {
        Table::from_csv_str(csv, b',').unwrap()
    }

    fn record(spec: &str, exp: &str, fail: bool) -> EvaluatedRecord {
        let values = Bounds { minimum: Some(1.0), typical: Some(2.0), maximum: Some(3.0) };
        let cls = if fail { CellClassification::Violating } else { CellClassification::Compliant };
        EvaluatedRecord {
            record: UnifiedRecord {
                key: SpecKey::basic(spec, exp),
                limits: Bounds { minimum: Some(0.0), typical: None, maximum: Some(5.0) },
                values: vec![Some(values), None],
            },
            presence: PresenceTag::OnlyFile(1),
            verdict: if fail {
                Verdict::from_reasons(vec!["Minimum_A < Minimum_Limits1".into()])
            } else {
                Verdict::from_reasons(vec![])
            },
            cells: vec![
                Bounds { minimum: cls, typical: CellClassification::Compliant, maximum: CellClassification::Compliant },
                Bounds {
                    minimum: CellClassification::Unknown,
                    typical: CellClassification::Unknown,
                    maximum: CellClassification::Unknown,
                },
            ],
        }
    }

    fn labels() -> Vec<String> {
        vec!["A".into(), "B".into()]
    }

    fn options<'a>(labels: &'a [String], sentinel: Option<&'a str>, filter: &'a ExpansionFilter) -> ReportOptions<'a> {
        ReportOptions { labels, track_typical: true, sentinel, expansion: filter }
    }

    const CSV: &str = "spec_number,spec_id_expansion,param,check,notes\n\
                       100,, gain ,  VSWR ,x\n\
                       100,1,gain,other,y\n";

    #[test]
    fn appends_computed_columns_without_sentinel() {
        let t = base(CSV);
        let keys = KeyColumns::locate(&t, KeyShape::Basic, "file 1").unwrap();
        let records = vec![record("100", "", true), record("100", "1", false)];
        let labels = labels();
        let report = assemble(&t, &keys, &records, &options(&labels, None, &ExpansionFilter::All));

        assert_eq!(
            report.headers,
            vec![
                "spec_number", "spec_id_expansion", "param", "check", "notes",
                "File Presence", "Minimum_Limits1", "Typical_Limits1", "Maximum_Limits1",
                "Minimum_A", "Typical_A", "Maximum_A", "Minimum_B", "Typical_B", "Maximum_B",
                "Pass or Fail", "Why Failed",
            ]
        );
        assert_eq!(report.rows.len(), 2);
        let pf = report.column_index(PASS_FAIL_COLUMN).unwrap();
        assert_eq!(report.rows[0][pf].value, CellValue::Text("Fail".into()));
        assert_eq!(report.rows[0][pf].class, Some(CellClassification::Violating));
        assert_eq!(report.rows[1][pf].value, CellValue::Text("Pass".into()));

        let why = report.column_index(WHY_FAILED_COLUMN).unwrap();
        assert_eq!(report.rows[1][why].value, CellValue::Text(String::new()));

        let min_a = report.column_index("Minimum_A").unwrap();
        assert_eq!(report.rows[0][min_a].class, Some(CellClassification::Violating));
        let min_b = report.column_index("Minimum_B").unwrap();
        assert_eq!(report.rows[0][min_b].class, None);
        assert_eq!(report.rows[0][min_b].value, CellValue::Empty);
        assert!(report.relocated_after.is_none());
    }

    #[test]
    fn relocates_after_sentinel_column_case_insensitive() {
        let t = base(CSV);
        let keys = KeyColumns::locate(&t, KeyShape::Basic, "file 1").unwrap();
        let records = vec![record("100", "", false), record("100", "1", false)];
        let labels = labels();
        let report = assemble(&t, &keys, &records, &options(&labels, Some("vswr"), &ExpansionFilter::All));

        assert_eq!(report.relocated_after.as_deref(), Some("check"));
        assert_eq!(&report.headers[..5], &["spec_number", "spec_id_expansion", "param", "check", "File Presence"]);
        assert_eq!(report.headers.last().unwrap(), "notes");
        assert_eq!(report.headers[report.headers.len() - 2], "Why Failed");
        // Cells move with their headers
        assert_eq!(report.rows[0][4].value, CellValue::Text("Only found in uploaded file 1".into()));
        assert_eq!(report.rows[1].last().unwrap().value, CellValue::Text("y".into()));
    }

    #[test]
    fn sentinel_only_checks_first_row() {
        let t = base("spec_number,a,b\n1,x,y\n2,compliance,z\n");
        let keys = KeyColumns::locate(&t, KeyShape::Basic, "file 1").unwrap();
        let labels = labels();
        let report = assemble(&t, &keys, &[], &options(&labels, Some("compliance"), &ExpansionFilter::All));
        assert!(report.relocated_after.is_none());
        assert_eq!(report.headers[3], "File Presence");
    }

    #[test]
    fn expansion_filter_drops_rows_before_sentinel_lookup() {
        let t = base(CSV);
        let keys = KeyColumns::locate(&t, KeyShape::Basic, "file 1").unwrap();
        let records = vec![record("100", "", false), record("100", "1", false)];
        let labels = labels();
        let filter = ExpansionFilter::Value("1".into());
        let report = assemble(&t, &keys, &records, &options(&labels, Some("vswr"), &filter));
        assert_eq!(report.rows.len(), 1);
        // Remaining first row holds "other", so nothing moves
        assert!(report.relocated_after.is_none());
    }

    #[test]
    fn untracked_typical_omits_columns_and_clashes_are_suffixed() {
        let t = base("spec_number,File Presence\n100,legacy\n");
        let keys = KeyColumns::locate(&t, KeyShape::Basic, "file 1").unwrap();
        let labels = labels();
        let opts = ReportOptions { labels: &labels, track_typical: false, sentinel: None, expansion: &ExpansionFilter::All };
        let report = assemble(&t, &keys, &[record("100", "", false)], &opts);
        assert!(report.column_index("Typical_A").is_none());
        assert!(report.column_index("Typical_Limits1").is_some());
        assert_eq!(report.headers[2], "File Presence (computed)");
        assert_eq!(report.rows[0][1].value, CellValue::Text("legacy".into()));
    }
}
