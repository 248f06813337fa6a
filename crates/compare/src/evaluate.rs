//! Evaluation Engine: pass/fail verdicts and per-cell compliance.
//!
//! Measured minimum and maximum are checked against the reference limits one
//! bound each. The typical value is only reported when it is below the lower
//! limit and above the upper limit at the same time; failing one bound alone
//! produces no reason. Comparisons against a null operand never fail.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::mapper::LIMITS_LABEL;
use crate::model::{Bound, Bounds, UnifiedRecord};

/// How a measured cell is classified when the matching limit is absent.
/// One policy holds for a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingLimitPolicy {
    #[default]
    Compliant,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PassFail {
    Pass,
    Fail,
}

impl fmt::Display for PassFail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "Pass"),
            Self::Fail => write!(f, "Fail"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub pass_fail: PassFail,
    pub reasons: Vec<String>,
}

impl Verdict {
    pub fn from_reasons(reasons: Vec<String>) -> Self {
        let pass_fail = if reasons.is_empty() { PassFail::Pass } else { PassFail::Fail };
        Self { pass_fail, reasons }
    }

    /// Reasons as shown in the report's "Why Failed" column.
    pub fn joined_reasons(&self) -> String {
        self.reasons.join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellClassification {
    Compliant,
    Violating,
    Unknown,
}

pub type FileCells = Bounds<CellClassification>;

#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluationRules {
    pub missing_limit: MissingLimitPolicy,
    /// When false, per-file typical values are neither checked nor shown.
    pub track_typical: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub verdict: Verdict,
    /// One entry per file position.
    pub cells: Vec<FileCells>,
}

pub fn evaluate(record: &UnifiedRecord, labels: &[String], rules: &EvaluationRules) -> Evaluation {
    let mut reasons = Vec::new();
    let cells = record
        .values
        .iter()
        .zip(labels)
        .map(|(values, label)| check_file(label, values.as_ref(), &record.limits, rules, &mut reasons))
        .collect();

    Evaluation { verdict: Verdict::from_reasons(reasons), cells }
}

fn check_file(
    label: &str,
    values: Option<&Bounds<Option<f64>>>,
    limits: &Bounds<Option<f64>>,
    rules: &EvaluationRules,
    reasons: &mut Vec<String>,
) -> FileCells {
    let Some(values) = values else {
        return Bounds {
            minimum: CellClassification::Unknown,
            typical: CellClassification::Unknown,
            maximum: CellClassification::Unknown,
        };
    };

    let lo = limits.minimum;
    let hi = limits.maximum;
    let typical = if rules.track_typical { values.typical } else { None };

    if let (Some(v), Some(lo)) = (values.minimum, lo) {
        if v < lo {
            reasons.push(format!("{} < {}", Bound::Minimum.column(label), Bound::Minimum.column(LIMITS_LABEL)));
        }
    }
    if let (Some(v), Some(hi)) = (values.maximum, hi) {
        if v > hi {
            reasons.push(format!("{} > {}", Bound::Maximum.column(label), Bound::Maximum.column(LIMITS_LABEL)));
        }
    }

    let failed_min = matches!((typical, lo), (Some(t), Some(lo)) if t < lo);
    let failed_max = matches!((typical, hi), (Some(t), Some(hi)) if t > hi);
    if failed_min && failed_max {
        reasons.push(format!("{} outside both limit bounds", Bound::Typical.column(label)));
    }

    Bounds {
        minimum: classify_bound(values.minimum, lo, |v, l| v >= l, rules.missing_limit),
        typical: match typical {
            None => CellClassification::Unknown,
            Some(_) if failed_min && failed_max => CellClassification::Violating,
            Some(_) => CellClassification::Compliant,
        },
        maximum: classify_bound(values.maximum, hi, |v, l| v <= l, rules.missing_limit),
    }
}

fn classify_bound(
    value: Option<f64>,
    limit: Option<f64>,
    within: impl Fn(f64, f64) -> bool,
    policy: MissingLimitPolicy,
) -> CellClassification {
    match (value, limit) {
        (None, _) => CellClassification::Unknown,
        (Some(v), Some(l)) if within(v, l) => CellClassification::Compliant,
        (Some(_), Some(_)) => CellClassification::Violating,
        (Some(_), None) => match policy {
            MissingLimitPolicy::Compliant => CellClassification::Compliant,
            MissingLimitPolicy::Unknown => CellClassification::Unknown,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::SpecKey;
    use proptest::prelude::*;

    fn bounds(min: Option<f64>, typ: Option<f64>, max: Option<f64>) -> Bounds<Option<f64>> {
        Bounds { minimum: min, typical: typ, maximum: max }
    }

    fn record(limits: Bounds<Option<f64>>, values: Vec<Option<Bounds<Option<f64>>>>) -> UnifiedRecord {
        UnifiedRecord { key: SpecKey::extended("100", "", "catA", "old1"), limits, values }
    }

    fn labels(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("File{i}")).collect()
    }

    fn rules() -> EvaluationRules {
        EvaluationRules { missing_limit: MissingLimitPolicy::Compliant, track_typical: true }
    }

    #[test]
    fn min_and_max_violations_across_files() {
        let r = record(
            bounds(Some(1.0), Some(5.0), Some(10.0)),
            vec![Some(bounds(Some(0.5), Some(5.0), Some(9.0))), Some(bounds(Some(2.0), Some(5.0), Some(11.0)))],
        );
        let eval = evaluate(&r, &labels(2), &rules());
        assert_eq!(eval.verdict.pass_fail, PassFail::Fail);
        assert_eq!(
            eval.verdict.reasons,
            vec!["Minimum_File1 < Minimum_Limits1", "Maximum_File2 > Maximum_Limits1"]
        );
        assert_eq!(eval.cells[0].minimum, CellClassification::Violating);
        assert_eq!(eval.cells[0].maximum, CellClassification::Compliant);
        assert_eq!(eval.cells[1].maximum, CellClassification::Violating);
        assert_eq!(eval.verdict.joined_reasons(), "Minimum_File1 < Minimum_Limits1, Maximum_File2 > Maximum_Limits1");
    }

    #[test]
    fn typical_one_bound_alone_is_not_a_violation() {
        let r = record(
            bounds(Some(1.0), None, Some(10.0)),
            vec![Some(bounds(None, Some(0.0), None)), Some(bounds(None, Some(12.0), None))],
        );
        let eval = evaluate(&r, &labels(2), &rules());
        assert_eq!(eval.verdict.pass_fail, PassFail::Pass);
        assert!(eval.verdict.reasons.is_empty());
        assert_eq!(eval.cells[0].typical, CellClassification::Compliant);
        assert_eq!(eval.cells[1].typical, CellClassification::Compliant);
    }

    #[test]
    fn typical_outside_both_bounds_is_reported() {
        // Inverted limits make both comparisons true at once.
        let r = record(bounds(Some(10.0), None, Some(1.0)), vec![Some(bounds(None, Some(5.0), None))]);
        let eval = evaluate(&r, &labels(1), &rules());
        assert_eq!(eval.verdict.reasons, vec!["Typical_File1 outside both limit bounds"]);
        assert_eq!(eval.cells[0].typical, CellClassification::Violating);
    }

    #[test]
    fn untracked_typical_is_never_evaluated() {
        let r = record(bounds(Some(10.0), None, Some(1.0)), vec![Some(bounds(None, Some(5.0), None))]);
        let no_typ = EvaluationRules { track_typical: false, ..rules() };
        let eval = evaluate(&r, &labels(1), &no_typ);
        assert!(eval.verdict.reasons.is_empty());
        assert_eq!(eval.cells[0].typical, CellClassification::Unknown);
    }

    #[test]
    fn absent_file_contributes_nothing() {
        let r = record(
            bounds(Some(1.0), None, Some(10.0)),
            vec![Some(bounds(Some(2.0), Some(3.0), Some(4.0))), None],
        );
        let eval = evaluate(&r, &labels(2), &rules());
        assert_eq!(eval.verdict.pass_fail, PassFail::Pass);
        assert_eq!(eval.cells[1].minimum, CellClassification::Unknown);
        assert_eq!(eval.cells[1].typical, CellClassification::Unknown);
    }

    #[test]
    fn missing_limit_policy_applies_to_present_values() {
        let r = record(bounds(None, None, None), vec![Some(bounds(Some(1.0), None, Some(2.0)))]);
        let compliant = evaluate(&r, &labels(1), &rules());
        assert_eq!(compliant.cells[0].minimum, CellClassification::Compliant);
        assert_eq!(compliant.cells[0].typical, CellClassification::Unknown);

        let unknown_rules = EvaluationRules { missing_limit: MissingLimitPolicy::Unknown, ..rules() };
        let unknown = evaluate(&r, &labels(1), &unknown_rules);
        assert_eq!(unknown.cells[0].minimum, CellClassification::Unknown);
        assert_eq!(unknown.cells[0].maximum, CellClassification::Unknown);
    }

    #[test]
    fn boundary_values_are_compliant() {
        let r = record(bounds(Some(1.0), None, Some(10.0)), vec![Some(bounds(Some(1.0), None, Some(10.0)))]);
        let eval = evaluate(&r, &labels(1), &rules());
        assert_eq!(eval.verdict.pass_fail, PassFail::Pass);
        assert_eq!(eval.cells[0].minimum, CellClassification::Compliant);
        assert_eq!(eval.cells[0].maximum, CellClassification::Compliant);
    }

    fn arb_opt() -> impl Strategy<Value = Option<f64>> {
        prop_oneof![1 => Just(None), 3 => (-100.0f64..100.0).prop_map(Some)]
    }

    fn arb_bounds() -> impl Strategy<Value = Bounds<Option<f64>>> {
        (arb_opt(), arb_opt(), arb_opt()).prop_map(|(a, b, c)| bounds(a, b, c))
    }

    proptest! {
        #[test]
        fn null_minimum_limit_never_yields_minimum_reason(
            hi in arb_opt(),
            files in proptest::collection::vec(proptest::option::of(arb_bounds()), 2..=4),
        ) {
            let n = files.len();
            let r = record(bounds(None, None, hi), files);
            let eval = evaluate(&r, &labels(n), &rules());
            prop_assert!(eval.verdict.reasons.iter().all(|s| !s.starts_with("Minimum_")));
        }

        #[test]
        fn verdict_fails_iff_reasons_present(
            limits in arb_bounds(),
            files in proptest::collection::vec(proptest::option::of(arb_bounds()), 2..=4),
        ) {
            let n = files.len();
            let r = record(limits, files);
            let eval = evaluate(&r, &labels(n), &rules());
            prop_assert_eq!(eval.verdict.pass_fail == PassFail::Fail, !eval.verdict.reasons.is_empty());
        }

        #[test]
        fn typical_reason_iff_both_bounds_fail(
            lo in arb_opt(),
            hi in arb_opt(),
            typ in arb_opt(),
        ) {
            let r = record(bounds(lo, None, hi), vec![Some(bounds(None, typ, None))]);
            let eval = evaluate(&r, &labels(1), &rules());
            let both = matches!((typ, lo, hi), (Some(t), Some(l), Some(h)) if t < l && t > h);
            let flagged = eval.verdict.reasons.iter().any(|s| s.starts_with("Typical_"));
            prop_assert_eq!(both, flagged);
        }
    }
}
