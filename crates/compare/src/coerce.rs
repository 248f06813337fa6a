//! Numeric coercion of value cells.
//!
//! Non-numeric content maps to null instead of failing, so comparisons stay
//! well defined for mixed-quality input.

use crate::model::CellValue;

/// Read a cell as a number. Text is trimmed first; `NaN` counts as null.
pub fn to_number(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Empty => None,
        CellValue::Number(n) if n.is_nan() => None,
        CellValue::Number(n) => Some(*n),
        CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| !n.is_nan()),
    }
}

/// Coerce a cell to `Number` or `Empty`. Idempotent.
pub fn coerce_cell(cell: &CellValue) -> CellValue {
    CellValue::from_option(to_number(cell))
}

/// True when coercion discards real content (blank text is not content).
pub fn is_lossy(cell: &CellValue) -> bool {
    match cell {
        CellValue::Text(s) => !s.trim().is_empty() && to_number(cell).is_none(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_trimmed_text() {
        assert_eq!(to_number(&CellValue::Text(" 2.5 ".into())), Some(2.5));
        assert_eq!(to_number(&CellValue::Text("-1e3".into())), Some(-1000.0));
    }

    #[test]
    fn non_numeric_becomes_null() {
        assert_eq!(coerce_cell(&CellValue::Text("N/A".into())), CellValue::Empty);
        assert_eq!(coerce_cell(&CellValue::Text("nan".into())), CellValue::Empty);
        assert!(is_lossy(&CellValue::Text("N/A".into())));
        assert!(!is_lossy(&CellValue::Text("   ".into())));
        assert!(!is_lossy(&CellValue::Empty));
    }

    fn arb_cell() -> impl Strategy<Value = CellValue> {
        prop_oneof![
            Just(CellValue::Empty),
            any::<f64>().prop_map(CellValue::Number),
            r"-?[0-9]{1,6}(\.[0-9]{1,3})?".prop_map(CellValue::Text),
            r"[a-zA-Z /]{0,10}".prop_map(CellValue::Text),
        ]
    }

    proptest! {
        #[test]
        fn coercion_is_idempotent(cell in arb_cell()) {
            let once = coerce_cell(&cell);
            let twice = coerce_cell(&once);
            prop_assert_eq!(once, twice);
        }
    }
}
