// Excel import and styled report export

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use rust_xlsxwriter::{
    Chart, ChartFormat, ChartLine, ChartLineDashType, ChartType, Color, Format, Workbook as XlsxWorkbook,
    Worksheet,
};

use clcompare_engine::chart::{ChartData, SeriesKind};
use clcompare_engine::coerce::to_number;
use clcompare_engine::evaluate::CellClassification;
use clcompare_engine::key::{KeyShape, SPEC_ID_EXPANSION, SPEC_ITEM_CATEGORY, SPEC_ITEM_OLD_NAME, SPEC_NUMBER};
use clcompare_engine::mapper::LIMITS_LABEL;
use clcompare_engine::model::{Bound, CellValue, EvaluatedRecord};
use clcompare_engine::report::{Report, ReportCell, PASS_FAIL_COLUMN, PRESENCE_COLUMN, WHY_FAILED_COLUMN};
use clcompare_engine::{CompareResult, Table};

pub const COMPARISON_SHEET: &str = "Comparison";
pub const UNIFIED_SHEET: &str = "Unified";
pub const CHART_SHEET: &str = "Chart";

const COMPLIANT_FILL: u32 = 0xC6EFCE;
const COMPLIANT_FONT: u32 = 0x006100;
const VIOLATING_FILL: u32 = 0xFFC7CE;
const VIOLATING_FONT: u32 = 0x9C0006;

// ============================================================================
// Import
// ============================================================================

/// Import the first sheet of a workbook (xlsx, xls, xlsb, ods) as a table.
/// Row 1 is the header row.
pub fn import_table(path: &Path) -> Result<Table, String> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file: {}", e))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| "Excel file contains no sheets".to_string())?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(row) => row.iter().map(|cell| data_to_cell(cell).to_string()).collect(),
        None => Vec::new(),
    };

    let mut table = Table::new(headers);
    for row in rows {
        table.push_row(row.iter().map(data_to_cell).collect());
    }

    log::debug!("{}: sheet '{}' with {} rows", path.display(), sheet_name, table.len());
    Ok(table)
}

fn data_to_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        // Integers without decimals, matching CSV text
        Data::Float(n) if n.fract() == 0.0 && n.abs() < 1e15 => CellValue::Text(format!("{}", *n as i64)),
        Data::Float(n) => CellValue::Text(format!("{}", n)),
        Data::Int(n) => CellValue::Text(format!("{}", n)),
        Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(e) => CellValue::Text(format!("#{:?}", e)),
        Data::DateTime(dt) => CellValue::Text(format!("{}", dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

// ============================================================================
// Export
// ============================================================================

struct Styles {
    header: Format,
    compliant: Format,
    violating: Format,
}

impl Styles {
    fn new() -> Self {
        Self {
            header: Format::new().set_bold(),
            compliant: Format::new()
                .set_background_color(Color::RGB(COMPLIANT_FILL))
                .set_font_color(Color::RGB(COMPLIANT_FONT)),
            violating: Format::new()
                .set_background_color(Color::RGB(VIOLATING_FILL))
                .set_font_color(Color::RGB(VIOLATING_FONT)),
        }
    }

    fn for_class(&self, class: Option<CellClassification>) -> Option<&Format> {
        match class {
            Some(CellClassification::Compliant) => Some(&self.compliant),
            Some(CellClassification::Violating) => Some(&self.violating),
            Some(CellClassification::Unknown) | None => None,
        }
    }
}

/// Export the report workbook: the styled `Comparison` sheet, the `Unified`
/// sheet and, when chart data is present, the `Chart` sheet.
pub fn export_report(result: &CompareResult, path: &Path) -> Result<(), String> {
    let styles = Styles::new();
    let mut workbook = XlsxWorkbook::new();

    let worksheet = workbook
        .add_worksheet()
        .set_name(COMPARISON_SHEET)
        .map_err(|e| format!("Failed to create sheet '{}': {}", COMPARISON_SHEET, e))?;
    write_report(worksheet, &result.report, &styles)?;

    let worksheet = workbook
        .add_worksheet()
        .set_name(UNIFIED_SHEET)
        .map_err(|e| format!("Failed to create sheet '{}': {}", UNIFIED_SHEET, e))?;
    let unified = unified_report(result);
    write_report(worksheet, &unified, &styles)?;

    if let Some(chart) = result.chart.as_ref() {
        let worksheet = workbook
            .add_worksheet()
            .set_name(CHART_SHEET)
            .map_err(|e| format!("Failed to create sheet '{}': {}", CHART_SHEET, e))?;
        write_chart(worksheet, chart, &styles)?;
    }

    workbook
        .save(path)
        .map_err(|e| format!("Failed to save XLSX file: {}", e))?;

    log::info!("wrote {}", path.display());
    Ok(())
}

fn write_report(worksheet: &mut Worksheet, report: &Report, styles: &Styles) -> Result<(), String> {
    let mut widths: Vec<usize> = report.headers.iter().map(|h| h.chars().count()).collect();

    for (col, header) in report.headers.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, header, &styles.header)
            .map_err(|e| format!("Failed to write header: {}", e))?;
    }

    for (row_idx, row) in report.rows.iter().enumerate() {
        let row_num = (row_idx + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            write_cell(worksheet, row_num, col as u16, cell, styles)?;
            if let Some(w) = widths.get_mut(col) {
                *w = (*w).max(cell.value.to_string().chars().count());
            }
        }
    }

    for (col, width) in widths.iter().enumerate() {
        worksheet
            .set_column_width(col as u16, (*width + 2) as f64)
            .map_err(|e| format!("Failed to set column {} width: {}", col, e))?;
    }

    worksheet
        .set_freeze_panes(1, 0)
        .map_err(|e| format!("Failed to set freeze panes: {}", e))?;
    Ok(())
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, cell: &ReportCell, styles: &Styles) -> Result<(), String> {
    let format = styles.for_class(cell.class);
    let written = match (export_number(&cell.value), &cell.value, format) {
        (Some(n), _, None) => worksheet.write_number(row, col, n).map(|_| ()),
        (Some(n), _, Some(format)) => worksheet.write_number_with_format(row, col, n, format).map(|_| ()),
        (None, CellValue::Text(s), None) => worksheet.write_string(row, col, s).map(|_| ()),
        (None, CellValue::Text(s), Some(format)) => worksheet.write_string_with_format(row, col, s, format).map(|_| ()),
        (None, _, None) => return Ok(()),
        (None, _, Some(format)) => worksheet.write_blank(row, col, format).map(|_| ()),
    };
    written.map_err(|e| format!("Failed to write cell ({}, {}): {}", row, col, e))
}

/// Numeric text from the inputs is written as a number.
fn export_number(value: &CellValue) -> Option<f64> {
    to_number(value).filter(|n| n.is_finite())
}

/// Every unified record, including keys file 1 never had.
fn unified_report(result: &CompareResult) -> Report {
    let labels = &result.meta.labels;
    let extended = result.meta.key_shape == KeyShape::Extended;
    let track_typical = result.meta.track_typical;
    let bounds: Vec<Bound> = Bound::ALL
        .into_iter()
        .filter(|b| track_typical || *b != Bound::Typical)
        .collect();

    let mut headers: Vec<String> = vec![SPEC_NUMBER.into(), SPEC_ID_EXPANSION.into()];
    if extended {
        headers.push(SPEC_ITEM_CATEGORY.into());
        headers.push(SPEC_ITEM_OLD_NAME.into());
    }
    headers.push(PRESENCE_COLUMN.into());
    headers.extend(Bound::ALL.iter().map(|b| b.column(LIMITS_LABEL)));
    for label in labels {
        headers.extend(bounds.iter().map(|b| b.column(label)));
    }
    headers.push(PASS_FAIL_COLUMN.into());
    headers.push(WHY_FAILED_COLUMN.into());

    let rows = result
        .records
        .iter()
        .map(|record| unified_row(record, labels.len(), extended, &bounds))
        .collect();

    Report { headers, rows, relocated_after: None }
}

fn unified_row(record: &EvaluatedRecord, files: usize, extended: bool, bounds: &[Bound]) -> Vec<ReportCell> {
    let plain = |value: CellValue| ReportCell { value, class: None };
    let text = |s: &str| plain(if s.is_empty() { CellValue::Empty } else { CellValue::Text(s.to_string()) });

    let key = record.key();
    let mut row = vec![text(&key.spec_number), text(&key.spec_id_expansion)];
    if extended {
        row.push(text(&key.spec_item_category));
        row.push(text(&key.spec_item_old_name));
    }
    row.push(text(&record.presence.to_string()));
    for bound in Bound::ALL {
        row.push(plain(CellValue::from_option(*record.record.limits.get(bound))));
    }
    for position in 0..files {
        let values = record.record.values.get(position).and_then(|v| v.as_ref());
        for &bound in bounds {
            let class = record.cell(position, bound);
            row.push(ReportCell {
                value: CellValue::from_option(values.and_then(|v| *v.get(bound))),
                class: (class != CellClassification::Unknown).then_some(class),
            });
        }
    }
    let pass = record.verdict.reasons.is_empty();
    row.push(ReportCell {
        value: CellValue::Text(record.verdict.pass_fail.to_string()),
        class: Some(if pass { CellClassification::Compliant } else { CellClassification::Violating }),
    });
    row.push(text(&record.verdict.joined_reasons()));
    row
}

/// Data block at A1 (categories then one column per series) with a line
/// chart beside it. Limit series are drawn as dashed reference lines.
fn write_chart(worksheet: &mut Worksheet, data: &ChartData, styles: &Styles) -> Result<(), String> {
    let err = |e: rust_xlsxwriter::XlsxError| format!("Failed to write chart data: {}", e);

    worksheet
        .write_string_with_format(0, 0, SPEC_NUMBER, &styles.header)
        .map_err(err)?;
    for (i, category) in data.categories.iter().enumerate() {
        worksheet.write_string((i + 1) as u32, 0, category).map_err(err)?;
    }
    for (s, series) in data.series.iter().enumerate() {
        let col = (s + 1) as u16;
        worksheet
            .write_string_with_format(0, col, &series.name, &styles.header)
            .map_err(err)?;
        for (i, point) in series.points.iter().enumerate() {
            if let Some(v) = point {
                worksheet.write_number((i + 1) as u32, col, *v).map_err(err)?;
            }
        }
    }

    if data.is_empty() {
        log::warn!("chart '{}' has no rows, data block only", data.title);
        return Ok(());
    }

    let last_row = data.categories.len() as u32;
    let mut chart = Chart::new(ChartType::Line);
    chart.title().set_name(data.title.as_str());
    chart.x_axis().set_name("Spec Number");
    chart.y_axis().set_name("Value");

    for (s, series) in data.series.iter().enumerate() {
        let col = (s + 1) as u16;
        let chart_series = chart
            .add_series()
            .set_categories((CHART_SHEET, 1, 0, last_row, 0))
            .set_values((CHART_SHEET, 1, col, last_row, col))
            .set_name((CHART_SHEET, 0, col));

        if let SeriesKind::Limit { bound } = series.kind {
            chart_series.set_format(
                ChartFormat::new().set_line(
                    ChartLine::new()
                        .set_color(limit_color(bound))
                        .set_dash_type(ChartLineDashType::Dash),
                ),
            );
        }
    }

    let anchor_col = (data.series.len() + 2) as u16;
    worksheet
        .insert_chart(1, anchor_col, &chart)
        .map_err(|e| format!("Failed to insert chart: {}", e))?;
    worksheet
        .set_freeze_panes(1, 0)
        .map_err(|e| format!("Failed to set freeze panes: {}", e))?;
    Ok(())
}

fn limit_color(bound: Bound) -> Color {
    match bound {
        Bound::Minimum => Color::RGB(0x800080),
        Bound::Typical => Color::RGB(0x808080),
        Bound::Maximum => Color::RGB(0xFF0000),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clcompare_engine::chart::ChartConfig;
    use clcompare_engine::engine::load_csv_table;
    use clcompare_engine::{run, CompareConfig, CompareInput};
    use tempfile::tempdir;

    fn result(with_chart: bool) -> CompareResult {
        let mut config = CompareConfig::for_files(&["a.csv", "b.csv"]);
        config.key = KeyShape::Basic;
        config.sentinel = Some("VSWR".into());
        if with_chart {
            config.chart = Some(ChartConfig::default());
        }
        let input = CompareInput {
            tables: vec![
                load_csv_table(
                    "spec_number,check,cm_summary,t,m,limits,lt,lm\n100,VSWR,0.5,2,3,1,2,4\n200,x,1,2,3,0,2,4\n",
                    b',',
                )
                .unwrap(),
                load_csv_table("spec_number,cm_summary,t,m\n100,1,2,3\n300,1,2,3\n", b',').unwrap(),
            ],
        };
        run(&config, &input).unwrap()
    }

    fn read_sheet(path: &Path, name: &str) -> calamine::Range<Data> {
        let mut workbook: Sheets<_> = open_workbook_auto(path).unwrap();
        workbook.worksheet_range(name).unwrap()
    }

    #[test]
    fn test_export_report_sheets() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        let result = result(false);
        export_report(&result, &path).unwrap();

        let workbook: Sheets<_> = open_workbook_auto(&path).unwrap();
        assert_eq!(workbook.sheet_names(), vec![COMPARISON_SHEET.to_string(), UNIFIED_SHEET.to_string()]);

        let comparison = read_sheet(&path, COMPARISON_SHEET);
        assert_eq!(comparison.get_value((0, 0)), Some(&Data::String("spec_number".into())));
        // Computed block moved after the "check" column
        assert_eq!(comparison.get_value((0, 2)), Some(&Data::String("File Presence".into())));
        assert_eq!(comparison.get_size().0, 3);

        let unified = read_sheet(&path, UNIFIED_SHEET);
        // Header plus 100, 200, 300
        assert_eq!(unified.get_size().0, 4);
        assert_eq!(unified.get_value((3, 0)), Some(&Data::Float(300.0)));
        assert_eq!(
            unified.get_value((3, 2)),
            Some(&Data::String("Only found in uploaded file 2".into()))
        );
    }

    #[test]
    fn test_export_keeps_numbers_numeric() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("numbers.xlsx");
        export_report(&result(false), &path).unwrap();

        let comparison = read_sheet(&path, COMPARISON_SHEET);
        assert_eq!(comparison.get_value((1, 0)), Some(&Data::Float(100.0)));
        // "check" column stays text, original value block is numeric
        assert_eq!(comparison.get_value((1, 1)), Some(&Data::String("VSWR".into())));
        let summary = (0..comparison.get_size().1)
            .find(|&c| comparison.get_value((0, c as u32)) == Some(&Data::String("cm_summary".into())))
            .unwrap();
        assert_eq!(comparison.get_value((1, summary as u32)), Some(&Data::Float(0.5)));
    }

    #[test]
    fn test_export_with_chart_sheet() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chart.xlsx");
        let result = result(true);
        export_report(&result, &path).unwrap();

        let chart = read_sheet(&path, CHART_SHEET);
        assert_eq!(chart.get_value((0, 1)), Some(&Data::String("Minimum_File 1".into())));
        assert_eq!(chart.get_value((1, 1)), Some(&Data::Float(0.5)));
    }

    #[test]
    fn test_import_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("input.xlsx");

        let mut workbook = XlsxWorkbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "spec_number").unwrap();
        sheet.write_string(0, 1, "spec_id_expansion").unwrap();
        sheet.write_string(0, 2, "cm_summary").unwrap();
        sheet.write_number(1, 0, 100.0).unwrap();
        sheet.write_number(1, 2, 0.25).unwrap();
        workbook.save(&path).unwrap();

        let table = import_table(&path).unwrap();
        assert_eq!(table.headers, vec!["spec_number", "spec_id_expansion", "cm_summary"]);
        assert_eq!(table.rows[0][0], CellValue::Text("100".into()));
        assert_eq!(table.rows[0][1], CellValue::Empty);
        assert_eq!(table.rows[0][2], CellValue::Text("0.25".into()));
    }
}
