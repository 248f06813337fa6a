use crate::chart::{build_chart, ChartOptions};
use crate::config::CompareConfig;
use crate::error::CompareError;
use crate::evaluate::{evaluate, EvaluationRules, PassFail};
use crate::key::{project, KeyColumns, Projection};
use crate::merge::{coerce, merge_all};
use crate::model::{
    CanonicalTable, CompareInput, CompareMeta, CompareResult, CompareSummary, EvaluatedRecord,
};
use crate::presence::{classify, key_sets, PresenceTag};
use crate::report::{assemble, ReportOptions};
use crate::table::Table;

/// Run the comparison per config. Returns evaluated records, the report and
/// optional chart data.
pub fn run(config: &CompareConfig, input: &CompareInput) -> Result<CompareResult, CompareError> {
    let labels = config.labels();
    check_inputs(config, input, &labels)?;

    // Project every file; limits come from the reference file only
    let mut canonical: Vec<CanonicalTable> = Vec::with_capacity(input.tables.len());
    for (position, table) in input.tables.iter().enumerate() {
        let projection = Projection {
            index: position + 1,
            label: &labels[position],
            shape: config.key,
            values: &config.blocks.values,
            limits: (position == 0).then_some(&config.blocks.limits),
        };
        canonical.push(project(table, &projection)?);
    }

    let sets = key_sets(&canonical);
    let (unified, warnings) = coerce(merge_all(&canonical));

    let rules = EvaluationRules {
        missing_limit: config.missing_limit,
        track_typical: config.typical,
    };
    let records: Vec<EvaluatedRecord> = unified
        .into_iter()
        .map(|record| {
            let presence = classify(&record.key, &sets);
            let evaluation = evaluate(&record, &labels, &rules);
            EvaluatedRecord {
                record,
                presence,
                verdict: evaluation.verdict,
                cells: evaluation.cells,
            }
        })
        .collect();

    let base = &input.tables[0];
    let base_keys = KeyColumns::locate(base, config.key, &format!("file 1 ({})", labels[0]))?;
    let report = assemble(
        base,
        &base_keys,
        &records,
        &ReportOptions {
            labels: &labels,
            track_typical: config.typical,
            sentinel: config.sentinel.as_deref(),
            expansion: &config.expansion,
        },
    );

    let chart = config.chart.as_ref().map(|chart_config| {
        build_chart(
            &records,
            chart_config,
            &ChartOptions {
                labels: &labels,
                track_typical: config.typical,
                expansion: &config.expansion,
            },
        )
    });

    let mut summary = compute_summary(&records);
    summary.report_rows = report.rows.len();
    summary.coercion_warnings = warnings.len();

    log::info!(
        "{}: {} records, {} passed, {} failed",
        config.name,
        summary.total_records,
        summary.passed,
        summary.failed
    );

    Ok(CompareResult {
        meta: CompareMeta {
            config_name: config.name.clone(),
            file_count: input.tables.len(),
            labels,
            key_shape: config.key,
            track_typical: config.typical,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        records,
        report,
        warnings,
        chart,
    })
}

fn check_inputs(config: &CompareConfig, input: &CompareInput, labels: &[String]) -> Result<(), CompareError> {
    if input.tables.len() != config.files.len() {
        return Err(CompareError::EmptyInput(format!(
            "{} files configured, {} loaded",
            config.files.len(),
            input.tables.len()
        )));
    }
    for (position, table) in input.tables.iter().enumerate() {
        if table.headers.is_empty() {
            return Err(CompareError::EmptyInput(format!(
                "file {} ({}) has no header row",
                position + 1,
                labels[position]
            )));
        }
        if table.is_empty() {
            log::warn!("file {} ({}) has no data rows", position + 1, labels[position]);
        }
    }
    Ok(())
}

pub fn compute_summary(records: &[EvaluatedRecord]) -> CompareSummary {
    let mut summary = CompareSummary {
        total_records: records.len(),
        ..CompareSummary::default()
    };
    for record in records {
        match record.verdict.pass_fail {
            PassFail::Pass => summary.passed += 1,
            PassFail::Fail => summary.failed += 1,
        }
        match record.presence {
            PresenceTag::AllFiles => summary.in_all_files += 1,
            PresenceTag::OnlyFile(_) => summary.in_single_file += 1,
            PresenceTag::SubsetOfFiles(_) => summary.in_some_files += 1,
        }
    }
    summary
}

/// Parse CSV text into a [`Table`]. The delimiter is supplied by the caller.
///
/// Empty text yields a table without headers; [`run`] rejects it.
pub fn load_csv_table(csv_data: &str, delimiter: u8) -> Result<Table, CompareError> {
    let table = Table::from_csv_str(csv_data, delimiter)?;
    log::debug!("parsed {} columns, {} rows", table.headers.len(), table.len());
    Ok(table)
}
