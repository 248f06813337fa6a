//! `clcompare run|validate|groups|compare`: config-driven CL comparison.

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};

use clcompare_engine::chart::{group_values, ChartConfig, GroupBy};
use clcompare_engine::config::{ExpansionFilter, FileConfig};
use clcompare_engine::evaluate::MissingLimitPolicy;
use clcompare_engine::key::KeyShape;
use clcompare_engine::{CompareConfig, CompareError, CompareInput, CompareResult};

use crate::exit_codes::{
    compare_exit_code, EXIT_COMPARE_FAILURES, EXIT_COMPARE_INVALID_CONFIG, EXIT_COMPARE_IO, EXIT_ERROR,
};
use crate::CliError;

/// Where and how results are emitted.
#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Output JSON to stdout instead of human summary
    #[arg(long)]
    pub json: bool,

    /// Write JSON output to file
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Write the styled report workbook to this path
    #[arg(long)]
    pub xlsx: Option<PathBuf>,

    /// Exit 3 when any record fails its limits
    #[arg(long)]
    pub strict_exit: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum KeyArg {
    Basic,
    Extended,
}

impl From<KeyArg> for KeyShape {
    fn from(k: KeyArg) -> Self {
        match k {
            KeyArg::Basic => KeyShape::Basic,
            KeyArg::Extended => KeyShape::Extended,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum MissingLimitArg {
    Compliant,
    Unknown,
}

impl From<MissingLimitArg> for MissingLimitPolicy {
    fn from(m: MissingLimitArg) -> Self {
        match m {
            MissingLimitArg::Compliant => MissingLimitPolicy::Compliant,
            MissingLimitArg::Unknown => MissingLimitPolicy::Unknown,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum GroupByArg {
    Category,
    OldName,
}

impl From<GroupByArg> for GroupBy {
    fn from(g: GroupByArg) -> Self {
        match g {
            GroupByArg::Category => GroupBy::Category,
            GroupByArg::OldName => GroupBy::OldName,
        }
    }
}

/// Flags of the ad-hoc `compare` command.
#[derive(Args, Debug, Clone)]
pub struct AdHocArgs {
    /// Display label per file, in file order
    #[arg(long = "label")]
    pub labels: Vec<String>,

    /// Composite key shape
    #[arg(long, value_enum, default_value = "extended")]
    pub key: KeyArg,

    /// Anchor column of the measured value block
    #[arg(long, default_value = "cm_summary")]
    pub values_anchor: String,

    /// Anchor column of the limits block (file 1)
    #[arg(long, default_value = "limits")]
    pub limits_anchor: String,

    /// Ignore per-file Typical values
    #[arg(long)]
    pub no_typical: bool,

    /// First-row text after which computed columns are inserted (e.g. VSWR)
    #[arg(long)]
    pub sentinel: Option<String>,

    /// Cell class when a value has no matching limit
    #[arg(long, value_enum, default_value = "compliant")]
    pub missing_limit: MissingLimitArg,

    /// Expansion filter: all, blank, or an expansion id
    #[arg(long, default_value = "all")]
    pub expansion: String,

    /// Add chart data grouped by this dimension
    #[arg(long, value_enum)]
    pub chart_by: Option<GroupByArg>,

    /// Group value to chart (defaults to the first one found)
    #[arg(long, requires = "chart_by")]
    pub chart_group: Option<String>,
}

fn compare_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

fn engine_err(err: CompareError) -> CliError {
    let hint = match &err {
        CompareError::MissingColumn { .. } | CompareError::TruncatedBlock { .. } => {
            Some("check the block anchors and key columns of that file".to_string())
        }
        CompareError::EmptyInput(_) => Some("every configured file needs a header row".to_string()),
        _ => None,
    };
    CliError { code: compare_exit_code(&err), message: err.to_string(), hint }
}

// ---------------------------------------------------------------------------
// Config + input loading
// ---------------------------------------------------------------------------

fn load_config(config_path: &Path) -> Result<CompareConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        compare_err(EXIT_COMPARE_IO, format!("cannot read config {}: {e}", config_path.display()))
    })?;
    CompareConfig::from_toml(&config_str).map_err(engine_err)
}

/// Load every configured file. Relative paths resolve against `base_dir`.
fn load_input(config: &CompareConfig, base_dir: &Path) -> Result<CompareInput, CliError> {
    let mut tables = Vec::with_capacity(config.files.len());
    for (i, file) in config.files.iter().enumerate() {
        let path = base_dir.join(&file.path);
        log::info!("file {}: {}", i + 1, path.display());
        let table = clcompare_io::load_table(&path).map_err(|e| {
            compare_err(EXIT_COMPARE_IO, format!("file {}: cannot read {}: {e}", i + 1, path.display()))
        })?;
        tables.push(table);
    }
    Ok(CompareInput { tables })
}

fn config_dir(config_path: &Path) -> &Path {
    config_path.parent().unwrap_or_else(|| Path::new("."))
}

/// Output paths from the config resolve like input paths; flags win.
fn merge_outputs(config: &CompareConfig, base_dir: &Path, mut out: OutputArgs) -> OutputArgs {
    if out.xlsx.is_none() {
        out.xlsx = config.output.xlsx.as_ref().map(|p| base_dir.join(p));
    }
    if out.output.is_none() {
        out.output = config.output.json.as_ref().map(|p| base_dir.join(p));
    }
    out
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

pub fn cmd_run(config_path: PathBuf, out: OutputArgs) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let base_dir = config_dir(&config_path);
    let out = merge_outputs(&config, base_dir, out);
    let input = load_input(&config, base_dir)?;
    execute(&config, &input, &out)
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let labels = config.labels();
    eprintln!(
        "valid: \"{}\" ({} files: {}, key {})",
        config.name,
        config.files.len(),
        labels.join(", "),
        config.key
    );
    Ok(())
}

pub fn cmd_groups(config_path: PathBuf, by: Option<GroupByArg>, json: bool) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let input = load_input(&config, config_dir(&config_path))?;
    let result = clcompare_engine::run(&config, &input).map_err(engine_err)?;

    let by: GroupBy = by
        .map(GroupBy::from)
        .or_else(|| config.chart.as_ref().map(|c| c.group_by))
        .unwrap_or_default();
    let values = group_values(&result.records, by);

    if json {
        let json_str = serde_json::to_string_pretty(&serde_json::json!({
            "group_by": by,
            "values": values,
        }))
        .map_err(|e| compare_err(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    } else {
        for value in &values {
            println!("{value}");
        }
        eprintln!("{} distinct {} values", values.len(), by.title());
    }
    Ok(())
}

pub fn cmd_compare(files: Vec<PathBuf>, args: AdHocArgs, out: OutputArgs) -> Result<(), CliError> {
    let config = adhoc_config(&files, &args)?;
    let input = load_input(&config, Path::new(""))?;
    execute(&config, &input, &out)
}

fn adhoc_config(files: &[PathBuf], args: &AdHocArgs) -> Result<CompareConfig, CliError> {
    if !args.labels.is_empty() && args.labels.len() != files.len() {
        return Err(CliError::args(format!(
            "{} labels given for {} files",
            args.labels.len(),
            files.len()
        ))
        .with_hint("pass --label once per file, or not at all"));
    }

    let paths: Vec<String> = files.iter().map(|p| p.to_string_lossy().into_owned()).collect();
    let mut config = CompareConfig::for_files(&paths);
    config.files = paths
        .iter()
        .enumerate()
        .map(|(i, path)| FileConfig { path: path.clone(), label: args.labels.get(i).cloned() })
        .collect();
    config.key = args.key.into();
    config.blocks.values.anchor = args.values_anchor.clone();
    config.blocks.limits.anchor = args.limits_anchor.clone();
    config.typical = !args.no_typical;
    config.sentinel = args.sentinel.clone();
    config.missing_limit = args.missing_limit.into();
    config.expansion = ExpansionFilter::from(args.expansion.clone());
    config.chart = args.chart_by.map(|by| ChartConfig {
        group_by: by.into(),
        group: args.chart_group.clone(),
        ..ChartConfig::default()
    });

    config
        .validate()
        .map_err(|e| compare_err(EXIT_COMPARE_INVALID_CONFIG, e.to_string()))?;
    Ok(config)
}

/// Run the engine, then write outputs. Nothing is written unless the whole
/// pipeline succeeded.
fn execute(config: &CompareConfig, input: &CompareInput, out: &OutputArgs) -> Result<(), CliError> {
    let result = clcompare_engine::run(config, input).map_err(engine_err)?;

    write_outputs(&result, out)?;

    if out.json {
        let json_str = serde_json::to_string_pretty(&result)
            .map_err(|e| compare_err(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    print_summary(&result);

    if out.strict_exit && result.summary.failed > 0 {
        return Err(compare_err(
            EXIT_COMPARE_FAILURES,
            format!("{} of {} records failed", result.summary.failed, result.summary.total_records),
        ));
    }
    Ok(())
}

/// Write the JSON and workbook outputs. Both land or neither does.
fn write_outputs(result: &CompareResult, out: &OutputArgs) -> Result<(), CliError> {
    let mut staged: Vec<(PathBuf, PathBuf)> = Vec::new();
    let written = stage_outputs(result, out, &mut staged).and_then(|()| commit_outputs(&staged));
    if written.is_err() {
        for (partial, _) in &staged {
            let _ = std::fs::remove_file(partial);
        }
    }
    written
}

fn stage_outputs(
    result: &CompareResult,
    out: &OutputArgs,
    staged: &mut Vec<(PathBuf, PathBuf)>,
) -> Result<(), CliError> {
    if let Some(ref path) = out.output {
        let partial = partial_path(path);
        staged.push((partial.clone(), path.clone()));
        clcompare_io::json::export(result, &partial)
            .map_err(|e| compare_err(EXIT_COMPARE_IO, format!("cannot write output: {e}")))?;
    }
    if let Some(ref path) = out.xlsx {
        let partial = partial_path(path);
        staged.push((partial.clone(), path.clone()));
        clcompare_io::xlsx::export_report(result, &partial)
            .map_err(|e| compare_err(EXIT_COMPARE_IO, format!("cannot write workbook: {e}")))?;
    }
    Ok(())
}

/// Move staged files onto their targets, undoing earlier moves on failure.
fn commit_outputs(staged: &[(PathBuf, PathBuf)]) -> Result<(), CliError> {
    for (i, (partial, path)) in staged.iter().enumerate() {
        if let Err(e) = std::fs::rename(partial, path) {
            for (_, done) in &staged[..i] {
                let _ = std::fs::remove_file(done);
            }
            return Err(compare_err(EXIT_COMPARE_IO, format!("cannot write {}: {e}", path.display())));
        }
    }
    for (_, path) in staged {
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

/// `report.xlsx` -> `report.xlsx.partial`, in the same directory.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

fn print_summary(result: &CompareResult) {
    let s = &result.summary;
    eprintln!(
        "{}: {} records ({} files), {} pass, {} fail",
        result.meta.config_name, s.total_records, result.meta.file_count, s.passed, s.failed
    );
    eprintln!(
        "  presence: {} in all files, {} in one file, {} in some files",
        s.in_all_files, s.in_single_file, s.in_some_files
    );
    if s.coercion_warnings > 0 {
        eprintln!("  {} non-numeric value(s) treated as empty", s.coercion_warnings);
    }
    if let Some(ref after) = result.report.relocated_after {
        eprintln!("  computed columns placed after \"{after}\"");
    }
}
