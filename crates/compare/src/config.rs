use std::fmt;

use serde::{Deserialize, Serialize};

use crate::chart::ChartConfig;
use crate::error::CompareError;
use crate::evaluate::MissingLimitPolicy;
use crate::key::{canonical_id, KeyShape};
use crate::mapper::{BlockSpec, DEFAULT_LIMITS_ANCHOR, DEFAULT_VALUE_ANCHOR, LIMITS_LABEL};

pub const MIN_FILES: usize = 2;
pub const MAX_FILES: usize = 4;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CompareConfig {
    #[serde(default = "default_name")]
    pub name: String,
    pub files: Vec<FileConfig>,
    #[serde(default)]
    pub key: KeyShape,
    #[serde(default)]
    pub blocks: BlockConfig,
    /// Track per-file Typical values (report columns and evaluation).
    #[serde(default = "default_true")]
    pub typical: bool,
    /// First-row text that marks where computed columns are inserted.
    #[serde(default)]
    pub sentinel: Option<String>,
    #[serde(default)]
    pub missing_limit: MissingLimitPolicy,
    #[serde(default)]
    pub expansion: ExpansionFilter,
    #[serde(default)]
    pub chart: Option<ChartConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_name() -> String {
    "CL Comparison".into()
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Files + blocks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct FileConfig {
    pub path: String,
    /// Display label; defaults to `File <n>`.
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockConfig {
    #[serde(default = "default_values_block")]
    pub values: BlockSpec,
    #[serde(default = "default_limits_block")]
    pub limits: BlockSpec,
}

fn default_values_block() -> BlockSpec {
    BlockSpec::new(DEFAULT_VALUE_ANCHOR)
}

fn default_limits_block() -> BlockSpec {
    BlockSpec::new(DEFAULT_LIMITS_ANCHOR)
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            values: default_values_block(),
            limits: default_limits_block(),
        }
    }
}

// ---------------------------------------------------------------------------
// Expansion filter
// ---------------------------------------------------------------------------

/// Restricts report and chart rows by `spec_id_expansion`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum ExpansionFilter {
    #[default]
    All,
    Blank,
    Value(String),
}

impl ExpansionFilter {
    pub fn matches(&self, expansion: &str) -> bool {
        match self {
            Self::All => true,
            Self::Blank => expansion.is_empty(),
            Self::Value(v) => expansion == v,
        }
    }
}

impl From<String> for ExpansionFilter {
    fn from(s: String) -> Self {
        let t = s.trim();
        if t.eq_ignore_ascii_case("all") {
            Self::All
        } else if t.eq_ignore_ascii_case("blank") || t.is_empty() {
            Self::Blank
        } else {
            Self::Value(canonical_id(t))
        }
    }
}

impl From<ExpansionFilter> for String {
    fn from(f: ExpansionFilter) -> Self {
        f.to_string()
    }
}

impl fmt::Display for ExpansionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Blank => write!(f, "blank"),
            Self::Value(v) => write!(f, "{v}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub xlsx: Option<String>,
    #[serde(default)]
    pub json: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl CompareConfig {
    pub fn from_toml(input: &str) -> Result<Self, CompareError> {
        let config: CompareConfig =
            toml::from_str(input).map_err(|e| CompareError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// A config for `paths` with default blocks and labels.
    pub fn for_files<S: AsRef<str>>(paths: &[S]) -> Self {
        Self {
            name: default_name(),
            files: paths
                .iter()
                .map(|p| FileConfig { path: p.as_ref().to_string(), label: None })
                .collect(),
            key: KeyShape::default(),
            blocks: BlockConfig::default(),
            typical: true,
            sentinel: None,
            missing_limit: MissingLimitPolicy::default(),
            expansion: ExpansionFilter::default(),
            chart: None,
            output: OutputConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), CompareError> {
        let n = self.files.len();
        if !(MIN_FILES..=MAX_FILES).contains(&n) {
            return Err(CompareError::ConfigValidation(format!(
                "between {MIN_FILES} and {MAX_FILES} files are required, got {n}"
            )));
        }

        let labels = self.labels();
        for (i, label) in labels.iter().enumerate() {
            if label.trim().is_empty() {
                return Err(CompareError::ConfigValidation(format!("file {}: label must not be empty", i + 1)));
            }
            if label == LIMITS_LABEL {
                return Err(CompareError::ConfigValidation(format!(
                    "file {}: label \"{LIMITS_LABEL}\" is reserved for the limits block",
                    i + 1
                )));
            }
            if labels[..i].contains(label) {
                return Err(CompareError::ConfigValidation(format!("duplicate file label \"{label}\"")));
            }
        }

        self.blocks.values.validate()?;
        self.blocks.limits.validate()?;

        if let Some(sentinel) = &self.sentinel {
            if sentinel.trim().is_empty() {
                return Err(CompareError::ConfigValidation("sentinel must not be blank".into()));
            }
        }

        Ok(())
    }

    /// Display label per file, in file order.
    pub fn labels(&self) -> Vec<String> {
        self.files
            .iter()
            .enumerate()
            .map(|(i, f)| f.label.clone().unwrap_or_else(|| format!("File {}", i + 1)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::GroupBy;
    use crate::model::Bound;

    const VALID: &str = r#"
name = "Rev A vs Rev B"
key = "basic"
sentinel = "VSWR"
missing_limit = "unknown"
expansion = "blank"

[[files]]
path = "rev_a.csv"
label = "Rev A"

[[files]]
path = "rev_b.csv"

[blocks.values]
anchor = "cl_values"

[blocks.limits]
anchor = "spec_limits"
fields = ["maximum", "typical", "minimum"]

[chart]
group_by = "old_name"
spec_numbers = ["100", "200"]
show_typ_limit = false

[output]
xlsx = "out.xlsx"
"#;

    #[test]
    fn parse_full_config() {
        let config = CompareConfig::from_toml(VALID).unwrap();
        assert_eq!(config.name, "Rev A vs Rev B");
        assert_eq!(config.key, KeyShape::Basic);
        assert_eq!(config.labels(), vec!["Rev A", "File 2"]);
        assert_eq!(config.sentinel.as_deref(), Some("VSWR"));
        assert_eq!(config.missing_limit, MissingLimitPolicy::Unknown);
        assert_eq!(config.expansion, ExpansionFilter::Blank);
        assert_eq!(config.blocks.values.anchor, "cl_values");
        assert_eq!(config.blocks.values.fields, Bound::ALL.to_vec());
        assert_eq!(config.blocks.limits.fields[0], Bound::Maximum);
        assert!(config.typical);

        let chart = config.chart.unwrap();
        assert_eq!(chart.group_by, GroupBy::OldName);
        assert!(chart.show_min_limit);
        assert!(!chart.show_typ_limit);
        assert_eq!(config.output.xlsx.as_deref(), Some("out.xlsx"));
    }

    #[test]
    fn defaults_for_minimal_config() {
        let config = CompareConfig::from_toml(
            r#"
[[files]]
path = "a.csv"
[[files]]
path = "b.csv"
"#,
        )
        .unwrap();
        assert_eq!(config.key, KeyShape::Extended);
        assert_eq!(config.blocks.values.anchor, "cm_summary");
        assert_eq!(config.blocks.limits.anchor, "limits");
        assert_eq!(config.missing_limit, MissingLimitPolicy::Compliant);
        assert_eq!(config.expansion, ExpansionFilter::All);
        assert!(config.chart.is_none());
    }

    #[test]
    fn reject_file_count() {
        let one = "[[files]]\npath = \"a.csv\"\n";
        let err = CompareConfig::from_toml(one).unwrap_err();
        assert!(err.to_string().contains("between 2 and 4"));

        let five = "[[files]]\npath = \"a\"\n".repeat(5);
        assert!(CompareConfig::from_toml(&five).is_err());
    }

    #[test]
    fn reject_duplicate_labels() {
        let input = r#"
[[files]]
path = "a.csv"
label = "X"
[[files]]
path = "b.csv"
label = "X"
"#;
        let err = CompareConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("duplicate file label"));
    }

    #[test]
    fn reject_reserved_label() {
        let mut config = CompareConfig::for_files(&["a.csv", "b.csv"]);
        config.files[1].label = Some("Limits1".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_unknown_key_shape() {
        let input = "key = \"wide\"\n[[files]]\npath = \"a\"\n[[files]]\npath = \"b\"\n";
        assert!(matches!(CompareConfig::from_toml(input), Err(CompareError::ConfigParse(_))));
    }

    #[test]
    fn expansion_filter_values() {
        assert_eq!(ExpansionFilter::from("All".to_string()), ExpansionFilter::All);
        assert_eq!(ExpansionFilter::from("1.0".to_string()), ExpansionFilter::Value("1".into()));
        assert!(ExpansionFilter::Blank.matches(""));
        assert!(!ExpansionFilter::Blank.matches("1"));
        assert!(ExpansionFilter::Value("2".into()).matches("2"));
    }
}
