use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum CompareError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (file count, duplicate label, bad block, etc.).
    ConfigValidation(String),
    /// A required key column or block anchor is missing from an input file.
    MissingColumn { file: String, column: String },
    /// The block anchor exists but fewer than `width` columns follow it.
    TruncatedBlock { file: String, anchor: String, width: usize, found: usize },
    /// Not every required input was supplied, or an input has no header row.
    EmptyInput(String),
    /// IO / CSV read error.
    Io(String),
}

impl CompareError {
    /// Schema errors are the fatal "required column missing" family.
    pub fn is_schema(&self) -> bool {
        matches!(self, Self::MissingColumn { .. } | Self::TruncatedBlock { .. })
    }
}

impl fmt::Display for CompareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { file, column } => {
                write!(f, "missing column \"{column}\" in {file}")
            }
            Self::TruncatedBlock { file, anchor, width, found } => write!(
                f,
                "{file}: block at \"{anchor}\" needs {width} columns, found {found}"
            ),
            Self::EmptyInput(msg) => write!(f, "empty input: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for CompareError {}
