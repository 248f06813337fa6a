//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                                  |
//! |------|----------------------------------------------------------|
//! | 0    | Success                                                  |
//! | 1    | General error (unspecified)                              |
//! | 2    | CLI usage error (bad args)                               |
//! | 3    | Comparison ran and some records failed (`--strict-exit`) |
//! | 4    | Schema error: required column or block missing           |
//! | 5    | Empty input: file missing rows or headers, wrong count   |
//! | 6    | Invalid config (parse or validation)                     |
//! | 7    | I/O error reading inputs or writing outputs              |

use clcompare_engine::CompareError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Compare (3-7)
// =============================================================================

/// At least one record failed its limits. Only with `--strict-exit`.
pub const EXIT_COMPARE_FAILURES: u8 = 3;

/// A required key column or value block is missing from an input.
pub const EXIT_COMPARE_SCHEMA: u8 = 4;

/// An input has no header row, or fewer files were loaded than configured.
pub const EXIT_COMPARE_EMPTY_INPUT: u8 = 5;

/// Config could not be parsed or failed validation.
pub const EXIT_COMPARE_INVALID_CONFIG: u8 = 6;

/// Reading an input or writing an output failed.
pub const EXIT_COMPARE_IO: u8 = 7;

/// Map an engine error to its exit code.
pub fn compare_exit_code(err: &CompareError) -> u8 {
    match err {
        CompareError::MissingColumn { .. } | CompareError::TruncatedBlock { .. } => EXIT_COMPARE_SCHEMA,
        CompareError::EmptyInput(_) => EXIT_COMPARE_EMPTY_INPUT,
        CompareError::ConfigParse(_) | CompareError::ConfigValidation(_) => EXIT_COMPARE_INVALID_CONFIG,
        CompareError::Io(_) => EXIT_COMPARE_IO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_errors_share_one_code() {
        let missing = CompareError::MissingColumn { file: "file 1".into(), column: "limits".into() };
        let truncated = CompareError::TruncatedBlock {
            file: "file 2".into(),
            anchor: "cm_summary".into(),
            width: 3,
            found: 1,
        };
        assert_eq!(compare_exit_code(&missing), EXIT_COMPARE_SCHEMA);
        assert_eq!(compare_exit_code(&truncated), EXIT_COMPARE_SCHEMA);
    }

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_COMPARE_FAILURES,
            EXIT_COMPARE_SCHEMA,
            EXIT_COMPARE_EMPTY_INPUT,
            EXIT_COMPARE_INVALID_CONFIG,
            EXIT_COMPARE_IO,
        ];
        for (i, a) in codes.iter().enumerate() {
            assert!(!codes[i + 1..].contains(a), "duplicate exit code {a}");
        }
    }
}
