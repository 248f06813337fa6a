use std::collections::HashSet;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::key::SpecKey;
use crate::model::CanonicalTable;

/// Which input files contributed a unified key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceTag {
    AllFiles,
    /// 1-based file index.
    OnlyFile(usize),
    /// 1-based file indices, ascending.
    SubsetOfFiles(Vec<usize>),
}

impl fmt::Display for PresenceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllFiles => write!(f, "Found in all files"),
            Self::OnlyFile(i) => write!(f, "Only found in uploaded file {i}"),
            Self::SubsetOfFiles(files) => {
                let list: Vec<String> = files.iter().map(|i| i.to_string()).collect();
                write!(f, "Found in files: {}", list.join(", "))
            }
        }
    }
}

impl Serialize for PresenceTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Pre-merge key set of every file, in file order.
pub fn key_sets(tables: &[CanonicalTable]) -> Vec<HashSet<SpecKey>> {
    tables
        .iter()
        .map(|t| t.rows.iter().map(|r| r.key.clone()).collect())
        .collect()
}

pub fn classify(key: &SpecKey, key_sets: &[HashSet<SpecKey>]) -> PresenceTag {
    let found: Vec<usize> = key_sets
        .iter()
        .enumerate()
        .filter(|(_, set)| set.contains(key))
        .map(|(i, _)| i + 1)
        .collect();

    if found.len() == key_sets.len() {
        PresenceTag::AllFiles
    } else if found.len() == 1 {
        PresenceTag::OnlyFile(found[0])
    } else {
        PresenceTag::SubsetOfFiles(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sets(files: &[&[&str]]) -> Vec<HashSet<SpecKey>> {
        files
            .iter()
            .map(|keys| keys.iter().map(|k| SpecKey::basic(k, "")).collect())
            .collect()
    }

    #[test]
    fn labels_match_exact_strings() {
        let s = sets(&[&["1", "2", "3"], &["1", "3"], &["1", "4"]]);
        assert_eq!(classify(&SpecKey::basic("1", ""), &s).to_string(), "Found in all files");
        assert_eq!(classify(&SpecKey::basic("2", ""), &s).to_string(), "Only found in uploaded file 1");
        assert_eq!(classify(&SpecKey::basic("4", ""), &s).to_string(), "Only found in uploaded file 3");
        assert_eq!(classify(&SpecKey::basic("3", ""), &s).to_string(), "Found in files: 1, 2");
    }

    #[test]
    fn two_files_never_use_subset_form() {
        let s = sets(&[&["1"], &["2"]]);
        assert_eq!(classify(&SpecKey::basic("2", ""), &s), PresenceTag::OnlyFile(2));
    }

    #[test]
    fn serializes_as_label() {
        let json = serde_json::to_string(&PresenceTag::SubsetOfFiles(vec![2, 4])).unwrap();
        assert_eq!(json, "\"Found in files: 2, 4\"");
    }
}
