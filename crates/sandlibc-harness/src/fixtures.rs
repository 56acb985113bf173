//! Fixture loading and management.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::HarnessError;

/// A single fixture test case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureCase {
    /// Case identifier.
    pub name: String,
    /// Runtime function under test (see [`crate::executor::FUNCTIONS`]).
    pub function: String,
    /// C standard or runtime behavior reference.
    pub reference: String,
    /// Function-specific inputs.
    pub inputs: serde_json::Value,
    /// Expected rendered output.
    pub expected_output: String,
    /// Expected errno after the call.
    #[serde(default)]
    pub expected_errno: i32,
}

/// A collection of fixture cases for a function family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureSet {
    /// Schema version.
    pub version: String,
    /// Function family name.
    pub family: String,
    /// UTC timestamp of capture.
    pub captured_at: String,
    /// Individual test cases.
    pub cases: Vec<FixtureCase>,
}

impl FixtureSet {
    /// Load fixture set from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize fixture set to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load fixture set from a file path.
    pub fn from_file(path: &Path) -> Result<Self, HarnessError> {
        Ok(LoadedFixture::from_file(path)?.set)
    }
}

/// A fixture set together with where it came from.
#[derive(Debug, Clone)]
pub struct LoadedFixture {
    pub path: PathBuf,
    /// Lowercase hex SHA-256 of the file bytes.
    pub sha256: String,
    pub set: FixtureSet,
}

impl LoadedFixture {
    pub fn from_file(path: &Path) -> Result<Self, HarnessError> {
        let bytes = std::fs::read(path)?;
        let set = serde_json::from_slice(&bytes)?;
        Ok(Self {
            path: path.to_path_buf(),
            sha256: sha256_hex(&bytes),
            set,
        })
    }
}

/// Loads one fixture file, or every `*.json` file directly under a
/// directory in name order.
pub fn load_fixtures(path: &Path) -> Result<Vec<LoadedFixture>, HarnessError> {
    if path.is_file() {
        return Ok(vec![LoadedFixture::from_file(path)?]);
    }
    let mut paths: Vec<PathBuf> = std::fs::read_dir(path)?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();
    paths.sort();
    if paths.is_empty() {
        return Err(HarnessError::NoFixtures(path.to_path_buf()));
    }
    paths.iter().map(|p| LoadedFixture::from_file(p)).collect()
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "version": "v1",
        "family": "string",
        "captured_at": "2026-01-01T00:00:00Z",
        "cases": [
            {"name": "len", "function": "strlen", "reference": "C11 7.24.6.3",
             "inputs": {"s": "abc"}, "expected_output": "3"}
        ]
    }"#;

    #[test]
    fn errno_defaults_to_zero() {
        let set = FixtureSet::from_json(SAMPLE).expect("parse");
        assert_eq!(set.cases.len(), 1);
        assert_eq!(set.cases[0].expected_errno, 0);
    }

    #[test]
    fn json_round_trip_keeps_cases() {
        let set = FixtureSet::from_json(SAMPLE).expect("parse");
        let again = FixtureSet::from_json(&set.to_json().expect("json")).expect("reparse");
        assert_eq!(again.cases[0].name, "len");
        assert_eq!(again.family, "string");
    }

    #[test]
    fn digest_is_lowercase_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn directory_without_json_is_an_error() {
        let dir = std::env::temp_dir().join(format!("sandlibc-empty-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("dir");
        assert!(matches!(
            load_fixtures(&dir),
            Err(HarnessError::NoFixtures(_))
        ));
    }
}
