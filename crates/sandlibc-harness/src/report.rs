//! Report generation for conformance results.

use serde::{Deserialize, Serialize};

use crate::fixtures::LoadedFixture;
use crate::verify::VerificationSummary;

/// Where a fixture set came from and what it hashed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureDigest {
    pub path: String,
    pub family: String,
    /// Lowercase hex SHA-256 of the fixture file.
    pub sha256: String,
    pub cases: usize,
}

impl From<&LoadedFixture> for FixtureDigest {
    fn from(loaded: &LoadedFixture) -> Self {
        Self {
            path: loaded.path.display().to_string(),
            family: loaded.set.family.clone(),
            sha256: loaded.sha256.clone(),
            cases: loaded.set.cases.len(),
        }
    }
}

/// A conformance report: what ran, against which fixtures, and how it went.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConformanceReport {
    /// Report title.
    pub title: String,
    /// Timestamp (UTC).
    pub timestamp: String,
    /// Fixture files the run loaded.
    pub fixtures: Vec<FixtureDigest>,
    /// Verification summary.
    pub summary: VerificationSummary,
}

impl ConformanceReport {
    /// Render the report as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", self.title));
        out.push_str(&format!("- Timestamp: {}\n", self.timestamp));
        out.push_str(&format!("- Total: {}\n", self.summary.total));
        out.push_str(&format!("- Passed: {}\n", self.summary.passed));
        out.push_str(&format!("- Failed: {}\n\n", self.summary.failed));

        if !self.fixtures.is_empty() {
            out.push_str("## Fixtures\n\n");
            for f in &self.fixtures {
                out.push_str(&format!(
                    "- `{}` ({}, {} cases) sha256 `{}`\n",
                    f.path, f.family, f.cases, f.sha256
                ));
            }
            out.push('\n');
        }

        out.push_str("| Case | Function | Reference | Status |\n");
        out.push_str("|------|----------|-----------|--------|\n");
        for r in &self.summary.results {
            let status = if r.passed { "PASS" } else { "FAIL" };
            out.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                r.case_name, r.function, r.reference, status
            ));
        }

        let failures: Vec<_> = self.summary.failures().collect();
        if !failures.is_empty() {
            out.push_str("\n## Failures\n");
            for r in failures {
                out.push_str(&format!("\n### {}\n\n```\n", r.case_name));
                out.push_str(r.diff.as_deref().unwrap_or("(no diff)"));
                out.push_str("\n```\n");
            }
        }
        out
    }

    /// Render the report as JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}
