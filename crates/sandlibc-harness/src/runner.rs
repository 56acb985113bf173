//! Test execution engine.

use crate::diff;
use crate::executor::{self, Execution};
use crate::fixtures::{FixtureCase, FixtureSet};
use crate::verify::VerificationResult;

/// Runs a fixture set and collects verification results.
pub struct TestRunner {
    /// Name of the test campaign.
    pub campaign: String,
    /// When set, only cases whose function is listed run.
    pub functions: Option<Vec<String>>,
}

impl TestRunner {
    /// Create a new test runner.
    #[must_use]
    pub fn new(campaign: impl Into<String>) -> Self {
        Self {
            campaign: campaign.into(),
            functions: None,
        }
    }

    /// Restricts the run to the named functions.
    #[must_use]
    pub fn only(mut self, functions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.functions = Some(functions.into_iter().map(Into::into).collect());
        self
    }

    /// Run all fixtures in a set and return results.
    pub fn run(&self, fixture_set: &FixtureSet) -> Vec<VerificationResult> {
        fixture_set
            .cases
            .iter()
            .filter(|case| self.selects(case))
            .map(|case| verify_case(&fixture_set.family, case))
            .collect()
    }

    fn selects(&self, case: &FixtureCase) -> bool {
        self.functions
            .as_ref()
            .is_none_or(|names| names.iter().any(|n| n == &case.function))
    }
}

fn verify_case(family: &str, case: &FixtureCase) -> VerificationResult {
    let (actual, actual_errno, mut diff_out) = match executor::execute(&case.function, &case.inputs)
    {
        Ok(Execution { output, errno }) => {
            let diff_out = (output != case.expected_output)
                .then(|| diff::render_diff(&case.expected_output, &output));
            (output, errno, diff_out)
        }
        Err(err) => {
            let actual = format!("unsupported:{err}");
            let diff_out = Some(diff::render_diff(&case.expected_output, &actual));
            (actual, 0, diff_out)
        }
    };
    let errno_matches = actual_errno == case.expected_errno;
    if !errno_matches {
        let note = format!(
            "errno mismatch: expected={}, actual={actual_errno}",
            case.expected_errno
        );
        diff_out = Some(match diff_out {
            Some(d) => format!("{d}\n{note}"),
            None => note,
        });
    }
    VerificationResult {
        case_name: case.name.clone(),
        family: family.to_owned(),
        function: case.function.clone(),
        reference: case.reference.clone(),
        passed: actual == case.expected_output && errno_matches,
        expected: case.expected_output.clone(),
        actual,
        expected_errno: case.expected_errno,
        actual_errno,
        diff: diff_out,
    }
}
