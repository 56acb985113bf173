//! Runs the checked-in fixtures against the runtime.

use std::collections::BTreeSet;
use std::path::PathBuf;

use sandlibc_harness::executor::FUNCTIONS;
use sandlibc_harness::fixtures::load_fixtures;
use sandlibc_harness::report::FixtureDigest;
use sandlibc_harness::{ConformanceReport, TestRunner, VerificationSummary};

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

#[test]
fn all_fixtures_pass() {
    let loaded = load_fixtures(&fixture_dir()).expect("fixtures load");
    let runner = TestRunner::new("suite");
    let results: Vec<_> = loaded.iter().flat_map(|f| runner.run(&f.set)).collect();
    let summary = VerificationSummary::from_results(results);

    let failures: Vec<String> = summary
        .failures()
        .map(|r| format!("{}: {}", r.case_name, r.diff.as_deref().unwrap_or("")))
        .collect();
    assert!(failures.is_empty(), "failing cases:\n{}", failures.join("\n"));
    assert!(summary.total >= 50, "only {} cases", summary.total);
}

#[test]
fn every_function_has_fixtures() {
    let loaded = load_fixtures(&fixture_dir()).expect("fixtures load");
    let covered: BTreeSet<&str> = loaded
        .iter()
        .flat_map(|f| f.set.cases.iter().map(|c| c.function.as_str()))
        .collect();
    for function in FUNCTIONS {
        assert!(covered.contains(function), "no fixture exercises {function}");
    }
    for function in &covered {
        assert!(FUNCTIONS.contains(function), "fixture names unknown {function}");
    }
}

#[test]
fn case_names_are_unique() {
    let loaded = load_fixtures(&fixture_dir()).expect("fixtures load");
    let mut seen = BTreeSet::new();
    for case in loaded.iter().flat_map(|f| &f.set.cases) {
        assert!(seen.insert(case.name.clone()), "duplicate case {}", case.name);
    }
}

#[test]
fn report_records_fixture_digests() {
    let loaded = load_fixtures(&fixture_dir()).expect("fixtures load");
    let families: Vec<_> = loaded.iter().map(|f| f.set.family.as_str()).collect();
    assert_eq!(families, ["malloc", "stdio", "string", "time"]);

    let runner = TestRunner::new("digest").only(["strlen"]);
    let results: Vec<_> = loaded.iter().flat_map(|f| runner.run(&f.set)).collect();
    let report = ConformanceReport {
        title: "digest".into(),
        timestamp: "2026-10-19T00:00:00.000Z".into(),
        fixtures: loaded.iter().map(FixtureDigest::from).collect(),
        summary: VerificationSummary::from_results(results),
    };
    assert_eq!(report.summary.total, 4);
    assert!(report.fixtures.iter().all(|f| f.sha256.len() == 64));
    assert!(report.to_markdown().contains("| strlen_basic | strlen |"));
}

#[test]
fn single_file_loads() {
    let loaded = load_fixtures(&fixture_dir().join("string.json")).expect("file loads");
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].set.family, "string");
}
