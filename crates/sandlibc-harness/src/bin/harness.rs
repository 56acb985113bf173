//! CLI entrypoint for the sandlibc conformance harness.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use sandlibc_core::malloc::HeapLimits;
use sandlibc_core::time;
use sandlibc_harness::report::FixtureDigest;
use sandlibc_harness::structured_log::{LogEmitter, LogEntry, LogLevel, Outcome};
use sandlibc_harness::{ConformanceReport, TestRunner, VerificationSummary, alloc_trace, fixtures};

/// Conformance tooling for sandlibc.
#[derive(Debug, Parser)]
#[command(name = "sandlibc-harness")]
#[command(about = "Conformance testing harness for sandlibc")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Verify the runtime against fixture files.
    Verify {
        /// Fixture JSON file, or a directory of them.
        #[arg(long)]
        fixture: PathBuf,
        /// Output report path (markdown).
        #[arg(long)]
        report: Option<PathBuf>,
        /// Output report path (JSON).
        #[arg(long)]
        json: Option<PathBuf>,
        /// Per-case JSONL log path.
        #[arg(long)]
        log: Option<PathBuf>,
        /// Fixed report timestamp, for reproducible reports.
        #[arg(long)]
        timestamp: Option<String>,
        /// Only run cases for these functions (repeatable).
        #[arg(long = "function")]
        functions: Vec<String>,
    },
    /// Format an epoch instant with strftime.
    Strftime {
        #[arg(long, allow_hyphen_values = true)]
        epoch: i64,
        #[arg(long, default_value = "%a %b %e %H:%M:%S %Y")]
        format: String,
        /// Minutes west of UTC.
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        offset: i32,
    },
    /// Trace allocator lifecycle for a list of sizes as JSONL.
    AllocTrace {
        /// Comma-separated allocation sizes.
        #[arg(long, value_delimiter = ',', default_value = "16,256,4096")]
        sizes: Vec<usize>,
        /// Heap page ceiling.
        #[arg(long)]
        max_pages: Option<usize>,
        /// Output path; stdout when absent.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Verify {
            fixture,
            report,
            json,
            log,
            timestamp,
            functions,
        } => {
            eprintln!("Verifying against fixtures in {}", fixture.display());
            let loaded = fixtures::load_fixtures(&fixture)?;

            let mut runner = TestRunner::new("fixture-verify");
            if !functions.is_empty() {
                runner = runner.only(functions);
            }
            let mut results = Vec::new();
            for set in &loaded {
                results.extend(runner.run(&set.set));
            }

            if let Some(log_path) = log {
                let mut emitter = LogEmitter::to_file(&log_path, &runner.campaign)?;
                for r in &results {
                    let outcome = if r.passed { Outcome::Pass } else { Outcome::Fail };
                    let level = if r.passed { LogLevel::Info } else { LogLevel::Error };
                    emitter.emit_entry(
                        LogEntry::new("", level, "case_verified")
                            .with_api(&r.family, &r.function)
                            .with_outcome(outcome)
                            .with_errno(r.actual_errno)
                            .with_details(serde_json::json!({
                                "case": r.case_name,
                                "reference": r.reference,
                            })),
                    )?;
                }
                emitter.flush()?;
                eprintln!("Wrote {} log lines to {}", emitter.emitted(), log_path.display());
            }

            let summary = VerificationSummary::from_results(results);
            let report_doc = ConformanceReport {
                title: String::from("sandlibc Conformance Report"),
                timestamp: timestamp.unwrap_or_else(|| {
                    LogEntry::new("", LogLevel::Info, "report").timestamp
                }),
                fixtures: loaded.iter().map(FixtureDigest::from).collect(),
                summary,
            };

            eprintln!(
                "Verification complete: total={}, passed={}, failed={}",
                report_doc.summary.total, report_doc.summary.passed, report_doc.summary.failed
            );
            for r in report_doc.summary.failures() {
                eprintln!("FAIL {}: {}", r.case_name, r.diff.as_deref().unwrap_or(""));
            }

            if let Some(report_path) = report {
                eprintln!("Writing report to {}", report_path.display());
                std::fs::write(&report_path, report_doc.to_markdown())?;
            }
            if let Some(json_path) = json {
                std::fs::write(&json_path, report_doc.to_json())?;
            }

            if !report_doc.summary.all_passed() {
                return Err("Conformance verification failed".into());
            }
        }
        Command::Strftime {
            epoch,
            format,
            offset,
        } => {
            let cal = time::to_calendar(epoch, offset)
                .ok_or_else(|| format!("epoch {epoch} does not fit a calendar year"))?;
            let text = time::render(format.as_bytes(), &cal, offset);
            println!("{}", String::from_utf8_lossy(&text));
        }
        Command::AllocTrace {
            sizes,
            max_pages,
            output,
        } => {
            let mut heap = HeapLimits::default();
            if let Some(pages) = max_pages {
                heap.max_pages = pages;
            }
            let entries = alloc_trace::trace_sizes(&sizes, heap);
            let mut lines = String::new();
            for entry in &entries {
                lines.push_str(&entry.to_jsonl()?);
                lines.push('\n');
            }
            match output {
                Some(path) => {
                    std::fs::write(&path, lines)?;
                    eprintln!("Wrote {} entries to {}", entries.len(), path.display());
                }
                None => print!("{lines}"),
            }
        }
    }

    Ok(())
}
