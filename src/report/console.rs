//! # Simple console renderer for debugging and demos.
//!
//! [`ConsoleReport`] prints unit failures as they arrive and a one-line
//! summary at the end of each generation.
//!
//! ## Output format
//! ```text
//! --- diagnostics -------------------------------
//! Debug.log output captured during suite setup
//! -----------------------------------------------
//! FAIL unit=3 (12.4ms)
//!   expected 4, got 5
//! TODO unit=7
//! summary: 10 units, 8 passed, 1 failed, 1 todo
//! ```
//!
//! Not intended for CI pipelines; implement a custom [`Report`] for JSON or
//! JUnit output.

use async_trait::async_trait;

use crate::report::renderer::{ExitStatus, Report};
use crate::suite::{Outcome, UnitResult};

/// Embedded renderer printing human-readable lines to stdout/stderr.
///
/// Passing units are silent; failures print their logs. Todo units are
/// counted as not-passing, matching the strict interpretation a CI caller
/// expects from the exit code.
#[derive(Debug, Default)]
pub struct ConsoleReport {
    unit_count: u32,
    passed: u32,
    failed: u32,
    todo: u32,
}

impl ConsoleReport {
    /// Creates a renderer with empty tallies.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Report for ConsoleReport {
    async fn restart(&mut self, unit_count: u32) {
        self.unit_count = unit_count;
        self.passed = 0;
        self.failed = 0;
        self.todo = 0;
    }

    async fn diagnostic(&mut self, lines: &[String]) {
        if lines.is_empty() {
            return;
        }
        eprintln!("--- diagnostics -------------------------------");
        for line in lines {
            eprintln!("{line}");
        }
        eprintln!("-----------------------------------------------");
    }

    async fn ingest(&mut self, result: &UnitResult) {
        match result.outcome {
            Outcome::Passed => self.passed += 1,
            Outcome::Failed => {
                self.failed += 1;
                println!("FAIL unit={} ({:.1}ms)", result.unit, result.duration_ms);
                for line in &result.logs {
                    println!("  {line}");
                }
            }
            Outcome::Todo => {
                self.todo += 1;
                println!("TODO unit={}", result.unit);
            }
        }
    }

    async fn finish(&mut self) -> ExitStatus {
        println!(
            "summary: {} units, {} passed, {} failed, {} todo",
            self.unit_count, self.passed, self.failed, self.todo
        );
        if self.failed == 0 && self.todo == 0 {
            ExitStatus::Success
        } else {
            ExitStatus::TestFailures
        }
    }
}
