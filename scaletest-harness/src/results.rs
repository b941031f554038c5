//! Immutable snapshots of finished runs and their text/JSON rendering

use chrono::{DateTime, Utc};
use humantime::format_duration;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::time::Duration;

use crate::error::RunError;

/// Outcome of a single finished run
#[derive(Debug, Clone)]
pub struct RunResult {
    pub full_id: String,
    pub test_name: String,
    pub id: String,
    pub logs: String,
    /// `None` when the run passed
    pub error: Option<RunError>,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
}

impl RunResult {
    pub fn passed(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate outcome of a harness
#[derive(Debug, Clone, Default)]
pub struct Results {
    pub total_runs: usize,
    pub total_pass: usize,
    pub total_fail: usize,
    /// Wall-clock time of the whole run phase
    pub elapsed: Duration,
    /// Keyed by full id
    pub runs: BTreeMap<String, RunResult>,
}

impl Results {
    pub fn from_runs(runs: impl IntoIterator<Item = RunResult>, elapsed: Duration) -> Self {
        let mut results = Results {
            elapsed,
            ..Default::default()
        };
        for run in runs {
            results.total_runs += 1;
            if run.passed() {
                results.total_pass += 1;
            } else {
                results.total_fail += 1;
            }
            results.runs.insert(run.full_id.clone(), run);
        }
        results
    }

    pub fn is_success(&self) -> bool {
        self.total_fail == 0
    }

    pub fn failed(&self) -> impl Iterator<Item = &RunResult> {
        self.runs.values().filter(|r| !r.passed())
    }

    /// Human readable report: every failure with its logs, then totals
    pub fn print_text<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        let mut total_duration = Duration::ZERO;
        for run in self.runs.values() {
            total_duration += run.duration;
            let Some(err) = &run.error else {
                continue;
            };

            write!(w, "\n== FAIL: {}\n\n", run.full_id)?;
            write!(w, "\tError: {:#}\n\n", err)?;
            writeln!(w, "\tLog:")?;
            for line in run.logs.lines() {
                writeln!(w, "\t\t{}", line)?;
            }
        }

        write!(w, "\n\nTest results:\n")?;
        if self.total_runs == 0 {
            writeln!(w, "\tNo tests run")?;
            return Ok(());
        }
        writeln!(w, "\tPass:  {}", self.total_pass)?;
        writeln!(w, "\tFail:  {}", self.total_fail)?;
        writeln!(w, "\tTotal: {}", self.total_runs)?;
        writeln!(w)?;
        writeln!(w, "\tTotal duration: {}", format_duration(self.elapsed))?;
        writeln!(
            w,
            "\tAvg. duration:  {}",
            format_duration(total_duration / self.total_runs as u32)
        )?;
        Ok(())
    }
}

#[derive(Serialize)]
struct RunResultJson<'a> {
    full_id: &'a str,
    test_name: &'a str,
    id: &'a str,
    logs: &'a str,
    started_at: &'a DateTime<Utc>,
    duration: String,
    duration_ms: u64,
    error: Option<String>,
}

impl Serialize for RunResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RunResultJson {
            full_id: &self.full_id,
            test_name: &self.test_name,
            id: &self.id,
            logs: &self.logs,
            started_at: &self.started_at,
            duration: format_duration(self.duration).to_string(),
            duration_ms: self.duration.as_millis() as u64,
            error: self.error.as_ref().map(|e| format!("{:#}", e)),
        }
        .serialize(serializer)
    }
}

#[derive(Serialize)]
struct ResultsJson<'a> {
    total_runs: usize,
    total_pass: usize,
    total_fail: usize,
    elapsed: String,
    elapsed_ms: u64,
    runs: &'a BTreeMap<String, RunResult>,
}

impl Serialize for Results {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ResultsJson {
            total_runs: self.total_runs,
            total_pass: self.total_pass,
            total_fail: self.total_fail,
            elapsed: format_duration(self.elapsed).to_string(),
            elapsed_ms: self.elapsed.as_millis() as u64,
            runs: &self.runs,
        }
        .serialize(serializer)
    }
}
