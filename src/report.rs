// src/report.rs - Per-run outcome collection and summary for the test clients

use std::time::{Duration, Instant};

use crate::constants::{LOG_PREFIX_ERROR, LOG_PREFIX_SUCCESS};
use crate::utils::format_duration;

/// Result of one named test request
#[derive(Debug, Clone)]
pub struct TestOutcome {
    pub name: String,
    pub passed: bool,
    pub latency: Option<Duration>,
    pub detail: Option<String>,
}

/// Accumulates outcomes across a sequential test run and prints a summary.
/// Requests are one at a time, so no synchronization is needed here.
#[derive(Debug)]
pub struct TestReport {
    outcomes: Vec<TestOutcome>,
    started: Instant,
}

impl TestReport {
    pub fn new() -> Self {
        Self {
            outcomes: Vec::new(),
            started: Instant::now(),
        }
    }

    pub fn record_pass(&mut self, name: &str, latency: Duration) {
        self.outcomes.push(TestOutcome {
            name: name.to_string(),
            passed: true,
            latency: Some(latency),
            detail: None,
        });
    }

    pub fn record_fail(&mut self, name: &str, detail: &str) {
        self.outcomes.push(TestOutcome {
            name: name.to_string(),
            passed: false,
            latency: None,
            detail: Some(detail.to_string()),
        });
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    pub fn success_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        self.passed() as f64 / self.total() as f64
    }

    fn latencies(&self) -> impl Iterator<Item = Duration> + '_ {
        self.outcomes.iter().filter_map(|o| o.latency)
    }

    pub fn average_latency(&self) -> Option<Duration> {
        let count = self.latencies().count() as u32;
        if count == 0 {
            return None;
        }
        Some(self.latencies().sum::<Duration>() / count)
    }

    pub fn min_latency(&self) -> Option<Duration> {
        self.latencies().min()
    }

    pub fn max_latency(&self) -> Option<Duration> {
        self.latencies().max()
    }

    pub fn print_summary(&self) {
        println!();
        println!("Summary");
        println!("------------------------------------------------------");
        println!(
            "Tests: {} total, {} passed, {} failed ({:.0}% success)",
            self.total(),
            self.passed(),
            self.failed(),
            self.success_rate() * 100.0
        );

        if let (Some(avg), Some(min), Some(max)) = (
            self.average_latency(),
            self.min_latency(),
            self.max_latency(),
        ) {
            println!(
                "Latency: avg {} | min {} | max {}",
                format_duration(avg),
                format_duration(min),
                format_duration(max)
            );
        }

        println!("Elapsed: {}", format_duration(self.started.elapsed()));

        for outcome in &self.outcomes {
            match (outcome.passed, &outcome.detail) {
                (true, _) => println!("{} {}", LOG_PREFIX_SUCCESS, outcome.name),
                (false, Some(detail)) => {
                    println!("{} {}: {}", LOG_PREFIX_ERROR, outcome.name, detail)
                }
                (false, None) => println!("{} {}", LOG_PREFIX_ERROR, outcome.name),
            }
        }
    }
}

impl Default for TestReport {
    fn default() -> Self {
        Self::new()
    }
}
