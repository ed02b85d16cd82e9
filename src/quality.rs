//! Before/after comparison of analyzer findings
//!
//! Once rewrites are spliced in, the analyzer is run again on the result.
//! Comparing the two finding lists tells whether the rewrite fixed issues,
//! left them alone, or introduced new ones. Metric values are read out of
//! messages like "The method 'foo()' has a cyclomatic complexity of 12."

use crate::findings::Finding;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;
use tracing::{info, warn};

static METRIC_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bhas\b.*?\s(\d+)").expect("METRIC_VALUE_RE regex should compile")
});

/// Aggregate of one metric's values
#[derive(Debug, Clone, PartialEq)]
pub struct MetricStats {
    pub count: usize,
    pub average: f64,
    pub max: u64,
}

/// Per-rule metric statistics for one analyzer run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSummary {
    pub metrics: BTreeMap<String, MetricStats>,
    /// Largest number of values reported for any single rule
    pub total_methods: usize,
}

/// Direction of change in finding count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityOutcome {
    Fixed(usize),
    Unchanged,
    Introduced(usize),
}

impl fmt::Display for QualityOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityOutcome::Fixed(n) => write!(f, "LLM response fixed {} analyzer issue(s).", n),
            QualityOutcome::Unchanged => write!(f, "LLM response didn't affect analyzer issues."),
            QualityOutcome::Introduced(n) => {
                write!(f, "LLM response introduced {} new analyzer issue(s).", n)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QualityReport {
    pub before_count: usize,
    pub after_count: usize,
    pub outcome: QualityOutcome,
    pub before_metrics: MetricsSummary,
    pub after_metrics: MetricsSummary,
}

/// Numeric metric values per rule, in finding order.
/// Findings whose message carries no "has ... N" value are ignored.
pub fn extract_metrics(findings: &[Finding]) -> BTreeMap<String, Vec<u64>> {
    let mut metrics: BTreeMap<String, Vec<u64>> = BTreeMap::new();
    for finding in findings {
        let Some(value) = METRIC_VALUE_RE
            .captures(&finding.message)
            .and_then(|c| c[1].parse::<u64>().ok())
        else {
            continue;
        };
        metrics.entry(finding.rule_id.clone()).or_default().push(value);
    }
    metrics
}

pub fn summarize_metrics(findings: &[Finding]) -> MetricsSummary {
    let values = extract_metrics(findings);
    let total_methods = values.values().map(Vec::len).max().unwrap_or(0);

    let metrics = values
        .into_iter()
        .map(|(rule, values)| {
            let sum: u64 = values.iter().sum();
            let stats = MetricStats {
                count: values.len(),
                average: sum as f64 / values.len() as f64,
                max: values.iter().copied().max().unwrap_or(0),
            };
            (rule, stats)
        })
        .collect();

    MetricsSummary {
        metrics,
        total_methods,
    }
}

/// Compare analyzer findings on the original file with those on the rewrite.
pub fn compare_findings(before: &[Finding], after: &[Finding]) -> QualityReport {
    let before_count = before.len();
    let after_count = after.len();

    let outcome = match after_count.cmp(&before_count) {
        std::cmp::Ordering::Less => QualityOutcome::Fixed(before_count - after_count),
        std::cmp::Ordering::Equal => QualityOutcome::Unchanged,
        std::cmp::Ordering::Greater => QualityOutcome::Introduced(after_count - before_count),
    };

    match outcome {
        QualityOutcome::Introduced(_) => warn!(before_count, after_count, "{}", outcome),
        _ => info!(before_count, after_count, "{}", outcome),
    }

    QualityReport {
        before_count,
        after_count,
        outcome,
        before_metrics: summarize_metrics(before),
        after_metrics: summarize_metrics(after),
    }
}

fn write_metrics(f: &mut fmt::Formatter<'_>, label: &str, summary: &MetricsSummary) -> fmt::Result {
    writeln!(f, "{}:", label)?;
    for (rule, stats) in &summary.metrics {
        writeln!(f, "  {}: Average: {:.2}, Max: {}", rule, stats.average, stats.max)?;
    }
    writeln!(f, "  Total Methods: {}", summary.total_methods)
}

impl fmt::Display for QualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Analyzer findings: {} before, {} after",
            self.before_count, self.after_count
        )?;
        writeln!(f, "{}", self.outcome)?;
        write_metrics(f, "Metrics before", &self.before_metrics)?;
        write_metrics(f, "Metrics after", &self.after_metrics)
    }
}
