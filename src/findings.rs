//! Static-analysis findings
//!
//! Findings arrive as raw analyzer text, one `<path>:<line>: <rule>: <message>`
//! entry per line (PMD's text renderer format). Anything else on a line is
//! noise and gets skipped.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{info, warn};

static FINDING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+):(\d+):\s*([\w-]+):\s*(.+)$").expect("FINDING_RE regex should compile")
});

/// A single analyzer finding attached to a source line
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Finding {
    /// 1-based source line
    pub line: usize,
    pub rule_id: String,
    pub message: String,
}

impl Finding {
    pub fn new(line: usize, rule_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            line,
            rule_id: rule_id.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}: {}", self.line, self.rule_id, self.message)
    }
}

/// Extract findings from raw analyzer output, in input order.
///
/// Lines that don't match the expected format, or whose line number is
/// unusable, are skipped with a warning.
pub fn extract_findings(raw: &str) -> Vec<Finding> {
    let mut findings = Vec::new();

    for line in raw.lines() {
        let trimmed = line.trim_end();
        if trimmed.trim().is_empty() {
            continue;
        }

        let Some(captures) = FINDING_RE.captures(trimmed) else {
            warn!(line = trimmed, "skipping unrecognized analyzer output line");
            continue;
        };

        let line_number = match captures[2].parse::<usize>() {
            Ok(0) | Err(_) => {
                warn!(line = trimmed, "skipping finding with invalid line number");
                continue;
            }
            Ok(n) => n,
        };

        findings.push(Finding::new(
            line_number,
            &captures[3],
            captures[4].trim(),
        ));
    }

    info!("extracted {} findings from analyzer output", findings.len());
    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_pmd_text_lines() {
        let raw = "\
src/main/java/Foo.java:12:\tCyclomaticComplexity:\tThe method 'bar' has a cyclomatic complexity of 14.
src/main/java/Foo.java:40:\tNPathComplexity:\tThe method 'baz' has an NPath complexity of 256
";
        let findings = extract_findings(raw);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].line, 12);
        assert_eq!(findings[0].rule_id, "CyclomaticComplexity");
        assert_eq!(
            findings[0].message,
            "The method 'bar' has a cyclomatic complexity of 14."
        );
        assert_eq!(findings[1].line, 40);
        assert_eq!(findings[1].rule_id, "NPathComplexity");
    }

    #[test]
    fn test_skips_noise_and_bad_line_numbers() {
        let raw = "\
Picked up _JAVA_OPTIONS: -Xmx2g

Foo.java:0: SomeRule: zero is not a line
Foo.java:99999999999999999999999: SomeRule: overflow
Foo.java:7: unused-local: Avoid unused local variables such as 'x'.
";
        let findings = extract_findings(raw);
        assert_eq!(findings, vec![Finding::new(
            7,
            "unused-local",
            "Avoid unused local variables such as 'x'."
        )]);
    }

    #[test]
    fn test_windows_style_paths() {
        let raw = r"C:\work\src\Foo.java:3: GodClass: Possible God Class";
        let findings = extract_findings(raw);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line, 3);
        assert_eq!(findings[0].rule_id, "GodClass");
    }
}
