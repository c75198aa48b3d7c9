//! Rendering findings for the terminal or for machines.
//!
//! The table report has three parts: an optional per-finding detail table, a
//! per-check summary, and the run totals. The JSON report carries the same data.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use clap::ValueEnum;
use colored::*;
use serde::Serialize;

use crate::error::Result;
use crate::finding::{Finding, Severity};
use crate::rules::{RULE_EXECUTION_ERROR, RuleEngine};

/// Output format selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Per-check issue count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckSummary {
    pub check: String,
    pub description: String,
    pub severity: Severity,
    pub issues: usize,
}

/// Totals for one lint run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub checks_ran: usize,
    pub checks_with_issues: usize,
    pub total_issues: usize,
    pub by_check: Vec<CheckSummary>,
}

impl Summary {
    /// Tally findings against the rules that ran.
    ///
    /// Checks that found nothing are left out of `by_check`; findings from a check the
    /// engine does not know (rule execution errors) are still counted.
    pub fn new(findings: &[Finding], engine: &RuleEngine) -> Self {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for finding in findings {
            *counts.entry(finding.check.as_str()).or_default() += 1;
        }

        let failed_rules: BTreeSet<&str> = findings.iter().filter_map(|f| f.failed_rule.as_deref()).collect();

        let by_check = counts
            .into_iter()
            .map(|(check, issues)| {
                let rule = engine.rules().find(|rule| rule.id() == check);
                let description = match rule {
                    Some(rule) => rule.description().to_string(),
                    None if check == RULE_EXECUTION_ERROR && !failed_rules.is_empty() => format!(
                        "Checks that could not be evaluated: {}",
                        failed_rules.iter().copied().collect::<Vec<_>>().join(", ")
                    ),
                    None => String::new(),
                };
                CheckSummary {
                    check: check.to_string(),
                    description,
                    severity: rule.map(|r| r.severity()).unwrap_or(Severity::High),
                    issues,
                }
            })
            .collect::<Vec<_>>();

        Self {
            checks_ran: engine.len(),
            checks_with_issues: by_check.len(),
            total_issues: findings.len(),
            by_check,
        }
    }
}

#[derive(Serialize)]
struct JsonFinding<'a> {
    check: &'a str,
    component: String,
    resource: &'a str,
    message: &'a str,
    severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    failed_rule: Option<&'a str>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    findings: Vec<JsonFinding<'a>>,
    summary: &'a Summary,
}

/// Render findings as pretty-printed JSON
pub fn render_json(findings: &[Finding], summary: &Summary) -> Result<String> {
    let report = JsonReport {
        findings: findings
            .iter()
            .map(|f| JsonFinding {
                check: &f.check,
                component: f.component.to_string(),
                resource: &f.resource,
                message: &f.message,
                severity: f.severity,
                failed_rule: f.failed_rule.as_deref(),
            })
            .collect(),
        summary,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Render the human readable report; `verbose` adds one row per finding
pub fn render_table(findings: &[Finding], summary: &Summary, verbose: bool) -> String {
    let mut out = String::new();

    if verbose && !findings.is_empty() {
        out.push_str(&detail_table(findings));
        out.push('\n');
    }

    if !summary.by_check.is_empty() {
        out.push_str(&summary_table(summary));
        out.push('\n');
    }

    let _ = writeln!(out, "{:<20} {}", "Checks ran:", summary.checks_ran);
    let _ = writeln!(out, "{:<20} {}", "Checks with issues:", summary.checks_with_issues);
    let total = summary.total_issues.to_string();
    let total = if summary.total_issues == 0 {
        total.green()
    } else {
        total.red().bold()
    };
    let _ = writeln!(out, "{:<20} {}", "Total issue count:", total);
    out
}

fn detail_table(findings: &[Finding]) -> String {
    let headers = ["Check", "Component", "Resource", "Severity"];
    let rows: Vec<[String; 4]> = findings
        .iter()
        .map(|f| {
            [
                f.check.clone(),
                f.component.to_string(),
                f.resource.clone(),
                f.severity.to_string(),
            ]
        })
        .collect();
    let widths = column_widths(&headers, &rows);

    let mut out = String::new();
    let _ = writeln!(out, "{}", header_line(&headers, &widths).bold());
    for (finding, row) in findings.iter().zip(&rows) {
        let _ = writeln!(
            out,
            "{:<w0$}  {:<w1$}  {:<w2$}  {}  {}",
            row[0],
            row[1],
            row[2],
            paint_severity(finding.severity, &format!("{:<w$}", row[3], w = widths[3])),
            finding.message,
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2],
        );
    }
    out
}

fn summary_table(summary: &Summary) -> String {
    let headers = ["Check", "Issues", "Severity", "Description"];
    let rows: Vec<[String; 4]> = summary
        .by_check
        .iter()
        .map(|c| {
            [
                c.check.clone(),
                c.issues.to_string(),
                c.severity.to_string(),
                c.description.clone(),
            ]
        })
        .collect();
    let widths = column_widths(&headers, &rows);

    let mut out = String::new();
    let _ = writeln!(out, "{}", header_line(&headers, &widths).bold());
    for (check, row) in summary.by_check.iter().zip(&rows) {
        let _ = writeln!(
            out,
            "{:<w0$}  {:>w1$}  {}  {}",
            row[0],
            row[1],
            paint_severity(check.severity, &format!("{:<w$}", row[2], w = widths[2])),
            row[3],
            w0 = widths[0],
            w1 = widths[1],
        );
    }
    out
}

fn column_widths(headers: &[&str; 4], rows: &[[String; 4]]) -> [usize; 4] {
    let mut widths = headers.map(str::len);
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }
    widths
}

fn header_line(headers: &[&str; 4], widths: &[usize; 4]) -> String {
    headers
        .iter()
        .zip(widths)
        .map(|(h, w)| format!("{:<w$}", h, w = *w))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

fn paint_severity(severity: Severity, text: &str) -> ColoredString {
    match severity {
        Severity::High => text.red(),
        Severity::Medium => text.yellow(),
        Severity::Low => text.normal(),
    }
}

/// Process exit code: non-zero iff there are findings and assertion is on
pub fn exit_code(findings: &[Finding], assert: bool) -> i32 {
    if assert && !findings.is_empty() { 1 } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::Component;
    use crate::model::ResourceKind;
    use crate::rules::RuleSettings;

    fn findings() -> Vec<Finding> {
        vec![
            Finding::new(
                "orphaned-dataset",
                Component::Resource(ResourceKind::Dataset),
                "DS_Old",
                "Not used by any other resource.",
                Severity::Medium,
            ),
            Finding::new(
                "pipeline-description",
                Component::Resource(ResourceKind::Pipeline),
                "PL_A",
                "Missing description.",
                Severity::Low,
            ),
            Finding::new(
                "pipeline-description",
                Component::Resource(ResourceKind::Pipeline),
                "PL_B",
                "Missing description.",
                Severity::Low,
            ),
        ]
    }

    fn engine() -> RuleEngine {
        RuleEngine::with_defaults(RuleSettings::default())
    }

    #[test]
    fn test_summary_counts() {
        let engine = engine();
        let summary = Summary::new(&findings(), &engine);

        assert_eq!(summary.checks_ran, engine.len());
        assert_eq!(summary.checks_with_issues, 2);
        assert_eq!(summary.total_issues, 3);
        assert_eq!(summary.by_check[1].check, "pipeline-description");
        assert_eq!(summary.by_check[1].issues, 2);
        assert_eq!(summary.by_check[1].severity, Severity::Low);
    }

    #[test]
    fn test_summary_counts_unknown_checks() {
        let findings = vec![Finding::new("custom-check", Component::Activity, "PL/Act", "boom", Severity::High)];
        let summary = Summary::new(&findings, &engine());
        assert_eq!(summary.by_check[0].severity, Severity::High);
        assert!(summary.by_check[0].description.is_empty());
    }

    #[test]
    fn test_summary_names_failed_rules() {
        let findings = vec![
            Finding::new(RULE_EXECUTION_ERROR, Component::Activity, "PL/Act", "boom", Severity::High)
                .with_failed_rule("copy-activity-diu-auto"),
            Finding::new(
                RULE_EXECUTION_ERROR,
                Component::Resource(ResourceKind::LinkedService),
                "LS",
                "boom",
                Severity::High,
            )
            .with_failed_rule("linked-service-key-vault"),
        ];
        let summary = Summary::new(&findings, &engine());
        assert_eq!(
            summary.by_check[0].description,
            "Checks that could not be evaluated: copy-activity-diu-auto, linked-service-key-vault"
        );

        let json = render_json(&findings, &summary).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["findings"][0]["failed_rule"], "copy-activity-diu-auto");
    }

    #[test]
    fn test_render_table_totals() {
        colored::control::set_override(false);
        let findings = findings();
        let summary = Summary::new(&findings, &engine());
        let out = render_table(&findings, &summary, false);

        assert!(out.contains("Checks with issues:  2"));
        assert!(out.contains("Total issue count:   3"));
        assert!(out.contains("pipeline-description"));
        assert!(!out.contains("PL_A"));
    }

    #[test]
    fn test_render_table_verbose_lists_findings() {
        colored::control::set_override(false);
        let findings = findings();
        let summary = Summary::new(&findings, &engine());
        let out = render_table(&findings, &summary, true);

        assert!(out.contains("PL_A"));
        assert!(out.contains("Dataset"));
        assert!(out.contains("Not used by any other resource."));
    }

    #[test]
    fn test_render_json() {
        let findings = findings();
        let summary = Summary::new(&findings, &engine());
        let json = render_json(&findings, &summary).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["findings"][0]["component"], "Dataset");
        assert_eq!(value["findings"][0]["severity"], "Medium");
        assert_eq!(value["summary"]["total_issues"], 3);
    }

    #[test]
    fn test_exit_code() {
        assert_eq!(exit_code(&findings(), true), 1);
        assert_eq!(exit_code(&findings(), false), 0);
        assert_eq!(exit_code(&[], true), 0);
    }
}
