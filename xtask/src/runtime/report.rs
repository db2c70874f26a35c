//! Violation reports in text or JSON form.

use crate::runtime::error::{XtaskError, XtaskResult};
use doc_governance::{error_count, AppliedFix, FixConflict, Tier, TierOutcome, Violation};
use serde::Serialize;
use std::fmt::Write as _;

/// Output format selected with `--format`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl ReportFormat {
    /// Parse a `--format` value.
    pub fn parse(value: &str) -> XtaskResult<Self> {
        match value {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(XtaskError::validation(format!(
                "unsupported format `{other}` (expected `text` or `json`)"
            ))),
        }
    }
}

/// Everything one gate run produced.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Report {
    /// Gate name, e.g. `validate adr`.
    pub check: String,
    /// Remaining violations, sorted.
    pub violations: Vec<Violation>,
    /// Fixes written in this run.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub applied: Vec<AppliedFix>,
    /// Fixes refused for ambiguity.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<FixConflict>,
    /// Per-tier commit results.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tiers: Vec<TierStatus>,
}

/// Pass/fail summary for one commit tier.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct TierStatus {
    pub tier: Tier,
    pub passed: bool,
}

impl From<&TierOutcome> for TierStatus {
    fn from(outcome: &TierOutcome) -> Self {
        Self {
            tier: outcome.tier,
            passed: outcome.passed(),
        }
    }
}

impl Report {
    /// Empty report for a gate.
    pub fn new(check: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            ..Self::default()
        }
    }

    /// Error-severity violations plus unresolved fix conflicts.
    pub fn error_count(&self) -> usize {
        error_count(&self.violations) + self.conflicts.len()
    }

    /// Whether the gate passes.
    pub fn passed(&self) -> bool {
        self.error_count() == 0
    }

    /// Human-readable form.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for fix in &self.applied {
            let _ = writeln!(out, "fixed {fix}");
        }
        for conflict in &self.conflicts {
            let _ = writeln!(
                out,
                "[fix.conflict] {} lines {:?} - {}",
                conflict.path, conflict.lines, conflict.message
            );
        }
        for tier in &self.tiers {
            let status = if tier.passed { "ok" } else { "failed" };
            let _ = writeln!(out, "{}: {status}", tier.tier);
        }
        for v in &self.violations {
            let _ = write!(out, "[{}] {} - {}", v.rule_id, v.location, v.message);
            if !v.is_error() {
                out.push_str(" (warning)");
            }
            if v.fixable {
                out.push_str(" (fixable)");
            }
            out.push('\n');
        }
        let errors = self.error_count();
        if errors == 0 {
            out.push_str("OK\n");
        } else {
            let _ = writeln!(out, "\nFAILED: {errors} issue(s)");
        }
        out
    }

    /// Print to stdout and turn a failing gate into an error.
    pub fn emit(&self, format: ReportFormat) -> XtaskResult<()> {
        match format {
            ReportFormat::Text => print!("{}", self.render_text()),
            ReportFormat::Json => {
                let json = serde_json::to_string_pretty(self).map_err(|err| {
                    XtaskError::io(format!("failed to serialize report: {err}"))
                })?;
                println!("{json}");
            }
        }
        if self.passed() {
            Ok(())
        } else {
            Err(XtaskError::validation(format!("{} failed", self.check)))
        }
    }
}
