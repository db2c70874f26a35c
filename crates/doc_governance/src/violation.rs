//! Violation records shared by every validator.

use serde::Serialize;
use std::fmt::{self, Display, Formatter};

/// How a violation affects the gate.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Fails the gate.
    Error,
    /// Reported only.
    Warning,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warning => "warning",
        })
    }
}

/// Where a violation was found.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Location {
    /// Repository-relative path, or a commit id.
    pub path: String,
    /// One-based line, when known.
    pub line: Option<usize>,
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{line}", self.path),
            None => f.write_str(&self.path),
        }
    }
}

/// One rule violation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Violation {
    /// Stable rule id such as `terms.format`.
    pub rule_id: &'static str,
    /// Gate effect.
    pub severity: Severity,
    /// Source location.
    pub location: Location,
    /// Human-readable explanation.
    pub message: String,
    /// Whether fix mode can correct it mechanically.
    pub fixable: bool,
}

impl Violation {
    /// Error-severity violation.
    pub fn error(
        rule_id: &'static str,
        path: impl Into<String>,
        line: Option<usize>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id,
            severity: Severity::Error,
            location: Location {
                path: path.into(),
                line,
            },
            message: message.into(),
            fixable: false,
        }
    }

    /// Warning-severity violation.
    pub fn warning(
        rule_id: &'static str,
        path: impl Into<String>,
        line: Option<usize>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(rule_id, path, line, message)
        }
    }

    /// Mark as mechanically fixable.
    pub fn fixable(mut self) -> Self {
        self.fixable = true;
        self
    }

    /// Whether this violation fails the gate.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl Display for Violation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}: {}",
            self.rule_id, self.severity, self.location, self.message
        )?;
        if self.fixable {
            f.write_str(" (fixable)")?;
        }
        Ok(())
    }
}

/// Sort violations by location, then rule, then message.
pub fn sort_violations(violations: &mut [Violation]) {
    violations.sort_by(|a, b| {
        (&a.location.path, a.location.line.unwrap_or(0), a.rule_id, &a.message).cmp(&(
            &b.location.path,
            b.location.line.unwrap_or(0),
            b.rule_id,
            &b.message,
        ))
    });
}

/// Number of error-severity violations.
pub fn error_count(violations: &[Violation]) -> usize {
    violations.iter().filter(|v| v.is_error()).count()
}
