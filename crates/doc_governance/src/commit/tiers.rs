//! Three-tier commit message enforcement.

use super::grammar::{parse_draft, CommitDraft};
use crate::config::CommitRules;
use crate::violation::{Severity, Violation};
use serde::Serialize;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Enforcement tier.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Branch and subject category vocabulary.
    Naming,
    /// Subject and bullet grammar.
    Structure,
    /// Conditional architectural justification.
    Justification,
}

impl Tier {
    /// All tiers in enforcement order.
    pub const ALL: [Tier; 3] = [Tier::Naming, Tier::Structure, Tier::Justification];

    /// Tier number as used on the command line.
    pub fn number(self) -> u8 {
        match self {
            Tier::Naming => 1,
            Tier::Structure => 2,
            Tier::Justification => 3,
        }
    }
}

impl Display for Tier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "tier {}", self.number())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "1" => Ok(Tier::Naming),
            "2" => Ok(Tier::Structure),
            "3" => Ok(Tier::Justification),
            other => Err(format!("unknown tier `{other}` (expected 1, 2, or 3)")),
        }
    }
}

/// Which tiers run, and whether Tier 3 blocks.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TierSelection {
    /// Enabled tiers.
    pub tiers: Vec<Tier>,
    /// Report Tier 3 failures as warnings.
    pub advisory_justification: bool,
}

impl Default for TierSelection {
    fn default() -> Self {
        Self {
            tiers: Tier::ALL.to_vec(),
            advisory_justification: false,
        }
    }
}

impl TierSelection {
    /// Parse a comma-separated tier list such as `1,2`.
    pub fn parse_list(list: &str) -> Result<Vec<Tier>, String> {
        let mut tiers = list
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse::<Tier>)
            .collect::<Result<Vec<_>, _>>()?;
        tiers.sort();
        tiers.dedup();
        if tiers.is_empty() {
            return Err("tier list is empty".into());
        }
        Ok(tiers)
    }

    fn enabled(&self, tier: Tier) -> bool {
        self.tiers.contains(&tier)
    }
}

/// Result of one tier.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TierOutcome {
    /// Tier that ran.
    pub tier: Tier,
    /// Every violation the tier found.
    pub violations: Vec<Violation>,
}

impl TierOutcome {
    /// No error-severity violations.
    pub fn passed(&self) -> bool {
        !self.violations.iter().any(Violation::is_error)
    }
}

/// Tiered validator bound to the commit ruleset.
#[derive(Clone, Debug)]
pub struct CommitValidator<'r> {
    rules: &'r CommitRules,
    selection: TierSelection,
}

impl<'r> CommitValidator<'r> {
    /// Validator running `selection`.
    pub fn new(rules: &'r CommitRules, selection: TierSelection) -> Self {
        Self { rules, selection }
    }

    /// Run every enabled tier against one message.
    ///
    /// `source` names the message in locations (a file path or commit id).
    pub fn validate(&self, source: &str, text: &str, branch: Option<&str>) -> Vec<TierOutcome> {
        let draft = parse_draft(text, &self.rules.justification_key);
        Tier::ALL
            .into_iter()
            .filter(|tier| self.selection.enabled(*tier))
            .map(|tier| {
                let violations = match tier {
                    Tier::Naming => self.naming(source, &draft, branch),
                    Tier::Structure => self.structure(source, text, &draft),
                    Tier::Justification => self.justification(source, &draft),
                };
                TierOutcome { tier, violations }
            })
            .collect()
    }

    fn naming(&self, source: &str, draft: &CommitDraft, branch: Option<&str>) -> Vec<Violation> {
        let mut out = Vec::new();
        let exempt = |b: &&str| self.rules.exempt_branches.iter().any(|e| e.as_str() == *b);
        if let Some(branch) = branch.filter(|b| !exempt(b)) {
            let category = branch
                .split_once(self.rules.branch_separator.as_str())
                .map(|(category, _)| category);
            match category {
                Some(category) if self.rules.is_category(category) => {}
                Some(category) => out.push(Violation::error(
                    "commit.naming",
                    source,
                    None,
                    format!("branch category `{category}` is not in the category vocabulary"),
                )),
                None => out.push(Violation::error(
                    "commit.naming",
                    source,
                    None,
                    format!(
                        "branch `{branch}` must be named `<category>{}<topic>`",
                        self.rules.branch_separator
                    ),
                )),
            }
        }
        if let Some(subject) = &draft.subject {
            if !self.rules.is_category(&subject.category) {
                out.push(Violation::error(
                    "commit.naming",
                    source,
                    draft.subject_line,
                    format!(
                        "subject category `{}` is not in the category vocabulary",
                        subject.category
                    ),
                ));
            }
        }
        out
    }

    fn structure(&self, source: &str, text: &str, draft: &CommitDraft) -> Vec<Violation> {
        let mut out: Vec<Violation> = draft
            .errors
            .iter()
            .map(|err| Violation::error("commit.structure", source, Some(err.line), &err.message))
            .collect();
        let subject_len = draft
            .subject_line
            .and_then(|line| text.lines().nth(line - 1))
            .map(|line| line.trim_end().chars().count())
            .unwrap_or(0);
        if subject_len > self.rules.max_subject_len {
            out.push(Violation::error(
                "commit.structure",
                source,
                draft.subject_line,
                format!(
                    "subject is {subject_len} characters; the limit is {}",
                    self.rules.max_subject_len
                ),
            ));
        }
        for bullet in &draft.bullets {
            if !self.rules.is_category(&bullet.tag) {
                out.push(Violation::error(
                    "commit.structure",
                    source,
                    Some(bullet.line),
                    format!("bullet tag `{}` is not in the category vocabulary", bullet.tag),
                ));
            }
        }
        out.sort_by_key(|v| v.location.line);
        out
    }

    fn justification(&self, source: &str, draft: &CommitDraft) -> Vec<Violation> {
        let Some(subject) = &draft.subject else {
            return Vec::new();
        };
        if !self
            .rules
            .justification_categories
            .iter()
            .any(|c| *c == subject.category)
        {
            return Vec::new();
        }
        let key = &self.rules.justification_key;
        let violation = match &draft.justification {
            None => Violation::error(
                "commit.justification",
                source,
                None,
                format!(
                    "`{}` commits require a `{key}: <kind>` line (one of: {})",
                    subject.category,
                    self.rules.justification_kinds.join(", ")
                ),
            ),
            Some(tag) if !self.rules.justification_kinds.contains(&tag.kind) => Violation::error(
                "commit.justification",
                source,
                Some(tag.line),
                format!(
                    "justification kind `{}` is not one of: {}",
                    tag.kind,
                    self.rules.justification_kinds.join(", ")
                ),
            ),
            Some(_) => return Vec::new(),
        };
        let violation = if self.selection.advisory_justification {
            Violation {
                severity: Severity::Warning,
                ..violation
            }
        } else {
            violation
        };
        vec![violation]
    }
}
