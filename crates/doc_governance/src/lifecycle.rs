//! Record status lifecycle.
//!
//! ```text
//! proposed ──► accepted ──► superseded
//!     │                         ▲
//!     ├──► rejected             │
//!     └─────────────────────────┘
//! ```
//!
//! `rejected` and `superseded` are terminal. Every transition runs its guard; a failing guard is
//! returned as a [`GuardViolation`] naming the missing precondition and the record keeps its
//! prior status.

use crate::config::LifecycleRules;
use crate::sections::Section;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Record status.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Initial state.
    Proposed,
    /// Passed the promotion gate.
    Accepted,
    /// Declined with a rationale. Terminal.
    Rejected,
    /// Replaced by another record. Terminal.
    Superseded,
}

impl Status {
    /// Every status, in index order.
    pub const ALL: [Status; 4] = [
        Status::Accepted,
        Status::Proposed,
        Status::Superseded,
        Status::Rejected,
    ];

    /// Lowercase name used in metadata.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Proposed => "proposed",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Superseded => "superseded",
        }
    }

    /// No transition leaves a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Superseded)
    }

    fn can_reach(self, to: Status) -> bool {
        matches!(
            (self, to),
            (Self::Proposed, Self::Accepted | Self::Rejected | Self::Superseded)
                | (Self::Accepted, Self::Superseded)
        )
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "proposed" => Ok(Self::Proposed),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "superseded" => Ok(Self::Superseded),
            other => Err(format!(
                "unknown status `{other}`; expected proposed, accepted, rejected, or superseded"
            )),
        }
    }
}

/// A transition guard that did not hold.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum GuardViolation {
    /// The record is already in a terminal status.
    #[error("`{from}` is terminal; cannot move to `{to}`")]
    Terminal {
        /// Current status.
        from: Status,
        /// Requested status.
        to: Status,
    },

    /// No edge between the two statuses.
    #[error("no transition from `{from}` to `{to}`")]
    Illegal {
        /// Current status.
        from: Status,
        /// Requested status.
        to: Status,
    },

    /// Promotion-gate sections are absent or empty.
    #[error("promotion gate requires non-empty sections: {}", .missing.join(", "))]
    PromotionGate {
        /// Missing or empty section headings.
        missing: Vec<String>,
    },

    /// Rejection without a rationale section.
    #[error("rejection requires a populated `{section}` section")]
    MissingRationale {
        /// Expected heading.
        section: String,
    },

    /// Supersession without a pointer.
    #[error("supersession requires `{field}` naming the superseding record")]
    MissingSuccessor {
        /// Expected metadata key.
        field: String,
    },

    /// Supersession pointing at an unknown or self record.
    #[error("superseding record `{target}` does not resolve")]
    UnresolvedSuccessor {
        /// Cited id.
        target: String,
    },
}

/// Facts a guard inspects.
#[derive(Clone, Copy, Debug)]
pub struct GuardInput<'a> {
    /// The record's own id.
    pub id: &'a str,
    /// The record's sections.
    pub sections: &'a [Section],
    /// Value of the superseded-by metadata key.
    pub superseded_by: Option<&'a str>,
    /// Ids the record may cite.
    pub known_ids: &'a BTreeSet<String>,
}

/// Status machine bound to one domain's lifecycle rules.
#[derive(Clone, Copy, Debug)]
pub struct Lifecycle<'r> {
    rules: &'r LifecycleRules,
}

impl<'r> Lifecycle<'r> {
    /// Bind the machine to a ruleset.
    pub fn new(rules: &'r LifecycleRules) -> Self {
        Self { rules }
    }

    /// Move `from` to `to` if the edge exists and its guard holds.
    pub fn transition(
        &self,
        from: Status,
        to: Status,
        input: &GuardInput<'_>,
    ) -> Result<Status, GuardViolation> {
        if from.is_terminal() {
            return Err(GuardViolation::Terminal { from, to });
        }
        if !from.can_reach(to) {
            return Err(GuardViolation::Illegal { from, to });
        }
        self.guard(to, input)?;
        Ok(to)
    }

    /// Check that a record resting in `status` satisfies the guard that admits it.
    pub fn check_resting(&self, status: Status, input: &GuardInput<'_>) -> Result<(), GuardViolation> {
        match status {
            Status::Proposed => Ok(()),
            other => self.guard(other, input),
        }
    }

    fn guard(&self, to: Status, input: &GuardInput<'_>) -> Result<(), GuardViolation> {
        match to {
            Status::Proposed => Ok(()),
            Status::Accepted => {
                let missing: Vec<String> = self
                    .rules
                    .promotion_sections
                    .iter()
                    .filter(|heading| !has_populated(input.sections, heading))
                    .cloned()
                    .collect();
                if missing.is_empty() {
                    Ok(())
                } else {
                    Err(GuardViolation::PromotionGate { missing })
                }
            }
            Status::Rejected => {
                if has_populated(input.sections, &self.rules.rationale_section) {
                    Ok(())
                } else {
                    Err(GuardViolation::MissingRationale {
                        section: self.rules.rationale_section.clone(),
                    })
                }
            }
            Status::Superseded => {
                let target = input
                    .superseded_by
                    .map(str::trim)
                    .filter(|target| !target.is_empty())
                    .ok_or_else(|| GuardViolation::MissingSuccessor {
                        field: self.rules.superseded_by_field.clone(),
                    })?;
                if target == input.id || !input.known_ids.contains(target) {
                    return Err(GuardViolation::UnresolvedSuccessor {
                        target: target.to_string(),
                    });
                }
                Ok(())
            }
        }
    }
}

fn has_populated(sections: &[Section], heading: &str) -> bool {
    sections
        .iter()
        .any(|section| section.heading == heading && !section.is_empty())
}
