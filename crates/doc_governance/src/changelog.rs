//! Changelog generation from a commit range.
//!
//! Output is a pure function of the range: sections follow the configured order, targets keep
//! first-seen order, commits are walked oldest first, and nothing time-dependent is rendered.

use crate::commit::CommitMessage;
use crate::config::CommitRules;
use crate::error::{ChangelogError, RangeTooLargeError};
use indexmap::IndexMap;

/// Target heading for subject-only commits without a scope.
pub const GENERAL_TARGET: &str = "general";

/// One commit as read from history.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommitRecord {
    /// Full commit id.
    pub id: String,
    /// Raw message.
    pub message: String,
}

impl CommitRecord {
    /// Record from an id and message.
    pub fn new(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Abbreviated id used in rendered entries.
    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(7) {
            Some((idx, _)) => &self.id[..idx],
            None => &self.id,
        }
    }
}

/// Ordered commit history.
pub trait CommitSource {
    /// Listing failure.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Commits reachable from `to` but not from `from`, oldest first.
    ///
    /// Implementations may stop after `limit + 1` commits; any count above `limit` is treated as
    /// an overflow by the generator.
    fn commits(&self, from: &str, to: &str, limit: usize) -> Result<Vec<CommitRecord>, Self::Error>;
}

/// In-memory linear history.
#[derive(Clone, Debug, Default)]
pub struct CommitList {
    commits: Vec<CommitRecord>,
}

/// Revision not present in a [`CommitList`].
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("unknown revision `{0}`")]
pub struct UnknownRevision(pub String);

impl CommitList {
    /// History in oldest-first order.
    pub fn new(commits: Vec<CommitRecord>) -> Self {
        Self { commits }
    }

    fn position(&self, rev: &str) -> Result<usize, UnknownRevision> {
        self.commits
            .iter()
            .position(|commit| commit.id == rev || commit.short_id() == rev)
            .ok_or_else(|| UnknownRevision(rev.to_string()))
    }
}

impl CommitSource for CommitList {
    type Error = UnknownRevision;

    fn commits(&self, from: &str, to: &str, limit: usize) -> Result<Vec<CommitRecord>, Self::Error> {
        let start = if from.is_empty() {
            0
        } else {
            self.position(from)? + 1
        };
        let end = self.position(to)? + 1;
        Ok(self
            .commits
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .take(limit.saturating_add(1))
            .cloned()
            .collect())
    }
}

/// One rendered line plus its nested sub-bullets.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChangelogItem {
    /// Bullet description.
    pub description: String,
    /// Abbreviated commit id.
    pub commit: String,
    /// Sub-bullets, verbatim.
    pub children: Vec<String>,
}

/// A generated changelog.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Changelog {
    /// Range start as given.
    pub from: String,
    /// Range end as given.
    pub to: String,
    /// Section title -> target -> items, in output order.
    pub sections: IndexMap<String, IndexMap<String, Vec<ChangelogItem>>>,
    /// Ids of commits skipped for malformed messages.
    pub skipped: Vec<String>,
}

impl Changelog {
    /// Markdown document.
    pub fn render(&self) -> String {
        let mut out = format!("# Changelog: {}..{}\n", self.from, self.to);
        if self.sections.is_empty() {
            out.push_str("\nNo changes.\n");
            return out;
        }
        for (title, targets) in &self.sections {
            out.push_str(&format!("\n## {title}\n"));
            for (target, items) in targets {
                out.push_str(&format!("### {target}\n"));
                for item in items {
                    out.push_str(&format!("- {} ({})\n", item.description, item.commit));
                    for child in &item.children {
                        out.push_str("  ");
                        out.push_str(child);
                        out.push('\n');
                    }
                }
            }
        }
        out
    }
}

/// Folds a commit range into a [`Changelog`].
#[derive(Clone, Debug)]
pub struct ChangelogGenerator<'r> {
    rules: &'r CommitRules,
    max_commits: usize,
}

impl<'r> ChangelogGenerator<'r> {
    /// Generator with the configured scan cap.
    pub fn new(rules: &'r CommitRules) -> Self {
        Self {
            rules,
            max_commits: rules.changelog.max_commits,
        }
    }

    /// Override the scan cap.
    pub fn with_max_commits(mut self, max_commits: usize) -> Self {
        self.max_commits = max_commits;
        self
    }

    /// Generate the changelog for `from..to`.
    pub fn generate<S>(&self, source: &S, from: &str, to: &str) -> Result<Changelog, ChangelogError>
    where
        S: CommitSource + ?Sized,
    {
        let range = format!("{from}..{to}");
        let commits = source
            .commits(from, to, self.max_commits)
            .map_err(|err| ChangelogError::Source {
                range: range.clone(),
                source: Box::new(err),
            })?;
        if commits.len() > self.max_commits {
            return Err(RangeTooLargeError {
                range,
                limit: self.max_commits,
            }
            .into());
        }
        tracing::debug!(range = %range, commits = commits.len(), "generating changelog");

        let mut grouped: IndexMap<&str, IndexMap<String, Vec<ChangelogItem>>> = IndexMap::new();
        let mut skipped = Vec::new();
        for commit in &commits {
            let parsed = CommitMessage::parse(&commit.message, &self.rules.justification_key);
            let message = match parsed {
                Ok(message) => message,
                Err(errors) => {
                    let first = errors.first().map(ToString::to_string).unwrap_or_default();
                    tracing::warn!(
                        commit = %commit.id,
                        error = %first,
                        "skipping malformed commit message"
                    );
                    skipped.push(commit.id.clone());
                    continue;
                }
            };
            for (category, target, item) in self.items(commit, &message) {
                let title = self.rules.changelog.section_for(category);
                grouped
                    .entry(title)
                    .or_default()
                    .entry(target)
                    .or_default()
                    .push(item);
            }
        }

        let changelog = &self.rules.changelog;
        let order = changelog
            .sections
            .iter()
            .map(|section| section.title.as_str())
            .chain(std::iter::once(changelog.fallback_section.as_str()));
        let mut sections = IndexMap::new();
        for title in order {
            if let Some(targets) = grouped.shift_remove(title) {
                sections.insert(title.to_string(), targets);
            }
        }
        Ok(Changelog {
            from: from.to_string(),
            to: to.to_string(),
            sections,
            skipped,
        })
    }

    fn items<'m>(
        &self,
        commit: &CommitRecord,
        message: &'m CommitMessage,
    ) -> Vec<(&'m str, String, ChangelogItem)> {
        let subject = &message.subject;
        if message.bullets.is_empty() {
            let description = if subject.breaking {
                format!("BREAKING: {}", subject.description)
            } else {
                subject.description.clone()
            };
            let target = subject.scope.clone().unwrap_or_else(|| GENERAL_TARGET.into());
            return vec![(
                subject.category.as_str(),
                target,
                ChangelogItem {
                    description,
                    commit: commit.short_id().to_string(),
                    children: Vec::new(),
                },
            )];
        }
        message
            .bullets
            .iter()
            .map(|bullet| {
                (
                    bullet.tag.as_str(),
                    bullet.targets.join(", "),
                    ChangelogItem {
                        description: bullet.description.clone(),
                        commit: commit.short_id().to_string(),
                        children: bullet.children.clone(),
                    },
                )
            })
            .collect()
    }
}
