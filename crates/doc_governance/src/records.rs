//! A domain's on-disk record set.
//!
//! Fix mode is one scoped unit: every candidate document is read, every fix is computed, and
//! only then are the changed files written back. Concurrent runs against one checkout are not
//! supported.

use crate::config::DocumentRules;
use crate::document::StructuredDocument;
use crate::fix::{fix, AppliedFix, FixConflict, FixOptions, FixOutcome};
use crate::index::render_index;
use crate::lifecycle::{GuardInput, GuardViolation, Lifecycle, Status};
use crate::validate::{ReferenceIndex, ValidateOptions, Validator};
use crate::violation::{Location, Violation};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Parsed records of one domain plus per-file parse failures.
#[derive(Clone, Debug)]
pub struct RecordSet {
    domain: String,
    rules: DocumentRules,
    documents: Vec<StructuredDocument>,
    parse_failures: Vec<Violation>,
    index_text: Option<String>,
}

/// Files to write back after a fix pass.
#[derive(Clone, Debug, Default)]
pub struct FixReport {
    /// Every applied fix, in document order.
    pub applied: Vec<AppliedFix>,
    /// Documents left unmodified because a fix was ambiguous.
    pub conflicts: Vec<FixConflict>,
    /// Repository-relative path -> new file text.
    pub writes: BTreeMap<String, String>,
}

impl FixReport {
    /// Write every changed file below `root`.
    pub fn write(&self, root: &Path) -> io::Result<()> {
        for (rel_path, text) in &self.writes {
            let path = root.join(rel_path);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, text)?;
        }
        Ok(())
    }
}

impl RecordSet {
    /// Load every markdown record under the domain's `records_dir`.
    pub fn load(root: &Path, domain: &str, rules: &DocumentRules) -> io::Result<Self> {
        let dir = root.join(&rules.records_dir);
        let mut files = Vec::new();
        if dir.exists() {
            collect_markdown(&dir, &mut files)?;
        }
        files.sort();

        let index_rel = index_rel_path(rules);
        let mut sources = Vec::new();
        let mut index_text = None;
        for path in files {
            let text = fs::read_to_string(&path)?;
            let rel = rel_posix(root, &path);
            if rel == index_rel {
                index_text = Some(text);
            } else {
                sources.push((rel, text));
            }
        }
        let mut set = Self::from_sources(domain, rules, sources);
        set.index_text = index_text;
        Ok(set)
    }

    /// Build a set from `(relative path, text)` pairs.
    pub fn from_sources(
        domain: &str,
        rules: &DocumentRules,
        sources: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        let mut documents = Vec::new();
        let mut parse_failures = Vec::new();
        for (rel_path, text) in sources {
            match StructuredDocument::parse(&rel_path, &text, rules) {
                Ok(doc) => {
                    tracing::debug!(path = %rel_path, id = %doc.id, "parsed record");
                    documents.push(doc);
                }
                Err(err) => parse_failures.push(Violation::error(
                    "parse.frontmatter",
                    rel_path,
                    Some(1),
                    err.to_string(),
                )),
            }
        }
        Self {
            domain: domain.to_string(),
            rules: rules.clone(),
            documents,
            parse_failures,
            index_text: None,
        }
    }

    /// Attach the current on-disk index text.
    pub fn with_index_text(mut self, text: Option<String>) -> Self {
        self.index_text = text;
        self
    }

    /// Domain name.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Domain rules.
    pub fn rules(&self) -> &DocumentRules {
        &self.rules
    }

    /// Successfully parsed documents.
    pub fn documents(&self) -> &[StructuredDocument] {
        &self.documents
    }

    /// Ids of the parsed documents.
    pub fn ids(&self) -> impl Iterator<Item = String> + '_ {
        self.documents.iter().map(|doc| doc.id.clone())
    }

    /// Regenerated index text.
    pub fn expected_index(&self) -> String {
        render_index(&self.rules, &self.documents)
    }

    /// An empty domain with no index file has nothing to keep in sync.
    fn index_tracked(&self) -> bool {
        self.index_text.is_some() || !self.documents.is_empty() || !self.parse_failures.is_empty()
    }

    /// Every violation across the set: parse failures, per-document rules, duplicate record
    /// ids, and index staleness.
    pub fn validate(&self, references: &ReferenceIndex, options: ValidateOptions) -> Vec<Violation> {
        let mut out = self.parse_failures.clone();
        let validator = Validator::new(&self.rules, references, options);
        for doc in &self.documents {
            out.extend(validator.validate(doc));
        }

        let mut by_id: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for doc in &self.documents {
            by_id.entry(&doc.id).or_default().push(&doc.rel_path);
        }
        for (id, paths) in by_id {
            if paths.len() > 1 {
                for path in &paths[1..] {
                    out.push(Violation::error(
                        "records.duplicate-id",
                        *path,
                        None,
                        format!("record id `{id}` is already used by {}", paths[0]),
                    ));
                }
            }
        }

        if self.index_tracked() && self.index_text.as_deref() != Some(self.expected_index().as_str()) {
            out.push(
                Violation::error(
                    "index.stale",
                    index_rel_path(&self.rules),
                    None,
                    "index does not match record metadata",
                )
                .fixable(),
            );
        }
        out
    }

    /// Compute every requested fix and the regenerated index.
    ///
    /// Documents with a conflict are left out of `writes` entirely.
    pub fn fix(&self, references: &ReferenceIndex, options: FixOptions, regenerate_index: bool) -> FixReport {
        let mut report = FixReport::default();
        let mut fixed_documents = Vec::with_capacity(self.documents.len());
        for doc in &self.documents {
            match fix(doc, &self.rules, references.formats(), options) {
                FixOutcome::Unchanged => fixed_documents.push(doc.clone()),
                FixOutcome::Fixed { document, applied } => {
                    report.writes.insert(document.rel_path.clone(), document.render());
                    report.applied.extend(applied);
                    fixed_documents.push(document);
                }
                FixOutcome::Conflict(conflict) => {
                    report.conflicts.push(conflict);
                    fixed_documents.push(doc.clone());
                }
            }
        }

        if regenerate_index && self.index_tracked() {
            let index = render_index(&self.rules, &fixed_documents);
            if self.index_text.as_deref() != Some(index.as_str()) {
                let rel = index_rel_path(&self.rules);
                report.applied.push(AppliedFix {
                    rule_id: "index.stale",
                    location: Location {
                        path: rel.clone(),
                        line: None,
                    },
                    description: "regenerated index".into(),
                });
                report.writes.insert(rel, index);
            }
        }
        report
    }

    /// Move one record to `to`, returning the rewritten document text.
    pub fn transition(
        &self,
        id: &str,
        to: Status,
        references: &ReferenceIndex,
    ) -> Result<StructuredDocument, TransitionError> {
        let doc = self
            .documents
            .iter()
            .find(|doc| doc.id == id)
            .ok_or_else(|| TransitionError::UnknownRecord(id.to_string()))?;
        let lifecycle = &self.rules.lifecycle;
        let raw = doc.scalar(&lifecycle.status_field).unwrap_or("");
        let from = raw
            .parse::<Status>()
            .map_err(|_| TransitionError::UnknownStatus(raw.to_string()))?;
        let input = GuardInput {
            id: &doc.id,
            sections: &doc.sections,
            superseded_by: doc.scalar(&lifecycle.superseded_by_field),
            known_ids: references.ids(),
        };
        let to = Lifecycle::new(lifecycle).transition(from, to, &input)?;

        let status_field = &lifecycle.status_field;
        let frontmatter: Vec<String> = doc
            .frontmatter
            .split('\n')
            .map(|line| match line.split_once(':') {
                Some((key, _)) if key == status_field.as_str() => format!("{key}: {to}"),
                _ => line.to_string(),
            })
            .collect();
        let updated = StructuredDocument {
            frontmatter: frontmatter.join("\n"),
            ..doc.clone()
        };
        updated
            .reparse(&self.rules)
            .map_err(|err| TransitionError::Reparse(err.to_string()))
    }
}

/// Why a requested transition did not happen.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum TransitionError {
    /// No record has the id.
    #[error("no record with id `{0}`")]
    UnknownRecord(String),
    /// The record's current status is not a lifecycle status.
    #[error("current status `{0}` is not a lifecycle status")]
    UnknownStatus(String),
    /// The guard refused.
    #[error(transparent)]
    Guard(#[from] GuardViolation),
    /// The rewritten record failed to parse.
    #[error("rewritten record does not parse: {0}")]
    Reparse(String),
}

fn index_rel_path(rules: &DocumentRules) -> String {
    format!(
        "{}/{}",
        rules.records_dir.trim_end_matches('/'),
        rules.index_file
    )
}

fn collect_markdown(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    let mut entries = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|entry| entry.path());
    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            collect_markdown(&path, out)?;
        } else if path.is_file() && path.extension().is_some_and(|ext| ext == "md") {
            out.push(path);
        }
    }
    Ok(())
}

fn rel_posix(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::CurDir => Some(".".to_string()),
            Component::ParentDir => Some("..".to_string()),
            Component::RootDir | Component::Prefix(_) => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
