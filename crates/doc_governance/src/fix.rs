//! Deterministic document fixes.
//!
//! Three fixes exist: merging duplicate sections whose bodies are identical, rewriting
//! near-miss cross-references, and migrating legacy metadata. Anything that would require
//! choosing between differing prose is returned as a [`FixConflict`] and the document is left
//! untouched.

use crate::config::DocumentRules;
use crate::document::StructuredDocument;
use crate::terms::{reformat_terms, TermFormat};
use crate::violation::Location;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

/// Which fixes to attempt.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FixOptions {
    /// Merge identical duplicate sections.
    pub merge_duplicates: bool,
    /// Rewrite near-miss references.
    pub terms: bool,
    /// Apply legacy metadata migrations.
    pub migrate: bool,
}

impl FixOptions {
    /// Every fix.
    pub fn all() -> Self {
        Self {
            merge_duplicates: true,
            terms: true,
            migrate: true,
        }
    }
}

/// One change made by fix mode.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct AppliedFix {
    /// Rule whose violation the fix addresses.
    pub rule_id: &'static str,
    /// Where the change was made.
    pub location: Location,
    /// What changed.
    pub description: String,
}

impl Display for AppliedFix {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.rule_id, self.location, self.description)
    }
}

/// A requested fix that cannot be applied without guessing.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, thiserror::Error)]
#[error("{path}: {message}")]
pub struct FixConflict {
    /// Document path.
    pub path: String,
    /// Lines involved.
    pub lines: Vec<usize>,
    /// What the caller must resolve.
    pub message: String,
}

/// Result of fixing one document.
#[derive(Clone, Debug, PartialEq)]
pub enum FixOutcome {
    /// Nothing to change.
    Unchanged,
    /// Fixes applied.
    Fixed {
        /// Document after every fix.
        document: StructuredDocument,
        /// Changes in application order.
        applied: Vec<AppliedFix>,
    },
    /// At least one fix needs a human decision; nothing was applied.
    Conflict(FixConflict),
}

/// Apply the requested fixes to `doc`.
pub fn fix(
    doc: &StructuredDocument,
    rules: &DocumentRules,
    formats: &[TermFormat],
    options: FixOptions,
) -> FixOutcome {
    let mut applied = Vec::new();
    let mut frontmatter = doc.frontmatter.clone();
    let mut body = doc.body.clone();

    if options.merge_duplicates {
        match merge_duplicates(doc) {
            Ok(Some((merged, fixes))) => {
                body = merged;
                applied.extend(fixes);
            }
            Ok(None) => {}
            Err(conflict) => return FixOutcome::Conflict(conflict),
        }
    }

    if options.migrate {
        match migrate_frontmatter(doc, rules, &frontmatter) {
            Ok(Some((migrated, fixes))) => {
                frontmatter = migrated;
                applied.extend(fixes);
            }
            Ok(None) => {}
            Err(conflict) => return FixOutcome::Conflict(conflict),
        }
    }

    if options.terms {
        let (rewritten, replaced) = reformat_terms(&body, formats, doc.body_offset);
        if !replaced.is_empty() {
            body = rewritten;
            applied.extend(replaced.into_iter().map(|(written, canonical, line)| AppliedFix {
                rule_id: "terms.format",
                location: Location {
                    path: doc.rel_path.clone(),
                    line: Some(line),
                },
                description: format!("`{written}` -> `{canonical}`"),
            }));
        }
    }

    if applied.is_empty() {
        return FixOutcome::Unchanged;
    }

    let candidate = StructuredDocument {
        frontmatter,
        body,
        ..doc.clone()
    };
    match candidate.reparse(rules) {
        Ok(document) => {
            for applied_fix in &applied {
                tracing::info!(path = %doc.rel_path, fix = %applied_fix.description, "applied fix");
            }
            FixOutcome::Fixed { document, applied }
        }
        Err(err) => FixOutcome::Conflict(FixConflict {
            path: doc.rel_path.clone(),
            lines: Vec::new(),
            message: format!("fixed document no longer parses: {err}"),
        }),
    }
}

type Rewrite = Option<(String, Vec<AppliedFix>)>;

fn merge_duplicates(doc: &StructuredDocument) -> Result<Rewrite, FixConflict> {
    let mut seen: Vec<&str> = Vec::new();
    let mut removed: Vec<(usize, usize)> = Vec::new();
    let mut applied = Vec::new();
    let mut conflicts: Vec<(String, Vec<usize>)> = Vec::new();
    let line_count = doc.body.split('\n').count();

    for section in &doc.sections {
        if !seen.contains(&section.heading.as_str()) {
            seen.push(&section.heading);
            continue;
        }
        let bodies: BTreeSet<&str> = doc
            .sections
            .iter()
            .filter(|s| s.heading == section.heading)
            .map(|s| s.body.trim())
            .collect();
        if bodies.len() > 1 {
            if !conflicts.iter().any(|(heading, _)| *heading == section.heading) {
                let lines = doc
                    .sections
                    .iter()
                    .filter(|s| s.heading == section.heading)
                    .map(|s| s.line)
                    .collect();
                conflicts.push((section.heading.clone(), lines));
            }
            continue;
        }
        // A section running to the end keeps the file's trailing newline.
        let end = if section.end == line_count && doc.body.ends_with('\n') {
            section.end - 1
        } else {
            section.end
        };
        removed.push((section.start, end));
        applied.push(AppliedFix {
            rule_id: "sections.duplicate",
            location: Location {
                path: doc.rel_path.clone(),
                line: Some(section.line),
            },
            description: format!("removed identical duplicate of `{}`", section.heading),
        });
    }

    if !conflicts.is_empty() {
        let lines = conflicts.iter().flat_map(|(_, lines)| lines.clone()).collect();
        let detail: Vec<String> = conflicts
            .iter()
            .map(|(heading, lines)| {
                let lines: Vec<String> = lines.iter().map(usize::to_string).collect();
                format!("`{heading}` (lines {})", lines.join(", "))
            })
            .collect();
        return Err(FixConflict {
            path: doc.rel_path.clone(),
            lines,
            message: format!(
                "duplicate sections with differing bodies need a manual merge: {}",
                detail.join(", ")
            ),
        });
    }
    if removed.is_empty() {
        return Ok(None);
    }

    let merged: Vec<&str> = doc
        .body
        .split('\n')
        .enumerate()
        .filter(|(idx, _)| !removed.iter().any(|(start, end)| idx >= start && idx < end))
        .map(|(_, line)| line)
        .collect();
    Ok(Some((merged.join("\n"), applied)))
}

fn migrate_frontmatter(
    doc: &StructuredDocument,
    rules: &DocumentRules,
    frontmatter: &str,
) -> Result<Rewrite, FixConflict> {
    let migrations = &rules.migrations;
    let status_field = &rules.lifecycle.status_field;
    let mut applied = Vec::new();
    let mut lines: Vec<String> = Vec::new();

    for (idx, line) in frontmatter.split('\n').enumerate() {
        let file_line = idx + 2;
        let Some((key, value)) = line.split_once(':') else {
            lines.push(line.to_string());
            continue;
        };
        let mut key = key.to_string();
        if let Some(current) = migrations.keys.get(&key) {
            if doc.metadata.contains_key(current) {
                return Err(FixConflict {
                    path: doc.rel_path.clone(),
                    lines: vec![file_line],
                    message: format!("both legacy `{key}` and current `{current}` are set"),
                });
            }
            applied.push(migration_fix(doc, file_line, format!("renamed `{key}` to `{current}`")));
            key = current.clone();
        }

        let mut value = value.to_string();
        if &key == status_field {
            let raw = value.trim().trim_matches(|c| c == '"' || c == '\'');
            if let Some(current) = migrations.status_aliases.get(raw) {
                applied.push(migration_fix(
                    doc,
                    file_line,
                    format!("status `{raw}` -> `{current}`"),
                ));
                value = format!(" {current}");
            }
        }
        lines.push(format!("{key}:{value}"));
    }

    if applied.is_empty() {
        return Ok(None);
    }
    Ok(Some((lines.join("\n"), applied)))
}

fn migration_fix(doc: &StructuredDocument, line: usize, description: String) -> AppliedFix {
    AppliedFix {
        rule_id: "metadata.legacy-key",
        location: Location {
            path: doc.rel_path.clone(),
            line: Some(line),
        },
        description,
    }
}
