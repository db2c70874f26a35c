//! Per-document validation.
//!
//! Rules run in a fixed order and accumulate; none short-circuits another:
//! metadata, section whitelist, duplicate sections, cross-references, lifecycle guard.

use crate::config::DocumentRules;
use crate::document::{MetaValue, StructuredDocument};
use crate::lifecycle::{GuardInput, Lifecycle, Status};
use crate::sections::find_duplicates;
use crate::terms::{scan_terms, TermFormat};
use crate::violation::Violation;
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Ids a domain may cite, and the formats used to find them.
#[derive(Clone, Debug, Default)]
pub struct ReferenceIndex {
    formats: Vec<TermFormat>,
    ids: BTreeSet<String>,
}

impl ReferenceIndex {
    /// Empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a domain's id format and its existing record ids.
    pub fn add_domain(
        &mut self,
        domain: &str,
        rules: &DocumentRules,
        ids: impl IntoIterator<Item = String>,
    ) {
        if !self.formats.iter().any(|f| f.domain == domain) {
            self.formats.push(TermFormat {
                domain: domain.to_string(),
                prefix: rules.id_prefix.clone(),
                digits: rules.id_digits,
            });
        }
        self.ids.extend(ids);
    }

    /// Registered formats.
    pub fn formats(&self) -> &[TermFormat] {
        &self.formats
    }

    /// Every citable id.
    pub fn ids(&self) -> &BTreeSet<String> {
        &self.ids
    }
}

/// Optional rule families.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ValidateOptions {
    /// Run the cross-reference rule.
    pub check_terms: bool,
}

/// Validator for one document domain.
#[derive(Clone, Copy, Debug)]
pub struct Validator<'a> {
    rules: &'a DocumentRules,
    references: &'a ReferenceIndex,
    options: ValidateOptions,
}

impl<'a> Validator<'a> {
    /// Bind rules and the reference namespace.
    pub fn new(
        rules: &'a DocumentRules,
        references: &'a ReferenceIndex,
        options: ValidateOptions,
    ) -> Self {
        Self {
            rules,
            references,
            options,
        }
    }

    /// Every violation in `doc`.
    pub fn validate(&self, doc: &StructuredDocument) -> Vec<Violation> {
        let mut out = Vec::new();
        self.check_metadata(doc, &mut out);
        self.check_section_whitelist(doc, &mut out);
        self.check_duplicates(doc, &mut out);
        if self.options.check_terms {
            self.check_terms(doc, &mut out);
        }
        self.check_lifecycle(doc, &mut out);
        out
    }

    fn check_metadata(&self, doc: &StructuredDocument, out: &mut Vec<Violation>) {
        let rules = self.rules;
        let path = doc.rel_path.as_str();

        let expected_id = doc
            .id
            .strip_prefix(&format!("{}-", rules.id_prefix))
            .and_then(|digits| digits.parse::<u64>().ok())
            .map(|number| rules.canonical_id(number));
        if expected_id.as_deref() != Some(doc.id.as_str()) {
            out.push(Violation::error(
                "metadata.id",
                path,
                None,
                format!(
                    "record id `{}` must match `{}`",
                    doc.id,
                    rules.canonical_id(0).replace('0', "N")
                ),
            ));
        }

        for field in &rules.required_fields {
            if !doc.metadata.contains_key(field) {
                out.push(Violation::error(
                    "metadata.missing",
                    path,
                    Some(1),
                    format!("missing required field `{field}`"),
                ));
            }
        }

        for field in &rules.date_fields {
            let Some(value) = doc.metadata.get(field) else {
                continue;
            };
            let line = metadata_line(doc, field);
            match value.as_scalar() {
                None => out.push(Violation::error(
                    "metadata.type",
                    path,
                    line,
                    format!("`{field}` must be a single date"),
                )),
                Some(date) if !matches_date(date, &rules.date_format) => out.push(Violation::error(
                    "metadata.date-format",
                    path,
                    line,
                    format!("`{field}` value `{date}` does not match `{}`", rules.date_format),
                )),
                Some(_) => {}
            }
        }

        for field in &rules.tag_fields {
            let Some(value) = doc.metadata.get(field) else {
                continue;
            };
            let line = metadata_line(doc, field);
            let MetaValue::List(tags) = value else {
                out.push(Violation::error(
                    "metadata.type",
                    path,
                    line,
                    format!("`{field}` must be a list"),
                ));
                continue;
            };
            for tag in tags {
                if !rules.allowed_tags.contains(tag) {
                    out.push(Violation::error(
                        "metadata.tag",
                        path,
                        line,
                        format!("tag `{tag}` is not in the allowed tag list"),
                    ));
                }
            }
        }

        for legacy in rules.migrations.keys.keys() {
            if doc.metadata.contains_key(legacy) {
                out.push(
                    Violation::warning(
                        "metadata.legacy-key",
                        path,
                        metadata_line(doc, legacy),
                        format!(
                            "legacy key `{legacy}` should be `{}`",
                            rules.migrations.keys[legacy]
                        ),
                    )
                    .fixable(),
                );
            }
        }

        let status_field = &rules.lifecycle.status_field;
        match doc.metadata.get(status_field) {
            None => {}
            Some(MetaValue::List(_)) => out.push(Violation::error(
                "metadata.type",
                path,
                metadata_line(doc, status_field),
                format!("`{status_field}` must be a single value"),
            )),
            Some(MetaValue::Scalar(value)) => {
                if value.parse::<Status>().is_ok() {
                    return;
                }
                let line = metadata_line(doc, status_field);
                match rules.migrations.status_aliases.get(value) {
                    Some(current) => out.push(
                        Violation::warning(
                            "metadata.legacy-key",
                            path,
                            line,
                            format!("legacy status `{value}` should be `{current}`"),
                        )
                        .fixable(),
                    ),
                    None => out.push(Violation::error(
                        "metadata.status",
                        path,
                        line,
                        format!("unknown status `{value}`"),
                    )),
                }
            }
        }
    }

    fn check_section_whitelist(&self, doc: &StructuredDocument, out: &mut Vec<Violation>) {
        let status = self.effective_status(doc);
        for section in &doc.sections {
            if self.rules.allowed_sections.contains(&section.heading) {
                continue;
            }
            match self.rules.conditional_sections.get(&section.heading) {
                Some(statuses) => {
                    if !status.is_some_and(|s| statuses.iter().any(|allowed| allowed == s)) {
                        out.push(Violation::error(
                            "sections.conditional",
                            &doc.rel_path,
                            Some(section.line),
                            format!(
                                "section `{}` is only allowed when status is one of {:?}",
                                section.heading, statuses
                            ),
                        ));
                    }
                }
                None => out.push(Violation::error(
                    "sections.unknown",
                    &doc.rel_path,
                    Some(section.line),
                    format!("section `{}` is not allowed", section.heading),
                )),
            }
        }
    }

    fn check_duplicates(&self, doc: &StructuredDocument, out: &mut Vec<Violation>) {
        for duplicate in find_duplicates(&doc.sections) {
            let bodies: BTreeSet<&str> = doc
                .sections
                .iter()
                .filter(|s| s.heading == duplicate.heading)
                .map(|s| s.body.trim())
                .collect();
            let lines: Vec<String> = duplicate.lines.iter().map(usize::to_string).collect();
            let violation = Violation::error(
                "sections.duplicate",
                &doc.rel_path,
                duplicate.lines.first().copied(),
                format!(
                    "section `{}` appears on lines {}",
                    duplicate.heading,
                    lines.join(", ")
                ),
            );
            out.push(if bodies.len() == 1 {
                violation.fixable()
            } else {
                violation
            });
        }
    }

    fn check_terms(&self, doc: &StructuredDocument, out: &mut Vec<Violation>) {
        let terms = scan_terms(&doc.body, self.references.formats(), doc.body_offset);
        for term in terms {
            match &term.canonical {
                Some(canonical) => {
                    if !term.is_canonical() {
                        out.push(
                            Violation::error(
                                "terms.format",
                                &doc.rel_path,
                                Some(term.line),
                                format!(
                                    "reference `{}` should be written `{canonical}`",
                                    term.text
                                ),
                            )
                            .fixable(),
                        );
                    }
                    if !self.references.ids().contains(canonical) {
                        out.push(Violation::error(
                            "terms.unresolved",
                            &doc.rel_path,
                            Some(term.line),
                            format!("reference `{canonical}` does not resolve to a known record"),
                        ));
                    }
                }
                None => out.push(Violation::error(
                    "terms.unresolved",
                    &doc.rel_path,
                    Some(term.line),
                    format!("reference `{}` is not a valid record id", term.text),
                )),
            }
        }
    }

    /// Status value with legacy aliases resolved, so the guard sees what `--migrate` would write.
    fn effective_status<'d>(&'d self, doc: &'d StructuredDocument) -> Option<&'d str> {
        let raw = doc.scalar(&self.rules.lifecycle.status_field)?;
        if raw.parse::<Status>().is_ok() {
            return Some(raw);
        }
        Some(
            self.rules
                .migrations
                .status_aliases
                .get(raw)
                .map_or(raw, String::as_str),
        )
    }

    fn check_lifecycle(&self, doc: &StructuredDocument, out: &mut Vec<Violation>) {
        let lifecycle = &self.rules.lifecycle;
        let Some(status) = self
            .effective_status(doc)
            .and_then(|value| value.parse::<Status>().ok())
        else {
            return;
        };
        let input = GuardInput {
            id: &doc.id,
            sections: &doc.sections,
            superseded_by: doc.scalar(&lifecycle.superseded_by_field),
            known_ids: self.references.ids(),
        };
        if let Err(violation) = Lifecycle::new(lifecycle).check_resting(status, &input) {
            out.push(Violation::error(
                "lifecycle.guard",
                &doc.rel_path,
                metadata_line(doc, &lifecycle.status_field),
                format!("status `{status}`: {violation}"),
            ));
        }
    }
}

/// Whether `value` parses with `format` and re-renders to exactly `value`.
pub fn matches_date(value: &str, format: &str) -> bool {
    NaiveDate::parse_from_str(value, format)
        .map(|date| date.format(format).to_string() == value)
        .unwrap_or(false)
}

/// File line of a top-level metadata key.
pub fn metadata_line(doc: &StructuredDocument, key: &str) -> Option<usize> {
    doc.frontmatter
        .split('\n')
        .position(|line| {
            line.strip_prefix(key)
                .is_some_and(|rest| rest.trim_start().starts_with(':'))
        })
        .map(|idx| idx + 2)
}
