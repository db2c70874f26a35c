//! Status-partitioned record index.

use crate::config::DocumentRules;
use crate::document::StructuredDocument;
use crate::lifecycle::Status;
use std::collections::BTreeMap;

const UNCLASSIFIED: &str = "Unclassified";

/// Render the index for a domain's records.
///
/// Groups follow [`Status::ALL`] order, records sort by id inside a group, and empty groups are
/// omitted. Records whose status does not parse are listed under `Unclassified`.
pub fn render_index(rules: &DocumentRules, records: &[StructuredDocument]) -> String {
    let mut groups: BTreeMap<usize, Vec<&StructuredDocument>> = BTreeMap::new();
    for record in records {
        let slot = record
            .scalar(&rules.lifecycle.status_field)
            .and_then(|status| status.parse::<Status>().ok())
            .and_then(|status| Status::ALL.iter().position(|s| *s == status))
            .unwrap_or(Status::ALL.len());
        groups.entry(slot).or_default().push(record);
    }

    let mut out = String::new();
    out.push_str(&rules.index_title);
    out.push_str("\n\n<!-- Generated from record metadata; edits are overwritten. -->\n");
    for (slot, mut entries) in groups {
        let heading = match Status::ALL.get(slot) {
            Some(status) => capitalize(status.as_str()),
            None => UNCLASSIFIED.to_string(),
        };
        entries.sort_by(|a, b| a.id.cmp(&b.id).then_with(|| a.rel_path.cmp(&b.rel_path)));
        out.push_str(&format!("\n## {heading}\n\n"));
        for record in entries {
            out.push_str(&format!(
                "- [{}]({}) {}\n",
                record.id,
                link_target(rules, &record.rel_path),
                record.title()
            ));
        }
    }
    out
}

fn link_target<'a>(rules: &DocumentRules, rel_path: &'a str) -> &'a str {
    let dir = rules.records_dir.trim_end_matches('/');
    rel_path
        .strip_prefix(dir)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(rel_path)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::adr_rules;
    use pretty_assertions::assert_eq;

    fn record(file: &str, status: &str, title: &str) -> StructuredDocument {
        let text = format!("---\ntitle: {title}\nstatus: {status}\n---\n");
        StructuredDocument::parse(&format!("docs/adr/{file}"), &text, &adr_rules()).expect("parse")
    }

    #[test]
    fn index_groups_by_status_in_fixed_order() {
        let records = vec![
            record("ADR-00002-b.md", "proposed", "Second"),
            record("ADR-00001-a.md", "accepted", "First"),
            record("ADR-00003-c.md", "Draft", "Third"),
            record("ADR-00000-z.md", "accepted", "Zeroth"),
        ];
        let rendered = render_index(&adr_rules(), &records);
        assert_eq!(
            rendered,
            "# Architecture Decision Records\n\
\n\
<!-- Generated from record metadata; edits are overwritten. -->\n\
\n\
## Accepted\n\
\n\
- [ADR-00000](ADR-00000-z.md) Zeroth\n\
- [ADR-00001](ADR-00001-a.md) First\n\
\n\
## Proposed\n\
\n\
- [ADR-00002](ADR-00002-b.md) Second\n\
\n\
## Unclassified\n\
\n\
- [ADR-00003](ADR-00003-c.md) Third\n"
        );
    }

    #[test]
    fn index_is_stable_across_input_order() {
        let mut records = vec![
            record("ADR-00002-b.md", "proposed", "Second"),
            record("ADR-00001-a.md", "accepted", "First"),
        ];
        let first = render_index(&adr_rules(), &records);
        records.reverse();
        assert_eq!(first, render_index(&adr_rules(), &records));
    }
}
