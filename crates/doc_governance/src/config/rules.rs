//! Typed views over a resolved [`Ruleset`](super::Ruleset).

use super::Ruleset;
use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Rules for a document domain (ADRs, evidence artifacts, ...).
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct DocumentRules {
    /// Directory holding the domain's records, relative to the repository root.
    pub records_dir: String,
    /// Index file name inside `records_dir`.
    #[serde(default = "default_index_file")]
    pub index_file: String,
    /// First line of the regenerated index.
    #[serde(default = "default_index_title")]
    pub index_title: String,
    /// Record id prefix, e.g. `ADR`.
    pub id_prefix: String,
    /// Zero-padded numeral width in record ids.
    #[serde(default = "default_id_digits")]
    pub id_digits: usize,
    /// Domains whose record ids may be cited. Empty means only this domain.
    #[serde(default)]
    pub reference_domains: Vec<String>,
    /// Heading depth that delimits sections.
    #[serde(default = "default_section_depth")]
    pub section_depth: usize,
    /// Metadata keys every record must carry.
    #[serde(default)]
    pub required_fields: Vec<String>,
    /// Metadata keys holding dates.
    #[serde(default = "default_date_fields")]
    pub date_fields: Vec<String>,
    /// chrono format every date field must match exactly.
    #[serde(default = "default_date_format")]
    pub date_format: String,
    /// Metadata keys holding tag lists.
    #[serde(default = "default_tag_fields")]
    pub tag_fields: Vec<String>,
    /// Shared tag vocabulary.
    #[serde(default)]
    pub allowed_tags: Vec<String>,
    /// Sections allowed regardless of status.
    #[serde(default)]
    pub allowed_sections: Vec<String>,
    /// Sections allowed only for the listed statuses.
    #[serde(default)]
    pub conditional_sections: BTreeMap<String, Vec<String>>,
    /// Status lifecycle settings.
    #[serde(default)]
    pub lifecycle: LifecycleRules,
    /// Legacy metadata rewrites applied by `--migrate`.
    #[serde(default)]
    pub migrations: MigrationRules,
}

/// Lifecycle guard inputs.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LifecycleRules {
    /// Metadata key holding the status.
    pub status_field: String,
    /// Sections that must be present and non-empty before `accepted`.
    pub promotion_sections: Vec<String>,
    /// Section that must be populated before `rejected`.
    pub rationale_section: String,
    /// Metadata key pointing at the superseding record.
    pub superseded_by_field: String,
}

impl Default for LifecycleRules {
    fn default() -> Self {
        Self {
            status_field: "status".into(),
            promotion_sections: Vec::new(),
            rationale_section: "Rejection Rationale".into(),
            superseded_by_field: "superseded_by".into(),
        }
    }
}

/// Legacy-to-current metadata rewrites.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct MigrationRules {
    /// Legacy key -> current key.
    pub keys: BTreeMap<String, String>,
    /// Legacy status value -> status.
    pub status_aliases: BTreeMap<String, String>,
}

impl DocumentRules {
    /// Typed view of a document domain's ruleset.
    pub fn from_ruleset(ruleset: &Ruleset) -> Result<Self, ConfigError> {
        let rules: Self = ruleset.view()?;
        if rules.section_depth == 0 || rules.section_depth > 6 {
            return Err(ConfigError::InvalidRule {
                domain: ruleset.domain().to_string(),
                message: format!("section_depth {} is outside 1..=6", rules.section_depth),
            });
        }
        if rules.id_prefix.is_empty() || rules.id_digits == 0 {
            return Err(ConfigError::InvalidRule {
                domain: ruleset.domain().to_string(),
                message: "id_prefix and id_digits must be set".into(),
            });
        }
        Ok(rules)
    }

    /// Canonical id for a numeral, e.g. `ADR-00042`.
    pub fn canonical_id(&self, number: u64) -> String {
        format!("{}-{:0width$}", self.id_prefix, number, width = self.id_digits)
    }

    /// Whether a section heading is allowed in some status.
    pub fn knows_section(&self, heading: &str) -> bool {
        self.allowed_sections.iter().any(|s| s == heading)
            || self.conditional_sections.contains_key(heading)
    }
}

/// Rules for commit messages.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CommitRules {
    /// Shared category vocabulary for branches, subjects, and bullet tags.
    pub categories: Vec<String>,
    /// Subject categories that require an architectural justification.
    #[serde(default)]
    pub justification_categories: Vec<String>,
    /// Allowed justification kinds.
    #[serde(default)]
    pub justification_kinds: Vec<String>,
    /// Body key introducing the justification tag.
    #[serde(default = "default_justification_key")]
    pub justification_key: String,
    /// Longest allowed subject line.
    #[serde(default = "default_max_subject_len")]
    pub max_subject_len: usize,
    /// Branch name separator between category and topic.
    #[serde(default = "default_branch_separator")]
    pub branch_separator: String,
    /// Branches exempt from the naming tier.
    #[serde(default = "default_exempt_branches")]
    pub exempt_branches: Vec<String>,
    /// Changelog layout.
    #[serde(default)]
    pub changelog: ChangelogRules,
}

impl CommitRules {
    /// Typed view of the commit domain's ruleset.
    pub fn from_ruleset(ruleset: &Ruleset) -> Result<Self, ConfigError> {
        let rules: Self = ruleset.view()?;
        if rules.categories.is_empty() {
            return Err(ConfigError::InvalidRule {
                domain: ruleset.domain().to_string(),
                message: "categories must not be empty".into(),
            });
        }
        Ok(rules)
    }

    /// Whether `category` belongs to the shared vocabulary.
    pub fn is_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }
}

/// Category-to-section layout for generated changelogs.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChangelogRules {
    /// Sections in output order.
    pub sections: Vec<ChangelogSection>,
    /// Section for categories no section claims.
    pub fallback_section: String,
    /// Commit scan cap.
    pub max_commits: usize,
}

impl Default for ChangelogRules {
    fn default() -> Self {
        Self {
            sections: Vec::new(),
            fallback_section: "Other Changes".into(),
            max_commits: 1000,
        }
    }
}

impl ChangelogRules {
    /// Section title for a category.
    pub fn section_for(&self, category: &str) -> &str {
        self.sections
            .iter()
            .find(|section| section.categories.iter().any(|c| c == category))
            .map(|section| section.title.as_str())
            .unwrap_or(&self.fallback_section)
    }
}

/// One changelog section.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ChangelogSection {
    /// Heading text.
    pub title: String,
    /// Categories collected under this heading.
    pub categories: Vec<String>,
}

fn default_index_file() -> String {
    "README.md".into()
}

fn default_index_title() -> String {
    "# Index".into()
}

fn default_id_digits() -> usize {
    5
}

fn default_section_depth() -> usize {
    2
}

fn default_date_fields() -> Vec<String> {
    vec!["date".into()]
}

fn default_date_format() -> String {
    "%Y-%m-%d".into()
}

fn default_tag_fields() -> Vec<String> {
    vec!["tags".into()]
}

fn default_justification_key() -> String {
    "Arch".into()
}

fn default_max_subject_len() -> usize {
    72
}

fn default_branch_separator() -> String {
    "/".into()
}

fn default_exempt_branches() -> Vec<String> {
    vec!["main".into(), "master".into()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigNode, ConfigTree};

    #[test]
    fn document_rules_fill_defaults() {
        let node = ConfigNode::parse(
            "adr.toml",
            r#"
domain = "adr"
[rules]
records_dir = "docs/adr"
id_prefix = "ADR"
allowed_sections = ["Context", "Decision"]
[rules.conditional_sections]
"Rejection Rationale" = ["rejected"]
[rules.lifecycle]
promotion_sections = ["Decision"]
"#,
        )
        .expect("parse");
        let ruleset = ConfigTree::from_nodes([node])
            .and_then(|tree| tree.resolve("adr"))
            .expect("resolve");
        let rules = DocumentRules::from_ruleset(&ruleset).expect("rules");
        assert_eq!(rules.id_digits, 5);
        assert_eq!(rules.section_depth, 2);
        assert_eq!(rules.lifecycle.status_field, "status");
        assert_eq!(rules.lifecycle.promotion_sections, vec!["Decision"]);
        assert!(rules.knows_section("Rejection Rationale"));
        assert_eq!(rules.canonical_id(42), "ADR-00042");
    }

    #[test]
    fn document_rules_reject_wrong_types() {
        let node = ConfigNode::new("adr.toml", "adr")
            .with_rule("records_dir", "docs/adr")
            .with_rule("id_prefix", "ADR")
            .with_rule("allowed_tags", "storage");
        let ruleset = ConfigTree::from_nodes([node])
            .and_then(|tree| tree.resolve("adr"))
            .expect("resolve");
        assert!(matches!(
            DocumentRules::from_ruleset(&ruleset),
            Err(ConfigError::InvalidRule { .. })
        ));
    }

    #[test]
    fn changelog_sections_fall_back() {
        let rules = ChangelogRules {
            sections: vec![ChangelogSection {
                title: "Features".into(),
                categories: vec!["feat".into()],
            }],
            ..ChangelogRules::default()
        };
        assert_eq!(rules.section_for("feat"), "Features");
        assert_eq!(rules.section_for("chore"), "Other Changes");
    }
}
