use doc_governance::lifecycle::GuardInput;
use doc_governance::{
    extract, fix, ChangelogGenerator, CommitList, CommitRecord, CommitRules, CommitValidator,
    ConfigTree, DocumentRules, FixOptions, FixOutcome, GuardViolation, Lifecycle, RecordSet,
    ReferenceIndex, Status, StructuredDocument, Tier, TierSelection, ValidateOptions,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn shipped_config_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../tools/governance")
}

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, text).expect("write");
}

fn record_repo() -> TempDir {
    let root = tempfile::tempdir().expect("tempdir");
    write(
        root.path(),
        "config/base.toml",
        r#"
domain = "base"
[rules]
allowed_tags = ["storage", "api"]
date_format = "%Y-%m-%d"
"#,
    );
    write(
        root.path(),
        "config/records.toml",
        r#"
domain = "records"
parent = "base.toml"
[rules]
records_dir = "docs/records"
id_prefix = "RECORD"
id_digits = 5
required_fields = ["title", "status", "date"]
allowed_sections = ["Context", "Decision", "Participants", "Consequences"]
[rules.lifecycle]
promotion_sections = ["Participants", "Decision", "Consequences"]
"#,
    );
    root
}

fn load_rules(root: &Path, domain: &str) -> DocumentRules {
    let tree = ConfigTree::load(&root.join("config")).expect("config");
    DocumentRules::from_ruleset(&tree.resolve(domain).expect("resolve")).expect("rules")
}

fn references(set: &RecordSet) -> ReferenceIndex {
    let mut references = ReferenceIndex::new();
    references.add_domain(set.domain(), set.rules(), set.ids());
    references
}

#[test]
fn evidence_inherits_parent_vocabulary() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(
        dir.path(),
        "base.toml",
        "domain = \"base\"\n[rules]\nallowed_tags = [\"storage\", \"api\"]\n",
    );
    write(
        dir.path(),
        "evidence.toml",
        "domain = \"evidence\"\nparent = \"base.toml\"\n[rules]\nrequired_fields = [\"date\"]\n",
    );
    let tree = ConfigTree::load(dir.path()).expect("load");
    let ruleset = tree.resolve("evidence").expect("resolve");
    assert_eq!(ruleset.string_list("required_fields"), vec!["date"]);
    assert_eq!(ruleset.string_list("allowed_tags"), vec!["storage", "api"]);
    assert_eq!(ruleset.chain(), ["evidence.toml", "base.toml"]);
}

#[test]
fn shipped_config_resolves_every_domain() {
    let tree = ConfigTree::load(&shipped_config_dir()).expect("load shipped config");
    let domains: Vec<&str> = tree.domains().collect();
    assert_eq!(domains, vec!["adr", "base", "commit", "evidence"]);

    let evidence =
        DocumentRules::from_ruleset(&tree.resolve("evidence").expect("evidence")).expect("typed");
    assert!(evidence.allowed_tags.iter().any(|t| t == "storage"));
    assert!(evidence.allowed_tags.iter().any(|t| t == "benchmark"));
    assert_eq!(evidence.canonical_id(7), "EVD-0007");

    let adr = DocumentRules::from_ruleset(&tree.resolve("adr").expect("adr")).expect("typed");
    assert!(!adr.allowed_tags.iter().any(|t| t == "benchmark"));
    assert_eq!(adr.reference_domains, vec!["adr", "evidence"]);

    let commit = CommitRules::from_ruleset(&tree.resolve("commit").expect("commit")).expect("typed");
    assert_eq!(commit.changelog.sections[0].title, "Features");
}

#[test]
fn conflicting_duplicate_sections_are_surfaced_not_merged() {
    let root = record_repo();
    let rules = load_rules(root.path(), "records");
    let text = "---\ntitle: Log\nstatus: proposed\ndate: 2026-01-14\n---\n## Decision\nUse a log.\n## Context\nWrites.\n## Decision\nUse a table.\n";

    let err = extract(text, 2, 0).expect_err("duplicate");
    assert_eq!(err.duplicates.len(), 1);
    assert_eq!(err.duplicates[0].heading, "Decision");
    assert_eq!(err.duplicates[0].lines, vec![6, 10]);

    let doc = StructuredDocument::parse("docs/records/RECORD-00001-log.md", text, &rules)
        .expect("parse");
    match fix(&doc, &rules, &[], FixOptions::all()) {
        FixOutcome::Conflict(conflict) => assert_eq!(conflict.lines, vec![6, 10]),
        other => panic!("expected a conflict, got {other:?}"),
    }
}

#[test]
fn near_miss_term_is_fixable_and_fixed_verbatim() {
    let root = record_repo();
    let rules = load_rules(root.path(), "records");
    write(
        root.path(),
        "docs/records/RECORD-26004-store.md",
        "---\ntitle: Store\nstatus: proposed\ndate: 2026-01-14\n---\n## Context\nBaseline.\n",
    );
    write(
        root.path(),
        "docs/records/RECORD-26005-index.md",
        "---\ntitle: Index\nstatus: proposed\ndate: 2026-01-15\n---\n## Context\nBuilds on RECORD 26004.\n\n```\nRECORD 1 stays as written\n```\n",
    );

    let set = RecordSet::load(root.path(), "records", &rules).expect("load");
    let refs = references(&set);
    let options = ValidateOptions { check_terms: true };
    let violations = set.validate(&refs, options);
    let term = violations
        .iter()
        .find(|v| v.rule_id == "terms.format")
        .expect("terms.format reported");
    assert!(term.fixable);
    assert_eq!(term.location.line, Some(7));

    let report = set.fix(
        &refs,
        FixOptions {
            terms: true,
            ..FixOptions::default()
        },
        true,
    );
    assert!(report.conflicts.is_empty());
    report.write(root.path()).expect("write back");

    let fixed = fs::read_to_string(root.path().join("docs/records/RECORD-26005-index.md"))
        .expect("read");
    assert!(fixed.contains("Builds on RECORD-26004."));
    assert!(fixed.contains("RECORD 1 stays as written"));

    let reloaded = RecordSet::load(root.path(), "records", &rules).expect("reload");
    let remaining = reloaded.validate(&references(&reloaded), options);
    assert!(remaining.is_empty(), "unexpected violations: {remaining:?}");
}

#[test]
fn fixing_is_effective_and_non_destructive() {
    let root = record_repo();
    let rules = load_rules(root.path(), "records");
    write(
        root.path(),
        "docs/records/RECORD-00001-a.md",
        "---\ntitle: A\nstatus: proposed\ndate: 2026-1-4\n---\n## Context\nSee RECORD_2.\n## Context\nSee RECORD_2.\n",
    );
    write(
        root.path(),
        "docs/records/RECORD-00002-b.md",
        "---\ntitle: B\nstatus: proposed\ndate: 2026-01-05\n---\n## Context\nNone.\n",
    );
    let options = ValidateOptions { check_terms: true };
    let set = RecordSet::load(root.path(), "records", &rules).expect("load");
    let before = set.validate(&references(&set), options);
    let fixable: BTreeSet<&str> = before.iter().filter(|v| v.fixable).map(|v| v.rule_id).collect();
    let unfixable: BTreeSet<&str> = before.iter().filter(|v| !v.fixable).map(|v| v.rule_id).collect();
    assert_eq!(
        fixable,
        BTreeSet::from(["index.stale", "sections.duplicate", "terms.format"])
    );
    assert_eq!(unfixable, BTreeSet::from(["metadata.date-format"]));

    set.fix(&references(&set), FixOptions::all(), true)
        .write(root.path())
        .expect("write back");
    let reloaded = RecordSet::load(root.path(), "records", &rules).expect("reload");
    let after: BTreeSet<&str> = reloaded
        .validate(&references(&reloaded), options)
        .iter()
        .map(|v| v.rule_id)
        .collect();
    assert_eq!(after, BTreeSet::from(["metadata.date-format"]));
}

#[test]
fn promotion_gate_names_the_single_missing_section() {
    let root = record_repo();
    let rules = load_rules(root.path(), "records");
    let doc = StructuredDocument::parse(
        "docs/records/RECORD-00003-x.md",
        "---\ntitle: X\nstatus: proposed\n---\n## Participants\nA, B\n## Decision\nDo it.\n",
        &rules,
    )
    .expect("parse");
    let known = BTreeSet::new();
    let input = GuardInput {
        id: &doc.id,
        sections: &doc.sections,
        superseded_by: None,
        known_ids: &known,
    };
    assert_eq!(
        Lifecycle::new(&rules.lifecycle).transition(Status::Proposed, Status::Accepted, &input),
        Err(GuardViolation::PromotionGate {
            missing: vec!["Consequences".into()],
        })
    );
}

#[test]
fn refactor_needs_architectural_justification() {
    let tree = ConfigTree::load(&shipped_config_dir()).expect("load");
    let rules = CommitRules::from_ruleset(&tree.resolve("commit").expect("commit")).expect("rules");
    let validator = CommitValidator::new(&rules, TierSelection::default());

    let missing = validator.validate(
        "msg",
        "refactor(storage): restructure index\n\n- [refactor] src/index.rs: split writer\n",
        Some("refactor/index"),
    );
    let failed: Vec<Tier> = missing.iter().filter(|o| !o.passed()).map(|o| o.tier).collect();
    assert_eq!(failed, vec![Tier::Justification]);

    let justified = validator.validate(
        "msg",
        "refactor(storage): restructure index\n\n- [refactor] src/index.rs: split writer\nArch: boundary\n",
        Some("refactor/index"),
    );
    assert!(justified.iter().all(|o| o.passed()));
}

#[test]
fn changelog_is_byte_identical_across_runs() {
    let tree = ConfigTree::load(&shipped_config_dir()).expect("load");
    let rules = CommitRules::from_ruleset(&tree.resolve("commit").expect("commit")).expect("rules");
    let history = CommitList::new(vec![
        CommitRecord::new("1111111aaaa", "feat(cli): add validate\n"),
        CommitRecord::new(
            "2222222bbbb",
            "perf(store): batch writes\n\n- [perf] src/store.rs: batch writes\n  - halves fsync calls\nArch: performance\n",
        ),
        CommitRecord::new("3333333cccc", "not a conventional message"),
    ]);
    let generator = ChangelogGenerator::new(&rules);
    let first = generator.generate(&history, "", "3333333cccc").expect("first").render();
    let second = generator.generate(&history, "", "3333333cccc").expect("second").render();
    assert_eq!(first, second);
    assert_eq!(
        first,
        "# Changelog: ..3333333cccc\n\n## Features\n### cli\n- add validate (1111111)\n\n## Performance\n### src/store.rs\n- batch writes (2222222)\n  - halves fsync calls\n"
    );
}
