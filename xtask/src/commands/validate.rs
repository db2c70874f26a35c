//! `cargo xtask validate <domain>`: record validation and fix mode.

use crate::commands::{flag_value, unexpected};
use crate::runtime::context::CommandContext;
use crate::runtime::error::{XtaskError, XtaskResult};
use crate::runtime::report::{Report, ReportFormat};
use crate::XtaskCommand;
use doc_governance::{sort_violations, FixOptions, RecordSet, ValidateOptions};
use std::path::PathBuf;

/// `cargo xtask validate ...`
pub struct ValidateCommand;

/// Parsed `validate` options.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ValidateCommandOptions {
    pub domain: Option<String>,
    pub fix: bool,
    pub check_terms: bool,
    pub fix_terms: bool,
    pub migrate: bool,
    pub format: ReportFormat,
    pub config_dir: Option<PathBuf>,
    pub show_help: bool,
}

impl ValidateCommandOptions {
    fn validate_options(&self) -> ValidateOptions {
        ValidateOptions {
            check_terms: self.check_terms || self.fix_terms,
        }
    }

    fn fix_options(&self) -> Option<FixOptions> {
        let options = FixOptions {
            merge_duplicates: self.fix,
            terms: self.fix_terms || (self.fix && self.check_terms),
            migrate: self.migrate,
        };
        (options != FixOptions::default()).then_some(options)
    }
}

impl XtaskCommand for ValidateCommand {
    type Options = ValidateCommandOptions;

    fn parse(args: &[String]) -> XtaskResult<Self::Options> {
        parse_validate_options(args)
    }

    fn run(ctx: &CommandContext, options: Self::Options) -> XtaskResult<()> {
        if options.show_help {
            print_validate_usage();
            return Ok(());
        }
        let ctx = ctx.clone().with_config_dir(options.config_dir.as_deref());
        let report = validate_domain(&ctx, &options)?;
        report.emit(options.format)
    }
}

pub(crate) fn print_validate_usage() {
    eprintln!(
        "Usage: cargo xtask validate <domain> [options]\n\
         \n\
         Options:\n\
           --fix                Merge identical duplicate sections and regenerate the index\n\
           --check-terms        Check cross-references against the domain's namespaces\n\
           --fix-terms          Rewrite near-miss references (implies --check-terms)\n\
           --migrate            Rewrite legacy metadata keys and status values\n\
           --format <text|json> Report format (default: text)\n\
           --config-dir <path>  Governance config directory (default: tools/governance)\n"
    );
}

fn parse_validate_options(args: &[String]) -> XtaskResult<ValidateCommandOptions> {
    let mut options = ValidateCommandOptions::default();
    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--fix" => {
                options.fix = true;
                i += 1;
            }
            "--check-terms" => {
                options.check_terms = true;
                i += 1;
            }
            "--fix-terms" => {
                options.fix_terms = true;
                i += 1;
            }
            "--migrate" => {
                options.migrate = true;
                i += 1;
            }
            "--format" => {
                options.format = ReportFormat::parse(flag_value(args, i)?)?;
                i += 2;
            }
            "--config-dir" => {
                options.config_dir = Some(PathBuf::from(flag_value(args, i)?));
                i += 2;
            }
            "help" | "--help" | "-h" => {
                options.show_help = true;
                i += 1;
            }
            other if !other.starts_with('-') && options.domain.is_none() => {
                options.domain = Some(other.to_string());
                i += 1;
            }
            other => return Err(unexpected(other)),
        }
    }
    if options.domain.is_none() && !options.show_help {
        return Err(XtaskError::validation("missing `<domain>` argument")
            .with_hint("run `cargo xtask validate --help`"));
    }
    Ok(options)
}

/// Validate one domain, applying and writing requested fixes first.
pub(crate) fn validate_domain(
    ctx: &CommandContext,
    options: &ValidateCommandOptions,
) -> XtaskResult<Report> {
    let domain = options
        .domain
        .as_deref()
        .ok_or_else(|| XtaskError::validation("missing `<domain>` argument"))?;
    let tree = ctx.config_tree()?;
    let rules = ctx.document_rules(&tree, domain)?;
    let load = || {
        RecordSet::load(ctx.root(), domain, &rules).map_err(|err| {
            XtaskError::from(err)
                .with_operation(format!("load `{domain}` records"))
                .with_path(&ctx.root().join(&rules.records_dir))
        })
    };

    let mut set = load()?;
    let mut references = ctx.references(&tree, &set)?;
    let mut report = Report::new(format!("validate {domain}"));

    if let Some(fix_options) = options.fix_options() {
        let fixes = set.fix(&references, fix_options, options.fix);
        fixes
            .write(ctx.root())
            .map_err(|err| XtaskError::from(err).with_operation("write fixes"))?;
        for fix in &fixes.applied {
            tracing::info!(rule = fix.rule_id, location = %fix.location, "{}", fix.description);
        }
        report.applied = fixes.applied;
        report.conflicts = fixes.conflicts;
        set = load()?;
        references = ctx.references(&tree, &set)?;
    }

    let mut violations = set.validate(&references, options.validate_options());
    sort_violations(&mut violations);
    tracing::debug!(
        domain,
        records = set.documents().len(),
        violations = violations.len(),
        "validated records"
    );
    report.violations = violations;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::Path;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn write(root: &Path, rel: &str, text: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, text).expect("write");
    }

    fn fixture() -> tempfile::TempDir {
        let root = tempfile::tempdir().expect("tempdir");
        write(
            root.path(),
            "cfg/adr.toml",
            "domain = \"adr\"\n[rules]\nrecords_dir = \"docs/adr\"\nid_prefix = \"ADR\"\n\
             required_fields = [\"title\", \"status\"]\nallowed_sections = [\"Context\", \"Decision\"]\n",
        );
        write(
            root.path(),
            "docs/adr/ADR-00001-log.md",
            "---\ntitle: Log\nstatus: proposed\n---\n## Context\nSame.\n## Context\nSame.\n",
        );
        write(
            root.path(),
            "docs/adr/ADR-00002-index.md",
            "---\ntitle: Index\nstatus: proposed\n---\n## Context\nFollows ADR 1.\n",
        );
        root
    }

    #[test]
    fn validate_parser_reads_domain_and_flags() {
        let parsed = parse_validate_options(&args(&[
            "adr",
            "--fix",
            "--check-terms",
            "--format",
            "json",
        ]))
        .expect("parse");
        assert_eq!(parsed.domain.as_deref(), Some("adr"));
        assert!(parsed.fix && parsed.check_terms);
        assert_eq!(parsed.format, ReportFormat::Json);
        let fix = parsed.fix_options().expect("fix requested");
        assert!(fix.merge_duplicates && fix.terms && !fix.migrate);
    }

    #[test]
    fn validate_parser_requires_a_domain() {
        let err = parse_validate_options(&args(&["--fix"])).unwrap_err();
        assert!(err.to_string().contains("missing `<domain>`"));
        assert!(parse_validate_options(&args(&["--help"])).expect("help").show_help);
    }

    #[test]
    fn validate_parser_rejects_unknown_flags_and_extra_args() {
        assert!(parse_validate_options(&args(&["adr", "--frobnicate"])).is_err());
        assert!(parse_validate_options(&args(&["adr", "evidence"])).is_err());
        assert!(parse_validate_options(&args(&["adr", "--format"])).is_err());
    }

    #[test]
    fn plain_validation_reports_without_writing() {
        let root = fixture();
        let ctx = CommandContext::with_paths(root.path().to_path_buf(), root.path().join("cfg"));
        let options = parse_validate_options(&args(&["adr", "--check-terms"])).expect("parse");
        let report = validate_domain(&ctx, &options).expect("validate");
        let rules: Vec<&str> = report.violations.iter().map(|v| v.rule_id).collect();
        assert_eq!(rules, vec!["sections.duplicate", "terms.format", "index.stale"]);
        assert!(!report.passed());
        assert!(!root.path().join("docs/adr/README.md").exists());
    }

    #[test]
    fn fix_mode_writes_and_revalidates_clean() {
        let root = fixture();
        let ctx = CommandContext::with_paths(root.path().to_path_buf(), root.path().join("cfg"));
        let options = parse_validate_options(&args(&["adr", "--fix", "--fix-terms"])).expect("parse");
        let report = validate_domain(&ctx, &options).expect("validate");
        assert!(report.passed(), "{}", report.render_text());
        assert!(report.conflicts.is_empty());

        let fixed = fs::read_to_string(root.path().join("docs/adr/ADR-00002-index.md"))
            .expect("read");
        assert!(fixed.contains("Follows ADR-00001."));
        assert!(root.path().join("docs/adr/README.md").exists());
    }
}
