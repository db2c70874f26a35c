//! `cargo xtask transition <domain> <id> <status>`: guarded status changes.

use crate::commands::{flag_value, unexpected};
use crate::runtime::context::CommandContext;
use crate::runtime::error::{XtaskError, XtaskResult};
use crate::XtaskCommand;
use doc_governance::{RecordSet, Status, StructuredDocument};
use std::fs;
use std::path::PathBuf;

/// `cargo xtask transition ...`
pub struct TransitionCommand;

/// Parsed `transition` options.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TransitionOptions {
    pub domain: String,
    pub id: String,
    pub to: Option<Status>,
    pub config_dir: Option<PathBuf>,
    pub show_help: bool,
}

impl XtaskCommand for TransitionCommand {
    type Options = TransitionOptions;

    fn parse(args: &[String]) -> XtaskResult<Self::Options> {
        parse_transition_options(args)
    }

    fn run(ctx: &CommandContext, options: Self::Options) -> XtaskResult<()> {
        if options.show_help {
            print_transition_usage();
            return Ok(());
        }
        let ctx = ctx.clone().with_config_dir(options.config_dir.as_deref());
        let doc = transition_record(&ctx, &options)?;
        if let Some(to) = options.to {
            println!("{} ({}) is now {to}", doc.id, doc.rel_path);
        }
        Ok(())
    }
}

pub(crate) fn print_transition_usage() {
    eprintln!(
        "Usage: cargo xtask transition <domain> <record-id> <status> [--config-dir <path>]\n\
         \n\
         Moves a record to proposed, accepted, rejected, or superseded when the lifecycle\n\
         guard allows it, then regenerates the domain index.\n"
    );
}

fn parse_transition_options(args: &[String]) -> XtaskResult<TransitionOptions> {
    let mut options = TransitionOptions::default();
    let mut positional = Vec::new();
    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--config-dir" => {
                options.config_dir = Some(PathBuf::from(flag_value(args, i)?));
                i += 2;
            }
            "help" | "--help" | "-h" => {
                options.show_help = true;
                i += 1;
            }
            other if !other.starts_with('-') && positional.len() < 3 => {
                positional.push(other.to_string());
                i += 1;
            }
            other => return Err(unexpected(other)),
        }
    }
    if options.show_help {
        return Ok(options);
    }
    let [domain, id, status] = <[String; 3]>::try_from(positional).map_err(|_| {
        XtaskError::validation("expected `<domain> <record-id> <status>`")
            .with_hint("run `cargo xtask transition --help`")
    })?;
    options.domain = domain;
    options.id = id;
    options.to = Some(status.parse::<Status>()?);
    Ok(options)
}

/// Apply a guarded transition and write the record plus the regenerated index.
pub(crate) fn transition_record(
    ctx: &CommandContext,
    options: &TransitionOptions,
) -> XtaskResult<StructuredDocument> {
    let to = options
        .to
        .ok_or_else(|| XtaskError::validation("missing target status"))?;
    let domain = options.domain.as_str();
    let tree = ctx.config_tree()?;
    let rules = ctx.document_rules(&tree, domain)?;
    let set = RecordSet::load(ctx.root(), domain, &rules)
        .map_err(|err| XtaskError::from(err).with_operation(format!("load `{domain}` records")))?;
    let references = ctx.references(&tree, &set)?;

    let updated = set.transition(&options.id, to, &references)?;
    let path = ctx.root().join(&updated.rel_path);
    fs::write(&path, updated.render())
        .map_err(|err| XtaskError::from(err).with_operation("write record").with_path(&path))?;

    let reloaded = RecordSet::load(ctx.root(), domain, &rules)
        .map_err(|err| XtaskError::from(err).with_operation(format!("reload `{domain}` records")))?;
    let index_path = ctx
        .root()
        .join(&rules.records_dir)
        .join(&rules.index_file);
    fs::write(&index_path, reloaded.expected_index()).map_err(|err| {
        XtaskError::from(err)
            .with_operation("regenerate index")
            .with_path(&index_path)
    })?;
    tracing::info!(id = %updated.id, status = %to, "record transitioned");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn write(root: &Path, rel: &str, text: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, text).expect("write");
    }

    fn fixture(body: &str) -> tempfile::TempDir {
        let root = tempfile::tempdir().expect("tempdir");
        write(
            root.path(),
            "cfg/adr.toml",
            "domain = \"adr\"\n[rules]\nrecords_dir = \"docs/adr\"\nid_prefix = \"ADR\"\n\
             allowed_sections = [\"Participants\", \"Decision\", \"Consequences\"]\n\
             [rules.lifecycle]\npromotion_sections = [\"Participants\", \"Decision\", \"Consequences\"]\n",
        );
        write(
            root.path(),
            "docs/adr/ADR-00001-log.md",
            &format!("---\ntitle: Log\nstatus: proposed\n---\n{body}"),
        );
        root
    }

    #[test]
    fn transition_parser_requires_three_positionals() {
        let parsed = parse_transition_options(&args(&["adr", "ADR-00001", "accepted"])).expect("parse");
        assert_eq!(parsed.to, Some(Status::Accepted));
        assert!(parse_transition_options(&args(&["adr", "ADR-00001"])).is_err());
        assert!(parse_transition_options(&args(&["adr", "ADR-00001", "done"])).is_err());
    }

    #[test]
    fn accepted_transition_rewrites_status_and_index() {
        let root = fixture("## Participants\nA\n## Decision\nLog.\n## Consequences\nFast.\n");
        let ctx = CommandContext::with_paths(root.path().to_path_buf(), root.path().join("cfg"));
        let options = parse_transition_options(&args(&["adr", "ADR-00001", "accepted"])).expect("parse");
        transition_record(&ctx, &options).expect("transition");

        let text = fs::read_to_string(root.path().join("docs/adr/ADR-00001-log.md")).expect("read");
        assert!(text.contains("status: accepted"));
        assert!(text.contains("## Consequences\nFast."));
        assert!(root.path().join("docs/adr/README.md").exists());
    }

    #[test]
    fn refused_transition_leaves_record_untouched() {
        let body = "## Participants\nA\n## Decision\nLog.\n";
        let root = fixture(body);
        let ctx = CommandContext::with_paths(root.path().to_path_buf(), root.path().join("cfg"));
        let options = parse_transition_options(&args(&["adr", "ADR-00001", "accepted"])).expect("parse");
        let err = transition_record(&ctx, &options).unwrap_err();
        assert!(err.message.contains("Consequences"));

        let text = fs::read_to_string(root.path().join("docs/adr/ADR-00001-log.md")).expect("read");
        assert!(text.contains("status: proposed"));
        assert!(!root.path().join("docs/adr/README.md").exists());
    }
}
