//! `cargo xtask changelog <from> <to>`: deterministic changelog from git history.

use crate::commands::{flag_value, unexpected};
use crate::runtime::context::CommandContext;
use crate::runtime::error::{XtaskError, XtaskResult};
use crate::XtaskCommand;
use doc_governance::{ChangelogGenerator, CommitSource};
use std::fs;
use std::path::PathBuf;

/// `cargo xtask changelog ...`
pub struct ChangelogCommand;

/// Parsed `changelog` options.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ChangelogOptions {
    pub from: String,
    pub to: String,
    pub output: Option<PathBuf>,
    pub max_commits: Option<usize>,
    pub config_dir: Option<PathBuf>,
    pub show_help: bool,
}

impl XtaskCommand for ChangelogCommand {
    type Options = ChangelogOptions;

    fn parse(args: &[String]) -> XtaskResult<Self::Options> {
        parse_changelog_options(args)
    }

    fn run(ctx: &CommandContext, options: Self::Options) -> XtaskResult<()> {
        if options.show_help {
            print_changelog_usage();
            return Ok(());
        }
        let ctx = ctx.clone().with_config_dir(options.config_dir.as_deref());
        let rendered = render_changelog(&ctx, ctx.git(), &options)?;
        match &options.output {
            Some(path) => {
                let path = ctx.root().join(path);
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)
                        .map_err(|err| XtaskError::from(err).with_path(parent))?;
                }
                fs::write(&path, rendered).map_err(|err| {
                    XtaskError::from(err)
                        .with_operation("write changelog")
                        .with_path(&path)
                })?;
                println!("wrote {}", path.display());
            }
            None => print!("{rendered}"),
        }
        Ok(())
    }
}

pub(crate) fn print_changelog_usage() {
    eprintln!(
        "Usage: cargo xtask changelog <from> <to> [options]\n\
         \n\
         <from> is exclusive; pass \"\" to start from the root commit.\n\
         \n\
         Options:\n\
           --output <path>      Write to a file instead of stdout\n\
           --max-commits <n>    Override the configured range cap\n\
           --config-dir <path>  Governance config directory (default: tools/governance)\n"
    );
}

fn parse_changelog_options(args: &[String]) -> XtaskResult<ChangelogOptions> {
    let mut options = ChangelogOptions::default();
    let mut positional = Vec::new();
    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--output" | "-o" => {
                options.output = Some(PathBuf::from(flag_value(args, i)?));
                i += 2;
            }
            "--max-commits" => {
                let raw = flag_value(args, i)?;
                let value = raw.parse::<usize>().map_err(|_| {
                    XtaskError::validation(format!("`--max-commits` expects a number, got `{raw}`"))
                })?;
                options.max_commits = Some(value);
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
            other if !other.starts_with('-') && positional.len() < 2 => {
                positional.push(other.to_string());
                i += 1;
            }
            other => return Err(unexpected(other)),
        }
    }
    if options.show_help {
        return Ok(options);
    }
    let [from, to] = <[String; 2]>::try_from(positional).map_err(|_| {
        XtaskError::validation("expected `<from> <to>`")
            .with_hint("run `cargo xtask changelog --help`")
    })?;
    if to.is_empty() {
        return Err(XtaskError::validation("`<to>` must name a revision"));
    }
    options.from = from;
    options.to = to;
    Ok(options)
}

/// Generate and render the changelog for the requested range.
pub(crate) fn render_changelog<S>(
    ctx: &CommandContext,
    source: &S,
    options: &ChangelogOptions,
) -> XtaskResult<String>
where
    S: CommitSource + ?Sized,
{
    let tree = ctx.config_tree()?;
    let rules = ctx.commit_rules(&tree)?;
    let mut generator = ChangelogGenerator::new(&rules);
    if let Some(max) = options.max_commits {
        generator = generator.with_max_commits(max);
    }
    let changelog = generator.generate(source, &options.from, &options.to)?;
    if !changelog.skipped.is_empty() {
        tracing::warn!(
            skipped = changelog.skipped.len(),
            "commits with malformed messages were left out of the changelog"
        );
    }
    Ok(changelog.render())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::error::XtaskErrorCategory;
    use doc_governance::{CommitList, CommitRecord};
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn shipped_ctx() -> CommandContext {
        let root = Path::new(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .expect("workspace root")
            .to_path_buf();
        CommandContext::with_paths(root.clone(), root.join("tools/governance"))
    }

    fn history() -> CommitList {
        CommitList::new(vec![
            CommitRecord::new("aaaaaaa1", "fix(api): reject empty ids\n"),
            CommitRecord::new("bbbbbbb2", "docs: explain ids\n"),
        ])
    }

    #[test]
    fn changelog_parser_accepts_empty_from_and_overrides() {
        let parsed = parse_changelog_options(&args(&["", "HEAD", "--max-commits", "5", "-o", "CHANGELOG.md"]))
            .expect("parse");
        assert_eq!(parsed.from, "");
        assert_eq!(parsed.to, "HEAD");
        assert_eq!(parsed.max_commits, Some(5));
        assert_eq!(parsed.output, Some(PathBuf::from("CHANGELOG.md")));
    }

    #[test]
    fn changelog_parser_rejects_missing_range_and_bad_numbers() {
        assert!(parse_changelog_options(&args(&["v1"])).is_err());
        assert!(parse_changelog_options(&args(&["v1", "v2", "--max-commits", "many"])).is_err());
        assert!(parse_changelog_options(&args(&["v1", ""])).is_err());
    }

    #[test]
    fn changelog_renders_with_shipped_sections() {
        let options = parse_changelog_options(&args(&["", "bbbbbbb2"])).expect("parse");
        let rendered = render_changelog(&shipped_ctx(), &history(), &options).expect("render");
        assert_eq!(
            rendered,
            "# Changelog: ..bbbbbbb2\n\n## Fixes\n### api\n- reject empty ids (aaaaaaa)\n\n## Documentation\n### general\n- explain ids (bbbbbbb)\n"
        );
    }

    #[test]
    fn range_cap_surfaces_as_validation_error() {
        let options =
            parse_changelog_options(&args(&["", "bbbbbbb2", "--max-commits", "1"])).expect("parse");
        let err = render_changelog(&shipped_ctx(), &history(), &options).unwrap_err();
        assert_eq!(err.category, XtaskErrorCategory::Validation);
        assert!(err.hint.is_some());
    }
}
