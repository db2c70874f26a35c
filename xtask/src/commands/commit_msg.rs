//! `cargo xtask commit-msg <file>`: tiered commit message gate for hook use.

use crate::commands::{flag_value, unexpected};
use crate::runtime::context::CommandContext;
use crate::runtime::error::{XtaskError, XtaskResult};
use crate::runtime::report::{Report, ReportFormat, TierStatus};
use crate::XtaskCommand;
use doc_governance::{sort_violations, CommitValidator, TierSelection};
use std::fs;
use std::path::PathBuf;

/// `cargo xtask commit-msg ...`
pub struct CommitMsgCommand;

/// Parsed `commit-msg` options.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommitMsgOptions {
    pub file: Option<PathBuf>,
    pub branch: Option<String>,
    pub selection: TierSelection,
    pub format: ReportFormat,
    pub config_dir: Option<PathBuf>,
    pub show_help: bool,
}

impl XtaskCommand for CommitMsgCommand {
    type Options = CommitMsgOptions;

    fn parse(args: &[String]) -> XtaskResult<Self::Options> {
        parse_commit_msg_options(args)
    }

    fn run(ctx: &CommandContext, options: Self::Options) -> XtaskResult<()> {
        if options.show_help {
            print_commit_msg_usage();
            return Ok(());
        }
        let ctx = ctx.clone().with_config_dir(options.config_dir.as_deref());
        let file = options
            .file
            .as_ref()
            .ok_or_else(|| XtaskError::validation("missing `<file>` argument"))?;
        let text = fs::read_to_string(file).map_err(|err| {
            XtaskError::from(err)
                .with_operation("read commit message")
                .with_path(file)
        })?;
        let branch = options.branch.clone().or_else(|| ctx.git().current_branch());
        let source = file.display().to_string();
        let report = check_message(&ctx, &options, &source, &text, branch.as_deref())?;
        report.emit(options.format)
    }
}

pub(crate) fn print_commit_msg_usage() {
    eprintln!(
        "Usage: cargo xtask commit-msg <file> [options]\n\
         \n\
         Options:\n\
           --branch <name>      Branch to check (default: current git branch)\n\
           --tiers <list>       Comma-separated tiers to run, e.g. 1,2 (default: 1,2,3)\n\
           --advisory-tier3     Report missing justifications as warnings\n\
           --format <text|json> Report format (default: text)\n\
           --config-dir <path>  Governance config directory (default: tools/governance)\n"
    );
}

fn parse_commit_msg_options(args: &[String]) -> XtaskResult<CommitMsgOptions> {
    let mut options = CommitMsgOptions::default();
    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--branch" => {
                options.branch = Some(flag_value(args, i)?.to_string());
                i += 2;
            }
            "--tiers" => {
                options.selection.tiers = TierSelection::parse_list(flag_value(args, i)?)?;
                i += 2;
            }
            "--advisory-tier3" => {
                options.selection.advisory_justification = true;
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
            other if !other.starts_with('-') && options.file.is_none() => {
                options.file = Some(PathBuf::from(other));
                i += 1;
            }
            other => return Err(unexpected(other)),
        }
    }
    if options.file.is_none() && !options.show_help {
        return Err(XtaskError::validation("missing `<file>` argument")
            .with_hint("git passes the message file path to the `commit-msg` hook"));
    }
    Ok(options)
}

/// Run the selected tiers over one message.
pub(crate) fn check_message(
    ctx: &CommandContext,
    options: &CommitMsgOptions,
    source: &str,
    text: &str,
    branch: Option<&str>,
) -> XtaskResult<Report> {
    let tree = ctx.config_tree()?;
    let rules = ctx.commit_rules(&tree)?;
    let outcomes =
        CommitValidator::new(&rules, options.selection.clone()).validate(source, text, branch);
    tracing::debug!(source, branch = ?branch, tiers = outcomes.len(), "checked commit message");

    let mut report = Report::new("commit-msg");
    report.tiers = outcomes.iter().map(TierStatus::from).collect();
    let mut violations: Vec<_> = outcomes.into_iter().flat_map(|o| o.violations).collect();
    sort_violations(&mut violations);
    report.violations = violations;
    Ok(report)
}
