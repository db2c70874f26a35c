//! Top-level CLI parsing and help output.

use crate::runtime::error::{XtaskError, XtaskResult};

/// Top-level `xtask` command families.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TopLevelCommand {
    Validate(Vec<String>),
    Transition(Vec<String>),
    CommitMsg(Vec<String>),
    Changelog(Vec<String>),
    Help,
}

/// Parse raw command-line arguments into a top-level command selection.
pub fn parse(args: Vec<String>) -> XtaskResult<TopLevelCommand> {
    let Some(cmd) = args.first().cloned() else {
        return Ok(TopLevelCommand::Help);
    };

    let rest = args[1..].to_vec();
    match cmd.as_str() {
        "validate" => Ok(TopLevelCommand::Validate(rest)),
        "transition" => Ok(TopLevelCommand::Transition(rest)),
        "commit-msg" => Ok(TopLevelCommand::CommitMsg(rest)),
        "changelog" => Ok(TopLevelCommand::Changelog(rest)),
        "help" | "--help" | "-h" => Ok(TopLevelCommand::Help),
        other => Err(XtaskError::validation(format!(
            "unknown xtask command: {other}"
        ))),
    }
}

/// Print the canonical top-level usage text.
pub fn print_usage() {
    eprintln!(
        "Usage: cargo xtask <command> [args]\n\
         \n\
         Commands:\n\
           validate <domain> [--fix] [--check-terms] [--fix-terms] [--migrate]\n\
                              Validate a record domain; fix mode rewrites in place\n\
           transition <domain> <id> <status>\n\
                              Move a record through the status lifecycle\n\
           commit-msg <file> [--branch <name>] [--tiers 1,2,3] [--advisory-tier3]\n\
                              Check a commit message (git commit-msg hook)\n\
           changelog <from> <to> [--output <path>] [--max-commits <n>]\n\
                              Generate a changelog for a commit range\n\
         \n\
         Environment:\n\
           GOVERNANCE_CONFIG_DIR  Config directory (default: tools/governance)\n\
           GOVERNANCE_LOG         Log filter (default: warn)\n\
           GOVERNANCE_LOG_JSON=1  JSON log lines on stderr\n"
    );
}
