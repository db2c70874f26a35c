//! Documentation governance commands (`cargo xtask`).
//!
//! The crate is a small CLI layer over the `doc_governance` library. Command modules own option
//! parsing and write-back policy while [`runtime`] owns config loading, git access, report
//! printing, and logging.

pub mod cli;
pub mod commands;
pub mod runtime;

use crate::cli::TopLevelCommand;
use crate::commands::changelog::ChangelogCommand;
use crate::commands::commit_msg::CommitMsgCommand;
use crate::commands::transition::TransitionCommand;
use crate::commands::validate::ValidateCommand;
use crate::runtime::context::CommandContext;
use crate::runtime::error::{XtaskError, XtaskResult};

/// Shared command contract for top-level xtask command families.
///
/// Implementations treat [`XtaskCommand::parse`] as a pure translation step from raw CLI
/// arguments into a typed options value and keep side effects in [`XtaskCommand::run`].
pub trait XtaskCommand {
    /// Typed options produced by CLI parsing for the command family.
    type Options;

    /// Parse command-line arguments into typed options.
    ///
    /// Implementations should return [`XtaskError::validation`](crate::runtime::error::XtaskError::validation)
    /// for invalid user-facing argument shapes.
    fn parse(args: &[String]) -> XtaskResult<Self::Options>;

    /// Execute the command family using the shared runtime context.
    fn run(ctx: &CommandContext, options: Self::Options) -> XtaskResult<()>;
}

/// Executes the `xtask` binary using the current process arguments.
pub fn execute_from_env() -> XtaskResult<()> {
    let parsed = cli::parse(std::env::args().skip(1).collect())?;
    let ctx = CommandContext::new()?;

    match parsed {
        TopLevelCommand::Validate(args) => {
            ValidateCommand::run(&ctx, ValidateCommand::parse(&args)?)
        }
        TopLevelCommand::Transition(args) => {
            TransitionCommand::run(&ctx, TransitionCommand::parse(&args)?)
        }
        TopLevelCommand::CommitMsg(args) => {
            CommitMsgCommand::run(&ctx, CommitMsgCommand::parse(&args)?)
        }
        TopLevelCommand::Changelog(args) => {
            ChangelogCommand::run(&ctx, ChangelogCommand::parse(&args)?)
        }
        TopLevelCommand::Help => {
            cli::print_usage();
            Ok(())
        }
    }
}

/// Converts an xtask result into a stable process exit code.
///
/// All command failures, including failed gates, map to exit code `1` after printing the
/// formatted [`XtaskError`] to stderr.
pub fn exit_code(result: XtaskResult<()>) -> std::process::ExitCode {
    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::ExitCode::from(1)
        }
    }
}

impl From<String> for XtaskError {
    fn from(value: String) -> Self {
        XtaskError::validation(value)
    }
}
