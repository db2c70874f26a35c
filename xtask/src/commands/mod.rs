//! Top-level governance command families.

pub mod changelog;
pub mod commit_msg;
pub mod transition;
pub mod validate;

use crate::runtime::error::{XtaskError, XtaskResult};

/// Value following a flag at `args[i]`.
pub(crate) fn flag_value<'a>(args: &'a [String], i: usize) -> XtaskResult<&'a str> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| XtaskError::validation(format!("missing value for `{}`", args[i])))
}

/// Reject a positional argument beyond the expected ones.
pub(crate) fn unexpected(arg: &str) -> XtaskError {
    if arg.starts_with('-') {
        XtaskError::validation(format!("unknown option `{arg}`"))
    } else {
        XtaskError::validation(format!("unexpected argument `{arg}`"))
    }
}
