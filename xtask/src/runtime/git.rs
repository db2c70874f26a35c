//! Git access for branch detection and changelog history.

use crate::runtime::error::{XtaskError, XtaskResult};
use doc_governance::{CommitRecord, CommitSource};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

const FIELD_SEP: char = '\x1f';
const RECORD_SEP: char = '\x1e';

/// Git repository rooted at a worktree.
#[derive(Clone, Debug)]
pub struct GitRepo {
    root: PathBuf,
}

impl GitRepo {
    /// Repository handle for `root`.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Worktree root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return the current branch name, or `None` when detached or outside a repository.
    pub fn current_branch(&self) -> Option<String> {
        let Ok(output) = Command::new("git")
            .current_dir(&self.root)
            .args(["symbolic-ref", "--short", "-q", "HEAD"])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
        else {
            return None;
        };
        if !output.status.success() {
            return None;
        }
        let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if branch.is_empty() {
            None
        } else {
            Some(branch)
        }
    }

    fn log(&self, from: &str, to: &str, limit: usize) -> XtaskResult<String> {
        for rev in [from, to] {
            if rev.starts_with('-') {
                return Err(XtaskError::validation(format!(
                    "revision `{rev}` must not start with `-`"
                )));
            }
        }
        let range = if from.is_empty() {
            to.to_string()
        } else {
            format!("{from}..{to}")
        };
        let format = format!("--format=%H{FIELD_SEP}%B{RECORD_SEP}");
        let max_count = format!("--max-count={}", limit.saturating_add(1));
        let args = [
            "log",
            "--no-merges",
            format.as_str(),
            max_count.as_str(),
            range.as_str(),
            "--",
        ];
        tracing::debug!(range = %range, limit, "reading git history");

        let output = Command::new("git")
            .current_dir(&self.root)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|err| {
                XtaskError::process_launch(format!("failed to start `git log {range}`: {err}"))
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(XtaskError::process_exit(format!(
                "`git log {range}` exited with status {}: {}",
                output.status,
                stderr.trim()
            ))
            .with_path(&self.root));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl CommitSource for GitRepo {
    type Error = XtaskError;

    fn commits(&self, from: &str, to: &str, limit: usize) -> Result<Vec<CommitRecord>, Self::Error> {
        let raw = self.log(from, to, limit)?;
        let mut commits = parse_log(&raw);
        commits.reverse();
        Ok(commits)
    }
}

/// Split `git log` output in the `%H<US>%B<RS>` format, newest first.
pub(crate) fn parse_log(raw: &str) -> Vec<CommitRecord> {
    raw.split(RECORD_SEP)
        .filter_map(|record| {
            let record = record.trim_start_matches('\n');
            let (id, message) = record.split_once(FIELD_SEP)?;
            let id = id.trim();
            if id.is_empty() {
                None
            } else {
                Some(CommitRecord::new(id, message))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_parser_splits_records_and_keeps_bodies() {
        let raw = "bbbb\x1ffix: second\n\n- [fix] a.rs: b\n\x1e\naaaa\x1ffeat: first\n\x1e\n";
        let commits = parse_log(raw);
        assert_eq!(
            commits,
            vec![
                CommitRecord::new("bbbb", "fix: second\n\n- [fix] a.rs: b\n"),
                CommitRecord::new("aaaa", "feat: first\n"),
            ]
        );
    }

    #[test]
    fn log_parser_ignores_trailing_noise() {
        assert!(parse_log("\n").is_empty());
        assert!(parse_log("").is_empty());
    }

    #[test]
    fn option_like_revisions_are_rejected() {
        let root = tempfile::tempdir().expect("tempdir");
        let repo = GitRepo::new(root.path().to_path_buf());
        let err = repo.commits("--all", "HEAD", 10).expect_err("rejected");
        assert_eq!(
            err.category,
            crate::runtime::error::XtaskErrorCategory::Validation
        );
    }

    #[test]
    fn current_branch_is_none_outside_git_repo() {
        let root = tempfile::tempdir().expect("tempdir");
        let repo = GitRepo::new(root.path().to_path_buf());
        assert_eq!(repo.current_branch(), None);
    }
}
