//! Error types for the governance toolchain.
//!
//! Rule violations are not errors: they are accumulated as [`Violation`](crate::Violation)
//! values. The types here cover the cases that stop one unit of work (a config tree, a
//! document, a commit, a fix, a changelog run).

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

/// Configuration-tree failures. Always fatal for the run.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A parent chain revisits a node already on the current path.
    #[error("config cycle detected: {}", .chain.join(" -> "))]
    Cycle {
        /// Files on the path, ending with the revisited one.
        chain: Vec<String>,
    },

    /// A referenced parent config file does not exist.
    #[error("config `{child}` references missing parent `{parent}`")]
    Missing {
        /// File declaring the reference.
        child: String,
        /// Referenced file name.
        parent: String,
    },

    /// No config file declares the requested domain.
    #[error("no config declares domain `{0}`")]
    UnknownDomain(String),

    /// Two config files declare the same domain.
    #[error("domain `{domain}` is declared by both `{first}` and `{second}`")]
    DuplicateDomain {
        /// Declared domain.
        domain: String,
        /// First declaring file.
        first: String,
        /// Second declaring file.
        second: String,
    },

    /// Config file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying io error.
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML or misses `domain`.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// File path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// A resolved rule has the wrong shape for its typed view.
    #[error("invalid rule set for domain `{domain}`: {message}")]
    InvalidRule {
        /// Domain being resolved.
        domain: String,
        /// Deserializer message.
        message: String,
    },
}

/// Malformed document structure. Reported per document, never aborts a batch.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ParseError {
    /// Frontmatter delimiters are missing or unbalanced.
    #[error("{0}")]
    Delimiter(String),

    /// Frontmatter is not a valid YAML mapping.
    #[error("frontmatter is not a valid mapping: {0}")]
    Yaml(String),

    /// A metadata value nests deeper than one list level.
    #[error("metadata key `{0}` nests deeper than a flat list")]
    Nested(String),
}

/// One heading that appears more than once at the structural depth.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DuplicateHeading {
    /// Heading text.
    pub heading: String,
    /// One-based line numbers of every occurrence.
    pub lines: Vec<usize>,
}

/// Returned by section extraction when headings repeat.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DuplicateHeadingError {
    /// Every duplicated heading, in first-occurrence order.
    pub duplicates: Vec<DuplicateHeading>,
}

impl Display for DuplicateHeadingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "duplicate headings:")?;
        for dup in &self.duplicates {
            let lines: Vec<String> = dup.lines.iter().map(usize::to_string).collect();
            write!(f, " `{}` (lines {})", dup.heading, lines.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for DuplicateHeadingError {}

/// Malformed commit message subject or body.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct GrammarError {
    /// One-based line in the message.
    pub line: usize,
    /// What was expected.
    pub message: String,
}

impl GrammarError {
    pub(crate) fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// A commit range exceeded the configured scan cap.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("commit range `{range}` holds more than {limit} commits")]
pub struct RangeTooLargeError {
    /// Range expression as given.
    pub range: String,
    /// Configured cap.
    pub limit: usize,
}

/// Changelog generation failure.
#[derive(Debug, thiserror::Error)]
pub enum ChangelogError {
    /// The range exceeded the scan cap.
    #[error(transparent)]
    RangeTooLarge(#[from] RangeTooLargeError),

    /// The commit source could not list the range.
    #[error("cannot list commits in `{range}`")]
    Source {
        /// Range expression as given.
        range: String,
        /// Underlying source error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
