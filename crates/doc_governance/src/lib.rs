//! Documentation governance: config-driven validation and regeneration for decision records,
//! evidence artifacts, commit messages, and changelogs.
//!
//! The library is side-effect free apart from the explicit `load` / `write` helpers on
//! [`ConfigTree`] and [`RecordSet`]. Process spawning, git access, and report printing live in
//! the `xtask` binary.

pub mod changelog;
pub mod commit;
pub mod config;
pub mod document;
pub mod error;
pub mod fix;
pub mod index;
pub mod lifecycle;
pub mod records;
pub mod sections;
pub mod terms;
pub mod validate;
pub mod violation;

pub use changelog::{Changelog, ChangelogGenerator, CommitList, CommitRecord, CommitSource};
pub use commit::{CommitMessage, CommitValidator, Tier, TierOutcome, TierSelection};
pub use config::{
    ChangelogRules, CommitRules, ConfigNode, ConfigTree, DocumentRules, Ruleset,
    DEFAULT_CONFIG_DIR,
};
pub use document::{MetaValue, StructuredDocument};
pub use error::{
    ChangelogError, ConfigError, DuplicateHeadingError, GrammarError, ParseError,
    RangeTooLargeError,
};
pub use fix::{fix, AppliedFix, FixConflict, FixOptions, FixOutcome};
pub use index::render_index;
pub use lifecycle::{GuardViolation, Lifecycle, Status};
pub use records::{FixReport, RecordSet, TransitionError};
pub use sections::{extract, mask_fenced_blocks, Section};
pub use validate::{ReferenceIndex, ValidateOptions, Validator};
pub use violation::{error_count, sort_violations, Location, Severity, Violation};
