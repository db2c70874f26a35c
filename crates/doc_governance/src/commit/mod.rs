//! Commit message grammar and tiered validation.

mod grammar;
mod tiers;

pub use grammar::{parse_draft, Bullet, CommitDraft, CommitMessage, Justification, Subject};
pub use tiers::{CommitValidator, Tier, TierOutcome, TierSelection};
