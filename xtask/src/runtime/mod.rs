//! Shared governance runtime services.

pub mod context;
pub mod error;
pub mod git;
pub mod logging;
pub mod report;
