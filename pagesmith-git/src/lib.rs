//! # pagesmith-git
//!
//! The version-control gateway used by the publisher.
//!
//! [`VersionControl`] is the seam; [`GitCli`] drives the real `git`
//! executable and [`mock::MockGit`] stands in for it in tests.

pub mod cli;
pub mod gateway;
pub mod mock;

pub use cli::GitCli;
pub use gateway::{BranchPresence, GitOp, GitOutcome, VersionControl};
