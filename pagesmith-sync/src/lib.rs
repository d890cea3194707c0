//! # pagesmith-sync
//!
//! Mirrors a built artifact directory onto a publish target and drives the
//! commit and push.
//!
//! Call [`Publisher::run`] for a full publish. The building blocks
//! ([`ArtifactSet::scan`], [`area::prepare`], [`mirror::mirror`]) are public
//! for callers that need a single step.

pub mod area;
pub mod artifact;
pub mod error;
pub mod mirror;
pub mod publish;

pub use area::{AreaOrigin, Teardown, WorkingArea};
pub use artifact::ArtifactSet;
pub use error::PublishError;
pub use mirror::MirrorReport;
pub use publish::{
    resolve_repo_root, resolve_target, PublishEvent, PublishOutcome, PublishReport, PublishState,
    Publisher,
};
