//! pagesmith core library: domain types, publish configuration, errors.
//!
//! - [`types`]: newtypes and the resolved [`PublishTarget`]
//! - [`config`]: [`PublishConfig`] load / validate / init
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::PublishConfig;
pub use error::ConfigError;
pub use types::{
    BranchName, Identity, ModeKind, PublishMode, PublishTarget, RemoteQueryPolicy, RemoteSource,
    RemoteUrl,
};
