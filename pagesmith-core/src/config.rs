//! Publish configuration.
//!
//! # Storage layout
//!
//! ```text
//! <repo_root>/
//!   .pagesmith.yaml   (optional; absent means every field takes its default)
//! ```
//!
//! # API pattern
//!
//! - `load_at(repo_root)`: reads `<repo_root>/.pagesmith.yaml` if present.
//! - `load_file(path)`: reads an explicit file; missing is an error.
//! - `init_at(repo_root)`: writes the defaults atomically unless a file exists.
//!
//! Every loaded config passes through [`PublishConfig::validate`] before it is
//! handed out, so downstream code can splice field values into git arguments.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{invalid, ConfigError};
use crate::types::{BranchName, Identity, ModeKind, PublishMode, RemoteQueryPolicy};

/// File name looked up in the repository root.
pub const CONFIG_FILE_NAME: &str = ".pagesmith.yaml";

pub const DEFAULT_REMOTE: &str = "https://github.com/cyberspacesec/go-iconhash.git";
pub const DEFAULT_BRANCH: &str = "gh-pages";
pub const DEFAULT_DIRECTORY: &str = "docs";
pub const DEFAULT_COMMIT_MESSAGE: &str = "Update GitHub Pages site content";
pub const DEFAULT_MARKER_FILE: &str = ".nojekyll";
pub const DEFAULT_TEMP_PREFIX: &str = "gh-pages";
pub const DEFAULT_SITE_URL: &str = "https://cyberspacesec.github.io/go-iconhash/";

/// Recognized configuration for a publish run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublishConfig {
    /// Explicit remote; takes precedence over `origin` and `default_remote`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
    /// Used when the invoking repository has no readable `origin`.
    pub default_remote: String,
    pub mode: ModeKind,
    pub branch: String,
    /// DirectoryMode target, relative to the repository root.
    pub directory: PathBuf,
    pub identity: Identity,
    pub commit_message: String,
    pub marker_file: String,
    pub temp_prefix: String,
    /// Parent of BranchMode working areas; the system temp dir when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_url: Option<String>,
    pub on_query_failure: RemoteQueryPolicy,
    pub git_program: PathBuf,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            remote: None,
            default_remote: DEFAULT_REMOTE.to_string(),
            mode: ModeKind::default(),
            branch: DEFAULT_BRANCH.to_string(),
            directory: PathBuf::from(DEFAULT_DIRECTORY),
            identity: Identity::default(),
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
            marker_file: DEFAULT_MARKER_FILE.to_string(),
            temp_prefix: DEFAULT_TEMP_PREFIX.to_string(),
            temp_root: None,
            site_url: Some(DEFAULT_SITE_URL.to_string()),
            on_query_failure: RemoteQueryPolicy::default(),
            git_program: PathBuf::from("git"),
        }
    }
}

impl PublishConfig {
    /// Reject values that would be unsafe to pass to git or to join onto the
    /// repository root.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(remote) = &self.remote {
            check_remote("remote", remote)?;
        }
        check_remote("default_remote", &self.default_remote)?;
        check_branch(&self.branch)?;
        check_directory(&self.directory)?;
        check_file_name("marker_file", &self.marker_file)?;
        check_file_name("temp_prefix", &self.temp_prefix)?;
        if self.commit_message.trim().is_empty() {
            return Err(invalid("commit_message", "must not be empty"));
        }
        if self.identity.name.trim().is_empty() {
            return Err(invalid("identity.name", "must not be empty"));
        }
        if self.identity.email.trim().is_empty() {
            return Err(invalid("identity.email", "must not be empty"));
        }
        Ok(())
    }

    /// Resolve the strategy for a repository rooted at `repo_root`.
    pub fn publish_mode(&self, repo_root: &Path) -> PublishMode {
        match self.mode {
            ModeKind::Branch => PublishMode::Branch {
                branch: BranchName::from(self.branch.as_str()),
            },
            ModeKind::Directory => PublishMode::Directory {
                dir: repo_root.join(&self.directory),
            },
        }
    }

    /// Parent directory for ephemeral working areas.
    pub fn temp_root(&self) -> PathBuf {
        self.temp_root.clone().unwrap_or_else(std::env::temp_dir)
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// `<repo_root>/.pagesmith.yaml`: pure, no I/O.
pub fn config_path_at(repo_root: &Path) -> PathBuf {
    repo_root.join(CONFIG_FILE_NAME)
}

/// Load `<repo_root>/.pagesmith.yaml`, or the defaults when the file is absent.
pub fn load_at(repo_root: &Path) -> Result<PublishConfig, ConfigError> {
    let path = config_path_at(repo_root);
    if !path.exists() {
        let config = PublishConfig::default();
        config.validate()?;
        return Ok(config);
    }
    load_file(&path)
}

/// Load an explicitly named config file.
///
/// Returns `ConfigError::NotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_file(path: &Path) -> Result<PublishConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    // An empty file deserializes as YAML null; treat it as "all defaults".
    let config: PublishConfig = if contents.trim().is_empty() {
        PublishConfig::default()
    } else {
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?
    };
    config.validate()?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Init (atomic)
// ---------------------------------------------------------------------------

/// Write the default configuration to `<repo_root>/.pagesmith.yaml`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `rename`.
/// Idempotent: if the file already exists it is loaded and returned unchanged.
pub fn init_at(repo_root: &Path) -> Result<(PathBuf, PublishConfig), ConfigError> {
    let path = config_path_at(repo_root);
    if path.exists() {
        let existing = load_file(&path)?;
        return Ok((path, existing));
    }

    let config = PublishConfig::default();
    let yaml = to_yaml(&config)?;
    let tmp = path.with_file_name(format!("{CONFIG_FILE_NAME}.tmp"));
    std::fs::write(&tmp, yaml).map_err(|e| ConfigError::Io {
        path: tmp.clone(),
        source: e,
    })?;
    if let Err(e) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(ConfigError::Io { path, source: e });
    }
    Ok((path, config))
}

/// Render a config as YAML (used by `init_at` and `pagesmith config`).
pub fn to_yaml(config: &PublishConfig) -> Result<String, ConfigError> {
    Ok(serde_yaml::to_string(config)?)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn check_remote(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    if value.starts_with('-') {
        return Err(invalid(field, "must not start with '-'"));
    }
    Ok(())
}

fn check_branch(branch: &str) -> Result<(), ConfigError> {
    if branch.is_empty() {
        return Err(invalid("branch", "must not be empty"));
    }
    if branch.starts_with('-') {
        return Err(invalid("branch", "must not start with '-'"));
    }
    if branch.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid("branch", "must not contain whitespace"));
    }
    if branch.contains("..") || branch.ends_with('/') || branch.ends_with(".lock") {
        return Err(invalid("branch", format!("'{branch}' is not a valid ref name")));
    }
    Ok(())
}

fn check_directory(dir: &Path) -> Result<(), ConfigError> {
    if dir.as_os_str().is_empty() {
        return Err(invalid("directory", "must not be empty"));
    }
    let mut normal = 0usize;
    for component in dir.components() {
        match component {
            Component::Normal(name) => {
                if name == ".git" {
                    return Err(invalid("directory", "must not point into .git"));
                }
                normal += 1;
            }
            Component::CurDir => {}
            _ => {
                return Err(invalid(
                    "directory",
                    "must be a relative path inside the repository",
                ))
            }
        }
    }
    if normal == 0 {
        return Err(invalid("directory", "must name a subdirectory, not the root"));
    }
    Ok(())
}

fn check_file_name(field: &'static str, name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(invalid(field, "must be a plain file name"));
    }
    if name == ".git" {
        return Err(invalid(field, "must not be .git"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
