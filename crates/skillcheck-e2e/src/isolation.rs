//! Private agent home built from copied credentials and the repository's skills.
//!
//! The directory lives as long as the returned [`IsolatedHome`] and is removed
//! on drop.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info};

use crate::error::IsolationError;
use crate::fsutil::copy_tree;
use crate::runner::EnvOverrides;

/// Environment variable the agent CLI reads its home from.
pub const AGENT_HOME_ENV: &str = "CODEX_HOME";

pub const CONFIG_FILE: &str = "config.toml";
pub const AUTH_FILE: &str = "auth.json";

/// Which agent home a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgentHomeMode {
    /// Fresh temp home with copied credentials and repository skills.
    #[default]
    Isolated,
    /// The operator's own home, untouched.
    System,
}

impl AgentHomeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentHomeMode::Isolated => "isolated",
            AgentHomeMode::System => "system",
        }
    }
}

/// The operator's agent home: `$CODEX_HOME`, else `$HOME/.codex`.
pub fn system_agent_home() -> Result<PathBuf, IsolationError> {
    if let Some(home) = std::env::var_os(AGENT_HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    std::env::var_os("HOME")
        .filter(|v| !v.is_empty())
        .map(|home| PathBuf::from(home).join(".codex"))
        .ok_or(IsolationError::NoHome)
}

#[derive(Debug)]
pub struct IsolatedHome {
    dir: TempDir,
    env: EnvOverrides,
}

impl IsolatedHome {
    /// Build a home under the system temp dir from `source_home` credentials
    /// and every directory under `<repo_root>/skills`.
    pub fn build(repo_root: &Path, source_home: &Path) -> Result<Self, IsolationError> {
        let config_src = source_home.join(CONFIG_FILE);
        let auth_src = source_home.join(AUTH_FILE);
        if !config_src.is_file() {
            return Err(IsolationError::MissingConfig(config_src));
        }
        if !auth_src.is_file() {
            return Err(IsolationError::MissingAuth(auth_src));
        }

        let dir = tempfile::Builder::new()
            .prefix("skillcheck-agent-home-")
            .tempdir()?;
        let skills_dst = dir.path().join("skills");
        fs::create_dir_all(&skills_dst)?;

        copy_file(&config_src, &dir.path().join(CONFIG_FILE))?;
        copy_file(&auth_src, &dir.path().join(AUTH_FILE))?;

        let skills_src = repo_root.join("skills");
        let mut skills = 0usize;
        for entry in fs::read_dir(&skills_src)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let to = skills_dst.join(entry.file_name());
            copy_tree(&entry.path(), &to).map_err(|source| IsolationError::Copy {
                from: entry.path(),
                to: to.clone(),
                source,
            })?;
            debug!(skill = %entry.file_name().to_string_lossy(), "copied skill into isolated home");
            skills += 1;
        }

        let mut env = EnvOverrides::new();
        env.insert(
            AGENT_HOME_ENV.to_string(),
            dir.path().to_string_lossy().into_owned(),
        );

        info!(home = %dir.path().display(), skills = skills, "isolated agent home ready");
        Ok(Self { dir, env })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Environment overrides pointing the agent at this home.
    pub fn env(&self) -> &EnvOverrides {
        &self.env
    }
}

fn copy_file(from: &Path, to: &Path) -> Result<(), IsolationError> {
    fs::copy(from, to)
        .map(|_| ())
        .map_err(|source| IsolationError::Copy {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        })
}
