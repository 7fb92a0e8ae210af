//! Runtime configuration read from the environment.
//!
//! | Variable | Required | Default |
//! |----------|----------|---------|
//! | `GITHUB_TOKEN` | yes | |
//! | `WEBHOOK_SECRET` | yes | |
//! | `SPACKBOT_NAME` | no | `spackbot` |
//! | `SPACKBOT_BIND_ADDR` | no | `0.0.0.0:8080` |
//! | `GITLAB_TOKEN` | no | pipeline commands disabled |
//! | `SPACK_GITLAB_URL` | no | `https://gitlab.spack.io` |
//! | `GITLAB_PROJECT_URL` | no | `{SPACK_GITLAB_URL}/api/v4/projects/2` |
//! | `PR_MIRROR_BUCKET` | no | `rebuild everything` leaves the PR mirror alone |
//! | `SPACK_UPSTREAM` | no | `https://github.com/spack/spack` |
//!
//! The S3 client for `PR_MIRROR_BUCKET` reads `AWS_REGION`,
//! `AWS_ACCESS_KEY_ID` and `AWS_SECRET_ACCESS_KEY` itself.

use std::fmt;
use std::net::SocketAddr;

use thiserror::Error;

pub const DEFAULT_BOT_NAME: &str = "spackbot";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_GITLAB_URL: &str = "https://gitlab.spack.io";
pub const DEFAULT_SPACK_UPSTREAM: &str = "https://github.com/spack/spack";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// GitLab endpoints and credentials for pipeline commands.
#[derive(Clone, PartialEq, Eq)]
pub struct GitLabConfig {
    pub token: String,
    pub base_url: String,
    pub project_url: String,
    /// S3 bucket holding per-PR binary mirrors.
    pub mirror_bucket: Option<String>,
}

impl fmt::Debug for GitLabConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitLabConfig")
            .field("token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("project_url", &self.project_url)
            .field("mirror_bucket", &self.mirror_bucket)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct BotConfig {
    pub github_token: String,
    pub webhook_secret: String,
    pub bot_name: String,
    pub bind_addr: SocketAddr,
    /// Repository cloned for the `spack` that runs `fix style`.
    pub spack_upstream: String,
    /// `None` when `GITLAB_TOKEN` is unset.
    pub gitlab: Option<GitLabConfig>,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from any variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let bind_raw = get("SPACKBOT_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::Invalid {
            name: "SPACKBOT_BIND_ADDR",
            value: bind_raw.clone(),
        })?;

        let gitlab = get("GITLAB_TOKEN").map(|token| {
            let base_url = get("SPACK_GITLAB_URL")
                .unwrap_or_else(|| DEFAULT_GITLAB_URL.to_string())
                .trim_end_matches('/')
                .to_string();
            let project_url = get("GITLAB_PROJECT_URL")
                .unwrap_or_else(|| format!("{base_url}/api/v4/projects/2"));
            GitLabConfig {
                token,
                base_url,
                project_url,
                mirror_bucket: get("PR_MIRROR_BUCKET"),
            }
        });

        Ok(BotConfig {
            github_token: require("GITHUB_TOKEN")?,
            webhook_secret: require("WEBHOOK_SECRET")?,
            bot_name: get("SPACKBOT_NAME").unwrap_or_else(|| DEFAULT_BOT_NAME.to_string()),
            bind_addr,
            spack_upstream: get("SPACK_UPSTREAM")
                .unwrap_or_else(|| DEFAULT_SPACK_UPSTREAM.to_string()),
            gitlab,
        })
    }
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("github_token", &"<redacted>")
            .field("webhook_secret", &"<redacted>")
            .field("bot_name", &self.bot_name)
            .field("bind_addr", &self.bind_addr)
            .field("spack_upstream", &self.spack_upstream)
            .field("gitlab", &self.gitlab)
            .finish()
    }
}
