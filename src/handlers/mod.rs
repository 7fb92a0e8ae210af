//! Event handlers and the contract the router invokes them through.
//!
//! A handler receives the [`Event`] and a borrowed [`ApiClient`] for the
//! duration of one call. It reads only the payload fields it needs and reports
//! failure through [`HandlerError`]; the router records the error and moves on
//! to the next handler.
//!
//! # Handlers
//!
//! | Route | Handler |
//! |-------|---------|
//! | `check_run.completed` | [`StyleCheckCommenter`] - asks for `fix style` on failed style checks |
//! | `pull_request.opened` | [`WelcomeCommenter`] - greets the author with the command list |
//! | `issue_comment.created` | [`CommandHandler`] - answers `@spackbot` commands |

mod api;
mod commands;
mod fix_style;
mod permissions;
mod pipeline;
mod style_check;
mod welcome;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::git::{GitError, StyleFixer};
use crate::github::{ApiClient, TransportError};
use crate::mirror::MirrorError;
use crate::router::RouterBuilder;
use crate::webhooks::Event;

pub use api::{
    error_message, get, get_json, post_comment, post_json, report_failure, require_str,
    require_u64,
};
pub use commands::CommandHandler;
pub use fix_style::StyleFixTask;
pub use permissions::{collaborator_url, has_write_access};
pub use pipeline::{GitLabSettings, PipelineTrigger};
pub use style_check::StyleCheckCommenter;
pub use welcome::WelcomeCommenter;

/// Why a handler invocation failed.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// A payload field the handler needs is missing or has the wrong type.
    #[error("malformed event: missing or invalid field {field}")]
    MalformedEvent { field: String },

    /// The API answered with a non-2xx status.
    #[error("upstream rejected request to {url} with HTTP {status}")]
    UpstreamRejected { status: u16, url: String },

    /// The request never got a response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A local git or `spack style` step failed.
    #[error(transparent)]
    Git(#[from] GitError),

    /// The PR binary mirror could not be cleared.
    #[error(transparent)]
    Mirror(#[from] MirrorError),

    /// The handler panicked; the payload message is kept.
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    pub fn malformed(field: impl Into<String>) -> Self {
        HandlerError::MalformedEvent {
            field: field.into(),
        }
    }
}

/// An async event handler.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Name used in logs and dispatch outcomes.
    fn name(&self) -> &str;

    async fn handle(&self, event: &Event, client: &dyn ApiClient) -> Result<(), HandlerError>;
}

/// Settings the built-in handlers need at construction.
#[derive(Clone)]
pub struct HandlerSettings {
    /// Login the bot answers to, without `@`.
    pub bot_name: String,
    /// GitLab access for pipeline commands; `None` disables them.
    pub gitlab: Option<GitLabSettings>,
    /// Runs `spack style --fix` for `fix style`.
    pub style_fixer: Arc<dyn StyleFixer>,
}

impl fmt::Debug for HandlerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerSettings")
            .field("bot_name", &self.bot_name)
            .field("gitlab", &self.gitlab)
            .finish_non_exhaustive()
    }
}

/// Registers every built-in handler on `builder`.
pub fn register_defaults(builder: &mut RouterBuilder, settings: HandlerSettings) {
    let pipelines = Arc::new(PipelineTrigger::new(settings.gitlab));
    let style_fixes = Arc::new(StyleFixTask::new(
        &settings.bot_name,
        settings.style_fixer,
    ));

    builder
        .register(
            "check_run",
            Some("completed"),
            StyleCheckCommenter::new(&settings.bot_name),
        )
        .register(
            "pull_request",
            Some("opened"),
            WelcomeCommenter::new(&settings.bot_name),
        )
        .register(
            "issue_comment",
            Some("created"),
            CommandHandler::new(&settings.bot_name, pipelines, style_fixes),
        );
}
