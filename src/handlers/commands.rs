//! Answers `@spackbot` commands left in pull request comments.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::commands::{Command, help_text, parse_command};
use crate::github::ApiClient;
use crate::webhooks::Event;

use super::api::{post_comment, require_str};
use super::fix_style::StyleFixTask;
use super::pipeline::PipelineTrigger;
use super::{Handler, HandlerError};

/// Handles `issue_comment.created`.
pub struct CommandHandler {
    bot_name: String,
    pipelines: Arc<PipelineTrigger>,
    style_fixes: Arc<StyleFixTask>,
}

impl CommandHandler {
    pub fn new(
        bot_name: &str,
        pipelines: Arc<PipelineTrigger>,
        style_fixes: Arc<StyleFixTask>,
    ) -> Self {
        CommandHandler {
            bot_name: bot_name.to_string(),
            pipelines,
            style_fixes,
        }
    }

    /// Comments by the bot's own account, including its GitHub App identity.
    fn is_self(&self, login: &str) -> bool {
        login.eq_ignore_ascii_case(&self.bot_name)
            || login
                .strip_suffix("[bot]")
                .is_some_and(|name| name.eq_ignore_ascii_case(&self.bot_name))
    }
}

#[async_trait]
impl Handler for CommandHandler {
    fn name(&self) -> &str {
        "command-handler"
    }

    async fn handle(&self, event: &Event, client: &dyn ApiClient) -> Result<(), HandlerError> {
        let sender = require_str(event, "/comment/user/login")?;
        if self.is_self(sender) {
            debug!(sender, "Ignoring own comment");
            return Ok(());
        }

        let body = require_str(event, "/comment/body")?;
        let Some(command) = parse_command(body, &self.bot_name) else {
            return Ok(());
        };

        if command.needs_pull_request() && event.get("/issue/pull_request").is_none() {
            debug!(%command, "Ignoring pull request command on a plain issue");
            return Ok(());
        }

        let comments_url = require_str(event, "/issue/comments_url")?;
        info!(%command, sender, "Handling command");

        match command {
            Command::Hello => {
                post_comment(client, comments_url, &format!("Hello {sender}!")).await
            }
            Command::Help => post_comment(client, comments_url, &help_text(&self.bot_name)).await,
            Command::FixStyle => self.style_fixes.run(event, client).await,
            Command::RunPipeline => self.pipelines.run(event, client, false).await,
            Command::RebuildEverything => self.pipelines.run(event, client, true).await,
        }
    }
}
