//! Greets the author of a newly opened pull request.

use async_trait::async_trait;
use tracing::info;

use crate::commands::help_text;
use crate::github::ApiClient;
use crate::webhooks::Event;

use super::api::{post_comment, require_str};
use super::{Handler, HandlerError};

/// Handles `pull_request.opened`.
pub struct WelcomeCommenter {
    bot_name: String,
}

impl WelcomeCommenter {
    pub fn new(bot_name: &str) -> Self {
        WelcomeCommenter {
            bot_name: bot_name.to_string(),
        }
    }
}

#[async_trait]
impl Handler for WelcomeCommenter {
    fn name(&self) -> &str {
        "welcome-commenter"
    }

    async fn handle(&self, event: &Event, client: &dyn ApiClient) -> Result<(), HandlerError> {
        let author = require_str(event, "/pull_request/user/login")?;
        let comments_url = require_str(event, "/pull_request/comments_url")?;

        let message = format!(
            "Hi @{author}! I see this is your pull request. I'm @{bot}, a bot here to help \
             with things like style checks and pipelines.\n\n{help}",
            bot = self.bot_name,
            help = help_text(&self.bot_name)
        );

        info!(author, "Welcoming pull request author");
        post_comment(client, comments_url, &message).await
    }
}
