//! Comments on a pull request when its style check run fails.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::github::ApiClient;
use crate::types::{PrNumber, RepoId};
use crate::webhooks::Event;

use super::api::{post_comment, require_str, require_u64};
use super::{Handler, HandlerError};

/// Handles `check_run.completed`.
pub struct StyleCheckCommenter {
    bot_name: String,
}

impl StyleCheckCommenter {
    pub fn new(bot_name: &str) -> Self {
        StyleCheckCommenter {
            bot_name: bot_name.to_string(),
        }
    }

    fn message(&self) -> String {
        format!(
            "It looks like you had an issue with style checks! I can help with that if you ask \
             me: just say `@{bot} fix style` and I'll try to format the changed files for you. \
             To check locally, run `spack style --fix`.",
            bot = self.bot_name
        )
    }
}

fn is_style_check(name: &str) -> bool {
    name.to_ascii_lowercase().contains("style")
}

#[async_trait]
impl Handler for StyleCheckCommenter {
    fn name(&self) -> &str {
        "style-check-commenter"
    }

    async fn handle(&self, event: &Event, client: &dyn ApiClient) -> Result<(), HandlerError> {
        let conclusion = require_str(event, "/check_run/conclusion")?;
        let check_name = require_str(event, "/check_run/name")?;

        if conclusion != "failure" || !is_style_check(check_name) {
            debug!(check_name, conclusion, "Not a failed style check");
            return Ok(());
        }

        let pr = PrNumber(require_u64(event, "/check_run/pull_requests/0/number")?);
        let repo = RepoId::new(
            require_str(event, "/repository/owner/login")?,
            require_str(event, "/repository/name")?,
        );

        info!(%repo, %pr, check_name, "Style check failed, commenting");
        post_comment(client, &repo.issue_comments_url(pr), &self.message()).await
    }
}
