//! `fix style`: runs `spack style --fix` on a pull request branch and pushes
//! the result as the pull request's author.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::git::{CommitIdentity, StyleFixOutcome, StyleFixRequest, StyleFixer};
use crate::github::ApiClient;
use crate::webhooks::Event;

use super::HandlerError;
use super::api::{get_json, post_comment, report_failure, require_str};
use super::permissions::has_write_access;

const STARTED_MESSAGE: &str = "Let me see if I can fix that for you!";
const ERROR_MESSAGE: &str = "I encountered an error attempting to format style.";
const NO_CHANGES: &str = "I wasn't able to make any further changes, but please see the message above for remaining issues you can fix locally!";
const UPDATED: &str = "I've updated the branch with style fixes.";
const PUSH_REFUSED: &str = "But it looks like I'm not able to push to your branch. 😭️ Did you check maintainer can edit when you opened the PR?";

/// Reply for a sender who is neither the author nor a collaborator.
fn denied_message(sender: &str, author: &str) -> String {
    format!(
        "Sorry {sender}, I cannot do that for you. Only {author} and users with write can make this request!"
    )
}

/// Wraps `spack style` output for a comment.
fn style_message(output: &str) -> String {
    format!(
        "I was able to run `spack style --fix` for you!\n\
         <details>\n<summary><b>spack style --fix</b></summary>\n\n\
         ```bash\n{}\n```\n</details>\n",
        output.trim_end()
    )
}

/// Reply once the fixer has finished.
fn outcome_message(outcome: &StyleFixOutcome) -> String {
    let mut message = style_message(outcome.style_output());
    match outcome {
        StyleFixOutcome::NothingToCommit { .. } => {
            message.push('\n');
            message.push_str(NO_CHANGES);
        }
        StyleFixOutcome::Pushed { .. } => {
            message.push_str("\n\n");
            message.push_str(UPDATED);
        }
        StyleFixOutcome::PushRejected { .. } => {
            message.push_str("\n\n");
            message.push_str(UPDATED);
            message.push_str("\n\n");
            message.push_str(PUSH_REFUSED);
        }
    }
    message
}

fn pull_str<'a>(pull: &'a Value, pr_url: &str, pointer: &str) -> Result<&'a str, HandlerError> {
    pull.pointer(pointer)
        .and_then(|v| v.as_str())
        .ok_or_else(|| HandlerError::malformed(format!("{pr_url}#{pointer}")))
}

/// Runs `fix style` for the command handler.
pub struct StyleFixTask {
    bot_name: String,
    fixer: Arc<dyn StyleFixer>,
}

impl StyleFixTask {
    pub fn new(bot_name: &str, fixer: Arc<dyn StyleFixer>) -> Self {
        StyleFixTask {
            bot_name: bot_name.to_string(),
            fixer,
        }
    }

    /// Handles `fix style` on an `issue_comment` event. Any error after the
    /// comments URL is known is reported on the pull request and returned.
    pub async fn run(&self, event: &Event, github: &dyn ApiClient) -> Result<(), HandlerError> {
        let comments_url = require_str(event, "/issue/comments_url")?;
        let result = self.fix(event, github, comments_url).await;
        report_failure(github, comments_url, ERROR_MESSAGE, result).await
    }

    async fn fix(
        &self,
        event: &Event,
        github: &dyn ApiClient,
        comments_url: &str,
    ) -> Result<(), HandlerError> {
        let pr_url = require_str(event, "/issue/pull_request/url")?;
        let sender = require_str(event, "/sender/login")?;
        let collaborators_url = require_str(event, "/repository/collaborators_url")?;

        let pull = get_json(github, pr_url).await?;
        let author = pull_str(&pull, pr_url, "/user/login")?;

        if !has_write_access(github, collaborators_url, sender, author).await? {
            info!(sender, author, "Style fix request denied");
            return post_comment(github, comments_url, &denied_message(sender, author)).await;
        }

        post_comment(github, comments_url, STARTED_MESSAGE).await?;

        let branch = pull_str(&pull, pr_url, "/head/ref")?;
        let full_name = pull_str(&pull, pr_url, "/head/repo/full_name")?;
        let email = author_email(github, &pull, pr_url, author).await?;

        let request = StyleFixRequest {
            fork_url: format!("git@github.com:{full_name}.git"),
            branch: branch.to_string(),
            identity: CommitIdentity {
                name: author.to_string(),
                email,
            },
            commit_message: format!(
                "[{}] updating style on behalf of {author}",
                self.bot_name
            ),
        };
        info!(author, fork = %request.fork_url, branch, "Running style fix");

        let outcome = self.fixer.fix(request).await?;
        post_comment(github, comments_url, &outcome_message(&outcome)).await
    }
}

/// The author's public email, or their GitHub noreply address when it is
/// hidden.
async fn author_email(
    github: &dyn ApiClient,
    pull: &Value,
    pr_url: &str,
    author: &str,
) -> Result<String, HandlerError> {
    let user_url = pull_str(pull, pr_url, "/user/url")?;
    let user = get_json(github, user_url).await?;
    if let Some(email) = user
        .get("email")
        .and_then(|v| v.as_str())
        .filter(|e| !e.is_empty())
    {
        return Ok(email.to_string());
    }
    let id = user
        .get("id")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| HandlerError::malformed(format!("{user_url}#/id")))?;
    Ok(format!("{id}+{author}@users.noreply.github.com"))
}
