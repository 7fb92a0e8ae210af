//! Triggers GitLab CI pipelines for pull requests.
//!
//! GitLab mirrors every pull request branch as `pr{N}_{branch}`. A pipeline
//! is started by POSTing to the project's `pipeline` endpoint with that ref
//! and the project access token in `PRIVATE-TOKEN`. A rebuild-everything
//! request first empties that prefix in the PR binary mirror, then turns off
//! spec pruning through pipeline variables.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::github::{ApiClient, ApiRequest, Method};
use crate::mirror::MirrorStore;
use crate::types::PrNumber;
use crate::webhooks::Event;

use super::HandlerError;
use super::api::{get_json, post_comment, report_failure, require_str, require_u64, send};
use super::permissions::{has_write_access, permission_denied_message};

const NO_AUTH_MESSAGE: &str =
    "I'm not able to rebuild everything now because I don't have authentication.";
const FAILED_MESSAGE: &str = "I had a problem triggering the pipeline.";
const REBUILD_ERROR: &str = "I encountered an error attempting to rebuild everything.";
const RUN_ERROR: &str = "I encountered an error attempting to run the pipeline.";

/// GitLab access for pipeline commands.
#[derive(Clone)]
pub struct GitLabSettings {
    /// Client for GitLab calls; not the GitHub client.
    pub client: Arc<dyn ApiClient>,
    pub token: String,
    /// Web root, e.g. `https://gitlab.spack.io`.
    pub base_url: String,
    /// Project API root, e.g. `https://gitlab.spack.io/api/v4/projects/2`.
    pub project_url: String,
    /// PR binary mirror emptied by `rebuild everything`; `None` skips that.
    pub mirror: Option<Arc<dyn MirrorStore>>,
}

impl fmt::Debug for GitLabSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitLabSettings")
            .field("token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("project_url", &self.project_url)
            .field("mirror", &self.mirror.as_ref().map(|m| m.bucket()))
            .finish()
    }
}

/// GitLab ref and mirror prefix for a pull request branch.
pub fn mirror_ref(pr: PrNumber, branch: &str) -> String {
    format!("pr{}_{}", pr.0, branch)
}

/// Builds the pipeline trigger URL for a pull request branch.
pub fn pipeline_url(
    project_url: &str,
    pr: PrNumber,
    branch: &str,
    rebuild_everything: bool,
) -> String {
    let mut url = format!(
        "{}/pipeline?ref={}",
        project_url.trim_end_matches('/'),
        urlencoding::encode(&mirror_ref(pr, branch))
    );
    if rebuild_everything {
        for var in ["SPACK_PRUNE_UNTOUCHED", "SPACK_PRUNE_UP_TO_DATE"] {
            url.push_str(&format!("&variables[][key]={var}&variables[][value]=False"));
        }
    }
    url
}

/// Runs `run pipeline` and `rebuild everything` for the command handler.
#[derive(Debug, Clone)]
pub struct PipelineTrigger {
    gitlab: Option<GitLabSettings>,
}

impl PipelineTrigger {
    pub fn new(gitlab: Option<GitLabSettings>) -> Self {
        PipelineTrigger { gitlab }
    }

    /// Handles a pipeline command on an `issue_comment` event, replying on
    /// the pull request.
    ///
    /// Replies with the pipeline link on success. Any error after the
    /// comments URL is known is reported on the pull request and returned.
    pub async fn run(
        &self,
        event: &Event,
        github: &dyn ApiClient,
        rebuild_everything: bool,
    ) -> Result<(), HandlerError> {
        let comments_url = require_str(event, "/issue/comments_url")?;

        let Some(gitlab) = &self.gitlab else {
            warn!("Pipeline requested but no GitLab token is configured");
            return post_comment(github, comments_url, NO_AUTH_MESSAGE).await;
        };

        let summary = if rebuild_everything {
            REBUILD_ERROR
        } else {
            RUN_ERROR
        };
        let result =
            Self::trigger(gitlab, event, github, comments_url, rebuild_everything).await;
        report_failure(github, comments_url, summary, result).await
    }

    async fn trigger(
        gitlab: &GitLabSettings,
        event: &Event,
        github: &dyn ApiClient,
        comments_url: &str,
        rebuild_everything: bool,
    ) -> Result<(), HandlerError> {
        let pr = PrNumber(require_u64(event, "/issue/number")?);
        let pr_url = require_str(event, "/issue/pull_request/url")?;
        let sender = require_str(event, "/sender/login")?;
        let collaborators_url = require_str(event, "/repository/collaborators_url")?;

        let pull = get_json(github, pr_url).await?;
        let author = pull
            .pointer("/user/login")
            .and_then(|v| v.as_str())
            .ok_or_else(|| HandlerError::malformed(format!("{pr_url}#/user/login")))?;
        let branch = pull
            .pointer("/head/ref")
            .and_then(|v| v.as_str())
            .ok_or_else(|| HandlerError::malformed(format!("{pr_url}#/head/ref")))?;

        if !has_write_access(github, collaborators_url, sender, author).await? {
            info!(sender, %pr, "Pipeline request denied");
            return post_comment(github, comments_url, &permission_denied_message(sender)).await;
        }

        if rebuild_everything {
            let prefix = mirror_ref(pr, branch);
            match &gitlab.mirror {
                Some(mirror) => {
                    info!(bucket = mirror.bucket(), prefix = %prefix, sender, "Clearing PR mirror");
                    mirror.delete_prefix(&prefix).await?;
                }
                None => warn!(prefix = %prefix, "No PR mirror bucket configured, not clearing"),
            }
        }

        let url = pipeline_url(&gitlab.project_url, pr, branch, rebuild_everything);
        info!(sender, %pr, rebuild_everything, url = %url, "Triggering pipeline");

        let request = ApiRequest::new(Method::Post, &url)
            .with_header("PRIVATE-TOKEN", gitlab.token.clone());
        let response = send(gitlab.client.as_ref(), request).await?;

        let details_path = response
            .json()
            .ok()
            .and_then(|body| {
                body.pointer("/detailed_status/details_path")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            });

        let message = match details_path {
            Some(path) => {
                let link = format!(
                    "{}/{}",
                    gitlab.base_url.trim_end_matches('/'),
                    path.trim_start_matches('/')
                );
                info!(pipeline = %link, "Pipeline started");
                format!("I've started that [pipeline]({link}) for you!")
            }
            None => {
                warn!(status = response.status, "Pipeline response has no details path");
                FAILED_MESSAGE.to_string()
            }
        };
        post_comment(github, comments_url, &message).await
    }
}
