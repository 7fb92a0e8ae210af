//! Who may ask the bot to do work on a pull request.

use tracing::debug;

use crate::github::{ApiClient, ApiRequest};

use super::HandlerError;

/// Expands the `{/collaborator}` template in a repository's
/// `collaborators_url` for one login.
///
/// ```
/// use spackbot::handlers::collaborator_url;
///
/// assert_eq!(
///     collaborator_url("https://api.github.com/repos/a/b/collaborators{/collaborator}", "vsoch"),
///     "https://api.github.com/repos/a/b/collaborators/vsoch"
/// );
/// ```
pub fn collaborator_url(template: &str, login: &str) -> String {
    template.replace("{/collaborator}", &format!("/{login}"))
}

/// Returns true if `sender` authored the pull request or is a collaborator
/// with write access.
///
/// GitHub answers the collaborator check with 204 for collaborators and 404
/// otherwise; any other status is an upstream failure.
pub async fn has_write_access(
    client: &dyn ApiClient,
    collaborators_url: &str,
    sender: &str,
    author: &str,
) -> Result<bool, HandlerError> {
    if sender.eq_ignore_ascii_case(author) {
        return Ok(true);
    }

    let url = collaborator_url(collaborators_url, sender);
    let response = client.request(ApiRequest::get(&url)).await?;
    debug!(sender, status = response.status, "Collaborator check");
    match response.status {
        s if (200..300).contains(&s) => Ok(true),
        404 => Ok(false),
        status => Err(HandlerError::UpstreamRejected { status, url }),
    }
}

/// Reply for a sender without write access.
pub(crate) fn permission_denied_message(sender: &str) -> String {
    format!(
        "Sorry {sender}, I cannot do that for you. Only users with write can make this request!"
    )
}
