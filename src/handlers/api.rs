//! Payload accessors and API calls shared by handlers.
//!
//! The request helpers turn a non-2xx answer into
//! [`HandlerError::UpstreamRejected`], so a handler can use `?` throughout.

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::github::{ApiClient, ApiRequest, ApiResponse};
use crate::webhooks::Event;

use super::HandlerError;

/// Reads a string at a JSON pointer or reports the pointer as malformed.
pub fn require_str<'a>(event: &'a Event, pointer: &str) -> Result<&'a str, HandlerError> {
    event
        .get_str(pointer)
        .ok_or_else(|| HandlerError::malformed(pointer))
}

/// Reads an unsigned integer at a JSON pointer or reports it as malformed.
pub fn require_u64(event: &Event, pointer: &str) -> Result<u64, HandlerError> {
    event
        .get_u64(pointer)
        .ok_or_else(|| HandlerError::malformed(pointer))
}

/// Sends a request and requires a 2xx answer.
pub async fn send(client: &dyn ApiClient, request: ApiRequest) -> Result<ApiResponse, HandlerError> {
    let method = request.method;
    let url = request.url.clone();
    let response = client.request(request).await?;
    debug!(%method, url = %url, status = response.status, "API response");
    if response.is_success() {
        Ok(response)
    } else {
        Err(HandlerError::UpstreamRejected {
            status: response.status,
            url,
        })
    }
}

pub async fn get(client: &dyn ApiClient, url: &str) -> Result<ApiResponse, HandlerError> {
    send(client, ApiRequest::get(url)).await
}

pub async fn post_json(
    client: &dyn ApiClient,
    url: &str,
    body: Value,
) -> Result<ApiResponse, HandlerError> {
    send(client, ApiRequest::post(url, body)).await
}

/// GETs a URL and parses the body. An unparseable body is reported as a
/// malformed field named after the URL.
pub async fn get_json(client: &dyn ApiClient, url: &str) -> Result<Value, HandlerError> {
    let response = get(client, url).await?;
    response.json().map_err(|_| HandlerError::malformed(url))
}

/// Posts `body` as a comment to an issue or pull request comments URL.
pub async fn post_comment(
    client: &dyn ApiClient,
    comments_url: &str,
    body: &str,
) -> Result<(), HandlerError> {
    post_json(client, comments_url, json!({ "body": body })).await?;
    Ok(())
}

/// Formats a failure reply: the summary line followed by the error in a
/// collapsed block.
pub fn error_message(summary: &str, error: &HandlerError) -> String {
    format!("{summary}\n\n<details><summary>Error details</summary>\n\n```\n{error}\n```\n\n</details>")
}

/// Passes `result` through, first replying on the pull request with
/// `summary` and the error if it failed. A failure to post the reply is
/// logged and the original error is kept.
pub async fn report_failure<T>(
    client: &dyn ApiClient,
    comments_url: &str,
    summary: &str,
    result: Result<T, HandlerError>,
) -> Result<T, HandlerError> {
    if let Err(e) = &result {
        warn!(error = %e, summary, "Command failed");
        if let Err(post_error) = post_comment(client, comments_url, &error_message(summary, e)).await
        {
            warn!(error = %post_error, "Could not report command failure");
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::{Method, TransportError};
    use crate::test_utils::MockApiClient;

    #[test]
    fn require_reports_the_pointer() {
        let event = Event::new("check_run", "1", json!({"check_run": {"name": 3}}));
        match require_str(&event, "/check_run/name") {
            Err(HandlerError::MalformedEvent { field }) => assert_eq!(field, "/check_run/name"),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(require_u64(&event, "/check_run/name").is_err());
    }

    #[tokio::test]
    async fn post_comment_sends_body_object() {
        let client = MockApiClient::new();
        post_comment(&client, "https://api.github.com/c", "hi")
            .await
            .unwrap();
        let posts = client.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].method, Method::Post);
        assert_eq!(posts[0].body, Some(json!({"body": "hi"})));
    }

    #[tokio::test]
    async fn non_success_is_upstream_rejected() {
        let client = MockApiClient::new();
        client.push_response(ApiResponse::new(404));
        match get(&client, "https://api.github.com/missing").await {
            Err(HandlerError::UpstreamRejected { status, url }) => {
                assert_eq!(status, 404);
                assert_eq!(url, "https://api.github.com/missing");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_errors_pass_through() {
        let client = MockApiClient::new();
        client.push_error(TransportError::transient("connection reset"));
        assert!(matches!(
            get_json(&client, "https://api.github.com/x").await,
            Err(HandlerError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn failure_is_reported_then_returned() {
        let client = MockApiClient::new();
        let result: Result<(), _> = Err(HandlerError::UpstreamRejected {
            status: 502,
            url: "https://api.github.com/repos/a/b/pulls/1".to_string(),
        });

        let returned = report_failure(&client, "https://api.github.com/c", "It broke.", result).await;

        assert!(matches!(
            returned,
            Err(HandlerError::UpstreamRejected { status: 502, .. })
        ));
        let body = client.posts()[0].body.clone().unwrap();
        let text = body["body"].as_str().unwrap();
        assert!(text.starts_with("It broke.\n\n<details>"));
        assert!(text.contains("HTTP 502"));
    }

    #[tokio::test]
    async fn success_posts_nothing() {
        let client = MockApiClient::new();
        let returned = report_failure(&client, "https://api.github.com/c", "It broke.", Ok(7)).await;
        assert_eq!(returned.unwrap(), 7);
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn unpostable_report_keeps_original_error() {
        let client = MockApiClient::new();
        client.push_response(ApiResponse::new(403));
        let result: Result<(), _> = Err(HandlerError::malformed("/head/ref"));

        let returned = report_failure(&client, "https://api.github.com/c", "It broke.", result).await;

        assert!(matches!(returned, Err(HandlerError::MalformedEvent { .. })));
    }
}
