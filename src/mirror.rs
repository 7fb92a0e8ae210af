//! Per-PR binary mirror storage.
//!
//! GitLab pipelines for a pull request push built binaries to an S3 bucket
//! under the `pr{N}_{branch}` prefix. `rebuild everything` empties that
//! prefix so nothing is reused.

use std::fmt;

use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region, SharedCredentialsProvider};
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_sdk_s3::Client;
use thiserror::Error;
use tracing::{debug, info};

/// S3 accepts at most this many keys per `DeleteObjects` call.
const DELETE_BATCH: usize = 1000;

/// Mirror storage errors.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// Failed to list objects.
    #[error("failed to list s3://{bucket}/{prefix}: {details}")]
    List {
        bucket: String,
        prefix: String,
        details: String,
    },

    /// Failed to delete objects.
    #[error("failed to delete from s3://{bucket}: {details}")]
    Delete { bucket: String, details: String },
}

/// Storage holding the PR binary mirrors.
#[async_trait]
pub trait MirrorStore: Send + Sync {
    /// Bucket name, for logs and messages.
    fn bucket(&self) -> &str;

    /// Deletes every object whose key starts with `prefix` and returns how
    /// many were removed.
    async fn delete_prefix(&self, prefix: &str) -> Result<usize, MirrorError>;
}

/// [`MirrorStore`] backed by an S3 bucket.
#[derive(Clone)]
pub struct S3MirrorStore {
    client: Client,
    bucket: String,
}

impl fmt::Debug for S3MirrorStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3MirrorStore")
            .field("bucket", &self.bucket)
            .finish()
    }
}

impl S3MirrorStore {
    /// Builds a client from `AWS_REGION`, `AWS_ACCESS_KEY_ID` and
    /// `AWS_SECRET_ACCESS_KEY`.
    pub fn from_env(bucket: impl Into<String>) -> Self {
        let region = Region::new(
            std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
        );
        let mut config = aws_sdk_s3::Config::builder().region(region);

        if let (Ok(access_key), Ok(secret_key)) = (
            std::env::var("AWS_ACCESS_KEY_ID"),
            std::env::var("AWS_SECRET_ACCESS_KEY"),
        ) {
            let session_token = std::env::var("AWS_SESSION_TOKEN").ok();
            let credentials =
                Credentials::new(access_key, secret_key, session_token, None, "environment");
            config = config.credentials_provider(SharedCredentialsProvider::new(credentials));
        }

        let bucket = bucket.into();
        info!(bucket = %bucket, "S3 mirror client initialized");
        S3MirrorStore {
            client: Client::from_conf(config.build()),
            bucket,
        }
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, MirrorError> {
        let mut keys = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| MirrorError::List {
                bucket: self.bucket.clone(),
                prefix: prefix.to_string(),
                details: e.to_string(),
            })?;
            keys.extend(page.contents().iter().filter_map(|o| o.key().map(str::to_string)));
        }
        Ok(keys)
    }
}

#[async_trait]
impl MirrorStore for S3MirrorStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, MirrorError> {
        let keys = self.list_keys(prefix).await?;
        debug!(bucket = %self.bucket, prefix, count = keys.len(), "Listed mirror objects");

        let delete_error = |details: String| MirrorError::Delete {
            bucket: self.bucket.clone(),
            details,
        };

        for batch in keys.chunks(DELETE_BATCH) {
            let objects = batch
                .iter()
                .map(|key| ObjectIdentifier::builder().key(key).build())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| delete_error(e.to_string()))?;
            let delete = Delete::builder()
                .set_objects(Some(objects))
                .quiet(true)
                .build()
                .map_err(|e| delete_error(e.to_string()))?;

            self.client
                .delete_objects()
                .bucket(&self.bucket)
                .delete(delete)
                .send()
                .await
                .map_err(|e| delete_error(e.to_string()))?;
        }

        info!(bucket = %self.bucket, prefix, count = keys.len(), "Deleted mirror objects");
        Ok(keys.len())
    }
}
