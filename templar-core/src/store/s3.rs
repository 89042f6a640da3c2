//! S3-backed object store.

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use bytes::Bytes;
use tracing::{debug, instrument};

use crate::error::{Result, TemplarError};
use crate::store::{ObjectPage, ObjectRef, ObjectStore};

/// Object store over one S3 bucket.
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a client from ambient AWS configuration.
    ///
    /// When `S3_ACCESS_KEY_ID`/`S3_SECRET_ACCESS_KEY` are set they take
    /// precedence as static credentials; otherwise the default provider
    /// chain applies. Falls back to `us-east-1` when no region is
    /// configured.
    pub async fn from_env(bucket: impl Into<String>) -> Result<Self> {
        let region = aws_config::meta::region::RegionProviderChain::default_provider()
            .or_else("us-east-1");
        let mut loader =
            aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region);

        if let (Ok(access_key), Ok(secret_key)) = (
            std::env::var("S3_ACCESS_KEY_ID"),
            std::env::var("S3_SECRET_ACCESS_KEY"),
        ) {
            debug!("using static S3 credentials from environment");
            let credentials = aws_sdk_s3::config::Credentials::new(
                access_key, secret_key, None, None, "templar-env",
            );
            loader = loader.credentials_provider(credentials);
        }

        let sdk_config = loader.load().await;
        Ok(Self::new(aws_sdk_s3::Client::new(&sdk_config), bucket))
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(level = "debug", skip(self), fields(bucket = %self.bucket))]
    async fn list_page(&self, prefix: &str, continuation: Option<String>) -> Result<ObjectPage> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .set_continuation_token(continuation)
            .send()
            .await
            .map_err(|e| {
                TemplarError::ObjectStore(format!(
                    "ListObjectsV2 failed: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        let objects = response
            .contents()
            .iter()
            .filter_map(|object| {
                object.key().map(|key| ObjectRef {
                    key: key.to_string(),
                    size: object.size(),
                })
            })
            .collect::<Vec<_>>();

        let continuation = response.next_continuation_token().map(str::to_string);
        debug!(
            objects = objects.len(),
            has_more = continuation.is_some(),
            "listed page"
        );

        Ok(ObjectPage {
            objects,
            continuation,
        })
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| TemplarError::Retrieval {
                key: key.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        let body = response
            .body
            .collect()
            .await
            .map_err(|e| TemplarError::Retrieval {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        Ok(body.into_bytes())
    }
}
