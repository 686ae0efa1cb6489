//! S3 object store backed by the AWS SDK.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{ObjectPage, ObjectStore};
use crate::error::{StorageError, StorageResult};

/// Client settings for [`S3ObjectStore`]. Credentials come from the default
/// AWS provider chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Settings {
    pub region: String,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
}

impl Default for S3Settings {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint_url: None,
            force_path_style: false,
        }
    }
}

/// S3 object store.
///
/// The SDK client is built on first use and shared afterwards; concurrent
/// first callers wait on the same initialisation.
pub struct S3ObjectStore {
    settings: S3Settings,
    client: OnceCell<Client>,
}

impl S3ObjectStore {
    /// Create a store that builds its client lazily from `settings`.
    pub fn new(settings: S3Settings) -> Self {
        Self {
            settings,
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> &Client {
        self.client
            .get_or_init(|| async {
                let mut loader = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(self.settings.region.clone()));
                if let Some(ref endpoint) = self.settings.endpoint_url {
                    loader = loader.endpoint_url(endpoint);
                }
                let shared = loader.load().await;
                let config = aws_sdk_s3::config::Builder::from(&shared)
                    .force_path_style(self.settings.force_path_style)
                    .build();
                info!(
                    "S3 client initialized (region: {}, endpoint: {:?})",
                    self.settings.region, self.settings.endpoint_url
                );
                Client::from_conf(config)
            })
            .await
    }
}

/// `CopySource` is `bucket/key` with the key URL-encoded per path segment.
fn copy_source(container: &str, key: &str) -> String {
    let encoded: Vec<_> = key.split('/').map(urlencoding::encode).collect();
    format!("{}/{}", container, encoded.join("/"))
}

fn sdk_error<E>(container: &str, key: &str, error: E) -> StorageError
where
    E: std::error::Error,
{
    StorageError::object(container, key, DisplayErrorContext(&error).to_string())
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list_objects(
        &self,
        container: &str,
        prefix: &str,
        continuation: Option<String>,
    ) -> StorageResult<ObjectPage> {
        let response = self
            .client()
            .await
            .list_objects_v2()
            .bucket(container)
            .prefix(prefix)
            .set_continuation_token(continuation)
            .send()
            .await
            .map_err(|e| sdk_error(container, prefix, e))?;

        let keys: Vec<String> = response
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_string))
            .collect();

        let next_continuation = if response.is_truncated().unwrap_or(false) {
            response.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        debug!(
            "Listed {} keys under s3://{}/{} (more: {})",
            keys.len(),
            container,
            prefix,
            next_continuation.is_some()
        );

        Ok(ObjectPage {
            keys,
            next_continuation,
        })
    }

    async fn copy_object(
        &self,
        source_container: &str,
        source_key: &str,
        target_container: &str,
        target_key: &str,
    ) -> StorageResult<()> {
        self.client()
            .await
            .copy_object()
            .copy_source(copy_source(source_container, source_key))
            .bucket(target_container)
            .key(target_key)
            .send()
            .await
            .map_err(|e| sdk_error(source_container, source_key, e))?;
        Ok(())
    }

    async fn delete_object(&self, container: &str, key: &str) -> StorageResult<()> {
        self.client()
            .await
            .delete_object()
            .bucket(container)
            .key(key)
            .send()
            .await
            .map_err(|e| sdk_error(container, key, e))?;
        Ok(())
    }

    async fn get_object(&self, container: &str, key: &str) -> StorageResult<Vec<u8>> {
        let response = self
            .client()
            .await
            .get_object()
            .bucket(container)
            .key(key)
            .send()
            .await
            .map_err(|e| sdk_error(container, key, e))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::object(container, key, e.to_string()))?;
        Ok(data.into_bytes().to_vec())
    }

    async fn put_object(&self, container: &str, key: &str, body: Vec<u8>) -> StorageResult<()> {
        self.client()
            .await
            .put_object()
            .bucket(container)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| sdk_error(container, key, e))?;
        Ok(())
    }
}
