//! S3-backed ObjectStore implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectCannedAcl, ObjectIdentifier};

use super::{HASH_METADATA_KEY, ListPage, ObjectStore, PutRequest, Result, StoreError};
use crate::config::SyncConfig;

/// An [`ObjectStore`] backed by an S3 bucket.
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Create a new S3 store from the run configuration.
    ///
    /// Static credentials from the config take precedence; otherwise the
    /// standard AWS credential chain applies (env vars, ~/.aws, IAM roles,
    /// etc.).
    pub async fn new(config: &SyncConfig) -> Self {
        let mut aws_config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));

        if let (Some(access_key_id), Some(secret_access_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            aws_config_loader = aws_config_loader.credentials_provider(Credentials::new(
                access_key_id.clone(),
                secret_access_key.clone(),
                None,
                None,
                "bucketsync",
            ));
        }

        let aws_config = aws_config_loader.load().await;

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&aws_config)
            .force_path_style(config.force_path_style);

        if let Some(ref endpoint_url) = config.endpoint_url {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
        }

        let client = Client::from_conf(s3_config_builder.build());

        Self {
            client,
            bucket: config.bucket.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list_page(&self, marker: Option<&str>) -> Result<ListPage> {
        let mut request = self.client.list_objects().bucket(&self.bucket);

        if let Some(marker) = marker {
            request = request.marker(marker);
        }

        let response = request.send().await.map_err(|err| StoreError::List {
            source: Box::new(err),
        })?;

        let keys = response
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_string))
            .collect();

        Ok(ListPage {
            keys,
            is_truncated: response.is_truncated().unwrap_or(false),
        })
    }

    async fn head_metadata(&self, key: &str) -> Result<HashMap<String, String>> {
        let response = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| StoreError::Read {
                key: key.to_string(),
                source: Box::new(err),
            })?;

        Ok(response.metadata().cloned().unwrap_or_default())
    }

    async fn put_object(&self, request: PutRequest<'_>) -> Result<()> {
        let body =
            ByteStream::from_path(request.body_path)
                .await
                .map_err(|err| StoreError::Write {
                    key: request.key.to_string(),
                    source: Box::new(err),
                })?;

        self.client
            .put_object()
            .acl(ObjectCannedAcl::Private)
            .bucket(&self.bucket)
            .key(request.key)
            .body(body)
            .content_type(request.content_type)
            .cache_control(request.cache_control)
            .metadata(HASH_METADATA_KEY, request.digest)
            .send()
            .await
            .map_err(|err| StoreError::Write {
                key: request.key.to_string(),
                source: Box::new(err),
            })?;

        Ok(())
    }

    async fn delete_objects(&self, keys: &[String]) -> Result<()> {
        let objects = keys
            .iter()
            .map(|key| ObjectIdentifier::builder().key(key).build())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|err| StoreError::Delete {
                source: Box::new(err),
            })?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .build()
            .map_err(|err| StoreError::Delete {
                source: Box::new(err),
            })?;

        self.client
            .delete_objects()
            .bucket(&self.bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|err| StoreError::Delete {
                source: Box::new(err),
            })?;

        Ok(())
    }
}
