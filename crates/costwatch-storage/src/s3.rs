use crate::error::{Result, StorageError};
use crate::keys::validate_key;
use crate::{DocumentStore, StorageInfo};
use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;
use serde_json::Value;

/// Document store backed by an S3 bucket.
///
/// Credentials come from the default AWS provider chain (instance/task role,
/// environment, shared profile), so no secrets live in costwatch config.
pub struct S3Store {
    client: Client,
    bucket: String,
    region: String,
}

fn backend_err<E>(op: &'static str, err: E) -> StorageError
where
    E: std::error::Error + Send + Sync + 'static,
{
    StorageError::Backend {
        op,
        message: DisplayErrorContext(&err).to_string(),
    }
}

impl S3Store {
    /// Loads ambient credentials and verifies (or creates) the bucket.
    pub async fn connect(bucket: &str, region: &str) -> Result<Self> {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;
        if config.credentials_provider().is_none() {
            return Err(StorageError::Unavailable(
                "no AWS credentials provider configured".to_string(),
            ));
        }

        let store = Self {
            client: Client::new(&config),
            bucket: bucket.to_string(),
            region: region.to_string(),
        };
        store.ensure_bucket().await?;
        Ok(store)
    }

    async fn ensure_bucket(&self) -> Result<()> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => {
                tracing::debug!(bucket = %self.bucket, "S3 bucket accessible");
                Ok(())
            }
            Err(err) => {
                let missing = err
                    .as_service_error()
                    .map(|e| e.is_not_found())
                    .unwrap_or(false);
                if !missing {
                    return Err(StorageError::Unavailable(
                        DisplayErrorContext(&err).to_string(),
                    ));
                }
                self.create_bucket().await
            }
        }
    }

    async fn create_bucket(&self) -> Result<()> {
        let mut req = self.client.create_bucket().bucket(&self.bucket);
        // us-east-1 is the implicit default and rejects an explicit constraint.
        if self.region != "us-east-1" {
            req = req.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }
        req.send()
            .await
            .map_err(|e| StorageError::Unavailable(DisplayErrorContext(&e).to_string()))?;
        tracing::info!(bucket = %self.bucket, region = %self.region, "Created S3 bucket");
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                let missing = err
                    .as_service_error()
                    .map(|e| e.is_not_found())
                    .unwrap_or(false);
                if missing {
                    Ok(false)
                } else {
                    Err(backend_err("head_object", err))
                }
            }
        }
    }
}

#[async_trait]
impl DocumentStore for S3Store {
    fn info(&self) -> StorageInfo {
        StorageInfo {
            backend: "s3".to_string(),
            location: format!("s3://{}", self.bucket),
            fallback: false,
            healthy: true,
        }
    }

    async fn read(&self, key: &str) -> Result<Option<Value>> {
        validate_key(key)?;
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;
        match resp {
            Ok(output) => {
                let bytes = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| backend_err("get_object", e))?
                    .into_bytes();
                Ok(Some(serde_json::from_slice(&bytes)?))
            }
            Err(err) => {
                let missing = err
                    .as_service_error()
                    .map(|e| e.is_no_such_key())
                    .unwrap_or(false);
                if missing {
                    Ok(None)
                } else {
                    Err(backend_err("get_object", err))
                }
            }
        }
    }

    async fn write(&self, key: &str, value: &Value) -> Result<()> {
        validate_key(key)?;
        let bytes = serde_json::to_vec_pretty(value)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/json")
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| backend_err("put_object", e))?;
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let resp = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(token.take())
                .send()
                .await
                .map_err(|e| backend_err("list_objects_v2", e))?;

            keys.extend(
                resp.contents()
                    .iter()
                    .filter_map(|obj| obj.key())
                    .filter(|k| k.ends_with(".json"))
                    .map(str::to_string),
            );

            match resp.next_continuation_token() {
                Some(next) if resp.is_truncated().unwrap_or(false) => {
                    token = Some(next.to_string());
                }
                _ => break,
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        if !self.exists(key).await? {
            return Ok(false);
        }
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| backend_err("delete_object", e))?;
        Ok(true)
    }

    async fn health_check(&self) -> bool {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok()
    }
}
