// docker-maintain/src/storage/s3.rs
use aws_sdk_s3 as s3;
use chrono::{DateTime, Utc};
use s3::config::Region;
use s3::error::DisplayErrorContext;
use s3::primitives::ByteStream;
use s3::types::{Delete, ObjectIdentifier};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::remote::{ObjectStore, RemoteObject};
use crate::config::S3Credentials;
use crate::errors::{AppError, Result};

/// S3-compatible bucket reached with static credentials.
pub struct S3Bucket {
    client: s3::Client,
    bucket: String,
}

impl S3Bucket {
    pub async fn connect(credentials: &S3Credentials) -> Self {
        let mut loader = aws_config::defaults(s3::config::BehaviorVersion::latest())
            .region(Region::new(credentials.region.clone()))
            .credentials_provider(s3::config::Credentials::new(
                &credentials.access_key_id,
                &credentials.secret_access_key,
                None,     // session_token
                None,     // expiry
                "Static", // provider_name
            ));
        if let Some(endpoint) = &credentials.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        Self {
            client: s3::Client::new(&sdk_config),
            bucket: credentials.bucket_name.clone(),
        }
    }
}

fn remote_error(action: &str, err: impl std::error::Error) -> AppError {
    AppError::Remote(format!("{} failed: {}", action, DisplayErrorContext(err)))
}

/// Most keys a single `DeleteObjects` request accepts.
const MAX_DELETE_BATCH: usize = 1000;

fn delete_batches(keys: &[String]) -> Result<Vec<Delete>> {
    keys.chunks(MAX_DELETE_BATCH)
        .map(|chunk| {
            let identifiers = chunk
                .iter()
                .map(|key| ObjectIdentifier::builder().key(key).build())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| AppError::RemoteDelete(e.to_string()))?;
            Delete::builder()
                .set_objects(Some(identifiers))
                .build()
                .map_err(|e| AppError::RemoteDelete(e.to_string()))
        })
        .collect()
}

fn to_chrono(stamp: &s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(stamp.secs(), stamp.subsec_nanos())
}

impl ObjectStore for S3Bucket {
    async fn put_file(&self, key: &str, path: &Path) -> Result<()> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| remote_error(&format!("reading {}", path.display()), e))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| remote_error(&format!("upload of {} to bucket {}", key, self.bucket), e))?;
        Ok(())
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<RemoteObject>> {
        let mut objects = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let response = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| remote_error(&format!("listing bucket {}", self.bucket), e))?;

            for object in response.contents() {
                if let Some(key) = object.key() {
                    objects.push(RemoteObject {
                        key: key.to_string(),
                        last_modified: object.last_modified().and_then(to_chrono),
                    });
                }
            }

            match response.next_continuation_token() {
                Some(token) if response.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        debug!("listed {} object(s) under {}", objects.len(), prefix);
        Ok(objects)
    }

    async fn delete_objects(&self, keys: &[String]) -> Result<Vec<String>> {
        let mut deleted = Vec::with_capacity(keys.len());
        for delete in delete_batches(keys)? {
            let response = self
                .client
                .delete_objects()
                .bucket(&self.bucket)
                .delete(delete)
                .send()
                .await
                .map_err(|e| AppError::RemoteDelete(DisplayErrorContext(e).to_string()))?;

            let failed: Vec<String> = response
                .errors()
                .iter()
                .map(|err| {
                    format!(
                        "{}: {}",
                        err.key().unwrap_or("?"),
                        err.message().unwrap_or("unknown error")
                    )
                })
                .collect();
            if !failed.is_empty() {
                return Err(AppError::RemoteDelete(failed.join(", ")));
            }

            deleted.extend(response.deleted().iter().filter_map(|d| d.key().map(str::to_string)));
        }
        Ok(deleted)
    }

    async fn get_to_file(&self, key: &str, destination: &Path) -> Result<()> {
        let mut object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| remote_error(&format!("download of {}", key), e))?;

        let mut output_file = File::create(destination).await?;
        let mut total_bytes = 0;
        while let Some(chunk) = object
            .body
            .try_next()
            .await
            .map_err(|e| remote_error(&format!("reading body of {}", key), e))?
        {
            output_file.write_all(&chunk).await?;
            total_bytes += chunk.len();
        }
        output_file.flush().await?;

        debug!("downloaded {} bytes of {} to {}", total_bytes, key, destination.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_batches_respect_request_limit() -> anyhow::Result<()> {
        let keys: Vec<String> = (0..2500).map(|i| format!("docker_h_{:08}.tar.gz", i)).collect();
        let batches = delete_batches(&keys)?;

        let sizes: Vec<usize> = batches.iter().map(|d| d.objects().len()).collect();
        assert_eq!(sizes, vec![1000, 1000, 500]);
        assert_eq!(batches[1].objects()[0].key(), "docker_h_00001000.tar.gz");
        assert!(delete_batches(&[])?.is_empty());
        Ok(())
    }
}
