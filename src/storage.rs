//! Object storage access: listing a bucket prefix and streaming single objects.

use std::io::Write;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Output;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};

use crate::abort::Abort;
use crate::error::{Error, Result};

/// One listed entry. Read-only, taken as reported by the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub key: String,
    pub last_modified: DateTime<Utc>,
}

impl RemoteObject {
    /// Final `/` segment of the key, `None` for directory placeholders like `images/`.
    pub fn file_name(&self) -> Option<&str> {
        self.key.rsplit('/').next().filter(|s| !s.is_empty())
    }
}

#[async_trait]
pub trait ObjectSource: Send + Sync {
    /// Every object under `prefix`, in the order the backend returns them.
    async fn list(&self, bucket: &str, prefix: &str, abort: &Abort) -> Result<Vec<RemoteObject>>;

    /// Streams the object body into `sink` and returns the number of bytes written.
    async fn fetch(
        &self,
        bucket: &str,
        key: &str,
        sink: &mut (dyn Write + Send),
        abort: &Abort,
    ) -> Result<u64>;
}

#[derive(Debug, Clone)]
pub struct S3Source {
    client: Client,
}

impl S3Source {
    /// Builds the client from the ambient credential and region chain. `region` and
    /// `endpoint_url` override what the environment provides.
    pub async fn connect(region: Option<String>, endpoint_url: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = endpoint_url {
            log::debug!("using endpoint {}", endpoint);
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
        }
    }
}

/// Appends one listing page to `objects` and returns the token of the next page, `None`
/// once the listing is complete.
fn merge_page(page: &ListObjectsV2Output, objects: &mut Vec<RemoteObject>) -> Option<String> {
    for obj in page.contents() {
        let Some(key) = obj.key() else {
            continue;
        };
        let last_modified = obj
            .last_modified()
            .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()))
            .unwrap_or_else(|| {
                log::warn!("no last modified time for {}, using epoch", key);
                DateTime::<Utc>::default()
            });
        objects.push(RemoteObject {
            key: key.to_string(),
            last_modified,
        });
    }

    match (page.is_truncated(), page.next_continuation_token()) {
        (Some(true), Some(token)) => Some(token.to_string()),
        _ => None,
    }
}

#[async_trait]
impl ObjectSource for S3Source {
    async fn list(&self, bucket: &str, prefix: &str, abort: &Abort) -> Result<Vec<RemoteObject>> {
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;
        let mut page = 0;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix);
            if let Some(token) = continuation_token.take() {
                request = request.continuation_token(token);
            }

            let response = abort
                .guard(request.send())
                .await?
                .map_err(|e| Error::Backend(DisplayErrorContext(&e).to_string()))?;

            page += 1;
            log::debug!(
                "listing page {} of s3://{}/{}: {} objects",
                page,
                bucket,
                prefix,
                response.contents().len()
            );

            match merge_page(&response, &mut objects) {
                Some(token) => continuation_token = Some(token),
                None => break,
            }
        }

        Ok(objects)
    }

    async fn fetch(
        &self,
        bucket: &str,
        key: &str,
        sink: &mut (dyn Write + Send),
        abort: &Abort,
    ) -> Result<u64> {
        let response = abort
            .guard(self.client.get_object().bucket(bucket).key(key).send())
            .await?
            .map_err(|e| Error::Backend(DisplayErrorContext(&e).to_string()))?;

        let mut body = response.body;
        let mut written = 0u64;
        while let Some(chunk) = abort
            .guard(body.try_next())
            .await?
            .map_err(|e| Error::Backend(e.to_string()))?
        {
            sink.write_all(&chunk)?;
            written += chunk.len() as u64;
        }
        sink.flush()?;

        Ok(written)
    }
}
