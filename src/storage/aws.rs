//! AWS S3 object store.
//!
//! Reads camera objects from a single S3 bucket. Keys are mapped as
//! `{prefix}{YYYY/MM/DD/filename}` so the date partitions may live under
//! a sub-directory of a shared bucket.
//!
//! Credentials are resolved via the standard AWS credential chain
//! (env vars, `~/.aws/credentials`, IAM role, etc.).

use aws_sdk_s3::types::Object;
use aws_sdk_s3::Client;
use futures_util::stream;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, info};

use super::backend::{ObjectStore, StoreObject};

/// Read-only store backed by one AWS S3 bucket.
pub struct AwsObjectStore {
    /// AWS S3 SDK client.
    client: Client,
    /// The bucket holding the date-partitioned objects.
    bucket: String,
    /// Key prefix inside the bucket.
    prefix: String,
}

impl AwsObjectStore {
    /// Create a new S3 store.
    ///
    /// Loads AWS credentials from the default credential chain and
    /// initializes the S3 client for the specified region.
    pub async fn new(
        bucket: String,
        region: String,
        prefix: String,
        endpoint_url: Option<String>,
        use_path_style: bool,
    ) -> anyhow::Result<Self> {
        let mut config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region));

        if let Some(ref endpoint) = endpoint_url {
            config_loader = config_loader.endpoint_url(endpoint);
        }

        let sdk_config = config_loader.load().await;

        let s3_config_builder =
            aws_sdk_s3::config::Builder::from(&sdk_config).force_path_style(use_path_style);

        let client = Client::from_conf(s3_config_builder.build());

        info!(
            "AWS object store initialized: bucket={} prefix='{}'",
            bucket, prefix
        );

        Ok(Self {
            client,
            bucket,
            prefix,
        })
    }

    /// Map a gateway key to an upstream S3 key.
    fn s3_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Map an upstream S3 key back to a gateway key.
    fn gateway_key(&self, s3_key: &str) -> Option<String> {
        s3_key.strip_prefix(self.prefix.as_str()).map(str::to_string)
    }

    /// Gateway keys for a page of listed objects, dropping keys outside the prefix.
    fn gateway_keys<'a>(&'a self, objects: &'a [Object]) -> impl Iterator<Item = String> + 'a {
        objects
            .iter()
            .filter_map(|obj| obj.key())
            .filter_map(|k| self.gateway_key(k))
    }

    /// Map an AWS SDK error to an anyhow error with context.
    fn map_sdk_error(context: &str, err: impl std::fmt::Display) -> anyhow::Error {
        anyhow::anyhow!("AWS S3 {context}: {err}")
    }
}

impl ObjectStore for AwsObjectStore {
    fn list(
        &self,
        prefix: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<String>>> + Send + '_>> {
        let prefix = prefix.to_string();
        Box::pin(async move {
            let s3_prefix = self.s3_key(&prefix);

            debug!("AWS list_objects_v2: bucket={} prefix={}", self.bucket, s3_prefix);

            let mut keys = Vec::new();
            let mut continuation_token: Option<String> = None;
            loop {
                let mut req = self
                    .client
                    .list_objects_v2()
                    .bucket(&self.bucket)
                    .prefix(&s3_prefix);

                if let Some(ref token) = continuation_token {
                    req = req.continuation_token(token);
                }

                let resp = req
                    .send()
                    .await
                    .map_err(|e| Self::map_sdk_error("list_objects_v2", e.into_service_error()))?;

                keys.extend(self.gateway_keys(resp.contents()));

                if resp.is_truncated() == Some(true) {
                    continuation_token = resp.next_continuation_token().map(|s| s.to_string());
                    if continuation_token.is_none() {
                        break;
                    }
                } else {
                    break;
                }
            }

            Ok(keys)
        })
    }

    fn get(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<StoreObject>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let s3_key = self.s3_key(&key);

            debug!("AWS get_object: bucket={} key={}", self.bucket, s3_key);

            let resp = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(&s3_key)
                .send()
                .await
                .map_err(|e| {
                    let service_err = e.into_service_error();
                    if service_err.is_no_such_key() {
                        anyhow::anyhow!("Object not found: {key}")
                    } else {
                        Self::map_sdk_error("get_object", service_err)
                    }
                })?;

            let content_length = resp.content_length().and_then(|n| u64::try_from(n).ok());

            // ByteStream yields chunks as the socket delivers them.
            let body = stream::unfold(resp.body, |mut body| async move {
                match body.next().await {
                    Some(Ok(chunk)) => Some((Ok(chunk), body)),
                    Some(Err(e)) => Some((Err(std::io::Error::other(e)), body)),
                    None => None,
                }
            });

            Ok(StoreObject {
                content_length,
                body: Box::pin(body),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::config::{BehaviorVersion, Region};

    fn store(prefix: &str) -> AwsObjectStore {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .build();
        AwsObjectStore {
            client: Client::from_conf(config),
            bucket: "buzzercam".to_string(),
            prefix: prefix.to_string(),
        }
    }

    #[test]
    fn test_s3_key_mapping() {
        assert_eq!(store("").s3_key("2024/05/01/a.jpg"), "2024/05/01/a.jpg");
        assert_eq!(
            store("cams/front/").s3_key("2024/05/01/a.jpg"),
            "cams/front/2024/05/01/a.jpg"
        );
    }

    #[test]
    fn test_gateway_key_strips_prefix() {
        let store = store("cams/front/");
        assert_eq!(
            store.gateway_key("cams/front/2024/05/01/a.jpg").as_deref(),
            Some("2024/05/01/a.jpg")
        );
        assert_eq!(store.gateway_key("cams/back/2024/05/01/a.jpg"), None);
        assert_eq!(store.gateway_key("2024/05/01/a.jpg"), None);
    }

    #[test]
    fn test_gateway_key_round_trips() {
        for prefix in ["", "cams/front/"] {
            let store = store(prefix);
            let key = "2024/05/01/clip-0001.avi";
            assert_eq!(store.gateway_key(&store.s3_key(key)).as_deref(), Some(key));
        }
    }

    #[test]
    fn test_gateway_keys_filters_listing_page() {
        let store = store("cams/front/");
        let page = vec![
            Object::builder().key("cams/front/2024/05/01/a.jpg").build(),
            Object::builder().key("cams/frontdoor/2024/05/01/x.jpg").build(),
            Object::builder().build(),
            Object::builder().key("cams/front/2024/05/01/b.avi").build(),
        ];
        let keys: Vec<String> = store.gateway_keys(&page).collect();
        assert_eq!(keys, vec!["2024/05/01/a.jpg", "2024/05/01/b.avi"]);
    }
}
