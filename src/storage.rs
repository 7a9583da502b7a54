//! Blob storage destination
//!
//! Wraps an `object_store` backend scoped to one container. Azure
//! connection strings get the native Azure backend; URL forms
//! (`file://`, `memory:///`, ...) go through the generic URL parser,
//! which is also the seam integration tests use with the in-memory
//! store.

use bytes::Bytes;
use eyre::{Context, Result, eyre};
use object_store::path::Path as StorePath;
use object_store::{ObjectStore, PutPayload};
use std::sync::Arc;
use url::Url;

/// One named container on an object storage backend.
#[derive(Debug)]
pub struct BlobContainer {
    store: Arc<dyn ObjectStore>,
    prefix: Option<StorePath>,
    label: String,
}

impl BlobContainer {
    /// Connect to `container` on the backend described by `conn_str`.
    ///
    /// Azure connection strings (`AccountName=...;AccountKey=...`) build
    /// the Azure backend scoped to the container; anything else is parsed
    /// as a URL, with the container used as a path prefix inside the
    /// store.
    pub fn connect(conn_str: &str, container: &str) -> Result<Self> {
        if conn_str.contains("AccountName=") {
            let store = azure_from_connection_string(conn_str, container)?;
            return Ok(Self {
                store,
                prefix: None,
                label: format!("azure container {}", container),
            });
        }

        let url = Url::parse(conn_str)
            .with_context(|| format!("Unrecognized storage connection string: {}", conn_str))?;
        let (store, base) = object_store::parse_url(&url)
            .with_context(|| format!("Unsupported storage URL: {}", url))?;
        let prefix = if base.as_ref().is_empty() {
            StorePath::from(container)
        } else {
            StorePath::from(format!("{}/{}", base, container))
        };
        Ok(Self {
            store: Arc::from(store),
            prefix: Some(prefix),
            label: format!("{} container {}", url.scheme(), container),
        })
    }

    /// Wrap an already constructed store. Tests use this with
    /// `object_store::memory::InMemory`.
    pub fn with_store(store: Arc<dyn ObjectStore>, container: &str) -> Self {
        Self {
            store,
            prefix: Some(StorePath::from(container)),
            label: format!("container {}", container),
        }
    }

    fn blob_path(&self, name: &str) -> StorePath {
        match &self.prefix {
            Some(prefix) => prefix.child(name),
            None => StorePath::from(name),
        }
    }

    /// Upload a blob, overwriting any existing blob of the same name.
    pub async fn put(&self, name: &str, data: Bytes) -> Result<()> {
        self.store
            .put(&self.blob_path(name), PutPayload::from(data))
            .await
            .with_context(|| format!("Failed to upload blob: {}", name))?;
        Ok(())
    }

    /// Fetch a blob back. Used by tests to verify uploads.
    pub async fn get(&self, name: &str) -> Result<Bytes> {
        let result = self
            .store
            .get(&self.blob_path(name))
            .await
            .with_context(|| format!("Failed to fetch blob: {}", name))?;
        result
            .bytes()
            .await
            .with_context(|| format!("Failed to read blob body: {}", name))
    }
}

impl std::fmt::Display for BlobContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

fn azure_from_connection_string(conn_str: &str, container: &str) -> Result<Arc<dyn ObjectStore>> {
    let mut account = None;
    let mut key = None;
    for pair in conn_str.split(';') {
        // AccountKey values are base64 and may themselves contain '='.
        let Some((name, value)) = pair.split_once('=') else {
            continue;
        };
        match name.trim() {
            "AccountName" => account = Some(value.trim().to_string()),
            "AccountKey" => key = Some(value.to_string()),
            _ => {}
        }
    }

    let account = account.ok_or_else(|| eyre!("Connection string missing AccountName"))?;
    let key = key.ok_or_else(|| eyre!("Connection string missing AccountKey"))?;

    let store = object_store::azure::MicrosoftAzureBuilder::new()
        .with_account(account)
        .with_access_key(key)
        .with_container_name(container)
        .build()
        .context("Failed to build Azure blob client")?;
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    #[tokio::test]
    async fn test_put_then_get_round_trip() {
        let container = BlobContainer::with_store(Arc::new(InMemory::new()), "exports");
        container
            .put("report.csv", Bytes::from_static(b"id\n1\n"))
            .await
            .unwrap();

        let body = container.get("report.csv").await.unwrap();
        assert_eq!(&body[..], b"id\n1\n");
    }

    #[tokio::test]
    async fn test_put_overwrites_existing_blob() {
        let container = BlobContainer::with_store(Arc::new(InMemory::new()), "exports");
        container
            .put("report.csv", Bytes::from_static(b"old"))
            .await
            .unwrap();
        container
            .put("report.csv", Bytes::from_static(b"new"))
            .await
            .unwrap();

        let body = container.get("report.csv").await.unwrap();
        assert_eq!(&body[..], b"new");
    }

    #[tokio::test]
    async fn test_connect_memory_url() {
        let container = BlobContainer::connect("memory:///", "exports").unwrap();
        container
            .put("a.csv", Bytes::from_static(b"x"))
            .await
            .unwrap();
        assert_eq!(&container.get("a.csv").await.unwrap()[..], b"x");
    }

    #[test]
    fn test_connect_rejects_garbage() {
        assert!(BlobContainer::connect("definitely not a url", "exports").is_err());
    }

    #[test]
    fn test_azure_connection_string_requires_account() {
        let error = BlobContainer::connect("AccountName=dev", "exports").unwrap_err();
        assert!(error.to_string().contains("AccountKey"));
    }

    #[test]
    fn test_azure_connection_string_builds() {
        // Base64 key with '=' padding must survive parsing.
        let conn = "DefaultEndpointsProtocol=https;AccountName=dev;AccountKey=aGVsbG8=;EndpointSuffix=core.windows.net";
        assert!(BlobContainer::connect(conn, "exports").is_ok());
    }
}
