//! Remote publisher: make sure the bucket exists, then upload the finished CSV to
//! `raw/<run_id>.csv` inside it.

use crate::config::StorageCredentials;
use crate::error::{EtlError, EtlResult, Service};
use anyhow::{anyhow, Context, Result};
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::region::Region;
use s3::bucket_ops::BucketConfiguration;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Key prefix for raw extracts inside the bucket.
pub const RAW_PREFIX: &str = "raw";
/// MIME type the extract is stored under.
pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// Minimal object-store surface the publisher needs. `S3Store` is the real one.
pub trait ObjectStore {
    fn container_exists(&self, container: &str) -> Result<bool>;
    fn create_container(&self, container: &str) -> Result<()>;
    fn put_object(&self, container: &str, key: &str, body: &mut dyn Read, content_type: &str) -> Result<()>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for &T {
    fn container_exists(&self, container: &str) -> Result<bool> {
        (**self).container_exists(container)
    }
    fn create_container(&self, container: &str) -> Result<()> {
        (**self).create_container(container)
    }
    fn put_object(&self, container: &str, key: &str, body: &mut dyn Read, content_type: &str) -> Result<()> {
        (**self).put_object(container, key, body, content_type)
    }
}

/// Which branch `ensure_container` took.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerStatus {
    AlreadyExists,
    Created,
}

/// Object key of a run's file: `raw/<run_id>.csv`.
pub fn remote_key(run_id: &str) -> String {
    format!("{}/{}.csv", RAW_PREFIX, run_id)
}

/// Location reported back to the scheduler: `<container>/raw/<run_id>.csv`.
pub fn remote_location(container: &str, run_id: &str) -> String {
    format!("{}/{}", container, remote_key(run_id))
}

/// Idempotent: checks first, creates only when absent.
pub fn ensure_container<S: ObjectStore + ?Sized>(store: &S, container: &str) -> EtlResult<ContainerStatus> {
    let wrap = |source: anyhow::Error| EtlError::ContainerEnsure { container: container.to_string(), source };
    if store.container_exists(container).map_err(wrap)? {
        tracing::info!(container, "Bucket '{}' already exists.", container);
        return Ok(ContainerStatus::AlreadyExists);
    }
    store.create_container(container).map_err(wrap)?;
    tracing::info!(container, "Bucket '{}' created.", container);
    Ok(ContainerStatus::Created)
}

/// Upload `local_path` to `<container>/raw/<file_base_name>.csv` and return that location.
pub fn publish<S: ObjectStore + ?Sized>(
    store: &S,
    local_path: &Path,
    container: &str,
    file_base_name: &str,
) -> EtlResult<String> {
    let location = remote_location(container, file_base_name);
    let mut file = match File::open(local_path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::error!(path = %local_path.display(), "Local file not found");
            return Err(EtlError::LocalFileMissing { path: local_path.to_path_buf() });
        }
        Err(e) => {
            return Err(EtlError::Transfer {
                path: local_path.to_path_buf(),
                location,
                source: anyhow::Error::new(e).context("open local file"),
            })
        }
    };

    tracing::info!(path = %local_path.display(), %location, "Uploading {} to s3://{}...", local_path.display(), location);
    let key = remote_key(file_base_name);
    match store.put_object(container, &key, &mut file, CSV_CONTENT_TYPE) {
        Ok(()) => {
            tracing::info!(%location, "Upload successful.");
            Ok(location)
        }
        Err(source) => {
            tracing::error!(%location, error = %format!("{:#}", source), "S3 upload failed");
            Err(EtlError::Transfer { path: local_path.to_path_buf(), location, source })
        }
    }
}

// ----------------------------- S3 ------------------------------------

pub struct S3Store {
    region: Region,
    creds: Credentials,
    path_style: bool,
}

impl S3Store {
    /// Resolve region and credentials. Empty keys fail here as a storage
    /// authentication error, before the run touches disk.
    pub fn connect(storage: &StorageCredentials) -> EtlResult<Self> {
        if storage.access_key.trim().is_empty() || storage.secret_key.trim().is_empty() {
            return Err(EtlError::auth(Service::Storage, "access key/secret not provided"));
        }
        if storage.bucket.trim().is_empty() {
            return Err(EtlError::Config("destination bucket name not provided".into()));
        }
        let creds = Credentials::new(
            Some(storage.access_key.as_str()),
            Some(storage.secret_key.as_str()),
            None,
            None,
            None,
        )
        .map_err(|e| EtlError::auth(Service::Storage, e.to_string()))?;
        let (region, path_style) = match &storage.endpoint {
            Some(endpoint) => (Region::Custom { region: storage.region.clone(), endpoint: endpoint.clone() }, true),
            None => {
                let region: Region = storage
                    .region
                    .parse()
                    .map_err(|e| EtlError::Config(format!("invalid region '{}': {}", storage.region, e)))?;
                (region, false)
            }
        };
        tracing::info!(region = %storage.region, custom_endpoint = path_style, "S3 client configured");
        Ok(Self { region, creds, path_style })
    }

    fn with_bucket<T>(&self, name: &str, f: impl FnOnce(&Bucket) -> Result<T>) -> Result<T> {
        let bucket = Bucket::new(name, self.region.clone(), self.creds.clone())
            .with_context(|| format!("open bucket handle '{}'", name))?;
        let bucket = if self.path_style { bucket.with_path_style() } else { bucket };
        f(&bucket)
    }
}

impl ObjectStore for S3Store {
    fn container_exists(&self, container: &str) -> Result<bool> {
        self.with_bucket(container, |b| {
            b.exists().with_context(|| format!("check bucket '{}'", container))
        })
    }

    fn create_container(&self, container: &str) -> Result<()> {
        let config = BucketConfiguration::default();
        let resp = if self.path_style {
            Bucket::create_with_path_style(container, self.region.clone(), self.creds.clone(), config)
        } else {
            Bucket::create(container, self.region.clone(), self.creds.clone(), config)
        }
        .with_context(|| format!("create bucket '{}'", container))?;
        if !resp.success() {
            return Err(anyhow!(
                "create bucket '{}' returned {}: {}",
                container,
                resp.response_code,
                resp.response_text
            ));
        }
        Ok(())
    }

    fn put_object(&self, container: &str, key: &str, mut body: &mut dyn Read, content_type: &str) -> Result<()> {
        self.with_bucket(container, |b| {
            let status = b
                .put_object_stream_with_content_type(&mut body, key, content_type)
                .with_context(|| format!("put {}/{}", container, key))?;
            if !(200..300).contains(&status) {
                return Err(anyhow!("put {}/{} returned {}", container, key, status));
            }
            Ok(())
        })
    }
}
