//! Storage service implementation using Apache OpenDAL.

use std::time::Duration;

use opendal::{ErrorKind, Operator, services};

use super::config::{StorageConfig, StorageProvider};
use super::error::StorageError;

/// Storage service for document files (§6 object storage interface).
pub struct StorageService {
    operator: Operator,
    config: StorageConfig,
}

impl StorageService {
    /// Create a new storage service from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized.
    pub fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        let operator = Self::create_operator(&config.provider)?;
        Ok(Self { operator, config })
    }

    fn create_operator(provider: &StorageProvider) -> Result<Operator, StorageError> {
        match provider {
            StorageProvider::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
            } => {
                let builder = services::S3::default()
                    .endpoint(endpoint)
                    .bucket(bucket)
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .region(region);

                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
                    .pipe(Ok)
            }
            StorageProvider::AzureBlob {
                account,
                access_key,
                container,
            } => {
                let builder = services::Azblob::default()
                    .account_name(account)
                    .account_key(access_key)
                    .container(container);

                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
                    .pipe(Ok)
            }
            StorageProvider::LocalFs { root } => {
                let builder = services::Fs::default().root(
                    root.to_str()
                        .ok_or_else(|| StorageError::configuration("invalid path"))?,
                );

                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
                    .pipe(Ok)
            }
        }
    }

    /// Validates a file against the configured size and MIME constraints.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is too large or the MIME type isn't allowed.
    pub fn validate(&self, content_type: &str, size: u64) -> Result<(), StorageError> {
        if size > self.config.max_file_size {
            return Err(StorageError::file_too_large(size, self.config.max_file_size));
        }
        if !self.config.is_mime_type_allowed(content_type) {
            return Err(StorageError::invalid_mime_type(content_type));
        }
        Ok(())
    }

    /// Downloads a file's bytes from storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the path doesn't exist or the read fails.
    pub async fn download(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let buf = self.operator.read(path).await.map_err(StorageError::from)?;
        Ok(buf.to_vec())
    }

    /// Uploads bytes to storage at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if validation or the write fails.
    pub async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.validate(content_type, bytes.len() as u64)?;
        self.operator
            .write(path, bytes)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    /// Generates a time-limited signed URL for reading `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider doesn't support presigning or the
    /// operation fails.
    pub async fn signed_url(&self, path: &str, expires_in_s: u64) -> Result<String, StorageError> {
        let presigned = self
            .operator
            .presign_read(path, Duration::from_secs(expires_in_s))
            .await
            .map_err(StorageError::from)?;
        Ok(presigned.uri().to_string())
    }

    /// Removes one or more files from storage.
    ///
    /// # Errors
    ///
    /// Returns an error if any deletion fails; already-removed paths are not
    /// treated as errors.
    pub async fn remove(&self, paths: &[String]) -> Result<(), StorageError> {
        for path in paths {
            match self.operator.delete(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(StorageError::from(e)),
            }
        }
        Ok(())
    }

    /// Returns true if `path` exists in storage.
    pub async fn exists(&self, path: &str) -> bool {
        match self.operator.stat(path).await {
            Ok(_) => true,
            Err(_) => false,
        }
    }

    /// Returns the bucket/container name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        self.config.provider.bucket()
    }
}

trait Pipe: Sized {
    fn pipe<F, R>(self, f: F) -> R
    where
        F: FnOnce(Self) -> R,
    {
        f(self)
    }
}

impl<T> Pipe for T {}
