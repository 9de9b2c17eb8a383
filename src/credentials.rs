//! Service-account key resolution.

use crate::config::ENV_SERVICE_ACCOUNT;
use crate::error::{HarvestError, Result};
use std::path::{Path, PathBuf};

/// Location of a service-account JSON key that exists on disk.
///
/// The key itself is read by the BigQuery client when it authenticates;
/// this type only guarantees the path pointed at a regular file when it
/// was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    key_path: PathBuf,
}

impl Credentials {
    /// Resolves the configured key path.
    ///
    /// Fails when the path is unset, blank, or does not name a regular file.
    pub fn resolve(configured: Option<&Path>) -> Result<Self> {
        // Only UTF-8 paths are trimmed; other paths are used byte for byte.
        let key_path = match configured {
            Some(path) => match path.to_str() {
                Some(text) => PathBuf::from(text.trim()),
                None => path.to_path_buf(),
            },
            None => PathBuf::new(),
        };

        if key_path.as_os_str().is_empty() {
            return Err(HarvestError::authentication(format!(
                "Environment variable '{ENV_SERVICE_ACCOUNT}' is not set.  \
                 Set it to the path of your Google Cloud service-account JSON key file."
            )));
        }

        if !key_path.is_file() {
            return Err(HarvestError::authentication(format!(
                "Service-account key file not found: '{}'.  \
                 Verify the path stored in the '{ENV_SERVICE_ACCOUNT}' environment variable.",
                key_path.display()
            )));
        }

        Ok(Self { key_path })
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }
}
