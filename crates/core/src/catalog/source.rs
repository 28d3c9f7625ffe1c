use std::path::PathBuf;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::LoadError;

/// Where catalog documents are read from. Both variants are read-only.
#[derive(Debug, Clone)]
pub enum CatalogSource {
    /// Directory on the local filesystem.
    Directory(PathBuf),
    /// Static file host, addressed by base URL.
    Remote {
        /// Base URL without trailing slash.
        base_url: String,
        /// Shared HTTP client.
        client: reqwest::Client,
    },
}

impl CatalogSource {
    /// Pick a remote source for `http(s)://` roots and a directory otherwise.
    pub fn parse(root: &str) -> Self {
        let trimmed = root.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            CatalogSource::Remote {
                base_url: trimmed.trim_end_matches('/').to_string(),
                client: reqwest::Client::new(),
            }
        } else {
            CatalogSource::Directory(PathBuf::from(trimmed))
        }
    }

    /// Local directory, if this is a filesystem source.
    pub fn directory(&self) -> Option<&PathBuf> {
        match self {
            CatalogSource::Directory(path) => Some(path),
            CatalogSource::Remote { .. } => None,
        }
    }

    /// Human-readable location of `relative` within this source.
    pub fn locate(&self, relative: &str) -> String {
        match self {
            CatalogSource::Directory(root) => root.join(relative).display().to_string(),
            CatalogSource::Remote { base_url, .. } => {
                format!("{}/{}", base_url, relative.trim_start_matches('/'))
            }
        }
    }

    /// Fetch and decode the JSON document at `relative`.
    pub async fn fetch<T: DeserializeOwned>(&self, relative: &str) -> Result<T, LoadError> {
        let location = self.locate(relative);
        debug!(location = %location, "Fetching catalog document");
        let bytes = match self {
            CatalogSource::Directory(root) => {
                let path = root.join(relative);
                tokio::fs::read(&path)
                    .await
                    .map_err(|source| LoadError::Read { path, source })?
            }
            CatalogSource::Remote { client, .. } => {
                let fetch_error = |source| LoadError::Fetch {
                    url: location.clone(),
                    source,
                };
                let response = client
                    .get(&location)
                    .send()
                    .await
                    .and_then(|response| response.error_for_status())
                    .map_err(fetch_error)?;
                response.bytes().await.map_err(fetch_error)?.to_vec()
            }
        };

        serde_json::from_slice(&bytes).map_err(|source| LoadError::Parse { location, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CatalogIndex;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn parse_distinguishes_urls_from_paths() {
        let remote = CatalogSource::parse("https://example.com/cards/");
        assert_eq!(
            remote.locate("index.json"),
            "https://example.com/cards/index.json"
        );
        assert!(remote.directory().is_none());

        let local = CatalogSource::parse("webapp/cards");
        assert_eq!(local.directory(), Some(&PathBuf::from("webapp/cards")));
    }

    #[tokio::test]
    async fn directory_fetch_reports_missing_and_malformed_files() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(dir.path().join("broken.json"), "{ nope")?;
        let source = CatalogSource::Directory(dir.path().to_path_buf());

        let missing = source.fetch::<CatalogIndex>("index.json").await;
        assert!(matches!(missing, Err(LoadError::Read { .. })));

        let broken = source.fetch::<CatalogIndex>("broken.json").await;
        assert!(matches!(broken, Err(LoadError::Parse { .. })));
        Ok(())
    }
}
