use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use uuid::Uuid;

/// Fallback extension when none can be derived from the source URL.
const DEFAULT_EXT: &str = ".jpg";

/// Longest accepted derived extension, dot included (".jpeg" survives);
/// anything longer is assumed to be a query string or odd suffix.
const MAX_EXT_LEN: usize = 5;

/// Downloads an image and persists it locally, returning the stored path.
///
/// Callers treat failures as non-fatal: a missing thumbnail must not abort
/// ingestion of an otherwise-valid article.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn store(&self, source_url: &str) -> Result<PathBuf>;
}

/// Filesystem-backed image store: fetches over HTTP and writes into a local
/// assets directory under a collision-resistant random name.
pub struct FsImageStore {
    client: Client,
    dir: PathBuf,
}

impl FsImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(crate::fetch::DEFAULT_TIMEOUT_SECS))
            .user_agent(crate::fetch::USER_AGENT)
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self {
            client,
            dir: dir.into(),
        })
    }

    /// Copy a user-supplied local file into the assets directory under a
    /// fresh random name. Used when adding or updating an article by hand.
    pub async fn import(&self, source: &Path) -> Result<PathBuf> {
        let ext = source
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_else(|| DEFAULT_EXT.to_string());
        let dest = self.dir.join(format!("{}{}", Uuid::new_v4(), ext));

        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create assets directory {}", self.dir.display()))?;
        tokio::fs::copy(source, &dest)
            .await
            .with_context(|| format!("failed to copy {} into assets", source.display()))?;
        Ok(dest)
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn store(&self, source_url: &str) -> Result<PathBuf> {
        let name = format!("{}{}", Uuid::new_v4(), derive_extension(source_url));
        let dest = self.dir.join(name);

        let response = self
            .client
            .get(source_url)
            .send()
            .await
            .with_context(|| format!("failed to fetch image {}", source_url))?
            .error_for_status()
            .with_context(|| format!("image fetch rejected for {}", source_url))?;
        let bytes = response
            .bytes()
            .await
            .context("failed to read image body")?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create assets directory {}", self.dir.display()))?;
        tokio::fs::write(&dest, &bytes)
            .await
            .with_context(|| format!("failed to write image to {}", dest.display()))?;

        debug!(url = source_url, path = %dest.display(), "stored enclosure image");
        Ok(dest)
    }
}

/// Extension = characters from the last '.' of the URL, dot included.
/// Overlong or missing extensions fall back to ".jpg".
fn derive_extension(url: &str) -> &str {
    match url.rfind('.') {
        Some(idx) if url.len() - idx <= MAX_EXT_LEN => &url[idx..],
        _ => DEFAULT_EXT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_taken_from_the_last_dot() {
        assert_eq!(derive_extension("http://img.example.com/a/1.png"), ".png");
        assert_eq!(derive_extension("http://x/photo.jpeg"), ".jpeg");
    }

    #[test]
    fn overlong_suffix_falls_back_to_jpg() {
        // Query strings and odd suffixes must not be mistaken for extensions.
        assert_eq!(derive_extension("http://x/pic.png?width=600"), ".jpg");
        assert_eq!(derive_extension("http://x/photo.fullsize"), ".jpg");
    }

    #[test]
    fn url_without_a_dot_falls_back_to_jpg() {
        assert_eq!(derive_extension("http://localhost/pic"), ".jpg");
    }

    #[tokio::test]
    async fn store_downloads_and_writes_under_a_random_name() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/img/1.png")
            .with_status(200)
            .with_body(b"png-bytes".to_vec())
            .create_async()
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsImageStore::new(dir.path()).expect("build store");

        let path = store
            .store(&format!("{}/img/1.png", server.url()))
            .await
            .expect("store image");

        assert!(path.to_string_lossy().ends_with(".png"));
        let written = tokio::fs::read(&path).await.expect("read stored file");
        assert_eq!(written, b"png-bytes");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn failed_download_surfaces_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/img/missing.png")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsImageStore::new(dir.path()).expect("build store");

        let result = store
            .store(&format!("{}/img/missing.png", server.url()))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn import_copies_a_local_file_into_assets() {
        let src_dir = tempfile::tempdir().expect("tempdir");
        let src = src_dir.path().join("cover.png");
        tokio::fs::write(&src, b"local-bytes").await.expect("write source");

        let assets = tempfile::tempdir().expect("tempdir");
        let store = FsImageStore::new(assets.path()).expect("build store");

        let dest = store.import(&src).await.expect("import");
        assert!(dest.starts_with(assets.path()));
        assert!(dest.to_string_lossy().ends_with(".png"));
        let copied = tokio::fs::read(&dest).await.expect("read copy");
        assert_eq!(copied, b"local-bytes");
    }
}
