use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
};
use rand::{distributions::Alphanumeric, Rng};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

pub const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "gif"];
const NAME_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct UploadedFile {
    /// Path relative to the bucket, e.g. `products/ab12cd.png`
    pub path: String,
    pub public_url: String,
}

/// Stores product images on local disk under `<storage_dir>/<bucket>/products/`.
#[derive(Clone)]
pub struct MediaService {
    storage_dir: PathBuf,
    bucket: String,
    public_base_url: String,
    max_upload_bytes: usize,
    event_sender: Arc<EventSender>,
}

impl MediaService {
    pub fn new(
        storage_dir: impl Into<PathBuf>,
        bucket: impl Into<String>,
        public_base_url: impl Into<String>,
        max_upload_bytes: usize,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            bucket: bucket.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            max_upload_bytes,
            event_sender,
        }
    }

    pub fn bucket_dir(&self) -> PathBuf {
        self.storage_dir.join(&self.bucket)
    }

    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/{}/{}",
            self.public_base_url,
            self.bucket,
            path.trim_start_matches('/')
        )
    }

    /// Rejects empty, oversized or non-image payloads; returns the stored extension.
    pub fn check(&self, file_name: &str, bytes: &[u8]) -> Result<String, ServiceError> {
        if bytes.is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "{} is empty",
                file_name
            )));
        }
        if bytes.len() > self.max_upload_bytes {
            return Err(ServiceError::PayloadTooLarge(format!(
                "{} exceeds {} bytes",
                file_name, self.max_upload_bytes
            )));
        }
        image_extension(file_name)
    }

    /// Writes the bytes under a fresh random name keeping the original extension.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload(&self, file_name: &str, bytes: &[u8]) -> Result<UploadedFile, ServiceError> {
        let ext = self.check(file_name, bytes)?;

        let dir = self.bucket_dir().join("products");
        tokio::fs::create_dir_all(&dir).await?;

        let name = format!("{}.{}", random_name(), ext);
        tokio::fs::write(dir.join(&name), bytes).await?;

        let path = format!("products/{}", name);
        self.event_sender
            .send_or_log(Event::ImageUploaded { path: path.clone() });
        info!("Stored upload {} as {}", file_name, path);

        Ok(UploadedFile {
            public_url: self.public_url(&path),
            path,
        })
    }

    /// All or nothing: every file is checked before the first write, and files
    /// already written are removed if a later write fails.
    #[instrument(skip(self, files), fields(count = files.len()))]
    pub async fn upload_all<B: AsRef<[u8]>>(
        &self,
        files: &[(String, B)],
    ) -> Result<Vec<UploadedFile>, ServiceError> {
        for (file_name, bytes) in files {
            self.check(file_name, bytes.as_ref())?;
        }

        let mut stored = Vec::with_capacity(files.len());
        for (file_name, bytes) in files {
            match self.upload(file_name, bytes.as_ref()).await {
                Ok(file) => stored.push(file),
                Err(e) => {
                    for file in &stored {
                        self.remove(&file.path).await;
                    }
                    return Err(e);
                }
            }
        }
        Ok(stored)
    }

    /// Deletes a stored file by its bucket-relative path.
    pub async fn remove(&self, path: &str) {
        let target = self.bucket_dir().join(path.trim_start_matches('/'));
        if let Err(e) = tokio::fs::remove_file(&target).await {
            warn!("Could not remove upload {}: {}", target.display(), e);
        }
    }
}

/// Lowercased extension, restricted to [`ALLOWED_EXTENSIONS`].
pub fn image_extension(file_name: &str) -> Result<String, ServiceError> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| {
            ServiceError::ValidationError(format!("{} has no file extension", file_name))
        })?;

    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(ServiceError::ValidationError(format!(
            "Unsupported image type '.{}'; expected one of {}",
            ext,
            ALLOWED_EXTENSIONS.join(", ")
        )))
    }
}

fn random_name() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NAME_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn service(dir: &Path, max: usize) -> MediaService {
        let (sender, _rx) = EventSender::channel(8);
        MediaService::new(dir, "products", "http://localhost:8080/", max, Arc::new(sender))
    }

    #[test]
    fn extensions_are_normalised() {
        assert_eq!(image_extension("Photo.JPG").unwrap(), "jpg");
        assert_eq!(image_extension("a.b.webp").unwrap(), "webp");
        assert_matches!(image_extension("notes.txt"), Err(ServiceError::ValidationError(_)));
        assert_matches!(image_extension("README"), Err(ServiceError::ValidationError(_)));
    }

    #[tokio::test]
    async fn upload_writes_under_products_folder() {
        let dir = tempfile::tempdir().unwrap();
        let media = service(dir.path(), 1024);

        let stored = media.upload("coque.PNG", b"\x89PNG fake").await.unwrap();
        assert!(stored.path.starts_with("products/"));
        assert!(stored.path.ends_with(".png"));
        assert_eq!(
            stored.public_url,
            format!("http://localhost:8080/storage/products/{}", stored.path)
        );

        let on_disk = dir.path().join("products").join(&stored.path);
        assert_eq!(tokio::fs::read(on_disk).await.unwrap(), b"\x89PNG fake");
    }

    #[tokio::test]
    async fn rejects_empty_and_oversized_payloads() {
        let dir = tempfile::tempdir().unwrap();
        let media = service(dir.path(), 4);

        assert_matches!(
            media.upload("a.png", b"").await,
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            media.upload("a.png", b"12345").await,
            Err(ServiceError::PayloadTooLarge(_))
        );
    }

    #[tokio::test]
    async fn a_rejected_file_stores_none_of_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let media = service(dir.path(), 1024);
        let files = vec![
            ("a.png".to_string(), b"first".to_vec()),
            ("b.png".to_string(), b"second".to_vec()),
            ("notes.txt".to_string(), b"not an image".to_vec()),
        ];

        assert_matches!(
            media.upload_all(&files[..]).await,
            Err(ServiceError::ValidationError(_))
        );
        assert!(!media.bucket_dir().join("products").exists());

        let stored = media.upload_all(&files[..2]).await.unwrap();
        assert_eq!(stored.len(), 2);

        media.remove(&stored[0].path).await;
        assert!(!media.bucket_dir().join(&stored[0].path).exists());
        assert!(media.bucket_dir().join(&stored[1].path).exists());
    }

    #[test]
    fn generated_names_are_lowercase_alphanumeric() {
        let name = random_name();
        assert_eq!(name.len(), NAME_LEN);
        assert!(name
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }
}
