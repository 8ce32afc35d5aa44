use std::path::PathBuf;

use async_trait::async_trait;
use base64::Engine;

use crate::{
    constants::{IMAGE_EXTENSIONS, RECIPE_IMAGE_DIR},
    error::{CoreError, ErrorKind},
};

/// Persists decoded image bytes and hands back the reference stored on the recipe.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn save(&self, bytes: &[u8], extension: &str) -> Result<String, CoreError>;
}

pub struct FsImageStore {
    root: PathBuf,
}

impl FsImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn save(&self, bytes: &[u8], extension: &str) -> Result<String, CoreError> {
        let directory = self.root.join(RECIPE_IMAGE_DIR);
        tokio::fs::create_dir_all(&directory)
            .await
            .map_err(|e| CoreError::storage(format!("Could not create image directory: {e}")))?;

        let file_name = format!("{}.{extension}", uuid::Uuid::new_v4());
        tokio::fs::write(directory.join(&file_name), bytes)
            .await
            .map_err(|e| CoreError::storage(format!("Could not write image: {e}")))?;

        log::debug!("Stored {} byte image as {file_name}", bytes.len());
        Ok(format!("{RECIPE_IMAGE_DIR}/{file_name}"))
    }
}

/// Splits `data:image/<ext>;base64,<data>` into the extension and decoded bytes.
pub fn decode_data_uri(payload: &str) -> Result<(String, Vec<u8>), CoreError> {
    let invalid = || ErrorKind::Validation.new("Invalid image payload");

    let rest = payload.strip_prefix("data:image/").ok_or_else(invalid)?;
    let (extension, data) = rest.split_once(";base64,").ok_or_else(invalid)?;
    let extension = extension.to_lowercase();

    if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        return Err(CoreError::new(
            ErrorKind::Validation,
            format!("Unsupported image type: {extension}"),
        ));
    }

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|_| ErrorKind::Validation.new("Image is not valid base64"))?;
    if bytes.is_empty() {
        return Err(ErrorKind::Validation.new("Image is empty"));
    }

    Ok((extension, bytes))
}

/// Stores an inline data URI and returns its handle; any other value is taken
/// to be the handle of an image that is already stored.
pub async fn ingest_image(payload: &str, images: &impl ImageStore) -> Result<String, CoreError> {
    if !payload.starts_with("data:") {
        return Ok(payload.to_owned());
    }

    let (extension, bytes) = decode_data_uri(payload)?;
    images.save(&bytes, &extension).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_is_decoded() {
        let (extension, bytes) = decode_data_uri("data:image/PNG;base64,aGVsbG8=").unwrap();
        assert_eq!(extension, "png");
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn malformed_uris_are_rejected() {
        for payload in [
            "data:text/plain;base64,aGVsbG8=",
            "data:image/png,aGVsbG8=",
            "data:image/exe;base64,aGVsbG8=",
            "data:image/png;base64,@@@",
        ] {
            let error = decode_data_uri(payload).unwrap_err();
            assert_eq!(error.kind(), ErrorKind::Validation, "{payload}");
        }
    }

    #[tokio::test]
    async fn inline_image_is_written_under_media_root() {
        let root = tempfile::tempdir().unwrap();
        let images = FsImageStore::new(root.path());

        let handle = ingest_image("data:image/gif;base64,R0lGOA==", &images)
            .await
            .unwrap();
        assert!(handle.starts_with("recipes/"));
        assert!(handle.ends_with(".gif"));

        let written = std::fs::read(root.path().join(&handle)).unwrap();
        assert_eq!(written, b"GIF8");
    }

    #[tokio::test]
    async fn existing_handle_passes_through() {
        let root = tempfile::tempdir().unwrap();
        let images = FsImageStore::new(root.path());
        let handle = ingest_image("recipes/old.png", &images).await.unwrap();
        assert_eq!(handle, "recipes/old.png");
    }
}
