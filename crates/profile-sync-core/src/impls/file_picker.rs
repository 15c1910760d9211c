//! FilePicker - ローカルファイルを 1 枚だけ「選ぶ」ピッカー
//!
//! CLI からファイルパスを渡して使う。権限は常に許可。

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::{BackendError, LocalImage, Permission, PickOptions, PickResult};
use crate::ports::MediaPicker;

pub struct FilePicker {
    path: PathBuf,
}

impl FilePicker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

fn guess_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}

#[async_trait]
impl MediaPicker for FilePicker {
    async fn request_permission(&self) -> Result<Permission, BackendError> {
        Ok(Permission::Granted)
    }

    async fn pick_image(&self, _options: &PickOptions) -> Result<PickResult, BackendError> {
        let exists = tokio::fs::try_exists(&self.path).await.map_err(|e| {
            BackendError::picker(format!("cannot inspect {}: {e}", self.path.display()))
        })?;
        if !exists {
            return Ok(PickResult::Cancelled);
        }
        let mut image = LocalImage::new(format!("file://{}", self.path.display()));
        if let Some(name) = self.path.file_name().and_then(|n| n.to_str()) {
            image = image.with_file_name(name);
        }
        if let Some(mime) = guess_mime(&self.path) {
            image = image.with_mime_type(mime);
        }
        Ok(PickResult::Picked(image))
    }

    async fn read(&self, image: &LocalImage) -> Result<Vec<u8>, BackendError> {
        let path = image.uri.strip_prefix("file://").unwrap_or(&image.uri);
        tokio::fs::read(path)
            .await
            .map_err(|e| BackendError::picker(format!("cannot read {path}: {e}")))
    }
}
