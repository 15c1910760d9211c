//! MediaPicker port - 端末の画像ライブラリ

use async_trait::async_trait;

use crate::domain::{BackendError, LocalImage, Permission, PickOptions, PickResult};

/// MediaPicker は権限確認・画像選択・バイト読み出しを提供
///
/// `pick_image` は `request_permission` が `Granted` を返した後にだけ呼ぶこと。
#[async_trait]
pub trait MediaPicker: Send + Sync {
    async fn request_permission(&self) -> Result<Permission, BackendError>;

    async fn pick_image(&self, options: &PickOptions) -> Result<PickResult, BackendError>;

    async fn read(&self, image: &LocalImage) -> Result<Vec<u8>, BackendError>;
}
