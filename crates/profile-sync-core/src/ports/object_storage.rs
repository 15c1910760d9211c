//! ObjectStorage port - 外部オブジェクトストレージ（バケット + パス）

use async_trait::async_trait;
use url::Url;

use crate::domain::BackendError;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UploadOptions {
    /// Overwrite an existing object at the same path.
    pub upsert: bool,
    pub content_type: Option<String>,
}

/// ObjectStorage はバイナリを保存し、公開 URL を発行する
///
/// # 設計原則
/// - upload と公開 URL 発行は別呼び出し（アトミックではない）
/// - 公開 URL はオブジェクトの有無を確認せずに組み立てられることがある
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        options: &UploadOptions,
    ) -> Result<(), BackendError>;

    async fn public_url(&self, bucket: &str, path: &str) -> Result<Url, BackendError>;

    async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>, BackendError>;
}
