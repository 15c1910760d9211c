//! Media picker model.

use serde::{Deserialize, Serialize};

/// Handle to an image chosen on the device. Bytes are read lazily through
/// the picker port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalImage {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl LocalImage {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            file_name: None,
            mime_type: None,
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }
}

/// Options passed to the picker UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickOptions {
    /// Crop aspect ratio (width, height).
    pub aspect: (u32, u32),
    /// Compression quality in `0.0..=1.0`.
    pub quality: f32,
    pub allow_edit: bool,
}

impl Default for PickOptions {
    fn default() -> Self {
        Self {
            aspect: (1, 1),
            quality: 0.8,
            allow_edit: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickResult {
    Picked(LocalImage),
    Cancelled,
}
