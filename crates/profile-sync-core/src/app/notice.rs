//! User-facing notices (the alert a screen shows after an action).
//!
//! Profile failures stay generic; backend detail goes to the log only.
//! Auth failures are shown with the service's message verbatim.

use crate::domain::{SyncError, UploadOutcome, UploadReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserNotice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl UserNotice {
    fn new(level: NoticeLevel, title: &str, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.to_string(),
            message: message.into(),
        }
    }

    pub fn check_email() -> Self {
        Self::new(
            NoticeLevel::Success,
            "Success",
            "Check your email to confirm your account.",
        )
    }

    pub fn account_created() -> Self {
        Self::new(NoticeLevel::Success, "Success", "Your account is ready.")
    }

    pub fn auth_failure(err: &SyncError) -> Self {
        let message = match err {
            SyncError::Transport(e) => e.message.clone(),
            other => other.to_string(),
        };
        Self::new(NoticeLevel::Error, "Error", message)
    }

    pub fn upload_error() -> Self {
        Self::new(
            NoticeLevel::Error,
            "Error",
            "Could not upload avatar. Please try again.",
        )
    }

    pub fn upload_in_progress() -> Self {
        Self::new(
            NoticeLevel::Info,
            "Please wait",
            "Your profile picture is still uploading.",
        )
    }

    /// Notice for a finished attempt. A cancelled pick shows nothing.
    pub fn for_upload(report: &UploadReport) -> Option<Self> {
        let notice = match &report.outcome {
            UploadOutcome::Linked(_) => {
                Self::new(NoticeLevel::Success, "Success", "Profile picture updated!")
            }
            UploadOutcome::Cancelled => return None,
            UploadOutcome::PermissionDenied => Self::new(
                NoticeLevel::Error,
                "Permission needed",
                "We need access to your photos to set your profile picture.",
            ),
            UploadOutcome::UploadFailed(_) => Self::upload_error(),
            UploadOutcome::LinkFailed(_) => Self::new(
                NoticeLevel::Error,
                "Error",
                "Your picture was uploaded but could not be saved to your profile. Please retry.",
            ),
        };
        Some(notice)
    }
}
