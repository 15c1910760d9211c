//! Domain model (IDs, principals, profile records, upload workflow, errors).

pub mod errors;
pub mod events;
pub mod ids;
pub mod media;
pub mod principal;
pub mod profile;
pub mod upload;

pub use self::errors::{BackendError, ErrorKind, Service, SyncError};
pub use self::events::DomainEvent;
pub use self::ids::{AttemptId, PrincipalId};
pub use self::media::{LocalImage, Permission, PickOptions, PickResult};
pub use self::principal::{
    AuthChangeKind, Credentials, Principal, PrincipalContext, SessionEvent, SessionSnapshot,
    SignUp,
};
pub use self::profile::{AvatarPathStrategy, AvatarRef, ProfileSchema};
pub use self::upload::{PendingLink, UploadAttempt, UploadOutcome, UploadReport, UploadState};
