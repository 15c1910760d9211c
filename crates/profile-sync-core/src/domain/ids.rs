//! Domain identifiers (strongly-typed IDs).
//!
//! - `PrincipalId` は外部の認証サービスが発行する不透明な ID。
//!   クライアント側では形式を解釈せず、文字列としてそのまま扱う。
//! - `AttemptId` はアップロード試行ごとにクライアントが採番する ULID。
//!   時刻でソート可能なので、ログ上で試行の順序を追える。

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Identifier of an authenticated principal, as issued by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(String);

impl PrincipalId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PrincipalId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PrincipalId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Identifier of one upload attempt (pick → upload → link).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttemptId(Ulid);

impl AttemptId {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl From<Ulid> for AttemptId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "upload-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_id_is_opaque_text() {
        let id = PrincipalId::new("8f14e45f-ceea-467f-a8f3-2b0c1d4e5f60");
        assert_eq!(id.to_string(), "8f14e45f-ceea-467f-a8f3-2b0c1d4e5f60");

        // transparent なので JSON 上はただの文字列
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"8f14e45f-ceea-467f-a8f3-2b0c1d4e5f60\"");
    }

    #[test]
    fn attempt_ids_display_with_prefix() {
        let ulid = Ulid::new();
        let id: AttemptId = ulid.into();
        assert_eq!(id.as_ulid(), ulid);
        assert!(id.to_string().starts_with("upload-"));
    }

    #[test]
    fn attempt_ids_are_sortable() {
        let id1 = AttemptId::from_ulid(Ulid::new());
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = AttemptId::from_ulid(Ulid::new());
        assert!(id1 < id2);
    }
}
