//! One-shot fault injection for the in-memory adapters.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use super::lock;

/// An external call that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    SignUp,
    SignIn,
    SignOut,
    CurrentSession,
    Select,
    Insert,
    Update,
    Upload,
    PublicUrl,
    Download,
    Permission,
    Pick,
    Read,
}

/// Queue of failure messages per call site. Each armed message fails exactly
/// one call.
#[derive(Debug, Default)]
pub struct FaultInjector {
    armed: Mutex<HashMap<FaultPoint, VecDeque<String>>>,
}

impl FaultInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call at `point` fail with `message`.
    pub fn fail_next(&self, point: FaultPoint, message: impl Into<String>) {
        lock(&self.armed)
            .entry(point)
            .or_default()
            .push_back(message.into());
    }

    /// Consume an armed failure for `point`, if any.
    pub fn check(&self, point: FaultPoint) -> Option<String> {
        lock(&self.armed).get_mut(&point)?.pop_front()
    }
}
