//! Per-course entitlement state
//!
//! One [`EntitlementStatus`] per course, shared by every part of the view
//! layer that needs to know whether the viewer may see full content. The
//! store is a `watch` channel so readers can subscribe and see a payment
//! override the moment it lands.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::course::CourseId;
use crate::error::CoreError;

/// Entitlement of the current viewer for one course
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementStatus {
    pub course_id: CourseId,

    /// Full content unlocked
    pub entitled: bool,

    /// An enrollment check is outstanding
    pub checking: bool,

    /// Set by a confirmed payment; sticky for the lifetime of the store
    #[serde(default)]
    pub overridden: bool,
}

impl EntitlementStatus {
    /// Not entitled, nothing in flight
    pub const fn unknown(course_id: CourseId) -> Self {
        Self {
            course_id,
            entitled: false,
            checking: false,
            overridden: false,
        }
    }
}

/// Snapshot of every known course
pub type EntitlementMap = HashMap<CourseId, EntitlementStatus>;

/// Shared entitlement store
#[derive(Clone)]
pub struct EntitlementStore {
    tx: Arc<watch::Sender<EntitlementMap>>,
}

impl Default for EntitlementStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntitlementStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(EntitlementMap::new());
        Self { tx: Arc::new(tx) }
    }

    /// Mark a check as outstanding.
    ///
    /// Returns `false` when the course was already unlocked by a payment and
    /// no round-trip is needed.
    pub fn begin_check(&self, course_id: &CourseId) -> bool {
        let mut started = false;
        self.tx.send_if_modified(|map| {
            let status = map
                .entry(course_id.clone())
                .or_insert_with(|| EntitlementStatus::unknown(course_id.clone()));
            if status.overridden {
                return false;
            }
            // Fail closed while the oracle is thinking.
            status.entitled = false;
            status.checking = true;
            started = true;
            true
        });
        started
    }

    /// Record the oracle's answer. Errors resolve to "not entitled".
    pub fn resolve(
        &self,
        course_id: &CourseId,
        answer: std::result::Result<bool, CoreError>,
    ) -> EntitlementStatus {
        let entitled = match answer {
            Ok(entitled) => entitled,
            Err(err) => {
                tracing::warn!(course_id = %course_id, error = %err, "Entitlement check failed, staying in preview mode");
                false
            }
        };

        self.tx.send_modify(|map| {
            let status = map
                .entry(course_id.clone())
                .or_insert_with(|| EntitlementStatus::unknown(course_id.clone()));
            status.checking = false;
            if status.overridden {
                tracing::debug!(course_id = %course_id, "Late enrollment answer ignored, payment override wins");
            } else {
                status.entitled = entitled;
            }
        });

        self.status(course_id)
    }

    /// Drop an outstanding check without an answer. Entitlement is untouched.
    pub fn abandon_check(&self, course_id: &CourseId) {
        self.tx.send_if_modified(|map| match map.get_mut(course_id) {
            Some(status) if status.checking => {
                status.checking = false;
                true
            }
            _ => false,
        });
    }

    /// Optimistic override after a confirmed payment. Never lowers entitlement.
    pub fn grant(&self, course_id: &CourseId) {
        self.tx.send_modify(|map| {
            let status = map
                .entry(course_id.clone())
                .or_insert_with(|| EntitlementStatus::unknown(course_id.clone()));
            status.entitled = true;
            status.checking = false;
            status.overridden = true;
        });
        tracing::info!(course_id = %course_id, "Entitlement granted by payment");
    }

    /// Current status, `unknown` for courses never seen
    pub fn status(&self, course_id: &CourseId) -> EntitlementStatus {
        self.tx
            .borrow()
            .get(course_id)
            .cloned()
            .unwrap_or_else(|| EntitlementStatus::unknown(course_id.clone()))
    }

    pub fn is_entitled(&self, course_id: &CourseId) -> bool {
        self.tx.borrow().get(course_id).is_some_and(|s| s.entitled)
    }

    pub fn is_checking(&self, course_id: &CourseId) -> bool {
        self.tx.borrow().get(course_id).is_some_and(|s| s.checking)
    }

    /// Observe every change to the store
    pub fn subscribe(&self) -> watch::Receiver<EntitlementMap> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abandon_check_clears_flag_only() {
        let store = EntitlementStore::new();
        let course = CourseId::new("c1");
        assert!(store.begin_check(&course));

        store.abandon_check(&course);
        let status = store.status(&course);
        assert!(!status.checking);
        assert!(!status.entitled);

        // Unknown courses stay untouched.
        store.abandon_check(&CourseId::new("c2"));
        assert!(!store.is_checking(&CourseId::new("c2")));
    }

    #[test]
    fn test_check_is_fail_closed() {
        let store = EntitlementStore::new();
        let course = CourseId::new("c1");

        assert!(store.begin_check(&course));
        assert!(store.is_checking(&course));
        assert!(!store.is_entitled(&course));

        let status = store.resolve(&course, Ok(true));
        assert!(status.entitled);
        assert!(!status.checking);
    }

    #[test]
    fn test_error_resolves_to_not_entitled() {
        let store = EntitlementStore::new();
        let course = CourseId::new("c1");
        store.begin_check(&course);

        let status = store.resolve(&course, Err(CoreError::EntitlementCheckFailed("timeout".into())));
        assert!(!status.entitled);
        assert!(!status.checking);
    }

    #[test]
    fn test_override_beats_late_resolution() {
        let store = EntitlementStore::new();
        let course = CourseId::new("c1");
        store.begin_check(&course);

        store.grant(&course);
        let status = store.resolve(&course, Ok(false));
        assert!(status.entitled);
        assert!(status.overridden);

        // Already unlocked, no new round-trip.
        assert!(!store.begin_check(&course));
        assert!(store.is_entitled(&course));
    }

    #[test]
    fn test_subscribers_see_grant() {
        let store = EntitlementStore::new();
        let course = CourseId::new("c1");
        let mut rx = store.subscribe();

        store.grant(&course);
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().get(&course).unwrap().entitled);
    }

    #[test]
    fn test_unknown_course() {
        let store = EntitlementStore::new();
        let status = store.status(&CourseId::new("nope"));
        assert!(!status.entitled);
        assert!(!status.checking);
    }
}
