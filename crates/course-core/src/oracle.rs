//! Enrollment Oracle
//!
//! The remote collaborator that answers "may this viewer see all of course
//! X". Implementations live in the runtime crate; the view layer talks to
//! them only through [`resolve_entitlement`].
//!
//! The trait is `?Send`: the client runs on a single-threaded event loop
//! and browser HTTP futures are not `Send`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::course::CourseId;
use crate::entitlement::{EntitlementStatus, EntitlementStore};
use crate::error::Result;
use crate::view::ViewGuard;

/// Oracle answer; `success` means entitled
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentCheck {
    pub success: bool,
}

/// Strategy trait for enrollment lookups
#[async_trait(?Send)]
pub trait EnrollmentOracle {
    /// Is the current viewer entitled to full content for `course_id`
    async fn verify(&self, course_id: &CourseId) -> Result<EnrollmentCheck>;
}

/// Resolve entitlement for a freshly loaded course view.
///
/// Marks the course as checking (not entitled) until the oracle answers,
/// swallows oracle errors as "not entitled" and drops the answer if the
/// view is gone by the time it arrives, clearing only the checking flag.
/// Returns the status written, or `None` when the answer was dropped.
pub async fn resolve_entitlement<O>(
    oracle: &O,
    store: &EntitlementStore,
    course_id: &CourseId,
    guard: &ViewGuard,
) -> Option<EntitlementStatus>
where
    O: EnrollmentOracle + ?Sized,
{
    if !store.begin_check(course_id) {
        tracing::debug!(course_id = %course_id, "Course already unlocked, skipping enrollment check");
        return Some(store.status(course_id));
    }

    let answer = oracle.verify(course_id).await.map(|check| check.success);

    if !guard.is_active() {
        tracing::debug!(course_id = %course_id, "View closed before enrollment answer, dropping it");
        store.abandon_check(course_id);
        return None;
    }

    let status = store.resolve(course_id, answer);
    tracing::info!(course_id = %course_id, entitled = status.entitled, "Entitlement resolved");
    Some(status)
}
