//! Payment Reconciler
//!
//! State machine that turns a checkout return into a settled payment state.
//!
//! ```text
//!            cancelled hint
//!   Idle ───────────────────────────────────────▶ Cancelled
//!    │
//!    │ success hint + session + course            ┌──▶ Success ──▶ grant entitlement
//!    ├──────────────────────────────▶ Loading ────┤
//!    │                                  ▲         └──▶ Failed ──┐
//!    │ anything else                    │  retry (≤ 3)          │
//!    └──────────────────────────────────┼──────────▶ Failed     │
//!                                       └───────────────────────┘
//! ```
//!
//! The network call itself is not made here. [`PaymentReconciler::enter`]
//! and [`PaymentReconciler::retry`] hand out a [`VerifyTicket`]; the caller
//! performs the verification and feeds the answer to
//! [`PaymentReconciler::complete`]. Only one ticket is outstanding at a
//! time, which is what keeps two verifications of the same session from
//! overlapping.

use course_core::{CourseId, EntitlementStore, ViewGuard};
use serde::{Deserialize, Serialize};

use crate::error::{GENERIC_VERIFICATION_REASON, PaymentError, Result, RetryBlocked};
use crate::outcome::{EnrollmentSnapshot, OutcomeHint, PaymentOutcome, PaymentReturn, VerificationResponse};

/// Retry cap for one payment session
pub const MAX_VERIFICATION_RETRIES: u32 = 3;

/// Which kind of verification is in flight (display only)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadingPhase {
    Verifying,
    Retrying,
}

/// Why a session ended up failed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Return URL was unusable; no verification was attempted
    InvalidParameters,
    /// Backend said no
    Rejected,
    /// Verification call itself failed
    Error,
}

/// Reconciler states
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReconcilerState {
    Idle,
    Loading { phase: LoadingPhase },
    Success { enrollment: Option<EnrollmentSnapshot> },
    Cancelled,
    Failed { reason: String, kind: FailureKind },
}

impl ReconcilerState {
    /// Success and Cancelled never change again
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Success { .. } | Self::Cancelled)
    }
}

/// Retry bookkeeping
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryState {
    attempts: u32,
    last_error: Option<String>,
}

impl RetryState {
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub const fn exhausted(&self) -> bool {
        self.attempts >= MAX_VERIFICATION_RETRIES
    }

    pub const fn remaining(&self) -> u32 {
        MAX_VERIFICATION_RETRIES.saturating_sub(self.attempts)
    }
}

/// Permission to run one verification call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifyTicket {
    pub session_id: String,

    /// 0 for the initial verification, 1..=3 for retries
    pub attempt: u32,
}

/// What the caller has to do after entering
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// Run the verification call for this ticket
    Verify(VerifyTicket),
    /// Nothing to call; the state is already settled
    Settled,
}

/// Whether a verification answer was applied
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// Answer belonged to a closed view or a ticket that is no longer outstanding
    Stale,
}

/// Actions offered to the viewer on the result page
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "courseId", rename_all = "snake_case")]
pub enum PaymentAction {
    GoToMyCourses,
    StartLearning(CourseId),
    RetryVerification,
    /// Re-enter checkout with the original course and price
    MakeNewPayment,
    BackToCourse(CourseId),
}

/// Reconciles one returned payment session
pub struct PaymentReconciler {
    params: PaymentReturn,
    state: ReconcilerState,
    retry: RetryState,
    outstanding: Option<u32>,
    entitlements: EntitlementStore,
    guard: ViewGuard,
}

impl PaymentReconciler {
    pub fn new(params: PaymentReturn, entitlements: EntitlementStore, guard: ViewGuard) -> Self {
        Self {
            params,
            state: ReconcilerState::Idle,
            retry: RetryState {
                attempts: 0,
                last_error: None,
            },
            outstanding: None,
            entitlements,
            guard,
        }
    }

    pub const fn state(&self) -> &ReconcilerState {
        &self.state
    }

    pub const fn retry_state(&self) -> &RetryState {
        &self.retry
    }

    pub const fn params(&self) -> &PaymentReturn {
        &self.params
    }

    pub const fn course_id(&self) -> Option<&CourseId> {
        self.params.course_id.as_ref()
    }

    pub const fn in_flight(&self) -> bool {
        self.outstanding.is_some()
    }

    /// Apply the entry rules. Only the first call from `Idle` does anything.
    pub fn enter(&mut self) -> Step {
        if !matches!(self.state, ReconcilerState::Idle) {
            return Step::Settled;
        }

        match (&self.params.hint, &self.params.session_id, &self.params.course_id) {
            (Some(OutcomeHint::Cancelled), _, _) => {
                tracing::info!(course_id = ?self.params.course_id, "Checkout cancelled by viewer");
                self.state = ReconcilerState::Cancelled;
                Step::Settled
            }
            (Some(OutcomeHint::Success), Some(session_id), Some(course_id)) => {
                tracing::info!(course_id = %course_id, session_id = %session_id, "Verifying payment session");
                let ticket = VerifyTicket {
                    session_id: session_id.clone(),
                    attempt: 0,
                };
                self.start_loading(LoadingPhase::Verifying, 0);
                Step::Verify(ticket)
            }
            _ => {
                tracing::warn!(
                    hint = ?self.params.hint,
                    has_session = self.params.session_id.is_some(),
                    has_course = self.params.course_id.is_some(),
                    "Payment return is missing parameters"
                );
                self.settle_failure(&PaymentError::InvalidParameters);
                Step::Settled
            }
        }
    }

    /// Why retry is unavailable right now, if it is
    pub fn retry_blocker(&self) -> Option<RetryBlocked> {
        if self.in_flight() {
            return Some(RetryBlocked::InFlight);
        }
        let ReconcilerState::Failed { kind, .. } = &self.state else {
            return Some(RetryBlocked::NotFailed);
        };
        if *kind == FailureKind::InvalidParameters {
            return Some(RetryBlocked::InvalidParameters);
        }
        if self.params.session_id.is_none() {
            return Some(RetryBlocked::NoSession);
        }
        if self.retry.exhausted() {
            return Some(RetryBlocked::Exhausted);
        }
        None
    }

    pub fn can_retry(&self) -> bool {
        self.retry_blocker().is_none()
    }

    pub const fn retries_exhausted(&self) -> bool {
        self.retry.exhausted()
    }

    /// Settled on a failure with no retries left
    pub const fn retries_exhausted_failure(&self) -> bool {
        matches!(self.state, ReconcilerState::Failed { .. }) && self.retry.exhausted()
    }

    /// Explicit retry after a failed verification.
    pub fn retry(&mut self) -> Result<VerifyTicket> {
        if let Some(blocked) = self.retry_blocker() {
            tracing::debug!(reason = %blocked, attempts = self.retry.attempts, "Retry refused");
            return Err(PaymentError::RetryUnavailable(blocked));
        }
        let Some(session_id) = self.params.session_id.clone() else {
            return Err(PaymentError::RetryUnavailable(RetryBlocked::NoSession));
        };

        self.retry.attempts += 1;
        let attempt = self.retry.attempts;
        tracing::info!(session_id = %session_id, attempt, "Retrying payment verification");
        self.start_loading(LoadingPhase::Retrying, attempt);

        Ok(VerifyTicket { session_id, attempt })
    }

    /// Feed the answer of the verification call made for `ticket`.
    pub fn complete(
        &mut self,
        ticket: &VerifyTicket,
        result: Result<VerificationResponse>,
    ) -> Completion {
        if !self.guard.is_active() {
            tracing::debug!(session_id = %ticket.session_id, "View closed, dropping verification answer");
            return Completion::Stale;
        }
        if self.outstanding != Some(ticket.attempt) {
            tracing::debug!(attempt = ticket.attempt, "Verification answer for a ticket no longer outstanding");
            return Completion::Stale;
        }
        self.outstanding = None;

        match result {
            Ok(response) if response.success => self.settle_success(response.data),
            Ok(response) => {
                let reason = response
                    .message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| GENERIC_VERIFICATION_REASON.into());
                self.settle_failure(&PaymentError::VerificationFailed(reason));
            }
            Err(err) => self.settle_failure(&PaymentError::VerificationError(err.failure_reason())),
        }

        Completion::Applied
    }

    /// Collapsed view for callers that only care about the result
    pub fn outcome(&self) -> PaymentOutcome {
        match &self.state {
            ReconcilerState::Idle | ReconcilerState::Loading { .. } => PaymentOutcome::Pending,
            ReconcilerState::Success { enrollment } => PaymentOutcome::Success(enrollment.clone()),
            ReconcilerState::Cancelled => PaymentOutcome::Cancelled,
            ReconcilerState::Failed {
                kind: FailureKind::InvalidParameters,
                ..
            } => PaymentOutcome::MissingParams,
            ReconcilerState::Failed { reason, .. } => PaymentOutcome::Failed(reason.clone()),
        }
    }

    /// Status line for the result page
    pub fn status_label(&self) -> &str {
        match &self.state {
            ReconcilerState::Idle => "Preparing…",
            ReconcilerState::Loading {
                phase: LoadingPhase::Verifying,
            } => "Verifying your payment…",
            ReconcilerState::Loading {
                phase: LoadingPhase::Retrying,
            } => "Retrying verification…",
            ReconcilerState::Success { .. } => "Payment successful",
            ReconcilerState::Cancelled => "Payment cancelled",
            ReconcilerState::Failed { .. } if self.retry.exhausted() => "Maximum retries reached",
            ReconcilerState::Failed { reason, .. } => reason,
        }
    }

    /// Ways forward from the current state
    pub fn available_actions(&self) -> Vec<PaymentAction> {
        let course = self.params.course_id.clone();
        let mut actions = Vec::new();

        match &self.state {
            ReconcilerState::Idle | ReconcilerState::Loading { .. } => {}
            ReconcilerState::Success { .. } => {
                if let Some(course_id) = course {
                    actions.push(PaymentAction::StartLearning(course_id));
                }
                actions.push(PaymentAction::GoToMyCourses);
            }
            ReconcilerState::Cancelled | ReconcilerState::Failed { .. } => {
                if self.can_retry() {
                    actions.push(PaymentAction::RetryVerification);
                }
                match course {
                    Some(course_id) => {
                        actions.push(PaymentAction::MakeNewPayment);
                        actions.push(PaymentAction::BackToCourse(course_id));
                    }
                    None => actions.push(PaymentAction::GoToMyCourses),
                }
            }
        }

        actions
    }

    fn start_loading(&mut self, phase: LoadingPhase, attempt: u32) {
        self.state = ReconcilerState::Loading { phase };
        self.outstanding = Some(attempt);
    }

    fn settle_success(&mut self, enrollment: Option<EnrollmentSnapshot>) {
        self.retry.last_error = None;
        if let Some(course_id) = &self.params.course_id {
            self.entitlements.grant(course_id);
        }
        tracing::info!(
            course_id = ?self.params.course_id,
            enrollment_id = ?enrollment.as_ref().map(|e| e.id.as_str()),
            "Payment reconciled"
        );
        self.state = ReconcilerState::Success { enrollment };
    }

    fn settle_failure(&mut self, err: &PaymentError) {
        let kind = match err {
            PaymentError::InvalidParameters => FailureKind::InvalidParameters,
            PaymentError::VerificationFailed(_) => FailureKind::Rejected,
            _ => FailureKind::Error,
        };
        let reason = err.failure_reason();
        tracing::warn!(
            session_id = ?self.params.session_id,
            attempts = self.retry.attempts,
            kind = ?kind,
            reason = %reason,
            "Payment verification failed"
        );
        self.retry.last_error = Some(reason.clone());
        self.state = ReconcilerState::Failed { reason, kind };
    }
}

#[cfg(test)]
mod tests {
    use course_core::ViewScope;

    use super::*;

    fn reconciler(query: &str, scope: &ViewScope) -> (PaymentReconciler, EntitlementStore) {
        let store = EntitlementStore::new();
        let params = PaymentReturn::from_query(query);
        (PaymentReconciler::new(params, store.clone(), scope.guard()), store)
    }

    fn ticket(step: Step) -> VerifyTicket {
        match step {
            Step::Verify(ticket) => ticket,
            Step::Settled => panic!("expected a verification ticket"),
        }
    }

    #[test]
    fn test_cancelled_makes_no_call() {
        let scope = ViewScope::new();
        let (mut rec, _) = reconciler("payment=cancelled&course_id=c1", &scope);
        assert_eq!(rec.enter(), Step::Settled);
        assert_eq!(rec.state(), &ReconcilerState::Cancelled);
        assert_eq!(
            rec.available_actions(),
            vec![PaymentAction::MakeNewPayment, PaymentAction::BackToCourse(CourseId::new("c1"))]
        );
    }

    #[test]
    fn test_missing_course_is_invalid() {
        let scope = ViewScope::new();
        let (mut rec, _) = reconciler("payment=success&session_id=s1", &scope);
        assert_eq!(rec.enter(), Step::Settled);
        assert_eq!(rec.outcome(), PaymentOutcome::MissingParams);
        assert_eq!(rec.retry_blocker(), Some(RetryBlocked::InvalidParameters));
        assert_eq!(rec.available_actions(), vec![PaymentAction::GoToMyCourses]);
    }

    #[test]
    fn test_enter_twice_does_not_issue_second_ticket() {
        let scope = ViewScope::new();
        let (mut rec, _) = reconciler("payment=success&session_id=s1&course_id=c1", &scope);
        let first = ticket(rec.enter());
        assert_eq!(first.attempt, 0);
        assert_eq!(rec.enter(), Step::Settled);
        assert!(rec.in_flight());
    }

    #[test]
    fn test_retry_disabled_while_in_flight() {
        let scope = ViewScope::new();
        let (mut rec, _) = reconciler("payment=success&session_id=s1&course_id=c1", &scope);
        let first = ticket(rec.enter());
        rec.complete(&first, Ok(VerificationResponse::rejected("expired")));

        let retry = rec.retry().unwrap();
        assert_eq!(rec.status_label(), "Retrying verification…");
        assert!(matches!(
            rec.retry(),
            Err(PaymentError::RetryUnavailable(RetryBlocked::InFlight))
        ));
        assert!(rec.available_actions().is_empty());

        rec.complete(&retry, Err(PaymentError::Transport("timeout".into())));
        assert_eq!(rec.retry_state().attempts(), 1);
        assert_eq!(rec.retry_state().last_error(), Some("timeout"));
    }

    #[test]
    fn test_stale_ticket_is_ignored() {
        let scope = ViewScope::new();
        let (mut rec, store) = reconciler("payment=success&session_id=s1&course_id=c1", &scope);
        let first = ticket(rec.enter());
        rec.complete(&first, Ok(VerificationResponse::rejected("expired")));
        let _retry = rec.retry().unwrap();

        // A duplicate answer for the initial call must not settle the retry.
        let confirmed = VerificationResponse::confirmed(EnrollmentSnapshot {
            id: "e1".into(),
            status: "active".into(),
            course: None,
            enrollment_date: None,
        });
        assert_eq!(rec.complete(&first, Ok(confirmed)), Completion::Stale);
        assert!(rec.in_flight());
        assert!(!store.is_entitled(&CourseId::new("c1")));
    }

    #[test]
    fn test_closed_view_drops_answer() {
        let scope = ViewScope::new();
        let (mut rec, store) = reconciler("payment=success&session_id=s1&course_id=c1", &scope);
        let first = ticket(rec.enter());
        scope.close();

        let confirmed = VerificationResponse {
            success: true,
            message: None,
            data: None,
        };
        assert_eq!(rec.complete(&first, Ok(confirmed)), Completion::Stale);
        assert!(!store.is_entitled(&CourseId::new("c1")));
    }

    #[test]
    fn test_success_without_data() {
        let scope = ViewScope::new();
        let (mut rec, store) = reconciler("payment=success&session_id=s1&course_id=c1", &scope);
        let first = ticket(rec.enter());
        let answer = VerificationResponse {
            success: true,
            message: None,
            data: None,
        };
        assert_eq!(rec.complete(&first, Ok(answer)), Completion::Applied);
        assert_eq!(rec.outcome(), PaymentOutcome::Success(None));
        assert!(rec.state().is_terminal());
        assert!(store.is_entitled(&CourseId::new("c1")));
        assert_eq!(
            rec.available_actions(),
            vec![PaymentAction::StartLearning(CourseId::new("c1")), PaymentAction::GoToMyCourses]
        );
    }

    #[test]
    fn test_rejection_without_message_uses_generic_reason() {
        let scope = ViewScope::new();
        let (mut rec, _) = reconciler("payment=success&session_id=s1&course_id=c1", &scope);
        let first = ticket(rec.enter());
        let answer = VerificationResponse {
            success: false,
            message: None,
            data: None,
        };
        rec.complete(&first, Ok(answer));
        assert_eq!(rec.outcome(), PaymentOutcome::Failed(GENERIC_VERIFICATION_REASON.into()));
    }

    #[test]
    fn test_failure_kinds_follow_error_category() {
        let scope = ViewScope::new();
        let (mut rec, _) = reconciler("payment=success&session_id=s1&course_id=c1", &scope);
        let first = ticket(rec.enter());
        rec.complete(&first, Ok(VerificationResponse::rejected("card declined")));
        assert_eq!(
            rec.state(),
            &ReconcilerState::Failed {
                reason: "card declined".into(),
                kind: FailureKind::Rejected,
            }
        );

        let retry = rec.retry().unwrap();
        rec.complete(
            &retry,
            Err(PaymentError::Backend {
                status: 503,
                message: None,
            }),
        );
        assert_eq!(
            rec.state(),
            &ReconcilerState::Failed {
                reason: "Backend returned status 503".into(),
                kind: FailureKind::Error,
            }
        );

        let (mut invalid, _) = reconciler("payment=success", &scope);
        invalid.enter();
        assert_eq!(invalid.retry_state().last_error(), Some(crate::error::INVALID_PARAMETERS_REASON));
    }

    #[test]
    fn test_last_retry_succeeding_is_not_an_exhausted_failure() {
        let scope = ViewScope::new();
        let (mut rec, store) = reconciler("payment=success&session_id=s1&course_id=c1", &scope);
        let first = ticket(rec.enter());
        rec.complete(&first, Ok(VerificationResponse::rejected("pending")));

        for _ in 1..MAX_VERIFICATION_RETRIES {
            let retry = rec.retry().unwrap();
            rec.complete(&retry, Ok(VerificationResponse::rejected("pending")));
            assert!(!rec.retries_exhausted_failure());
        }

        let last = rec.retry().unwrap();
        assert_eq!(last.attempt, MAX_VERIFICATION_RETRIES);
        assert!(!rec.retries_exhausted_failure());
        rec.complete(
            &last,
            Ok(VerificationResponse {
                success: true,
                message: None,
                data: None,
            }),
        );

        assert!(rec.retries_exhausted());
        assert!(!rec.retries_exhausted_failure());
        assert_eq!(rec.status_label(), "Payment successful");
        assert!(store.is_entitled(&CourseId::new("c1")));
    }

    #[test]
    fn test_last_retry_failing_is_an_exhausted_failure() {
        let scope = ViewScope::new();
        let (mut rec, _) = reconciler("payment=success&session_id=s1&course_id=c1", &scope);
        let first = ticket(rec.enter());
        rec.complete(&first, Ok(VerificationResponse::rejected("pending")));
        for _ in 0..MAX_VERIFICATION_RETRIES {
            let retry = rec.retry().unwrap();
            rec.complete(&retry, Err(PaymentError::Transport("timeout".into())));
        }

        assert!(rec.retries_exhausted_failure());
        assert_eq!(rec.status_label(), "Maximum retries reached");
    }
}
