//! Subcommand implementations

use std::fmt::Write as _;
use std::time::Duration;

use anyhow::Context;
use serde::Serialize;

use course_core::{CourseId, EntitlementStore, ViewScope, resolve_entitlement};
use course_payments::{
    CreatePaymentRequest, PaymentAction, PaymentReconciler, PaymentReturn, PaymentSession, ReconcilerState,
    RetryState, begin_checkout,
};
use course_runtime::BackendClient;

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Check enrollment; succeeds only when the viewer is entitled.
pub async fn entitlement(client: &BackendClient, course: &str, json: bool) -> anyhow::Result<bool> {
    let course_id = CourseId::parse(Some(course)).context("course id must not be blank")?;
    let store = EntitlementStore::new();
    let scope = ViewScope::new();

    let status = resolve_entitlement(client, &store, &course_id, &scope.guard())
        .await
        .unwrap_or_else(|| store.status(&course_id));

    if json {
        print_json(&status)?;
    } else {
        let verdict = if status.entitled { "enrolled" } else { "not enrolled" };
        println!("{course_id}: {verdict}");
    }
    Ok(status.entitled)
}

pub async fn checkout(client: &BackendClient, request: &CreatePaymentRequest, json: bool) -> anyhow::Result<bool> {
    match begin_checkout(client, request).await {
        Ok(redirect) => {
            if json {
                print_json(&redirect)?;
            } else {
                println!("Checkout session: {}", redirect.session_id);
                println!("Open: {}", redirect.url);
            }
            Ok(true)
        }
        Err(e) => {
            eprintln!("Checkout failed: {}", e.failure_reason());
            Ok(false)
        }
    }
}

/// Reconcile a payment return; succeeds only on a confirmed payment.
pub async fn reconcile(
    client: &BackendClient,
    params: PaymentReturn,
    retries: u32,
    delay: Duration,
    json: bool,
) -> anyhow::Result<bool> {
    let store = EntitlementStore::new();
    let scope = ViewScope::new();
    let mut session = PaymentSession::new(PaymentReconciler::new(params, store.clone(), scope.guard()), client);

    session.start().await;

    let mut left = retries;
    while left > 0 && session.reconciler().can_retry() {
        left -= 1;
        tracing::info!(delay_ms = delay.as_millis(), "Verification failed, retrying");
        tokio::time::sleep(delay).await;
        session.retry().await?;
    }

    let reconciler = session.into_reconciler();
    let entitled = reconciler.course_id().is_some_and(|c| store.is_entitled(c));

    if json {
        print_json(&ReconcileReport::new(&reconciler, entitled))?;
    } else {
        print!("{}", render_report(&reconciler, entitled));
    }

    Ok(matches!(reconciler.state(), ReconcilerState::Success { .. }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReconcileReport<'a> {
    status: &'a str,
    state: &'a ReconcilerState,
    retry: &'a RetryState,
    entitled: bool,
    actions: Vec<PaymentAction>,
}

impl<'a> ReconcileReport<'a> {
    fn new(reconciler: &'a PaymentReconciler, entitled: bool) -> Self {
        Self {
            status: reconciler.status_label(),
            state: reconciler.state(),
            retry: reconciler.retry_state(),
            entitled,
            actions: reconciler.available_actions(),
        }
    }
}

fn action_label(action: &PaymentAction) -> String {
    match action {
        PaymentAction::GoToMyCourses => "go to my courses".into(),
        PaymentAction::StartLearning(course_id) => format!("start learning ({course_id})"),
        PaymentAction::RetryVerification => "retry verification".into(),
        PaymentAction::MakeNewPayment => "make a new payment".into(),
        PaymentAction::BackToCourse(course_id) => format!("back to course ({course_id})"),
    }
}

fn render_report(reconciler: &PaymentReconciler, entitled: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Status:   {}", reconciler.status_label());

    if let ReconcilerState::Success {
        enrollment: Some(enrollment),
    } = reconciler.state()
    {
        let title = enrollment.course.as_ref().map_or("-", |c| c.title.as_str());
        let _ = writeln!(out, "Enrolled: {title} ({}, {})", enrollment.id, enrollment.status);
        if let Some(date) = enrollment.enrollment_date {
            let _ = writeln!(out, "Since:    {}", date.format("%Y-%m-%d"));
        }
    }
    if let Some(last_error) = reconciler.retry_state().last_error() {
        let _ = writeln!(out, "Error:    {last_error}");
    }

    let retry = reconciler.retry_state();
    let _ = writeln!(out, "Retries:  {} used, {} left", retry.attempts(), retry.remaining());
    let _ = writeln!(out, "Access:   {}", if entitled { "unlocked" } else { "locked" });

    let actions: Vec<String> = reconciler.available_actions().iter().map(action_label).collect();
    if !actions.is_empty() {
        let _ = writeln!(out, "Next:     {}", actions.join(", "));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_payments::{EnrollmentSnapshot, OutcomeHint, PaymentError, Step, VerificationResponse};

    fn reconciler(hint: Option<OutcomeHint>, session: Option<&str>) -> (PaymentReconciler, ViewScope) {
        let scope = ViewScope::new();
        let reconciler = PaymentReconciler::new(
            PaymentReturn::new(hint, session, Some("c1")),
            EntitlementStore::new(),
            scope.guard(),
        );
        (reconciler, scope)
    }

    #[test]
    fn test_report_for_confirmed_payment() {
        let (mut reconciler, _scope) = reconciler(Some(OutcomeHint::Success), Some("cs_1"));
        let Step::Verify(ticket) = reconciler.enter() else {
            panic!("expected a verification");
        };
        reconciler.complete(
            &ticket,
            Ok(VerificationResponse::confirmed(EnrollmentSnapshot {
                id: "e1".into(),
                status: "active".into(),
                course: None,
                enrollment_date: None,
            })),
        );

        let report = render_report(&reconciler, true);
        assert!(report.contains("Payment successful"));
        assert!(report.contains("Enrolled: - (e1, active)"));
        assert!(report.contains("Access:   unlocked"));
        assert!(report.contains("start learning (c1), go to my courses"));
    }

    #[test]
    fn test_report_for_failed_verification() {
        let (mut reconciler, _scope) = reconciler(Some(OutcomeHint::Success), Some("cs_1"));
        let Step::Verify(ticket) = reconciler.enter() else {
            panic!("expected a verification");
        };
        reconciler.complete(&ticket, Err(PaymentError::Transport("connection reset".into())));

        let report = render_report(&reconciler, false);
        assert!(report.contains("Retries:  0 used, 3 left"));
        assert!(report.contains("retry verification"));
        assert!(report.contains("Access:   locked"));
    }

    #[test]
    fn test_json_report_shape() {
        let (mut reconciler, _scope) = reconciler(Some(OutcomeHint::Cancelled), None);
        assert_eq!(reconciler.enter(), Step::Settled);

        let value = serde_json::to_value(ReconcileReport::new(&reconciler, false)).unwrap();
        assert_eq!(value["status"], "Payment cancelled");
        assert_eq!(value["state"]["state"], "cancelled");
        assert_eq!(value["entitled"], false);
    }
}
