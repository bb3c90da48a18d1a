//! Payment result page
//!
//! Landing page of the hosted checkout. Verifies the session once on load
//! and offers a bounded number of manual retries.

use course_core::ViewScope;
use course_payments::{
    EnrollmentSnapshot, OutcomeHint, PaymentAction, PaymentReconciler, PaymentReturn, PaymentVerifier,
    ReconcilerState, Step, VerifyTicket,
};
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::hooks::use_query_map;

use crate::api;
use crate::context::AppContext;

#[component]
pub fn PaymentResultPage() -> impl IntoView {
    let ctx = expect_context::<AppContext>();
    let query = use_query_map();

    let params = query.with_untracked(|q| {
        PaymentReturn::new(
            q.get("payment").as_deref().and_then(OutcomeHint::parse),
            q.get("session_id").as_deref(),
            q.get("course_id").as_deref(),
        )
    });
    let params = params.with_course(api::pending_checkout().map(|p| p.course_id));

    let scope = ViewScope::new();
    let reconciler = RwSignal::new(PaymentReconciler::new(params, ctx.entitlements.clone(), scope.guard()));
    on_cleanup(move || scope.close());

    let checkout_error = RwSignal::new(None::<String>);

    let verify = {
        let ctx = ctx.clone();
        move |ticket: VerifyTicket| {
            let ctx = ctx.clone();
            spawn_local(async move {
                let result = match ctx.client() {
                    Ok(client) => PaymentVerifier::verify(&client, &ticket.session_id).await,
                    Err(e) => Err(e),
                };
                reconciler.try_update(|r| r.complete(&ticket, result));
            });
        }
    };

    if let Some(Step::Verify(ticket)) = reconciler.try_update(PaymentReconciler::enter) {
        verify(ticket);
    }

    let retry = move || match reconciler.try_update(PaymentReconciler::retry) {
        Some(Ok(ticket)) => verify(ticket),
        Some(Err(e)) => tracing::debug!(error = %e, "Retry refused"),
        None => {}
    };

    let new_payment = {
        let ctx = ctx.clone();
        move || {
            let course = reconciler.with_untracked(|r| r.course_id().cloned());
            let pending = api::pending_checkout().filter(|p| Some(&p.course_id) == course.as_ref());
            let Some(request) = pending else {
                // Nothing remembered for this course; its page can start a fresh checkout.
                if let Some(course_id) = course {
                    api::redirect(&format!("/courses/{course_id}"));
                }
                return;
            };

            checkout_error.set(None);
            let ctx = ctx.clone();
            spawn_local(async move {
                if let Err(e) = api::start_checkout(&ctx, request).await {
                    checkout_error.try_set(Some(e.failure_reason()));
                }
            });
        }
    };

    let actions = move || {
        let remaining = reconciler.with(|r| r.retry_state().remaining());
        reconciler
            .with(PaymentReconciler::available_actions)
            .into_iter()
            .map(|action| match action {
                PaymentAction::StartLearning(course_id) => view! {
                    <a class="btn btn-primary" href=format!("/courses/{course_id}")>"Start learning now"</a>
                }
                .into_any(),
                PaymentAction::GoToMyCourses => view! {
                    <a class="btn" href="/my-courses">"Go to my courses"</a>
                }
                .into_any(),
                PaymentAction::BackToCourse(course_id) => view! {
                    <a class="btn" href=format!("/courses/{course_id}")>"Back to course"</a>
                }
                .into_any(),
                PaymentAction::RetryVerification => {
                    let retry = retry.clone();
                    view! {
                        <button
                            class="btn btn-primary"
                            on:click=move |_| retry()
                            disabled=move || reconciler.with(PaymentReconciler::in_flight)
                        >
                            {format!("Retry verification ({remaining} left)")}
                        </button>
                    }
                    .into_any()
                }
                PaymentAction::MakeNewPayment => {
                    let new_payment = new_payment.clone();
                    view! { <button class="btn" on:click=move |_| new_payment()>"Make a new payment"</button> }
                        .into_any()
                }
            })
            .collect_view()
    };

    view! {
        <div class="payment-result">
            <h1>{move || reconciler.with(|r| r.status_label().to_string())}</h1>

            {move || {
                reconciler.with(|r| match r.state() {
                    ReconcilerState::Success { enrollment: Some(enrollment) } => {
                        Some(enrollment_details(enrollment))
                    }
                    _ => None,
                })
            }}

            <Show when=move || reconciler.with(PaymentReconciler::retries_exhausted_failure)>
                <p class="notice">
                    "Maximum retries reached. Start a new payment or go back to the course."
                </p>
            </Show>

            {move || checkout_error.get().map(|e| view! { <p class="error">{e}</p> })}

            <div class="actions">{actions}</div>
        </div>
    }
}

fn enrollment_details(enrollment: &EnrollmentSnapshot) -> AnyView {
    let title = enrollment.course.as_ref().map(|c| c.title.clone());
    let tutor = enrollment.course.as_ref().and_then(|c| c.tutor.clone());
    let enrolled_on = enrollment
        .enrollment_date
        .map(|d| d.format("%B %-d, %Y").to_string());

    view! {
        <dl class="enrollment">
            {title.map(|t| view! { <dt>"Course"</dt><dd>{t}</dd> })}
            {tutor.map(|t| view! { <dt>"Tutor"</dt><dd>{t}</dd> })}
            <dt>"Status"</dt>
            <dd>{enrollment.status.clone()}</dd>
            {enrolled_on.map(|d| view! { <dt>"Enrolled on"</dt><dd>{d}</dd> })}
        </dl>
    }
    .into_any()
}
