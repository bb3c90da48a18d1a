//! Course page: video with free preview, paywall, and checkout

use course_core::{CoreError, CourseId, ViewScope, resolve_entitlement};
use course_payments::CourseOffer;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::hooks::use_params_map;

use crate::components::{Paywall, VideoPlayer};
use crate::context::AppContext;

#[component]
pub fn CoursePage() -> impl IntoView {
    let ctx = expect_context::<AppContext>();
    let params = use_params_map();

    let Some(course_id) = params.with_untracked(|p| CourseId::parse(p.get("id").as_deref())) else {
        return view! { <p class="error">"Course not found"</p> }.into_any();
    };

    let scope = ViewScope::new();
    let guard = scope.guard();
    on_cleanup(move || scope.close());

    let store = ctx.entitlements.clone();
    let entitled = RwSignal::new(store.is_entitled(&course_id));
    let checking = RwSignal::new(false);
    let offer = RwSignal::new(None::<CourseOffer>);
    let load_error = RwSignal::new(None::<String>);
    let (paywall, set_paywall) = signal(false);

    // Mirror this course's store entry into signals until the view closes.
    {
        let store = store.clone();
        let course_id = course_id.clone();
        let guard = guard.clone();
        let mut changes = store.subscribe();
        spawn_local(async move {
            while changes.changed().await.is_ok() {
                if !guard.is_active() {
                    break;
                }
                let status = store.status(&course_id);
                entitled.try_set(status.entitled);
                checking.try_set(status.checking);
            }
        });
    }

    // One enrollment check per view load.
    {
        let ctx = ctx.clone();
        let course_id = course_id.clone();
        let guard = guard.clone();
        spawn_local(async move {
            match ctx.client() {
                Ok(client) => {
                    resolve_entitlement(&client, &ctx.entitlements, &course_id, &guard).await;
                }
                Err(e) => {
                    if ctx.entitlements.begin_check(&course_id) {
                        ctx.entitlements
                            .resolve(&course_id, Err(CoreError::EntitlementCheckFailed(e.to_string())));
                    }
                }
            }
        });
    }

    {
        let ctx = ctx.clone();
        let course_id = course_id.clone();
        spawn_local(async move {
            let result = match ctx.client() {
                Ok(client) => client.course_offer(&course_id).await,
                Err(e) => Err(e),
            };
            if !guard.is_active() {
                return;
            }
            match result {
                Ok(loaded) => {
                    offer.try_set(Some(loaded));
                }
                Err(e) => {
                    tracing::warn!(course_id = %course_id, error = %e, "Failed to load course");
                    load_error.try_set(Some(e.user_message().to_string()));
                }
            }
        });
    }

    let player = ctx.player;

    view! {
        <div class="course-page">
            <Show when=move || checking.get()>
                <span class="badge checking">"Checking enrollment…"</span>
            </Show>
            <Show when=move || entitled.get()>
                <span class="badge enrolled">"Enrolled"</span>
            </Show>

            {move || load_error.get().map(|e| view! { <p class="error">{e}</p> })}

            {move || {
                offer.get().map(|offer| {
                    let request = offer.to_request();
                    let player_view = offer.video_url.clone().map(|src| {
                        view! { <VideoPlayer src=src config=player entitled=entitled set_paywall=set_paywall /> }
                    });
                    view! {
                        <h1>{offer.title.clone()}</h1>
                        <div class="player-frame">
                            {player_view}
                            <Show when=move || paywall.get() && !entitled.get()>
                                <Paywall request=Some(request.clone()) />
                            </Show>
                        </div>
                    }
                })
            }}
        </div>
    }
    .into_any()
}
