//! UI Components

use course_core::{GateEvent, PlaybackSession, PlayerConfig};
use course_payments::CreatePaymentRequest;
use leptos::prelude::*;

use crate::api;
use crate::context::AppContext;

/// Video element wired to the free-preview gate
#[component]
pub fn VideoPlayer(
    src: String,
    config: PlayerConfig,
    #[prop(into)] entitled: Signal<bool>,
    set_paywall: WriteSignal<bool>,
) -> impl IntoView {
    let video_ref = NodeRef::<leptos::html::Video>::new();
    let session = RwSignal::new(PlaybackSession::from_config(&config, entitled.get_untracked()));

    let pause = move || {
        if let Some(video) = video_ref.get_untracked() {
            let _ = video.pause();
        }
    };

    let apply = move |event: Option<GateEvent>| {
        if let Some(GateEvent::PaywallTriggered { .. }) = event {
            pause();
            set_paywall.set(true);
        }
    };

    // Entitlement never goes back to false, so only the rising edge matters.
    Effect::new(move |_| {
        if entitled.get() {
            session.update(PlaybackSession::grant_entitlement);
            set_paywall.set(false);
        }
    });

    let on_metadata = move |_| {
        if let Some(video) = video_ref.get_untracked() {
            apply(session.try_update(|s| s.set_duration(video.duration())).flatten());
        }
    };

    let on_time = move |_| {
        if let Some(video) = video_ref.get_untracked() {
            apply(session.try_update(|s| s.on_time_update(video.current_time())).flatten());
        }
    };

    let on_seeking = move |_| {
        let Some(video) = video_ref.get_untracked() else {
            return;
        };
        let target = video.current_time();
        let Some((decision, elapsed)) = session.try_update(|s| (s.request_seek(target), s.elapsed())) else {
            return;
        };
        // Resetting the play head fires another `seeking`; stop once it is back.
        if !decision.is_allowed() && (target - elapsed).abs() > 0.01 {
            video.set_current_time(elapsed);
        }
    };

    let on_play = move |_| {
        if !session.with_untracked(PlaybackSession::can_play) {
            pause();
            set_paywall.set(true);
        }
    };

    view! {
        <div class="player">
            <video
                node_ref=video_ref
                src=src
                controls=true
                preload="metadata"
                on:loadedmetadata=on_metadata
                on:timeupdate=on_time
                on:seeking=on_seeking
                on:play=on_play
            />
            <ProgressBar
                progress=Signal::derive(move || session.with(PlaybackSession::progress_fraction))
                marker=Signal::derive(move || session.with(PlaybackSession::free_marker_fraction))
            />
            {move || {
                session
                    .with(PlaybackSession::remaining_preview)
                    .map(|left| view! { <p class="preview-left">{format!("Free preview: {left:.0}s left")}</p> })
            }}
        </div>
    }
}

/// Played fraction plus the free-preview marker
#[component]
pub fn ProgressBar(
    #[prop(into)] progress: Signal<f64>,
    #[prop(into)] marker: Signal<Option<f64>>,
) -> impl IntoView {
    view! {
        <div class="progress">
            <div class="progress-played" style:width=move || format!("{:.2}%", progress.get() * 100.0)></div>
            {move || {
                marker
                    .get()
                    .map(|at| view! { <div class="progress-free-marker" style:left=format!("{:.2}%", at * 100.0)></div> })
            }}
        </div>
    }
}

/// Overlay shown when the free preview runs out
#[component]
pub fn Paywall(request: Option<CreatePaymentRequest>) -> impl IntoView {
    let ctx = expect_context::<AppContext>();

    let cta = match (ctx.viewer.is_authenticated(), request) {
        (true, Some(request)) => view! { <CheckoutButton request=request /> }.into_any(),
        (true, None) => view! { <p>"This course is not available for purchase right now."</p> }.into_any(),
        (false, _) => view! { <a class="btn btn-primary" href="/login">"Sign in to enroll"</a> }.into_any(),
    };

    view! {
        <div class="paywall">
            <h2>"Free preview finished"</h2>
            <p>"Enroll to keep watching this course."</p>
            {cta}
        </div>
    }
}

/// Starts a checkout; failures stay inline on the page
#[component]
pub fn CheckoutButton(request: CreatePaymentRequest) -> impl IntoView {
    let ctx = expect_context::<AppContext>();
    let (busy, set_busy) = signal(false);
    let (error, set_error) = signal(None::<String>);
    let request = StoredValue::new(request);

    let buy = move |_| {
        if busy.get_untracked() {
            return;
        }
        set_busy.set(true);
        set_error.set(None);

        let ctx = ctx.clone();
        let request = request.get_value();
        leptos::task::spawn_local(async move {
            if let Err(e) = api::start_checkout(&ctx, request).await {
                set_error.try_set(Some(e.failure_reason()));
            }
            set_busy.try_set(false);
        });
    };

    view! {
        <button class="btn btn-primary" on:click=buy disabled=move || busy.get()>
            {move || if busy.get() { "Redirecting…" } else { "Buy this course" }}
        </button>
        {move || error.get().map(|e| view! { <p class="error">{e}</p> })}
    }
}
