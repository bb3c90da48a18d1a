//! Main App Component

use leptos::prelude::*;
use leptos_router::{components::*, path};

use crate::context::AppContext;
use crate::pages::{CoursePage, PaymentResultPage};

/// Root application component
#[component]
pub fn App() -> impl IntoView {
    provide_context(AppContext::from_browser());

    view! {
        <Router>
            <main class="app">
                <Routes fallback=|| view! { <p>"Page not found"</p> }>
                    <Route path=path!("/courses/:id") view=CoursePage />
                    <Route path=path!("/payment/result") view=PaymentResultPage />
                </Routes>
            </main>
        </Router>
    }
}
