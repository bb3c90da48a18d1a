//! Browser glue: origin, redirects, and the checkout remembered across the
//! hosted payment page.

use course_payments::{CreatePaymentRequest, PaymentError, begin_checkout};

use crate::context::AppContext;

const PENDING_CHECKOUT_KEY: &str = "pendingCheckout";

/// Origin of the current page
pub fn origin() -> String {
    web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .unwrap_or_else(|| "http://localhost:3000".into())
}

/// Full navigation away from the app
pub fn redirect(url: &str) {
    if let Some(window) = web_sys::window() {
        if let Err(e) = window.location().set_href(url) {
            tracing::error!(error = ?e, "Redirect failed");
        }
    }
}

fn session_storage() -> Option<web_sys::Storage> {
    web_sys::window().and_then(|w| w.session_storage().ok().flatten())
}

/// Remember what is being bought so a new payment can be started later
pub fn remember_checkout(request: &CreatePaymentRequest) {
    let (Some(storage), Ok(raw)) = (session_storage(), serde_json::to_string(request)) else {
        return;
    };
    let _ = storage.set_item(PENDING_CHECKOUT_KEY, &raw);
}

/// The checkout started before leaving for the hosted page
pub fn pending_checkout() -> Option<CreatePaymentRequest> {
    let raw = session_storage()?.get_item(PENDING_CHECKOUT_KEY).ok().flatten()?;
    serde_json::from_str(&raw).ok()
}

/// Create a payment session and leave for the hosted checkout page.
///
/// Returns only on failure; the error is meant for inline display.
pub async fn start_checkout(ctx: &AppContext, request: CreatePaymentRequest) -> Result<(), PaymentError> {
    let client = ctx.client()?;
    let checkout = begin_checkout(&client, &request).await?;
    remember_checkout(&request);
    redirect(&checkout.url);
    Ok(())
}
