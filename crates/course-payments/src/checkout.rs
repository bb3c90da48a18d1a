//! Checkout Hand-off
//!
//! Creates a payment session server-side and produces the URL of the hosted
//! checkout page. What happens on that page is opaque; control comes back
//! through the return URL handled by the reconciler.

use async_trait::async_trait;
use course_core::CourseId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{PaymentError, Result};

/// Request to create a payment session
///
/// Also remembered across the redirect so a new payment can be started
/// with the same course and price.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub course_id: CourseId,

    pub tutor_id: String,

    pub category_id: String,

    /// Course price in the store currency
    pub price: Decimal,
}

/// What the course page needs to offer a purchase
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseOffer {
    #[serde(rename = "id")]
    pub course_id: CourseId,

    pub title: String,

    #[serde(default)]
    pub video_url: Option<String>,

    pub tutor_id: String,

    pub category_id: String,

    pub price: Decimal,
}

impl CourseOffer {
    /// Checkout request for this course at its listed price
    pub fn to_request(&self) -> CreatePaymentRequest {
        CreatePaymentRequest {
            course_id: self.course_id.clone(),
            tutor_id: self.tutor_id.clone(),
            category_id: self.category_id.clone(),
            price: self.price,
        }
    }
}

/// Payment session handle returned by the backend
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutHandle {
    pub session_id: String,
}

/// Backend answer to `createPayment`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePaymentResponse {
    pub success: bool,

    #[serde(default)]
    pub data: Option<CheckoutHandle>,

    #[serde(default)]
    pub message: Option<String>,
}

/// Where to send the browser next
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRedirect {
    pub session_id: String,
    pub url: String,
}

/// Server-side payment session creation plus the hosted page location
#[async_trait(?Send)]
pub trait CheckoutInitiator {
    /// Create a payment session
    async fn create_payment(&self, request: &CreatePaymentRequest) -> Result<CreatePaymentResponse>;

    /// URL of the hosted checkout page for a session
    fn checkout_url(&self, session_id: &str) -> String;
}

/// Create a payment session and work out the redirect.
///
/// Every failure comes back as [`PaymentError::CheckoutInitiationFailed`];
/// it is shown inline on the course page and touches no reconciler state.
pub async fn begin_checkout<C>(initiator: &C, request: &CreatePaymentRequest) -> Result<CheckoutRedirect>
where
    C: CheckoutInitiator + ?Sized,
{
    if request.price <= Decimal::ZERO {
        return Err(PaymentError::CheckoutInitiationFailed(
            "course price must be positive".into(),
        ));
    }

    let response = initiator.create_payment(request).await.map_err(|e| {
        tracing::error!(course_id = %request.course_id, error = %e, "Checkout error");
        PaymentError::CheckoutInitiationFailed(e.failure_reason())
    })?;

    if !response.success {
        let message = response
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "payment session was not created".into());
        tracing::warn!(course_id = %request.course_id, message = %message, "Checkout refused");
        return Err(PaymentError::CheckoutInitiationFailed(message));
    }

    let session_id = response
        .data
        .map(|d| d.session_id)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| PaymentError::CheckoutInitiationFailed("no checkout session id returned".into()))?;

    tracing::info!(course_id = %request.course_id, session_id = %session_id, "Checkout session created");

    Ok(CheckoutRedirect {
        url: initiator.checkout_url(&session_id),
        session_id,
    })
}
