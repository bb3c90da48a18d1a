//! # course-payments
//!
//! Checkout hand-off and payment return reconciliation for the course client.
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────┐  createPayment   ┌─────────────────┐  ?payment=success  ┌──────────────────┐
//! │ Course page │─────────────────▶│ Hosted checkout │───────────────────▶│ Payment result   │
//! │  (buy now)  │  redirect(sid)   │  (black box)    │  &session_id=sid   │ (reconciler)     │
//! └─────────────┘                  └─────────────────┘  or =cancelled     └────────┬─────────┘
//!                                                                                  │ verify(sid)
//!                                                                                  ▼
//!                                                                        grant entitlement
//! ```
//!
//! The hosted checkout page is opaque: the only thing that comes back is
//! the outcome hint and the session id in the return URL. The
//! [`PaymentReconciler`] turns those into a settled state, retrying a failed
//! verification at most [`MAX_VERIFICATION_RETRIES`] times, and on success
//! unlocks the course in the shared
//! [`EntitlementStore`](course_core::EntitlementStore) without another
//! enrollment round-trip.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use course_payments::{PaymentReconciler, PaymentReturn, PaymentSession};
//!
//! let params = PaymentReturn::from_query("payment=success&session_id=cs_1&course_id=c1");
//! let reconciler = PaymentReconciler::new(params, store.clone(), scope.guard());
//! let mut session = PaymentSession::new(reconciler, backend);
//!
//! session.start().await;
//! if session.reconciler().can_retry() {
//!     session.retry().await?;
//! }
//! ```

mod checkout;
mod error;
mod outcome;
mod reconciler;
mod session;
mod verifier;

pub use checkout::{
    CheckoutHandle, CheckoutInitiator, CourseOffer, CheckoutRedirect, CreatePaymentRequest,
    CreatePaymentResponse, begin_checkout,
};
pub use error::{PaymentError, Result, RetryBlocked};
pub use outcome::{
    CourseSummary, EnrollmentSnapshot, OutcomeHint, PaymentOutcome, PaymentReturn,
    VerificationResponse,
};
pub use reconciler::{
    Completion, FailureKind, LoadingPhase, MAX_VERIFICATION_RETRIES, PaymentAction,
    PaymentReconciler, ReconcilerState, RetryState, Step, VerifyTicket,
};
pub use session::PaymentSession;
pub use verifier::PaymentVerifier;
