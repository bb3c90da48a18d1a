//! # course-runtime
//!
//! Remote collaborators for the course client, backed by the learning
//! platform's REST API.
//!
//! ## Collaborators
//!
//! - **EnrollmentOracle**: `GET /enrollments/check/{course_id}`
//! - **PaymentVerifier**: `GET /payments/verify/{session_id}`
//! - **CheckoutInitiator**: `POST /payments/create-checkout-session`
//! - Course purchase details: `GET /courses/{course_id}`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use course_runtime::{BackendClient, BackendConfig};
//!
//! let backend = BackendClient::from_config(BackendConfig::from_env())?
//!     .with_context(&viewer);
//! let status = resolve_entitlement(&backend, &store, &course_id, &scope.guard()).await;
//! ```

pub mod backend;
pub mod config;

pub use backend::BackendClient;
pub use config::BackendConfig;

// Re-export core types for convenience
pub use course_core::{CourseId, EnrollmentOracle, EntitlementStore, ViewerContext};
pub use course_payments::{CheckoutInitiator, PaymentError, PaymentVerifier};
