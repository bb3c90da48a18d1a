//! Payment verification collaborator

use async_trait::async_trait;

use crate::error::Result;
use crate::outcome::VerificationResponse;

/// Asks the backend what became of a payment session
#[async_trait(?Send)]
pub trait PaymentVerifier {
    async fn verify(&self, session_id: &str) -> Result<VerificationResponse>;
}

#[async_trait(?Send)]
impl<T: PaymentVerifier + ?Sized> PaymentVerifier for &T {
    async fn verify(&self, session_id: &str) -> Result<VerificationResponse> {
        (**self).verify(session_id).await
    }
}
