//! Async driver pairing a reconciler with its verifier

use crate::error::Result;
use crate::reconciler::{PaymentReconciler, ReconcilerState, Step, VerifyTicket};
use crate::verifier::PaymentVerifier;

/// Runs the reconciler's verification calls in-line.
///
/// `&mut self` across the await keeps a second verification from starting
/// while one is outstanding.
pub struct PaymentSession<V> {
    reconciler: PaymentReconciler,
    verifier: V,
}

impl<V: PaymentVerifier> PaymentSession<V> {
    pub const fn new(reconciler: PaymentReconciler, verifier: V) -> Self {
        Self {
            reconciler,
            verifier,
        }
    }

    pub const fn reconciler(&self) -> &PaymentReconciler {
        &self.reconciler
    }

    pub fn into_reconciler(self) -> PaymentReconciler {
        self.reconciler
    }

    /// Apply the entry rules and run the initial verification if needed
    pub async fn start(&mut self) -> &ReconcilerState {
        if let Step::Verify(ticket) = self.reconciler.enter() {
            self.run(ticket).await;
        }
        self.reconciler.state()
    }

    /// Retry a failed verification
    pub async fn retry(&mut self) -> Result<&ReconcilerState> {
        let ticket = self.reconciler.retry()?;
        self.run(ticket).await;
        Ok(self.reconciler.state())
    }

    async fn run(&mut self, ticket: VerifyTicket) {
        let result = self.verifier.verify(&ticket.session_id).await;
        self.reconciler.complete(&ticket, result);
    }
}
