//! REST Backend Client
//!
//! One `reqwest` client implementing every remote collaborator the course
//! client needs. Non-success statuses are turned into
//! [`PaymentError::Backend`] carrying the server's `message` when the body
//! has one.

use async_trait::async_trait;
use course_core::{CoreError, CourseId, EnrollmentCheck, EnrollmentOracle, ViewerContext};
use course_payments::{
    CheckoutInitiator, CourseOffer, CreatePaymentRequest, CreatePaymentResponse, PaymentError,
    PaymentVerifier, VerificationResponse,
};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::BackendConfig;

type PaymentResult<T> = std::result::Result<T, PaymentError>;

/// HTTP client for the learning platform API
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    config: BackendConfig,
    auth_token: Option<String>,
}

impl BackendClient {
    /// Create from configuration
    pub fn from_config(config: BackendConfig) -> PaymentResult<Self> {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(std::time::Duration::from_secs(config.timeout_secs));

        let client = builder
            .build()
            .map_err(|e| PaymentError::Config(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            auth_token: None,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> PaymentResult<Self> {
        Self::from_config(BackendConfig::from_env())
    }

    /// Attach the viewer's credentials to every request
    #[must_use]
    pub fn with_context(mut self, viewer: &ViewerContext) -> Self {
        self.auth_token.clone_from(&viewer.auth_token);
        self
    }

    pub const fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Purchase details for a course page
    pub async fn course_offer(&self, course_id: &CourseId) -> PaymentResult<CourseOffer> {
        #[derive(serde::Deserialize)]
        struct Envelope {
            data: CourseOffer,
        }

        let envelope: Envelope = self.get(&["courses", course_id.as_str()]).await?;
        Ok(envelope.data)
    }

    /// `{api_url}/{segments...}` with each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> PaymentResult<Url> {
        let mut url = Url::parse(&self.config.api_url)
            .map_err(|e| PaymentError::Config(format!("bad api url {}: {e}", self.config.api_url)))?;
        url.path_segments_mut()
            .map_err(|()| PaymentError::Config(format!("api url cannot be a base: {}", self.config.api_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> PaymentResult<T> {
        let response = builder
            .send()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| PaymentError::Transport(format!("unreadable response: {e}")))?;
            return Ok(serde_json::from_str(&body)?);
        }

        let body: serde_json::Value = response.json().await.unwrap_or_default();
        let message = body["message"]
            .as_str()
            .or_else(|| body["error"].as_str())
            .map(String::from);
        tracing::debug!(status = status.as_u16(), message = ?message, "Backend returned an error status");

        Err(PaymentError::Backend {
            status: status.as_u16(),
            message,
        })
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> PaymentResult<T> {
        let url = self.endpoint(segments)?;
        self.send(self.request(Method::GET, url)).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> PaymentResult<T> {
        let url = self.endpoint(segments)?;
        self.send(self.request(Method::POST, url).json(body)).await
    }
}

#[async_trait(?Send)]
impl EnrollmentOracle for BackendClient {
    async fn verify(&self, course_id: &CourseId) -> course_core::Result<EnrollmentCheck> {
        if self.auth_token.is_none() {
            tracing::debug!(course_id = %course_id, "Anonymous viewer, not enrolled");
            return Ok(EnrollmentCheck { success: false });
        }

        self.get(&["enrollments", "check", course_id.as_str()])
            .await
            .map_err(|e| CoreError::EntitlementCheckFailed(e.failure_reason()))
    }
}

#[async_trait(?Send)]
impl PaymentVerifier for BackendClient {
    async fn verify(&self, session_id: &str) -> PaymentResult<VerificationResponse> {
        self.get(&["payments", "verify", session_id]).await
    }
}

#[async_trait(?Send)]
impl CheckoutInitiator for BackendClient {
    async fn create_payment(&self, request: &CreatePaymentRequest) -> PaymentResult<CreatePaymentResponse> {
        self.post(&["payments", "create-checkout-session"], request).await
    }

    fn checkout_url(&self, session_id: &str) -> String {
        self.config.checkout_url(session_id)
    }
}
