//! Backend configuration

/// Placeholder replaced by the payment session id in the checkout URL
pub const SESSION_PLACEHOLDER: &str = "{session_id}";

/// Backend endpoint configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendConfig {
    /// Base URL of the REST API, e.g. `https://learn.example.com/api`
    pub api_url: String,

    /// Hosted checkout page, with `{session_id}` where the id goes
    pub checkout_url_template: String,

    /// Request timeout in seconds (ignored in the browser)
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000/api".into(),
            checkout_url_template: "https://checkout.stripe.com/c/pay/{session_id}".into(),
            timeout_secs: 30,
        }
    }
}

impl BackendConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let api_url = std::env::var("COURSE_API_URL").unwrap_or(defaults.api_url);
        let checkout_url_template =
            std::env::var("COURSE_CHECKOUT_URL").unwrap_or(defaults.checkout_url_template);
        let timeout_secs = std::env::var("COURSE_API_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(defaults.timeout_secs);

        Self {
            api_url,
            checkout_url_template,
            timeout_secs,
        }
    }

    /// API living under `/api` on the page's own origin
    pub fn for_origin(origin: &str) -> Self {
        Self {
            api_url: format!("{}/api", origin.trim_end_matches('/')),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    #[must_use]
    pub fn with_checkout_url(mut self, template: impl Into<String>) -> Self {
        self.checkout_url_template = template.into();
        self
    }

    /// Hosted checkout URL for one session
    pub fn checkout_url(&self, session_id: &str) -> String {
        if self.checkout_url_template.contains(SESSION_PLACEHOLDER) {
            self.checkout_url_template.replace(SESSION_PLACEHOLDER, session_id)
        } else {
            format!("{}/{session_id}", self.checkout_url_template.trim_end_matches('/'))
        }
    }
}
