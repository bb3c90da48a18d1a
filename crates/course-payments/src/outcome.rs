//! Payment return signals and verification payloads

use chrono::{DateTime, Utc};
use course_core::CourseId;
use serde::{Deserialize, Serialize};

use crate::error::{PaymentError, Result};

/// Outcome hint carried by the return URL (`payment=...`)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeHint {
    Success,
    Cancelled,
}

impl OutcomeHint {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Cancelled => "cancelled",
        }
    }

    /// Anything but the two known values is treated as no hint at all.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "success" => Some(Self::Success),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Everything the browser brings back from the hosted checkout
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReturn {
    pub hint: Option<OutcomeHint>,
    pub session_id: Option<String>,
    pub course_id: Option<CourseId>,
}

impl PaymentReturn {
    pub fn new(
        hint: Option<OutcomeHint>,
        session_id: Option<&str>,
        course_id: Option<&str>,
    ) -> Self {
        Self {
            hint,
            session_id: non_blank(session_id),
            course_id: CourseId::parse(course_id),
        }
    }

    /// Parse a raw query string, with or without the leading `?`.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut hint = None;
        let mut session_id = None;
        let mut course_id = None;

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "payment" => hint = OutcomeHint::parse(&value),
                "session_id" => session_id = non_blank(Some(&value)),
                "course_id" | "courseId" => course_id = CourseId::parse(Some(&value)),
                _ => {}
            }
        }

        Self {
            hint,
            session_id,
            course_id,
        }
    }

    /// Parse a full return URL
    pub fn from_url(raw: &str) -> Result<Self> {
        let url = url::Url::parse(raw).map_err(|e| PaymentError::Config(format!("bad return url: {e}")))?;
        Ok(Self::from_query(url.query().unwrap_or_default()))
    }

    /// Supply the course id from the route when the query lacks it
    #[must_use]
    pub fn with_course(mut self, course_id: Option<CourseId>) -> Self {
        if self.course_id.is_none() {
            self.course_id = course_id;
        }
        self
    }
}

fn non_blank(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(String::from)
}

/// Course details echoed back with an enrollment
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseSummary {
    pub title: String,

    #[serde(default)]
    pub tutor: Option<String>,
}

/// Enrollment created by a confirmed payment
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentSnapshot {
    pub id: String,

    pub status: String,

    #[serde(default)]
    pub course: Option<CourseSummary>,

    #[serde(default)]
    pub enrollment_date: Option<DateTime<Utc>>,
}

/// Answer of the payment verification endpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResponse {
    pub success: bool,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub data: Option<EnrollmentSnapshot>,
}

impl VerificationResponse {
    pub const fn confirmed(data: EnrollmentSnapshot) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

/// Settled view of a payment return
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PaymentOutcome {
    Pending,
    Success(Option<EnrollmentSnapshot>),
    Cancelled,
    Failed(String),
    /// Return URL did not carry enough to verify anything
    MissingParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_query() {
        let ret = PaymentReturn::from_query("?payment=success&session_id=cs_test_1&course_id=c42");
        assert_eq!(ret.hint, Some(OutcomeHint::Success));
        assert_eq!(ret.session_id.as_deref(), Some("cs_test_1"));
        assert_eq!(ret.course_id, Some(CourseId::new("c42")));
    }

    #[test]
    fn test_from_query_unknown_hint_and_blank_session() {
        let ret = PaymentReturn::from_query("payment=maybe&session_id=");
        assert_eq!(ret.hint, None);
        assert_eq!(ret.session_id, None);
    }

    #[test]
    fn test_from_url_and_route_course() {
        let ret = PaymentReturn::from_url("https://learn.example.com/payment/result?payment=cancelled")
            .unwrap()
            .with_course(Some(CourseId::new("c7")));
        assert_eq!(ret.hint, Some(OutcomeHint::Cancelled));
        assert_eq!(ret.course_id, Some(CourseId::new("c7")));
    }

    #[test]
    fn test_snapshot_decodes_backend_json() {
        let raw = r#"{
            "success": true,
            "data": {
                "id": "e1",
                "status": "active",
                "course": {"title": "Rust 101", "tutor": "Ada"},
                "enrollmentDate": "2026-03-01T10:00:00Z"
            }
        }"#;
        let resp: VerificationResponse = serde_json::from_str(raw).unwrap();
        let data = resp.data.unwrap();
        assert_eq!(data.id, "e1");
        assert_eq!(data.course.unwrap().title, "Rust 101");
        assert!(data.enrollment_date.is_some());
    }
}
