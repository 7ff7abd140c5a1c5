//! Step client: one remote call per questionnaire step.
//!
//! The transport is behind [`StepProcessor`] so the engine can be driven by
//! the real HTTP backend or an in-memory stub. [`StepClient`] adds the
//! response contract on top. `error` short-circuits. `blocked` on the
//! date-of-birth step ends the conversation. Anything else is a success
//! carrying free-form fields, and must include a `message` unless it
//! answers plan selection.

pub mod http;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ClientError;
use crate::flow::Session;

pub use http::HttpStepProcessor;

/// Shown when the processor is unreachable or answers nonsense.
pub const GENERIC_ERROR: &str = "Sorry, something went wrong. Please try again.";

/// Remote endpoint for a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    SubmitName,
    SubmitDob,
    SelectInsurance,
    SelectTiming,
    SelectIncome,
    SubmitPhone,
    SelectPreference,
    SubmitEmail,
    SelectSignup,
}

impl Endpoint {
    pub const ALL: [Endpoint; 9] = [
        Self::SubmitName,
        Self::SubmitDob,
        Self::SelectInsurance,
        Self::SelectTiming,
        Self::SelectIncome,
        Self::SubmitPhone,
        Self::SelectPreference,
        Self::SubmitEmail,
        Self::SelectSignup,
    ];

    /// Whether a successful reply must carry a bot `message`. Plan selection
    /// answers with plan fields instead.
    pub fn replies_with_message(&self) -> bool {
        *self != Self::SelectPreference
    }

    /// Path segment on the processor.
    pub fn path(&self) -> &'static str {
        match self {
            Self::SubmitName => "submit_name",
            Self::SubmitDob => "submit_dob",
            Self::SelectInsurance => "select_insurance",
            Self::SelectTiming => "select_timing",
            Self::SelectIncome => "select_income",
            Self::SubmitPhone => "submit_phone",
            Self::SelectPreference => "select_preference",
            Self::SubmitEmail => "submit_email",
            Self::SelectSignup => "select_signup",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// A successful step result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReply {
    pub message: Option<String>,
    /// Every other field of the response, untouched.
    pub fields: Map<String, Value>,
}

impl StepReply {
    /// A field rendered as display text. Numbers and booleans are formatted,
    /// strings are taken as-is, anything else is absent.
    pub fn field_text(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// What a step call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum StepResponse {
    Ok(StepReply),
    Error(String),
    Blocked(String),
}

impl StepResponse {
    /// Interpret a processor response body for `endpoint`.
    ///
    /// Every step except plan selection must carry a `message`; a body
    /// without one is malformed. `blocked` is only honoured on the
    /// date-of-birth step.
    pub fn from_value(endpoint: Endpoint, value: Value) -> Self {
        let Value::Object(mut fields) = value else {
            return Self::Error(GENERIC_ERROR.to_string());
        };

        if let Some(error) = fields.remove("error").filter(|v| !v.is_null()) {
            return Self::Error(message_or_generic(Some(error)));
        }

        let message = fields.remove("message");
        if endpoint == Endpoint::SubmitDob {
            let blocked = fields
                .remove("blocked")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            if blocked {
                return Self::Blocked(message_or_generic(message));
            }
        }

        let message = message.and_then(|v| v.as_str().map(String::from));
        if message.is_none() && endpoint.replies_with_message() {
            return Self::Error(GENERIC_ERROR.to_string());
        }

        Self::Ok(StepReply { message, fields })
    }
}

fn message_or_generic(value: Option<Value>) -> String {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => s,
        _ => GENERIC_ERROR.to_string(),
    }
}

/// Raw transport to the step-processor.
#[async_trait]
pub trait StepProcessor: Send + Sync {
    /// POST `payload` to `endpoint` on behalf of `session_id`, returning the
    /// decoded response body.
    async fn call(
        &self,
        session_id: Uuid,
        endpoint: Endpoint,
        payload: Value,
    ) -> Result<Value, ClientError>;
}

/// Submits answers and interprets replies.
#[derive(Clone)]
pub struct StepClient {
    processor: Arc<dyn StepProcessor>,
}

impl StepClient {
    pub fn new(processor: Arc<dyn StepProcessor>) -> Self {
        Self { processor }
    }

    /// Run one step call. Transport failures become a generic error reply.
    ///
    /// A successful plan selection is remembered on `session`.
    pub async fn submit(
        &self,
        session: &mut Session,
        endpoint: Endpoint,
        payload: Value,
    ) -> StepResponse {
        debug!(session = %session.id(), %endpoint, "Submitting step");

        let response = match self.processor.call(session.id(), endpoint, payload).await {
            Ok(body) => StepResponse::from_value(endpoint, body),
            Err(e) => {
                warn!(session = %session.id(), %endpoint, "Step call failed: {}", e);
                StepResponse::Error(GENERIC_ERROR.to_string())
            }
        };

        if endpoint == Endpoint::SelectPreference
            && let StepResponse::Ok(reply) = &response
            && let Some(plan) = reply.field_text("plan")
        {
            session.remember_plan(plan);
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    struct FixedProcessor {
        reply: Result<Value, ()>,
        calls: Mutex<Vec<(Endpoint, Value)>>,
    }

    impl FixedProcessor {
        fn new(reply: Result<Value, ()>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl StepProcessor for FixedProcessor {
        async fn call(
            &self,
            _session_id: Uuid,
            endpoint: Endpoint,
            payload: Value,
        ) -> Result<Value, ClientError> {
            self.calls.lock().unwrap().push((endpoint, payload));
            self.reply.clone().map_err(|_| ClientError::RequestFailed {
                endpoint,
                reason: "connection refused".to_string(),
            })
        }
    }

    #[test]
    fn error_field_short_circuits() {
        let resp = StepResponse::from_value(
            Endpoint::SubmitEmail,
            json!({"error": "Invalid email format.", "message": "x"}),
        );
        assert_eq!(resp, StepResponse::Error("Invalid email format.".into()));
    }

    #[test]
    fn null_error_is_not_an_error() {
        let resp = StepResponse::from_value(Endpoint::SubmitName, json!({"error": null, "message": "ok"}));
        assert!(matches!(resp, StepResponse::Ok(ref r) if r.message.as_deref() == Some("ok")));
    }

    #[test]
    fn blocked_flag_ends_the_dob_step() {
        let resp = StepResponse::from_value(
            Endpoint::SubmitDob,
            json!({"blocked": true, "message": "Sorry, not eligible"}),
        );
        assert_eq!(resp, StepResponse::Blocked("Sorry, not eligible".into()));

        let resp = StepResponse::from_value(Endpoint::SubmitDob, json!({"blocked": false, "message": "Great"}));
        assert!(matches!(resp, StepResponse::Ok(_)));
    }

    #[test]
    fn blocked_flag_is_ignored_on_other_steps() {
        let resp = StepResponse::from_value(
            Endpoint::SubmitPhone,
            json!({"blocked": true, "message": "About Perlindungan Combo"}),
        );
        assert!(matches!(resp, StepResponse::Ok(ref r) if r.message.as_deref() == Some("About Perlindungan Combo")));
    }

    #[test]
    fn non_object_body_is_a_generic_error() {
        let resp = StepResponse::from_value(Endpoint::SubmitName, json!(["nope"]));
        assert_eq!(resp, StepResponse::Error(GENERIC_ERROR.into()));
    }

    #[test]
    fn missing_message_is_malformed() {
        for endpoint in Endpoint::ALL {
            let resp = StepResponse::from_value(endpoint, json!({"detail": "boom"}));
            if endpoint.replies_with_message() {
                assert_eq!(resp, StepResponse::Error(GENERIC_ERROR.into()), "{endpoint}");
            } else {
                assert!(matches!(resp, StepResponse::Ok(_)), "{endpoint}");
            }
        }
        let resp = StepResponse::from_value(Endpoint::SubmitName, json!({"message": 42}));
        assert_eq!(resp, StepResponse::Error(GENERIC_ERROR.into()));
    }

    #[test]
    fn extra_fields_are_kept() {
        let resp = StepResponse::from_value(
            Endpoint::SelectPreference,
            json!({"plan": "Comprehensive", "premium": 250, "life": "100,000"}),
        );
        let StepResponse::Ok(reply) = resp else {
            panic!("expected Ok");
        };
        assert_eq!(reply.message, None);
        assert_eq!(reply.field_text("plan").as_deref(), Some("Comprehensive"));
        assert_eq!(reply.field_text("premium").as_deref(), Some("250"));
        assert_eq!(reply.field_text("life").as_deref(), Some("100,000"));
        assert_eq!(reply.field_text("missing"), None);
    }

    #[tokio::test]
    async fn transport_failure_is_a_generic_error() {
        let client = StepClient::new(FixedProcessor::new(Err(())));
        let mut session = Session::new();
        let resp = client
            .submit(&mut session, Endpoint::SubmitName, json!({"name": "Ali"}))
            .await;
        assert_eq!(resp, StepResponse::Error(GENERIC_ERROR.into()));
    }

    #[tokio::test]
    async fn plan_selection_is_remembered() {
        let processor = FixedProcessor::new(Ok(json!({
            "plan": "Comprehensive", "premium": 250, "life": 100, "critical": 80, "medical": 70
        })));
        let client = StepClient::new(processor.clone());
        let mut session = Session::new();

        client
            .submit(&mut session, Endpoint::SelectPreference, json!({"level": 3}))
            .await;

        assert_eq!(session.selected_plan(), Some("Comprehensive"));
        let calls = processor.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[(Endpoint::SelectPreference, json!({"level": 3}))]);
    }

    #[tokio::test]
    async fn plan_field_on_other_steps_is_ignored() {
        let client = StepClient::new(FixedProcessor::new(Ok(json!({"plan": "Basic", "message": "hi"}))));
        let mut session = Session::new();
        client
            .submit(&mut session, Endpoint::SubmitEmail, json!({"email": "a@b.co"}))
            .await;
        assert_eq!(session.selected_plan(), None);
    }

    #[test]
    fn endpoint_display_matches_serde() {
        for endpoint in Endpoint::ALL {
            let json = serde_json::to_string(&endpoint).unwrap();
            assert_eq!(format!("\"{endpoint}\""), json);
        }
    }
}
