use async_trait::async_trait;
use bytes::Bytes;
use research_core::auth::{RegisterUser, SignIn, VerifyOtp};
use research_core::query::{value_text, SubmitQuery};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("connection failed: {0}")]
    Transport(String),

    #[error("request rejected with status {status}")]
    Rejected { status: u16, body: Option<Value> },

    #[error("decode error: {0}")]
    Decode(String),
}

impl ServiceError {
    /// The structured body the backend sent with a rejection, if any.
    pub fn body(&self) -> Option<&Value> {
        match self {
            ServiceError::Rejected { body, .. } => body.as_ref(),
            _ => None,
        }
    }
}

/// Answer to the session check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenStatus {
    pub user_id: Option<String>,
}

impl TokenStatus {
    pub fn from_value(value: &Value) -> Self {
        Self {
            user_id: value.get("userId").and_then(value_text),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegisterReply {
    pub redirect_url: Option<String>,
    pub message: Option<String>,
}

impl RegisterReply {
    pub fn from_value(value: &Value) -> Self {
        Self {
            redirect_url: value
                .get("redirectUrl")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(String::from),
            message: message_of(value),
        }
    }
}

/// Replies that only carry a human-readable `message`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageReply {
    pub message: Option<String>,
}

impl MessageReply {
    pub fn from_value(value: &Value) -> Self {
        Self {
            message: message_of(value),
        }
    }
}

/// What the export endpoint handed back: the document itself, or a JSON
/// body that may still wrap one.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportPayload {
    Document(Bytes),
    Json(Value),
}

/// The research backend as seen by the client.
///
/// `HttpService` talks to the real backend; tests run it against the stub
/// in `test_helpers`.
#[async_trait]
pub trait ResearchApi: Send + Sync {
    // -- Auth --
    async fn check_token(&self) -> Result<TokenStatus, ServiceError>;
    async fn check_email(&self, email: &str) -> Result<bool, ServiceError>;
    async fn register(&self, input: &RegisterUser) -> Result<RegisterReply, ServiceError>;
    async fn verify_otp(&self, token: &str, input: &VerifyOtp)
        -> Result<MessageReply, ServiceError>;
    async fn sign_in(&self, input: &SignIn) -> Result<MessageReply, ServiceError>;

    // -- Research --
    async fn submit_query(&self, input: &SubmitQuery) -> Result<Value, ServiceError>;
    async fn fetch_history(&self) -> Result<Value, ServiceError>;
    async fn export_pdf(&self, id: &str) -> Result<ExportPayload, ServiceError>;
}

fn message_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        other => other.get("message").and_then(value_text),
    }
}
