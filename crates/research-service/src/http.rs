use async_trait::async_trait;
use research_core::auth::{RegisterUser, SignIn, VerifyOtp};
use research_core::query::SubmitQuery;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde_json::Value;
use tracing::debug;

use crate::traits::{ExportPayload, MessageReply, RegisterReply, TokenStatus};
use crate::{ResearchApi, ServiceError};

pub const DEFAULT_API_PREFIX: &str = "/app/api";

/// Async HTTP client implementation of ResearchApi.
/// Keeps a cookie store so the backend's session cookie survives between calls.
pub struct HttpService {
    base_url: String,
    client: Client,
}

impl HttpService {
    pub fn new(server_url: &str) -> Result<Self, ServiceError> {
        Self::with_prefix(server_url, DEFAULT_API_PREFIX)
    }

    /// Fails when the HTTP client cannot be built, since a client without a
    /// cookie store would lose the session after sign-in.
    pub fn with_prefix(server_url: &str, prefix: &str) -> Result<Self, ServiceError> {
        let prefix = prefix.trim_matches('/');
        let server_url = server_url.trim_end_matches('/');
        let base_url = if prefix.is_empty() {
            server_url.to_string()
        } else {
            format!("{server_url}/{prefix}")
        };
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| ServiceError::Transport(format!("build http client: {e}")))?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// The export URL with `id` as a single percent-encoded path segment.
    fn export_url(&self, id: &str) -> Result<Url, ServiceError> {
        let mut url = Url::parse(&self.url("/research/export"))
            .map_err(|e| ServiceError::Transport(format!("invalid url {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| ServiceError::Transport(format!("invalid url {}", self.base_url)))?
            .push(id);
        Ok(url)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ServiceError> {
        let resp = builder
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        debug!(url = %resp.url(), status = %resp.status(), "backend response");
        Ok(resp)
    }

    async fn get_value(&self, path: &str) -> Result<Value, ServiceError> {
        let resp = self.send(self.client.get(self.url(path))).await?;
        read_value(resp).await
    }

    async fn post_value<B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Value, ServiceError> {
        let resp = self
            .send(self.client.post(self.url(path)).json(body))
            .await?;
        read_value(resp).await
    }
}

/// Read a response body as JSON. Bodies that are not JSON become a JSON
/// string so callers always get a `Value` to normalize.
async fn read_value(resp: Response) -> Result<Value, ServiceError> {
    let status = resp.status();
    let text = resp
        .text()
        .await
        .map_err(|e| ServiceError::Decode(format!("read body: {e}")))?;

    if status.is_success() {
        Ok(parse_body(text))
    } else {
        Err(rejected(status.as_u16(), &text))
    }
}

fn parse_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

fn rejected(status: u16, text: &str) -> ServiceError {
    let body = serde_json::from_str::<Value>(text).ok();
    ServiceError::Rejected { status, body }
}

#[async_trait]
impl ResearchApi for HttpService {
    async fn check_token(&self) -> Result<TokenStatus, ServiceError> {
        let value = self.get_value("/auth/check-token").await?;
        Ok(TokenStatus::from_value(&value))
    }

    async fn check_email(&self, email: &str) -> Result<bool, ServiceError> {
        let builder = self
            .client
            .get(self.url("/auth/check-email"))
            .query(&[("email", email)]);
        let value = read_value(self.send(builder).await?).await?;
        Ok(value
            .get("available")
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    async fn register(&self, input: &RegisterUser) -> Result<RegisterReply, ServiceError> {
        let value = self.post_value("/auth/register", input).await?;
        Ok(RegisterReply::from_value(&value))
    }

    async fn verify_otp(
        &self,
        token: &str,
        input: &VerifyOtp,
    ) -> Result<MessageReply, ServiceError> {
        let builder = self
            .client
            .post(self.url("/auth/verify-otp"))
            .query(&[("token", token)])
            .json(input);
        let value = read_value(self.send(builder).await?).await?;
        Ok(MessageReply::from_value(&value))
    }

    async fn sign_in(&self, input: &SignIn) -> Result<MessageReply, ServiceError> {
        let value = self.post_value("/auth/signin", input).await?;
        Ok(MessageReply::from_value(&value))
    }

    async fn submit_query(&self, input: &SubmitQuery) -> Result<Value, ServiceError> {
        self.post_value("/research/query", input).await
    }

    async fn fetch_history(&self) -> Result<Value, ServiceError> {
        self.get_value("/research/history").await
    }

    async fn export_pdf(&self, id: &str) -> Result<ExportPayload, ServiceError> {
        let resp = self
            .send(self.client.get(self.export_url(id)?))
            .await?;
        let status = resp.status();
        let is_json = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("json"));
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ServiceError::Decode(format!("read body: {e}")))?;

        if !status.is_success() {
            return Err(rejected(
                status.as_u16(),
                &String::from_utf8_lossy(&bytes),
            ));
        }
        if is_json {
            let value = serde_json::from_slice(&bytes)
                .map_err(|e| ServiceError::Decode(format!("json decode: {e}")))?;
            Ok(ExportPayload::Json(value))
        } else {
            Ok(ExportPayload::Document(bytes))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn base_url_joins_prefix() {
        let svc = HttpService::with_prefix("http://127.0.0.1:3000/", "/app/api/").unwrap();
        assert_eq!(svc.base_url(), "http://127.0.0.1:3000/app/api");

        let bare = HttpService::with_prefix("http://127.0.0.1:3000", "").unwrap();
        assert_eq!(bare.base_url(), "http://127.0.0.1:3000");
    }

    #[test]
    fn export_id_is_one_encoded_segment() {
        let svc = HttpService::new("http://127.0.0.1:3000").unwrap();
        let url = svc.export_url("a/b?c#d").unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:3000/app/api/research/export/a%2Fb%3Fc%23d"
        );

        let plain = svc.export_url("c1").unwrap();
        assert_eq!(plain.path(), "/app/api/research/export/c1");
    }

    #[test]
    fn bad_server_url_fails_export_url() {
        let svc = HttpService::new("not a url").unwrap();
        assert!(matches!(
            svc.export_url("c1"),
            Err(ServiceError::Transport(_))
        ));
    }

    #[test]
    fn non_json_body_becomes_string() {
        assert_eq!(parse_body("plain answer".into()), json!("plain answer"));
        assert_eq!(parse_body("{\"a\":1}".into()), json!({"a": 1}));
        assert_eq!(parse_body("  ".into()), Value::Null);
    }

    #[test]
    fn rejection_keeps_json_body() {
        let err = rejected(400, r#"{"message":"Invalid OTP"}"#);
        assert_eq!(err.body(), Some(&json!({"message": "Invalid OTP"})));

        let err = rejected(502, "Bad Gateway");
        assert_eq!(err.body(), None);
        assert_eq!(err.to_string(), "request rejected with status 502");
    }
}
