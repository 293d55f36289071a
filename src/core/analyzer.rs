//! Client for the log analysis model.
//!
//! Sends operator-supplied log text to the Gemini `generateContent` endpoint
//! with a fixed system instruction and a response schema, and parses the
//! model's JSON answer into a [`LogAnalysisResult`].
//!
//! Every call re-queries the model; nothing is cached or retried. Two guards
//! sit in front of the network call:
//!
//! - an identical log text that is still being analyzed is refused with
//!   [`AnalysisFailure::InFlight`];
//! - each call takes a request token, and a call that was overtaken by a
//!   newer one resolves to [`AnalysisFailure::Superseded`] instead of its
//!   stale result.

use crate::config::model::AnalyzerConfig;
use crate::core::ent::{LogAnalysisResult, Severity};
use schemars::schema::RootSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

pub const SYSTEM_INSTRUCTION: &str =
    "You are an expert Site Reliability Engineer and Systems Architect.";

#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// No credential is configured. Raised before any network I/O.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("analysis failed: {0}")]
    Analysis(#[from] AnalysisFailure),
}

#[derive(Debug, Error)]
pub enum AnalysisFailure {
    #[error("log text is empty")]
    EmptyInput,

    #[error("the same log text is already being analyzed")]
    InFlight,

    #[error("superseded by a newer analysis request")]
    Superseded,

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("no response from model")]
    EmptyResponse,

    #[error("malformed model response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Where the API key comes from. Environment keys are read on every call.
#[derive(Debug, Clone)]
pub enum ApiKey {
    Env(String),
    Fixed(String),
}

impl ApiKey {
    fn resolve(&self) -> Option<String> {
        let key = match self {
            ApiKey::Env(var) => std::env::var(var).ok()?,
            ApiKey::Fixed(key) => key.clone(),
        };
        if key.trim().is_empty() {
            None
        } else {
            Some(key)
        }
    }

    fn missing(&self) -> String {
        match self {
            ApiKey::Env(var) => format!("API key is missing, set {}", var),
            ApiKey::Fixed(_) => "API key is missing".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&str>, text: String) -> Content {
        Content {
            role: role.map(str::to_string),
            parts: vec![Part { text: Some(text) }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize, Default)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize, Default)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// The response schema sent with every request, in the model API's own
/// schema dialect.
pub fn response_schema() -> Value {
    let severities: Vec<&str> = Severity::ALL.iter().map(Severity::as_str).collect();
    json!({
        "type": "OBJECT",
        "properties": {
            "summary": {
                "type": "STRING",
                "description": "A concise summary of what the logs indicate."
            },
            "severity": {
                "type": "STRING",
                "enum": severities,
                "description": "The overall severity of the identified issues."
            },
            "rootCause": {
                "type": "STRING",
                "description": "The likely technical root cause of the issue."
            },
            "recommendations": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "List of actionable steps to resolve the issue."
            }
        },
        "required": ["summary", "severity", "rootCause", "recommendations"]
    })
}

/// JSON Schema of [`LogAnalysisResult`] as published to API consumers.
pub fn result_json_schema() -> RootSchema {
    schemars::schema_for!(LogAnalysisResult)
}

fn prompt(logs: &str) -> String {
    format!(
        "Analyze the following system logs from a data center environment.\n\
         Identify the root cause of any errors, assess the severity, and provide \
         actionable recommendations for a Site Reliability Engineer.\n\n\
         Logs:\n{}",
        logs
    )
}

/// Removes its key from the in-flight set when dropped.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<String>>,
    key: String,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(set: &'a Mutex<HashSet<String>>, key: &str) -> Option<InFlightGuard<'a>> {
        let mut running = set.lock().unwrap_or_else(PoisonError::into_inner);
        if !running.insert(key.to_string()) {
            return None;
        }
        Some(InFlightGuard {
            set,
            key: key.to_string(),
        })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

pub struct LogAnalyzer {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: ApiKey,
    timeout: Duration,
    latest: AtomicU64,
    in_flight: Mutex<HashSet<String>>,
}

impl LogAnalyzer {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: ApiKey) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            api_key,
            timeout: Duration::from_secs(30),
            latest: AtomicU64::new(0),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self::new(
            config.base_url.clone(),
            config.model.clone(),
            ApiKey::Env(config.api_key_env.clone()),
        )
        .with_timeout(Duration::from_secs(config.timeout_secs))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether a credential is currently available.
    pub fn has_credential(&self) -> bool {
        self.api_key.resolve().is_some()
    }

    pub async fn analyze(&self, logs: &str) -> Result<LogAnalysisResult, AnalyzeError> {
        if logs.trim().is_empty() {
            return Err(AnalysisFailure::EmptyInput.into());
        }
        let api_key = self
            .api_key
            .resolve()
            .ok_or_else(|| AnalyzeError::Configuration(self.api_key.missing()))?;
        let _guard =
            InFlightGuard::acquire(&self.in_flight, logs).ok_or(AnalysisFailure::InFlight)?;
        let token = self.latest.fetch_add(1, Ordering::SeqCst) + 1;

        tracing::debug!(token, model = %self.model, bytes = logs.len(), "analyzing logs");
        let outcome = self.request(&api_key, logs).await;

        if self.latest.load(Ordering::SeqCst) != token {
            tracing::info!(token, "discarding superseded analysis");
            return Err(AnalysisFailure::Superseded.into());
        }
        if let Err(e) = &outcome {
            tracing::error!("log analysis failed: {e}");
        }
        outcome
    }

    async fn request(&self, api_key: &str, logs: &str) -> Result<LogAnalysisResult, AnalyzeError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let body = GenerateContentRequest {
            system_instruction: Content::text(None, SYSTEM_INSTRUCTION.to_string()),
            contents: vec![Content::text(Some("user"), prompt(logs))],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: response_schema(),
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(AnalysisFailure::Transport)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!("failed to read error body: {e}");
                    format!("<unreadable body: {e}>")
                }
            };
            return Err(AnalysisFailure::Status { status, body }.into());
        }

        let raw = response.bytes().await.map_err(AnalysisFailure::Transport)?;
        let payload: GenerateContentResponse =
            serde_json::from_slice(&raw).map_err(AnalysisFailure::Malformed)?;
        let text = payload.text().ok_or(AnalysisFailure::EmptyResponse)?;
        let result: LogAnalysisResult =
            serde_json::from_str(&text).map_err(AnalysisFailure::Malformed)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{any, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ENDPOINT: &str = "/v1beta/models/gemini-2.5-flash:generateContent";
    const UNSET_VAR: &str = "NEXUS_OPS_TEST_KEY_THAT_IS_NEVER_SET";

    fn analyzer(server: &MockServer) -> LogAnalyzer {
        LogAnalyzer::new(
            server.uri(),
            "gemini-2.5-flash",
            ApiKey::Fixed("test-key".to_string()),
        )
    }

    fn model_reply(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
        }))
    }

    #[tokio::test]
    async fn parses_result_and_keeps_recommendation_order() {
        let server = MockServer::start().await;
        let answer = json!({
            "summary": "Connection pool exhaustion",
            "severity": "CRITICAL",
            "rootCause": "Deadlock on table orders",
            "recommendations": ["Raise pool size", "Fix lock ordering"]
        });
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(model_reply(&answer.to_string()))
            .expect(1)
            .mount(&server)
            .await;

        let result = analyzer(&server).analyze("ERROR pool timeout").await.unwrap();
        assert_eq!(result.severity, Severity::Critical);
        assert_eq!(
            result.recommendations,
            vec!["Raise pool size".to_string(), "Fix lock ordering".to_string()]
        );
        assert_eq!(result.root_cause, "Deadlock on table orders");
    }

    #[tokio::test]
    async fn request_carries_instruction_logs_and_schema() {
        let server = MockServer::start().await;
        let answer = json!({
            "summary": "s", "severity": "LOW", "rootCause": "r", "recommendations": []
        });
        Mock::given(any())
            .respond_with(model_reply(&answer.to_string()))
            .mount(&server)
            .await;

        analyzer(&server)
            .analyze("FATAL [Database] deadlock")
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            SYSTEM_INSTRUCTION
        );
        let user_text = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(user_text.contains("FATAL [Database] deadlock"));
        let config = &body["generationConfig"];
        assert_eq!(config["responseMimeType"], "application/json");
        assert_eq!(
            config["responseSchema"]["required"],
            json!(["summary", "severity", "rootCause", "recommendations"])
        );
        assert_eq!(
            config["responseSchema"]["properties"]["severity"]["enum"],
            json!(["LOW", "MEDIUM", "HIGH", "CRITICAL"])
        );
    }

    #[tokio::test]
    async fn missing_credential_fails_without_network() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let analyzer = LogAnalyzer::new(
            server.uri(),
            "gemini-2.5-flash",
            ApiKey::Env(UNSET_VAR.to_string()),
        );
        assert!(!analyzer.has_credential());
        let err = analyzer.analyze("ERROR something").await.unwrap_err();
        assert!(matches!(err, AnalyzeError::Configuration(_)));
        assert!(err.to_string().contains(UNSET_VAR));
    }

    #[tokio::test]
    async fn blank_input_fails_without_network() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let analyzer = analyzer(&server);
        for input in ["", "   \n\t "] {
            let err = analyzer.analyze(input).await.unwrap_err();
            assert!(matches!(
                err,
                AnalyzeError::Analysis(AnalysisFailure::EmptyInput)
            ));
        }
    }

    #[tokio::test]
    async fn missing_severity_is_rejected() {
        let server = MockServer::start().await;
        let answer = json!({ "summary": "s", "rootCause": "r", "recommendations": ["a"] });
        Mock::given(any())
            .respond_with(model_reply(&answer.to_string()))
            .mount(&server)
            .await;

        let err = analyzer(&server).analyze("WARN x").await.unwrap_err();
        assert!(matches!(
            err,
            AnalyzeError::Analysis(AnalysisFailure::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn unknown_severity_is_rejected() {
        let server = MockServer::start().await;
        let answer = json!({
            "summary": "s", "severity": "catastrophic", "rootCause": "r", "recommendations": []
        });
        Mock::given(any())
            .respond_with(model_reply(&answer.to_string()))
            .mount(&server)
            .await;

        let err = analyzer(&server).analyze("WARN x").await.unwrap_err();
        assert!(matches!(
            err,
            AnalyzeError::Analysis(AnalysisFailure::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn non_json_text_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(model_reply("I think the database is sad."))
            .mount(&server)
            .await;

        let err = analyzer(&server).analyze("WARN x").await.unwrap_err();
        assert!(matches!(
            err,
            AnalyzeError::Analysis(AnalysisFailure::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn empty_candidates_are_reported() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let err = analyzer(&server).analyze("WARN x").await.unwrap_err();
        assert!(matches!(
            err,
            AnalyzeError::Analysis(AnalysisFailure::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn service_errors_carry_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let err = analyzer(&server).analyze("WARN x").await.unwrap_err();
        match err {
            AnalyzeError::Analysis(AnalysisFailure::Status { status, body }) => {
                assert_eq!(status, 429);
                assert_eq!(body, "quota exceeded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_failure() {
        // bind then release an ephemeral port so nothing is listening on it
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let uri = format!("http://127.0.0.1:{port}");

        let analyzer = LogAnalyzer::new(uri, "gemini-2.5-flash", ApiKey::Fixed("k".to_string()))
            .with_timeout(Duration::from_secs(5));
        let err = analyzer.analyze("WARN x").await.unwrap_err();
        assert!(matches!(
            err,
            AnalyzeError::Analysis(AnalysisFailure::Transport(_))
        ));
    }

    #[tokio::test]
    async fn identical_text_in_flight_is_refused() {
        let server = MockServer::start().await;
        let answer = json!({
            "summary": "s", "severity": "HIGH", "rootCause": "r", "recommendations": []
        });
        Mock::given(any())
            .respond_with(model_reply(&answer.to_string()).set_delay(Duration::from_millis(200)))
            .expect(2)
            .mount(&server)
            .await;

        let analyzer = analyzer(&server);
        let (first, second) = tokio::join!(analyzer.analyze("OOM"), analyzer.analyze("OOM"));
        assert_eq!(first.unwrap().severity, Severity::High);
        assert!(matches!(
            second,
            Err(AnalyzeError::Analysis(AnalysisFailure::InFlight))
        ));

        // the guard is released once the first call resolves
        assert!(analyzer.analyze("OOM").await.is_ok());
    }

    #[tokio::test]
    async fn newer_request_supersedes_older_one() {
        let server = MockServer::start().await;
        let answer = json!({
            "summary": "s", "severity": "MEDIUM", "rootCause": "r", "recommendations": []
        });
        Mock::given(any())
            .respond_with(model_reply(&answer.to_string()).set_delay(Duration::from_millis(200)))
            .expect(2)
            .mount(&server)
            .await;

        let analyzer = analyzer(&server);
        let (older, newer) = tokio::join!(analyzer.analyze("first"), analyzer.analyze("second"));
        assert!(matches!(
            older,
            Err(AnalyzeError::Analysis(AnalysisFailure::Superseded))
        ));
        assert_eq!(newer.unwrap().severity, Severity::Medium);
    }

    #[test]
    fn published_schema_matches_request_schema() {
        let root = result_json_schema();
        let published: Vec<String> = root
            .schema
            .object
            .as_ref()
            .unwrap()
            .required
            .iter()
            .cloned()
            .collect();
        let mut requested: Vec<String> = response_schema()["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();
        requested.sort();
        assert_eq!(published, requested);
    }
}
