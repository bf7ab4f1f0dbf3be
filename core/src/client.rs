use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{AnalystConfig, DEFAULT_AUTH_SCHEME};
use crate::credentials::CredentialProvider;
use crate::errors::{ApiError, ConfigResult, FeedbackError, TransportError};
use crate::semantic_model::SemanticModelRef;
use crate::session::Session;
use crate::types::*;

/// Path of the analyst message endpoint
pub const MESSAGE_ENDPOINT: &str = "/api/v2/cortex/analyst/message";

/// Path of the analyst feedback endpoint
pub const FEEDBACK_ENDPOINT: &str = "/api/v2/cortex/analyst/feedback";

/// Client for the Cortex Analyst REST API.
///
/// Every call is a single attempt bounded by the configured timeout. Failures
/// come back as values, never as panics or early returns past the caller.
#[derive(Debug, Clone)]
pub struct AnalystClient {
    client: Client,
    credentials: Arc<dyn CredentialProvider>,
    auth_scheme: String,
}

impl AnalystClient {
    /// Create a new client with a per-call timeout
    pub fn new(credentials: Arc<dyn CredentialProvider>, timeout: Duration) -> ConfigResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            credentials,
            auth_scheme: DEFAULT_AUTH_SCHEME.to_string(),
        })
    }

    /// Create a client from merged configuration
    pub fn from_config(config: &AnalystConfig) -> ConfigResult<Self> {
        let client = Self::new(config.credentials()?, config.timeout())?;
        Ok(client.with_auth_scheme(config.auth_scheme()))
    }

    pub fn with_auth_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.auth_scheme = scheme.into();
        self
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.credentials.host(), endpoint)
    }

    fn authorization(&self) -> Result<String, TransportError> {
        let token = self.credentials.current_token()?;
        Ok(format!("{} Token=\"{}\"", self.auth_scheme, token))
    }

    /// Asks the analyst about the conversation so far.
    ///
    /// Returns `None` without touching the network when the session has no
    /// turns. The session is only read; folding the result back in is up to
    /// the caller.
    pub async fn send(
        &self,
        session: &Session,
        semantic_model: &SemanticModelRef,
    ) -> Option<AnalystResult> {
        if session.turns().is_empty() {
            debug!(session = %session.id(), "No turns to send");
            return None;
        }

        let request = AnalystRequest::from_turns(session.turns(), semantic_model);
        debug!(
            session = %session.id(),
            messages = request.messages.len(),
            semantic_model = %request.semantic_model_file,
            "Sending analyst request"
        );
        Some(self.send_request(&request).await)
    }

    /// Posts a prepared request and classifies the outcome
    pub async fn send_request(&self, request: &AnalystRequest) -> AnalystResult {
        let (status, body) = match self.post_json(MESSAGE_ENDPOINT, request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(cause = %err.cause, "Analyst request failed in transport");
                return AnalystResult::TransportError(err);
            }
        };

        let result = classify_response(status, &body);
        match &result {
            AnalystResult::Success(reply) => info!(
                status = status.as_u16(),
                request_id = reply.request_id.as_deref().unwrap_or("-"),
                blocks = reply.content.len(),
                "Analyst responded"
            ),
            AnalystResult::ApiError(err) => warn!(
                status = err.status_code,
                error_code = err.error_code.as_deref().unwrap_or("-"),
                request_id = err.request_id.as_deref().unwrap_or("-"),
                "Analyst rejected request"
            ),
            AnalystResult::TransportError(err) => {
                warn!(cause = %err.cause, "Analyst response was unusable")
            }
        }
        result
    }

    /// Posts a rating for an earlier answer
    pub async fn post_feedback(&self, request: &FeedbackRequest) -> Result<(), FeedbackError> {
        let (status, body) = self.post_json(FEEDBACK_ENDPOINT, request).await?;

        if status.as_u16() >= 400 {
            let err = api_error(status, &body);
            warn!(
                status = err.status_code,
                error_code = err.error_code.as_deref().unwrap_or("-"),
                "Feedback rejected"
            );
            return Err(FeedbackError::Api(err));
        }

        info!(request_id = %request.request_id, positive = request.positive, "Feedback recorded");
        Ok(())
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &T,
    ) -> Result<(StatusCode, String), TransportError> {
        let authorization = self.authorization()?;

        let response = self
            .client
            .post(self.url(endpoint))
            .header(AUTHORIZATION, authorization)
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        Ok((status, text))
    }
}

/// Classifies a status code and raw body into an `AnalystResult`.
///
/// Below 400 the body must parse as a response, otherwise the exchange is
/// treated as a transport failure. From 400 up the status wins even when the
/// body is not JSON.
pub fn classify_response(status: StatusCode, body: &str) -> AnalystResult {
    if status.as_u16() >= 400 {
        return AnalystResult::ApiError(api_error(status, body));
    }

    match serde_json::from_str::<AnalystResponse>(body) {
        Ok(response) => AnalystResult::Success(response.into_reply()),
        Err(e) => AnalystResult::TransportError(TransportError::new(format!(
            "Failed to parse response: {}",
            e
        ))),
    }
}

fn api_error(status: StatusCode, body: &str) -> ApiError {
    let parsed = serde_json::from_str::<ApiErrorBody>(body);
    let fallback_message = || {
        let raw = body.trim();
        if !raw.is_empty() && parsed.is_err() {
            raw.to_string()
        } else {
            status
                .canonical_reason()
                .unwrap_or("no message provided")
                .to_string()
        }
    };

    let ApiErrorBody {
        error_code,
        request_id,
        message,
    } = parsed.as_ref().cloned().unwrap_or_default();

    ApiError {
        status_code: status.as_u16(),
        error_code,
        request_id,
        message: message.unwrap_or_else(fallback_message),
    }
}
