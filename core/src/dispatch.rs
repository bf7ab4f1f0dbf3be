//! Command dispatch: each user action becomes a `Command`, is applied to a
//! `Session`, and yields a `Render` telling the front end what to draw.

use tracing::info;

use crate::client::AnalystClient;
use crate::errors::{FeedbackError, SessionError, TransportError};
use crate::feedback::FeedbackSubmitter;
use crate::semantic_model::{SemanticModelRef, SemanticModelRegistry};
use crate::session::{Outcome, Session};
use crate::types::AnalystResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Ask a question
    Submit(String),
    /// Ask the currently selected suggestion
    SubmitSuggestion,
    SelectSuggestion(String),
    SubmitFeedback {
        request_id: String,
        positive: bool,
        comment: Option<String>,
    },
    ClearHistory,
    /// Switch semantic model by path or display name
    SelectSemanticModel(String),
}

/// What the front end should draw after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Render {
    /// The assistant turn at this index is new
    AssistantTurn(usize),
    /// A warning was appended to the session
    Warning(String),
    SuggestionSelected(String),
    /// Feedback for the turn at this index went through
    FeedbackRecorded(usize),
    Cleared,
    /// `changed` is false when the model was already selected
    ModelSelected {
        model: SemanticModelRef,
        changed: bool,
    },
}

/// Applies commands to sessions using one shared client
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: AnalystClient,
    feedback: FeedbackSubmitter,
    registry: SemanticModelRegistry,
}

impl Dispatcher {
    pub fn new(client: AnalystClient, registry: SemanticModelRegistry) -> Self {
        Self {
            feedback: FeedbackSubmitter::new(client.clone()),
            client,
            registry,
        }
    }

    pub fn registry(&self) -> &SemanticModelRegistry {
        &self.registry
    }

    /// A fresh session on the registry's default model
    pub fn new_session(&self) -> Session {
        Session::new(self.registry.default_model().clone())
    }

    /// Applies `command` to `session`.
    ///
    /// Usage errors come back as `Err` with the session unchanged. Failures
    /// of the remote service are not errors here: they are recorded as
    /// session warnings and rendered as `Render::Warning`.
    pub async fn dispatch(
        &self,
        session: &mut Session,
        command: Command,
    ) -> Result<Render, SessionError> {
        match command {
            Command::Submit(text) => {
                session.submit_user_message(text)?;
                self.round_trip(session).await
            }
            Command::SubmitSuggestion => {
                session.submit_active_suggestion()?;
                self.round_trip(session).await
            }
            Command::SelectSuggestion(text) => {
                session.select_suggestion(text.clone())?;
                Ok(Render::SuggestionSelected(text))
            }
            Command::SubmitFeedback {
                request_id,
                positive,
                comment,
            } => {
                match self
                    .feedback
                    .submit(session, &request_id, positive, comment)
                    .await
                {
                    Ok(turn_index) => Ok(Render::FeedbackRecorded(turn_index)),
                    Err(FeedbackError::UnknownRequest(id)) => {
                        Err(SessionError::UnknownRequestId(id))
                    }
                    Err(FeedbackError::RequestInFlight) => Err(SessionError::RequestInFlight),
                    Err(err) => {
                        let warning = format!("Feedback was not recorded: {}", err);
                        session.add_warning(warning.clone());
                        Ok(Render::Warning(warning))
                    }
                }
            }
            Command::ClearHistory => {
                session.clear_history();
                Ok(Render::Cleared)
            }
            Command::SelectSemanticModel(name) => {
                let model = self.registry.resolve(&name)?.clone();
                let changed = session.select_semantic_model(model.clone());
                if changed {
                    info!(session = %session.id(), model = %model, "Semantic model changed");
                }
                Ok(Render::ModelSelected { model, changed })
            }
        }
    }

    async fn round_trip(&self, session: &mut Session) -> Result<Render, SessionError> {
        let semantic_model = session.semantic_model().clone();
        // The user turn was just appended, so the log is never empty here
        let result = self
            .client
            .send(session, &semantic_model)
            .await
            .unwrap_or_else(|| AnalystResult::TransportError(TransportError::new("nothing to send")));

        match session.receive_result(result)? {
            Outcome::Answered(index) => Ok(Render::AssistantTurn(index)),
            Outcome::Failed(warning) => Ok(Render::Warning(warning)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionState;
    use crate::test_support::{mock_client, MockServer, Reply};
    use crate::types::Role;
    use serde_json::json;
    use std::time::Duration;

    fn dispatcher(server: &MockServer, timeout: Duration) -> Dispatcher {
        let registry = SemanticModelRegistry::from_paths(&[
            "CORTEX_ANALYST_DEMO.REVENUE_TIMESERIES.RAW_DATA/revenue_timeseries.yaml",
            "CORTEX_ANALYST_DEMO.REVENUE_TIMESERIES.RAW_DATA/orders.yaml",
        ])
        .unwrap();
        Dispatcher::new(mock_client(server, timeout), registry)
    }

    #[tokio::test]
    async fn successful_question_appends_two_turns() {
        let server = MockServer::start(vec![Reply::json(
            200,
            json!({"request_id": "abc123", "content": [{"type": "text", "text": "Q1 revenue was $1.2M"}]}),
        )])
        .await;
        let dispatcher = dispatcher(&server, Duration::from_secs(5));
        let mut session = dispatcher.new_session();

        let render = dispatcher
            .dispatch(&mut session, Command::Submit("What was Q1 revenue?".to_string()))
            .await
            .unwrap();

        assert_eq!(render, Render::AssistantTurn(1));
        assert_eq!(session.turns().len(), 2);
        assert_eq!(session.turns()[1].request_id.as_deref(), Some("abc123"));
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(
            server.requests()[0].body["semantic_model_file"],
            "@CORTEX_ANALYST_DEMO.REVENUE_TIMESERIES.RAW_DATA/revenue_timeseries.yaml"
        );
    }

    #[tokio::test]
    async fn api_error_becomes_a_warning() {
        let server = MockServer::start(vec![Reply::json(
            400,
            json!({"error_code": "INVALID_MODEL", "request_id": "xyz"}),
        )])
        .await;
        let dispatcher = dispatcher(&server, Duration::from_secs(5));
        let mut session = dispatcher.new_session();

        let render = dispatcher
            .dispatch(&mut session, Command::Submit("Revenue?".to_string()))
            .await
            .unwrap();

        assert!(matches!(render, Render::Warning(ref w) if w.contains("INVALID_MODEL")));
        assert_eq!(session.turns().len(), 1);
        assert_eq!(session.warnings().len(), 1);
        assert!(session.warnings()[0].contains("INVALID_MODEL"));
    }

    #[tokio::test]
    async fn timeout_becomes_a_warning_without_assistant_turn() {
        let server = MockServer::start(vec![Reply::delayed(
            Duration::from_secs(3),
            json!({"request_id": "late", "content": [{"type": "text", "text": "too late"}]}),
        )])
        .await;
        let dispatcher = dispatcher(&server, Duration::from_millis(200));
        let mut session = dispatcher.new_session();

        let render = dispatcher
            .dispatch(&mut session, Command::Submit("Slow?".to_string()))
            .await
            .unwrap();

        assert!(matches!(render, Render::Warning(_)));
        assert_eq!(session.turns().len(), 1);
        assert_eq!(session.turns()[0].role, Role::User);
        assert_eq!(session.warnings().len(), 1);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn history_is_resent_in_order() {
        let server = MockServer::start(vec![
            Reply::json(
                200,
                json!({
                    "request_id": "r1",
                    "message": {"role": "analyst", "content": [
                        {"type": "text", "text": "Revenue by quarter"},
                        {"type": "suggestions", "suggestions": ["What about Q2?"]}
                    ]}
                }),
            ),
            Reply::json(
                200,
                json!({"request_id": "r2", "content": [{"type": "sql", "statement": "SELECT 2"}]}),
            ),
        ])
        .await;
        let dispatcher = dispatcher(&server, Duration::from_secs(5));
        let mut session = dispatcher.new_session();

        dispatcher
            .dispatch(&mut session, Command::Submit("Revenue?".to_string()))
            .await
            .unwrap();
        let render = dispatcher
            .dispatch(&mut session, Command::SelectSuggestion("What about Q2?".to_string()))
            .await
            .unwrap();
        assert_eq!(render, Render::SuggestionSelected("What about Q2?".to_string()));
        dispatcher
            .dispatch(&mut session, Command::SubmitSuggestion)
            .await
            .unwrap();

        assert_eq!(session.turns().len(), 4);
        let second = &server.requests()[1].body["messages"];
        assert_eq!(second.as_array().unwrap().len(), 3);
        assert_eq!(second[1]["role"], "analyst");
        assert_eq!(second[1]["content"][1]["suggestions"][0], "What about Q2?");
        assert_eq!(second[2]["content"][0]["text"], "What about Q2?");
    }

    #[tokio::test]
    async fn unknown_feedback_request_is_a_usage_error() {
        let server = MockServer::start(vec![]).await;
        let dispatcher = dispatcher(&server, Duration::from_secs(5));
        let mut session = dispatcher.new_session();

        let result = dispatcher
            .dispatch(
                &mut session,
                Command::SubmitFeedback {
                    request_id: "ghost".to_string(),
                    positive: true,
                    comment: None,
                },
            )
            .await;
        assert_eq!(result, Err(SessionError::UnknownRequestId("ghost".to_string())));
        assert!(server.requests().is_empty());
    }

    #[tokio::test]
    async fn feedback_round_trip_and_failure_warning() {
        let server = MockServer::start(vec![
            Reply::json(200, json!({"request_id": "abc123", "content": [{"type": "text", "text": "a"}]})),
            Reply::json(200, json!({})),
            Reply::json(503, json!({"message": "try later"})),
        ])
        .await;
        let dispatcher = dispatcher(&server, Duration::from_secs(5));
        let mut session = dispatcher.new_session();
        dispatcher
            .dispatch(&mut session, Command::Submit("q".to_string()))
            .await
            .unwrap();

        let feedback = Command::SubmitFeedback {
            request_id: "abc123".to_string(),
            positive: true,
            comment: None,
        };
        let render = dispatcher.dispatch(&mut session, feedback.clone()).await.unwrap();
        assert_eq!(render, Render::FeedbackRecorded(1));
        assert!(session.is_feedback_submitted(1));

        let render = dispatcher.dispatch(&mut session, feedback).await.unwrap();
        assert!(matches!(render, Render::Warning(ref w) if w.contains("try later")));
        assert_eq!(session.turns().len(), 2);
    }

    #[tokio::test]
    async fn model_selection_resets_and_validates() {
        let server = MockServer::start(vec![Reply::json(
            200,
            json!({"request_id": "abc", "content": [{"type": "text", "text": "a"}]}),
        )])
        .await;
        let dispatcher = dispatcher(&server, Duration::from_secs(5));
        let mut session = dispatcher.new_session();
        dispatcher
            .dispatch(&mut session, Command::Submit("q".to_string()))
            .await
            .unwrap();

        let render = dispatcher
            .dispatch(&mut session, Command::SelectSemanticModel("orders.yaml".to_string()))
            .await
            .unwrap();
        assert!(matches!(render, Render::ModelSelected { changed: true, ref model } if model.display_name() == "orders.yaml"));
        assert!(session.turns().is_empty());

        let result = dispatcher
            .dispatch(&mut session, Command::SelectSemanticModel("nope.yaml".to_string()))
            .await;
        assert_eq!(
            result,
            Err(SessionError::UnknownSemanticModel("nope.yaml".to_string()))
        );
        assert_eq!(session.semantic_model().display_name(), "orders.yaml");
    }

    #[tokio::test]
    async fn clear_history_command() {
        let server = MockServer::start(vec![Reply::json(400, json!({"error_code": "E"}))]).await;
        let dispatcher = dispatcher(&server, Duration::from_secs(5));
        let mut session = dispatcher.new_session();
        dispatcher
            .dispatch(&mut session, Command::Submit("q".to_string()))
            .await
            .unwrap();

        let render = dispatcher
            .dispatch(&mut session, Command::ClearHistory)
            .await
            .unwrap();
        assert_eq!(render, Render::Cleared);
        assert!(session.turns().is_empty());
        assert!(session.warnings().is_empty());
    }
}
