//! Conversation state for one chat.
//!
//! A `Session` owns the ordered turn log and the ephemeral UI state around
//! it, and enforces the request cycle `Idle -> AwaitingResponse -> Idle`.
//! Operations that are not legal in the current state return a
//! `SessionError` and leave the session untouched.

use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use crate::errors::SessionError;
use crate::semantic_model::SemanticModelRef;
use crate::types::{AnalystResult, ConversationTurn, Role};

/// Where the session is in the request cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingResponse,
}

/// What `receive_result` folded into the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// An assistant turn was appended at this index
    Answered(usize),
    /// The call failed; this warning was appended instead
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    semantic_model: SemanticModelRef,
    state: SessionState,
    turns: Vec<ConversationTurn>,
    active_suggestion: Option<String>,
    warnings: Vec<String>,
    form_submitted: HashMap<usize, bool>,
}

impl Session {
    pub fn new(semantic_model: SemanticModelRef) -> Self {
        Self {
            id: Uuid::new_v4(),
            semantic_model,
            state: SessionState::Idle,
            turns: Vec::new(),
            active_suggestion: None,
            warnings: Vec::new(),
            form_submitted: HashMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn semantic_model(&self) -> &SemanticModelRef {
        &self.semantic_model
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn active_suggestion(&self) -> Option<&str> {
        self.active_suggestion.as_deref()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn form_submitted(&self) -> &HashMap<usize, bool> {
        &self.form_submitted
    }

    pub fn is_feedback_submitted(&self, turn_index: usize) -> bool {
        self.form_submitted.get(&turn_index).copied().unwrap_or(false)
    }

    /// Index of the turn the service tagged with `request_id`
    pub fn turn_index_for_request(&self, request_id: &str) -> Option<usize> {
        self.turns
            .iter()
            .position(|turn| turn.request_id.as_deref() == Some(request_id))
    }

    /// The most recent assistant turn, with its index
    pub fn last_assistant_turn(&self) -> Option<(usize, &ConversationTurn)> {
        self.turns
            .iter()
            .enumerate()
            .rev()
            .find(|(_, turn)| turn.role == Role::Assistant)
    }

    /// Follow-up questions offered by the latest answer
    pub fn last_suggestions(&self) -> Vec<&str> {
        self.last_assistant_turn()
            .map(|(_, turn)| turn.suggestions())
            .unwrap_or_default()
    }

    /// Appends a user turn and starts a request. Consumes any active suggestion.
    pub fn submit_user_message(&mut self, text: impl Into<String>) -> Result<usize, SessionError> {
        if self.state == SessionState::AwaitingResponse {
            return Err(SessionError::RequestInFlight);
        }
        let text = text.into();
        if text.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }

        self.active_suggestion = None;
        self.turns.push(ConversationTurn::user(text));
        self.state = SessionState::AwaitingResponse;
        debug!(session = %self.id, turns = self.turns.len(), "User message submitted");
        Ok(self.turns.len() - 1)
    }

    /// Submits the active suggestion as the user's message
    pub fn submit_active_suggestion(&mut self) -> Result<usize, SessionError> {
        if self.state == SessionState::AwaitingResponse {
            return Err(SessionError::RequestInFlight);
        }
        let suggestion = self
            .active_suggestion
            .clone()
            .ok_or(SessionError::NoActiveSuggestion)?;
        self.submit_user_message(suggestion)
    }

    /// Folds the outcome of the in-flight request back in and returns to `Idle`.
    ///
    /// A failure appends exactly one warning and no turn.
    pub fn receive_result(&mut self, result: AnalystResult) -> Result<Outcome, SessionError> {
        if self.state != SessionState::AwaitingResponse {
            return Err(SessionError::NotAwaitingResponse);
        }
        self.state = SessionState::Idle;

        let outcome = match result {
            AnalystResult::Success(reply) => {
                self.warnings.extend(reply.warnings);
                self.turns
                    .push(ConversationTurn::assistant(reply.content, reply.request_id));
                Outcome::Answered(self.turns.len() - 1)
            }
            AnalystResult::ApiError(err) => self.push_warning(err.to_string()),
            AnalystResult::TransportError(err) => self.push_warning(err.to_string()),
        };
        debug!(session = %self.id, ?outcome, "Result received");
        Ok(outcome)
    }

    fn push_warning(&mut self, warning: String) -> Outcome {
        self.warnings.push(warning.clone());
        Outcome::Failed(warning)
    }

    /// Adds a warning outside the request cycle, e.g. a failed feedback post
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Prefills the next message with a suggested question
    pub fn select_suggestion(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        if self.state == SessionState::AwaitingResponse {
            return Err(SessionError::RequestInFlight);
        }
        let text = text.into();
        if text.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        self.active_suggestion = Some(text);
        Ok(())
    }

    /// Records that the feedback form for a turn has been submitted
    pub fn mark_feedback_submitted(&mut self, turn_index: usize) -> Result<(), SessionError> {
        match self.turns.get(turn_index) {
            Some(turn) if turn.request_id.is_some() => {
                self.form_submitted.insert(turn_index, true);
                Ok(())
            }
            Some(_) | None => Err(SessionError::UnknownRequestId(format!(
                "turn {}",
                turn_index
            ))),
        }
    }

    /// Empties the conversation and returns to `Idle`, whatever the state
    pub fn clear_history(&mut self) {
        self.state = SessionState::Idle;
        self.turns.clear();
        self.active_suggestion = None;
        self.warnings.clear();
        self.form_submitted.clear();
        debug!(session = %self.id, "History cleared");
    }

    /// Switches the semantic model. A different model resets the conversation.
    ///
    /// Returns whether the model changed.
    pub fn select_semantic_model(&mut self, semantic_model: SemanticModelRef) -> bool {
        if semantic_model == self.semantic_model {
            return false;
        }
        self.semantic_model = semantic_model;
        self.clear_history();
        true
    }
}
