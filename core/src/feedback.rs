use tracing::debug;

use crate::client::AnalystClient;
use crate::errors::FeedbackError;
use crate::session::{Session, SessionState};
use crate::types::FeedbackRequest;

/// Sends ratings for earlier answers and records which feedback forms are done
#[derive(Debug, Clone)]
pub struct FeedbackSubmitter {
    client: AnalystClient,
}

impl FeedbackSubmitter {
    pub fn new(client: AnalystClient) -> Self {
        Self { client }
    }

    /// Rates the answer tagged `request_id` and returns its turn index.
    ///
    /// A request id that no turn in `session` carries is rejected before
    /// anything is sent. On failure the session is left as it was.
    pub async fn submit(
        &self,
        session: &mut Session,
        request_id: &str,
        positive: bool,
        comment: Option<String>,
    ) -> Result<usize, FeedbackError> {
        if session.state() == SessionState::AwaitingResponse {
            return Err(FeedbackError::RequestInFlight);
        }
        let turn_index = session
            .turn_index_for_request(request_id)
            .ok_or_else(|| FeedbackError::UnknownRequest(request_id.to_string()))?;

        let request = FeedbackRequest {
            request_id: request_id.to_string(),
            positive,
            feedback_message: comment.filter(|c| !c.trim().is_empty()),
        };
        debug!(request_id, turn_index, positive, "Submitting feedback");
        self.client.post_feedback(&request).await?;

        // The index came from this session, so the turn exists and is tagged
        if session.mark_feedback_submitted(turn_index).is_err() {
            return Err(FeedbackError::UnknownRequest(request_id.to_string()));
        }
        Ok(turn_index)
    }
}
