// Cortex Analyst client functionality:
// - API client for the analyst and feedback endpoints
// - Request/response data structures
// - Conversation session state machine and command dispatch
// - Configuration loading and credentials
// - Shared error types

// Export client module - API client for Cortex Analyst
pub mod client;
pub use client::*;

// Export types module - Request/response data structures
pub mod types;
pub use types::*;

// Export config module - Configuration loading
pub mod config;
pub use config::*;

// Export errors module - Shared error types
pub mod errors;
pub use errors::*;

pub mod credentials;
pub use credentials::{CredentialProvider, StaticCredentials, TokenFileCredentials};

pub mod semantic_model;
pub use semantic_model::{SemanticModelRef, SemanticModelRegistry};

pub mod session;
pub use session::{Outcome, Session, SessionState};

pub mod feedback;
pub use feedback::FeedbackSubmitter;

pub mod dispatch;
pub use dispatch::{Command, Dispatcher, Render};

#[cfg(test)]
pub(crate) mod test_support;
