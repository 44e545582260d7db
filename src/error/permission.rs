//! Permission errors and the process-wide channel they are published on.
//!
//! A permission error means the database refused a write that the caller was
//! not allowed to make (e.g. a second vote at an existing vote key). These are
//! collected for developers; they are not retried or otherwise recovered.

use std::collections::VecDeque;
use std::fmt::{Display, Formatter};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rocket::{serde::json::Value, tokio::sync::broadcast};
use serde::{Deserialize, Serialize};

/// How many errors `ErrorEmitter::recent` remembers.
pub const RECENT_ERRORS_CAPACITY: usize = 50;

/// The kind of access that was refused. Votes are insert-only, so creation
/// is the only access that can be refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
        }
    }
}

/// A refused database access, with enough context to reproduce it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionError {
    /// Document path, `collection/key`.
    pub path: String,
    pub operation: Operation,
    /// The data that the refused write carried, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_resource_data: Option<Value>,
    pub occurred_at: DateTime<Utc>,
}

impl PermissionError {
    pub fn new(path: impl Into<String>, operation: Operation, data: Option<Value>) -> Self {
        Self {
            path: path.into(),
            operation,
            request_resource_data: data,
            occurred_at: Utc::now(),
        }
    }

    /// What API clients are told.
    pub fn public_message(&self) -> String {
        match self.operation {
            Operation::Create if self.path.starts_with("votes/") => {
                "A vote has already been cast for this group.".to_string()
            }
            operation => format!("Missing or insufficient permissions to {operation} {}", self.path),
        }
    }
}

impl Display for PermissionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} refused on {}", self.operation, self.path)
    }
}

/// Publishes permission errors to any subscribers and keeps the most recent
/// ones for the developer error overlay.
pub struct ErrorEmitter {
    sender: broadcast::Sender<PermissionError>,
    recent: Mutex<VecDeque<PermissionError>>,
}

impl ErrorEmitter {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(RECENT_ERRORS_CAPACITY);
        Self {
            sender,
            recent: Mutex::new(VecDeque::with_capacity(RECENT_ERRORS_CAPACITY)),
        }
    }

    /// Publish an error. Never fails: with no subscribers the error is only
    /// logged and remembered.
    pub fn emit(&self, error: PermissionError) {
        warn!("Permission error: {error}");
        {
            let mut recent = self.recent.lock().unwrap_or_else(|e| e.into_inner());
            if recent.len() == RECENT_ERRORS_CAPACITY {
                recent.pop_front();
            }
            recent.push_back(error.clone());
        }
        let _ = self.sender.send(error);
    }

    /// Listen for errors emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<PermissionError> {
        self.sender.subscribe()
    }

    /// The most recent errors, oldest first.
    pub fn recent(&self) -> Vec<PermissionError> {
        self.recent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }
}

impl Default for ErrorEmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use rocket::serde::json::{json, serde_json};

    use super::*;

    #[test]
    fn emitter_keeps_bounded_history() {
        let emitter = ErrorEmitter::new();
        for i in 0..RECENT_ERRORS_CAPACITY + 5 {
            emitter.emit(PermissionError::new(
                format!("votes/{i}"),
                Operation::Create,
                None,
            ));
        }
        let recent = emitter.recent();
        assert_eq!(recent.len(), RECENT_ERRORS_CAPACITY);
        assert_eq!(recent[0].path, "votes/5");
        assert_eq!(
            recent.last().unwrap().path,
            format!("votes/{}", RECENT_ERRORS_CAPACITY + 4)
        );
    }

    #[test]
    fn subscribers_receive_errors() {
        let emitter = ErrorEmitter::new();
        let mut receiver = emitter.subscribe();
        let error = PermissionError::new(
            "votes/1_2",
            Operation::Create,
            Some(json!({"candidateId": "abc"})),
        );
        emitter.emit(error.clone());
        assert_eq!(receiver.try_recv().unwrap(), error);
    }

    #[test]
    fn public_messages() {
        let vote = PermissionError::new("votes/1_2", Operation::Create, None);
        assert_eq!(
            vote.public_message(),
            "A vote has already been cast for this group."
        );
        let other = PermissionError::new("admins/alice", Operation::Create, None);
        assert_eq!(
            other.public_message(),
            "Missing or insufficient permissions to create admins/alice"
        );
        assert_eq!(
            serde_json::to_value(&vote).unwrap()["operation"],
            json!("create")
        );
    }
}
