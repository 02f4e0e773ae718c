//! Per-session conversation history.
//!
//! A bounded FIFO of (question, answer) exchanges per session, rendered as
//! condensed text for the next query's system prompt. History is in-memory
//! only and isolated per session id, so concurrent sessions never share
//! state.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Exchange {
    question: String,
    answer: String,
}

pub struct SessionStore {
    max_history: usize,
    sessions: Mutex<HashMap<String, VecDeque<Exchange>>>,
}

impl SessionStore {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Create a new empty session and return its id.
    pub fn create_session(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.sessions
            .lock()
            .unwrap()
            .insert(id.clone(), VecDeque::new());
        id
    }

    /// Record one completed exchange, evicting the oldest beyond the cap.
    pub fn record(&self, session_id: &str, question: &str, answer: &str) {
        let mut sessions = self.sessions.lock().unwrap();
        let history = sessions.entry(session_id.to_string()).or_default();
        history.push_back(Exchange {
            question: question.to_string(),
            answer: answer.to_string(),
        });
        while history.len() > self.max_history {
            history.pop_front();
        }
    }

    /// Condensed history text for the system prompt, or `None` for a new
    /// or unknown session.
    pub fn history(&self, session_id: &str) -> Option<String> {
        let sessions = self.sessions.lock().unwrap();
        let history = sessions.get(session_id)?;
        if history.is_empty() {
            return None;
        }
        Some(
            history
                .iter()
                .map(|e| format!("User: {}\nAssistant: {}", e.question, e.answer))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }
}
