//! Progress notifications for connected clients.
//!
//! Every socket connection registers a session with the [`ProgressHub`] and
//! receives the events emitted for that session id. Handlers emit through a
//! [`ProgressReporter`] resolved from the `X-SocketIO-SID` request header.
//! Emission never blocks and never fails: when nobody listens, the event is
//! dropped.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

/// Request header that carries the client's socket session id
pub const SESSION_HEADER: &str = "x-socketio-sid";

/// Events pushed to a socket session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SocketEvent {
    /// First message on a new connection
    Connect { sid: String },
    ProcessingStatus { status: String },
    ProcessingProgress { progress: u8, message: String },
    ProcessingComplete { status: String },
    ProcessingError { status: String },
}

impl SocketEvent {
    /// Machine-friendly discriminator, matching the serialized event name
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            SocketEvent::Connect { .. } => "connect",
            SocketEvent::ProcessingStatus { .. } => "processing_status",
            SocketEvent::ProcessingProgress { .. } => "processing_progress",
            SocketEvent::ProcessingComplete { .. } => "processing_complete",
            SocketEvent::ProcessingError { .. } => "processing_error",
        }
    }
}

/// Wire envelope around an event, stamped at emission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(flatten)]
    pub event: SocketEvent,
    pub timestamp: DateTime<Utc>,
}

impl EventEnvelope {
    fn now(event: SocketEvent) -> Self {
        Self {
            event,
            timestamp: Utc::now(),
        }
    }
}

/// Registry of connected socket sessions
#[derive(Clone, Default)]
pub struct ProgressHub {
    sessions: Arc<RwLock<HashMap<String, UnboundedSender<EventEnvelope>>>>,
}

impl ProgressHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session with a fresh id. The `Connect` event is already queued.
    pub fn register(&self) -> (String, UnboundedReceiver<EventEnvelope>) {
        let sid = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(EventEnvelope::now(SocketEvent::Connect { sid: sid.clone() }));
        self.sessions.write().insert(sid.clone(), tx);
        tracing::info!(sid = %sid, "client connected");
        (sid, rx)
    }

    pub fn unregister(&self, sid: &str) {
        if self.sessions.write().remove(sid).is_some() {
            tracing::info!(sid = %sid, "client disconnected");
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Reporter bound to `sid`. Unknown or absent ids yield a silent reporter.
    pub fn reporter(&self, sid: Option<&str>) -> ProgressReporter {
        let sender = sid.and_then(|sid| self.sessions.read().get(sid).cloned());
        ProgressReporter {
            sid: sid.map(str::to_string),
            sender,
        }
    }
}

/// Fire-and-forget emitter for one request
#[derive(Clone, Debug, Default)]
pub struct ProgressReporter {
    sid: Option<String>,
    sender: Option<UnboundedSender<EventEnvelope>>,
}

impl ProgressReporter {
    /// A reporter that drops everything
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn sid(&self) -> Option<&str> {
        self.sid.as_deref()
    }

    pub fn emit(&self, event: SocketEvent) {
        let Some(sender) = &self.sender else {
            return;
        };
        if sender.send(EventEnvelope::now(event)).is_err() {
            tracing::debug!(sid = ?self.sid, "progress listener gone");
        }
    }

    pub fn status(&self, status: impl Into<String>) {
        self.emit(SocketEvent::ProcessingStatus {
            status: status.into(),
        });
    }

    /// Report `done` of `total` steps as a percentage
    pub fn progress(&self, done: usize, total: usize, message: impl Into<String>) {
        self.emit(SocketEvent::ProcessingProgress {
            progress: percent(done, total),
            message: message.into(),
        });
    }

    pub fn complete(&self, status: impl Into<String>) {
        self.emit(SocketEvent::ProcessingComplete {
            status: status.into(),
        });
    }

    pub fn error(&self, status: impl Into<String>) {
        self.emit(SocketEvent::ProcessingError {
            status: status.into(),
        });
    }
}

fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done.min(total) * 100) / total) as u8
}
