//! The diagnostic message seam.
//!
//! Every recoverable condition in the framework is reported through a single
//! [`MessageSink::message`] call carrying a severity, free text and a static
//! source tag.  The framework never writes to stdout or files itself.
//!
//! | Sink            | Behaviour                                              |
//! |-----------------|--------------------------------------------------------|
//! | [`TracingSink`] | Forwards to `tracing` (default).                       |
//! | [`MemorySink`]  | Records messages in memory; used by tests.             |

use std::fmt;
use std::sync::{Mutex, PoisonError};

use tracing::{debug, error, info, warn};

// ── Severity ──────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    Info,
    /// Dropped by [`TracingSink`] when `debug_assertions` are off.
    Debug,
    Warning,
    /// A recoverable failure: the operation was skipped, the run goes on.
    CannotProcess,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info          => "info",
            Severity::Debug         => "debug",
            Severity::Warning       => "warning",
            Severity::CannotProcess => "cannot process",
            Severity::Fatal         => "fatal",
        };
        f.write_str(s)
    }
}

// ── MessageSink ───────────────────────────────────────────────────────────────

/// Receiver of framework diagnostics.
///
/// Implementations must be `Send + Sync`: thread agent groups report through
/// the same sink from rayon workers.
pub trait MessageSink: Send + Sync {
    fn message(&self, severity: Severity, text: &str, source: &'static str);
}

// ── TracingSink ───────────────────────────────────────────────────────────────

/// Forwards every message to the matching `tracing` macro.
#[derive(Copy, Clone, Debug, Default)]
pub struct TracingSink;

impl MessageSink for TracingSink {
    fn message(&self, severity: Severity, text: &str, source: &'static str) {
        match severity {
            Severity::Info => info!(source, "{text}"),
            Severity::Debug => {
                if cfg!(debug_assertions) {
                    debug!(source, "{text}");
                }
            }
            Severity::Warning => warn!(source, "{text}"),
            Severity::CannotProcess => warn!(source, cannot_process = true, "{text}"),
            Severity::Fatal => error!(source, "{text}"),
        }
    }
}

// ── MemorySink ────────────────────────────────────────────────────────────────

/// One recorded message.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub severity: Severity,
    pub text:     String,
    pub source:   &'static str,
}

/// Keeps every message in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<Message>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of recorded messages with the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|m| m.severity == severity)
            .count()
    }

    pub fn clear(&self) {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl MessageSink for MemorySink {
    fn message(&self, severity: Severity, text: &str, source: &'static str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Message { severity, text: text.to_owned(), source });
    }
}
