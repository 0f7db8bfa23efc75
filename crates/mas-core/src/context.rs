//! Per-run shared services.

use std::sync::Arc;

use crate::{IdRegistry, MessageSink, Severity, SharedIds, TracingSink};

/// Services shared by every component of one simulation run: the identifier
/// registry and the message sink.
///
/// Cloning is cheap and yields a handle onto the same services, so several
/// independent runs can live in one process, each with its own context.
#[derive(Clone)]
pub struct MasContext {
    ids:  SharedIds,
    sink: Arc<dyn MessageSink>,
}

impl MasContext {
    /// Fresh registry, messages forwarded to `tracing`.
    pub fn new() -> Self {
        Self::with_sink(Arc::new(TracingSink))
    }

    pub fn with_sink(sink: Arc<dyn MessageSink>) -> Self {
        Self { ids: SharedIds::new(IdRegistry::new()), sink }
    }

    /// Replace the identifier registry, keeping the sink.
    pub fn with_registry(mut self, registry: IdRegistry) -> Self {
        self.ids = SharedIds::new(registry);
        self
    }

    #[inline]
    pub fn ids(&self) -> &SharedIds {
        &self.ids
    }

    #[inline]
    pub fn sink(&self) -> &dyn MessageSink {
        self.sink.as_ref()
    }

    /// Shorthand for `self.sink().message(..)`.
    #[inline]
    pub fn message(&self, severity: Severity, text: &str, source: &'static str) {
        self.sink.message(severity, text, source);
    }
}

impl Default for MasContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MasContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasContext").field("ids", &self.ids).finish_non_exhaustive()
    }
}
