//! Lifecycle callbacks for streamed completions

use std::sync::Arc;

use conduit_core::ProviderError;

use crate::types::Completion;

/// Hooks invoked while a chat stream runs
///
/// `on_start` fires once before the first delta. Exactly one of
/// `on_finish`, `on_error` or `on_abort` fires at the end.
pub trait StreamCallbacks: Send + Sync {
    fn on_start(&self) {}

    /// Called for every visible text delta
    fn on_text(&self, _text: &str) {}

    fn on_finish(&self, _completion: &Completion) {}

    fn on_error(&self, _error: &ProviderError) {}

    /// Called when the caller cancels, distinct from `on_error`
    fn on_abort(&self) {}
}

/// Enforces the once-only contract of [`StreamCallbacks`]
#[derive(Default)]
pub struct Lifecycle {
    callbacks: Option<Arc<dyn StreamCallbacks>>,
    started: bool,
    terminated: bool,
}

impl Lifecycle {
    pub fn new(callbacks: Option<Arc<dyn StreamCallbacks>>) -> Self {
        Self {
            callbacks,
            started: false,
            terminated: false,
        }
    }

    pub fn start(&mut self) {
        if self.started || self.terminated {
            return;
        }
        self.started = true;
        if let Some(callbacks) = &self.callbacks {
            callbacks.on_start();
        }
    }

    pub fn text(&self, text: &str) {
        if let Some(callbacks) = &self.callbacks {
            callbacks.on_text(text);
        }
    }

    pub fn finish(&mut self, completion: &Completion) {
        if let Some(callbacks) = self.terminate() {
            callbacks.on_finish(completion);
        }
    }

    pub fn error(&mut self, error: &ProviderError) {
        if let Some(callbacks) = self.terminate() {
            callbacks.on_error(error);
        }
    }

    pub fn abort(&mut self) {
        if let Some(callbacks) = self.terminate() {
            callbacks.on_abort();
        }
    }

    /// Mark terminal state; yields the callbacks only the first time
    fn terminate(&mut self) -> Option<&Arc<dyn StreamCallbacks>> {
        if std::mem::replace(&mut self.terminated, true) {
            return None;
        }
        self.callbacks.as_ref()
    }
}

impl Drop for Lifecycle {
    // A stream dropped mid-flight was abandoned by its consumer
    fn drop(&mut self) {
        if self.started && !self.terminated {
            tracing::debug!("stream dropped before completion");
            self.abort();
        }
    }
}
