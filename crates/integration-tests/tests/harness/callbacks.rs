//! Callback recorder shared by chat tests

use std::sync::Mutex;

use conduit_runtime::stream::StreamCallbacks;
use conduit_runtime::{Completion, ProviderError};

/// Records every lifecycle hook in call order
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<String>>,
    completion: Mutex<Option<Completion>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn completion(&self) -> Option<Completion> {
        self.completion.lock().unwrap().clone()
    }

    /// Number of terminal hooks fired
    pub fn terminal_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| e.starts_with("finish") || e.starts_with("error") || *e == "abort")
            .count()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl StreamCallbacks for Recorder {
    fn on_start(&self) {
        self.push("start".to_owned());
    }

    fn on_text(&self, text: &str) {
        self.push(format!("text:{text}"));
    }

    fn on_finish(&self, completion: &Completion) {
        *self.completion.lock().unwrap() = Some(completion.clone());
        self.push("finish".to_owned());
    }

    fn on_error(&self, error: &ProviderError) {
        self.push(format!("error:{:?}", error.kind()));
    }

    fn on_abort(&self) {
        self.push("abort".to_owned());
    }
}
