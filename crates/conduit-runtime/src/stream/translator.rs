//! Conversion of decoded frames into canonical chunks

use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

use crate::protocol::bedrock::{FrameUsage, StreamFrame};
use crate::types::chunk::CHUNK_OBJECT;
use crate::types::{CanonicalChunk, ChunkChoice, ChunkDelta, Completion, FinishReason, Usage};

/// Per-stream chunk builder
///
/// Every chunk shares one synthetic ID and echoes the requested model.
#[derive(Debug)]
pub struct StreamTranslator {
    id: String,
    model: String,
    created: u64,
    text: String,
    finish_reason: Option<FinishReason>,
    usage: Option<Usage>,
}

impl StreamTranslator {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            id: format!("chatcmpl-{}", Uuid::new_v4().simple()),
            model: model.into(),
            created: 0,
            text: String::new(),
            finish_reason: None,
            usage: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Absorb a frame, returning a chunk only for visible text
    pub fn accept(&mut self, frame: &StreamFrame) -> Option<CanonicalChunk> {
        if let Some(reason) = &frame.stop_reason {
            self.finish_reason = Some(map_stop_reason(reason));
        }
        if let Some(usage) = frame.usage {
            self.usage = Some(usage.into());
        }

        let text = frame.text()?;
        self.text.push_str(text);

        Some(self.chunk(Some(text.to_owned()), None))
    }

    /// Build the terminal chunk and the completion summary
    pub fn finish(&mut self) -> (CanonicalChunk, Completion) {
        let finish_reason = self.finish_reason.unwrap_or(FinishReason::Stop);
        let chunk = self.chunk(None, Some(finish_reason));

        let completion = Completion {
            text: std::mem::take(&mut self.text),
            finish_reason,
            usage: self.usage,
        };

        (chunk, completion)
    }

    fn chunk(&mut self, content: Option<String>, finish_reason: Option<FinishReason>) -> CanonicalChunk {
        self.created = self.created.max(unix_now());

        CanonicalChunk {
            id: self.id.clone(),
            object: CHUNK_OBJECT.to_owned(),
            created: self.created,
            model: self.model.clone(),
            choices: vec![ChunkChoice {
                index: 0,
                delta: ChunkDelta { content },
                finish_reason,
            }],
        }
    }
}

/// Map a Converse stop reason onto the canonical finish reason
pub fn map_stop_reason(reason: &str) -> FinishReason {
    match reason {
        "max_tokens" => FinishReason::Length,
        "tool_use" => FinishReason::ToolCalls,
        "content_filtered" | "guardrail_intervened" => FinishReason::ContentFilter,
        _ => FinishReason::Stop,
    }
}

impl From<FrameUsage> for Usage {
    fn from(usage: FrameUsage) -> Self {
        Self {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_frame(text: &str) -> StreamFrame {
        serde_json::from_value(serde_json::json!({"delta": {"text": text}})).unwrap()
    }

    #[test]
    fn chunks_share_id_and_model() {
        let mut translator = StreamTranslator::new("us.amazon.nova-pro-v1:0");

        let first = translator.accept(&text_frame("Hel")).unwrap();
        let second = translator.accept(&text_frame("lo")).unwrap();
        let (last, completion) = translator.finish();

        assert!(first.id.starts_with("chatcmpl-"));
        assert_eq!(first.id, second.id);
        assert_eq!(first.id, last.id);
        assert_eq!(first.model, "us.amazon.nova-pro-v1:0");
        assert_eq!(first.object, "chat.completion.chunk");
        assert!(first.created <= second.created && second.created <= last.created);

        assert_eq!(first.content(), Some("Hel"));
        assert_eq!(first.finish_reason(), None);
        assert_eq!(last.content(), None);
        assert_eq!(last.finish_reason(), Some(FinishReason::Stop));
        assert_eq!(completion.text, "Hello");
    }

    #[test]
    fn whitespace_frames_produce_no_chunk() {
        let mut translator = StreamTranslator::new("m");
        assert!(translator.accept(&text_frame(" \t ")).is_none());
        assert!(translator.accept(&StreamFrame::default()).is_none());
    }

    #[test]
    fn stop_reason_and_usage_recorded() {
        let mut translator = StreamTranslator::new("m");
        let stop: StreamFrame = serde_json::from_str(r#"{"stopReason":"max_tokens"}"#).unwrap();
        let meta: StreamFrame =
            serde_json::from_str(r#"{"usage":{"inputTokens":3,"outputTokens":4,"totalTokens":7}}"#).unwrap();

        assert!(translator.accept(&stop).is_none());
        assert!(translator.accept(&meta).is_none());

        let (chunk, completion) = translator.finish();
        assert_eq!(chunk.finish_reason(), Some(FinishReason::Length));
        assert_eq!(completion.usage.unwrap().total_tokens, 7);
    }

    #[test]
    fn stop_reason_mapping() {
        assert_eq!(map_stop_reason("end_turn"), FinishReason::Stop);
        assert_eq!(map_stop_reason("stop_sequence"), FinishReason::Stop);
        assert_eq!(map_stop_reason("tool_use"), FinishReason::ToolCalls);
        assert_eq!(map_stop_reason("guardrail_intervened"), FinishReason::ContentFilter);
        assert_eq!(map_stop_reason("something_new"), FinishReason::Stop);
    }

    #[test]
    fn serializes_openai_chunk_shape() {
        let mut translator = StreamTranslator::new("m");
        let chunk = translator.accept(&text_frame("Hi")).unwrap();
        let json = serde_json::to_value(&chunk).unwrap();

        assert_eq!(json["object"], "chat.completion.chunk");
        assert_eq!(json["choices"][0]["index"], 0);
        assert_eq!(json["choices"][0]["delta"]["content"], "Hi");
        assert!(json["choices"][0]["finish_reason"].is_null());
    }
}
