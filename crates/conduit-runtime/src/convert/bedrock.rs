//! Conversion from canonical requests to the Bedrock Converse wire format

use std::collections::HashSet;
use std::sync::OnceLock;

use base64::Engine;
use regex::Regex;

use crate::protocol::bedrock::{
    CachePoint, ContentBlock, ConverseMessage, ConverseRequest, ConverseRole, ImageBlock, ImageSource,
    InferenceConfig, ReasoningContentBlock, ReasoningText, SystemBlock, ToolConfig, ToolEntry, ToolInputSchema,
    ToolResultBlock, ToolResultContent, ToolSpec, ToolUseBlock,
};
use crate::types::{ChatRequest, Content, ContentPart, Message, Role, ToolDefinition};

/// Default max tokens when not specified (Converse requires this field)
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Provider-native conversation produced by [`normalize`]
///
/// Owned by a single call; cache annotations are applied to this copy only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    /// System blocks extracted from `system` messages
    pub system: Vec<SystemBlock>,
    /// User/assistant turns
    pub turns: Vec<ConverseMessage>,
}

// -- Message normalization --

/// Convert canonical messages into Converse turns and system blocks
pub fn normalize(messages: &[Message]) -> Conversation {
    let mut normalizer = Normalizer::default();

    for message in messages {
        normalizer.push(message);
    }

    normalizer.finish()
}

#[derive(Default)]
struct Normalizer {
    conversation: Conversation,
    known_tool_ids: HashSet<String>,
    pending_results: Vec<ContentBlock>,
}

impl Normalizer {
    fn push(&mut self, message: &Message) {
        match message.role {
            Role::System => {
                let text = message.content.as_text();
                let text = text.trim();
                if !text.is_empty() {
                    self.conversation.system.push(SystemBlock::Text(text.to_owned()));
                }
            }
            Role::Tool => self.push_tool_result(message),
            Role::User => {
                self.flush_results();
                let blocks = self.user_blocks(&message.content);
                self.push_turn(ConverseRole::User, blocks);
            }
            Role::Unknown => {
                tracing::warn!("message with unknown role treated as user");
                self.flush_results();
                let blocks = self.user_blocks(&message.content);
                self.push_turn(ConverseRole::User, blocks);
            }
            Role::Assistant => {
                self.flush_results();
                let blocks = self.assistant_blocks(message);
                self.push_turn(ConverseRole::Assistant, blocks);
            }
        }
    }

    fn finish(mut self) -> Conversation {
        self.flush_results();
        self.conversation
    }

    fn push_tool_result(&mut self, message: &Message) {
        let text = message.content.as_text();

        match message.tool_call_id.as_deref() {
            Some(id) if self.known_tool_ids.contains(id) => {
                self.pending_results.push(tool_result_block(id, &text));
            }
            id => {
                tracing::warn!(
                    tool_call_id = id.unwrap_or_default(),
                    "tool result without a matching tool call demoted to user text"
                );
                // stays in the pending batch so results remain one user turn
                self.pending_results.extend(text_block(&text));
            }
        }
    }

    /// Emit buffered tool results as one user turn
    fn flush_results(&mut self) {
        if self.pending_results.is_empty() {
            return;
        }
        let blocks = std::mem::take(&mut self.pending_results);
        self.push_turn(ConverseRole::User, blocks);
    }

    fn push_turn(&mut self, role: ConverseRole, content: Vec<ContentBlock>) {
        if content.is_empty() {
            return;
        }
        self.conversation.turns.push(ConverseMessage { role, content });
    }

    fn user_blocks(&self, content: &Content) -> Vec<ContentBlock> {
        let parts = match content {
            Content::Text(text) => return text_block(text).into_iter().collect(),
            Content::Parts(parts) => parts,
        };

        let mut blocks = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                ContentPart::Text { text } => blocks.extend(text_block(text)),
                ContentPart::Image { data } => blocks.extend(image_block(data)),
                ContentPart::ToolResult { tool_call_id, content } => {
                    if self.known_tool_ids.contains(tool_call_id) {
                        blocks.push(tool_result_block(tool_call_id, content));
                    } else {
                        tracing::warn!(
                            tool_call_id = %tool_call_id,
                            "tool result part without a matching tool call demoted to text"
                        );
                        blocks.extend(text_block(content));
                    }
                }
                ContentPart::Thinking { .. } | ContentPart::ToolUse { .. } => {
                    tracing::warn!("assistant-only content part dropped from user message");
                }
                ContentPart::Unknown => {
                    tracing::warn!("content part with unknown type dropped");
                }
            }
        }

        blocks
    }

    /// Reasoning first, then text, then tool use
    fn assistant_blocks(&mut self, message: &Message) -> Vec<ContentBlock> {
        let mut reasoning = Vec::new();
        let mut text = Vec::new();
        let mut tool_uses = Vec::new();

        match &message.content {
            Content::Text(value) => text.extend(text_block(value)),
            Content::Parts(parts) => {
                for part in parts {
                    match part {
                        ContentPart::Text { text: value } => text.extend(text_block(value)),
                        ContentPart::Thinking { text: value, signature } => {
                            if !value.trim().is_empty() {
                                reasoning.push(ContentBlock::ReasoningContent(ReasoningContentBlock {
                                    reasoning_text: ReasoningText {
                                        text: value.clone(),
                                        signature: signature.clone(),
                                    },
                                }));
                            }
                        }
                        ContentPart::ToolUse { id, name, input } => {
                            tool_uses.push(self.tool_use_block(id, name, input.clone()));
                        }
                        ContentPart::Image { .. } | ContentPart::ToolResult { .. } => {
                            tracing::warn!("user-only content part dropped from assistant message");
                        }
                        ContentPart::Unknown => {
                            tracing::warn!("content part with unknown type dropped");
                        }
                    }
                }
            }
        }

        for call in message.tool_calls.iter().flatten() {
            let input = serde_json::from_str(&call.function.arguments).unwrap_or_else(|e| {
                tracing::warn!(tool_call_id = %call.id, error = %e, "tool call arguments are not valid JSON");
                serde_json::json!({})
            });
            tool_uses.push(self.tool_use_block(&call.id, &call.function.name, input));
        }

        reasoning.into_iter().chain(text).chain(tool_uses).collect()
    }

    fn tool_use_block(&mut self, id: &str, name: &str, input: serde_json::Value) -> ContentBlock {
        self.known_tool_ids.insert(id.to_owned());
        ContentBlock::ToolUse(ToolUseBlock {
            tool_use_id: id.to_owned(),
            name: name.to_owned(),
            input,
        })
    }
}

fn text_block(text: &str) -> Option<ContentBlock> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| ContentBlock::Text(trimmed.to_owned()))
}

fn tool_result_block(tool_call_id: &str, text: &str) -> ContentBlock {
    ContentBlock::ToolResult(ToolResultBlock {
        tool_use_id: tool_call_id.to_owned(),
        content: vec![ToolResultContent::Text(text.to_owned())],
    })
}

/// Parse a `data:<mime>;base64,<payload>` URI into an image block
fn image_block(data: &str) -> Option<ContentBlock> {
    let Some((header, payload)) = data.strip_prefix("data:").and_then(|rest| rest.split_once(',')) else {
        tracing::warn!("image part is not an inline data URI; dropped");
        return None;
    };

    let mime = header.strip_suffix(";base64").unwrap_or(header);
    let format = match mime {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpeg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        other => {
            tracing::warn!(mime = %other, "unsupported image format dropped");
            return None;
        }
    };

    if let Err(e) = base64::engine::general_purpose::STANDARD.decode(payload) {
        tracing::warn!(error = %e, "image payload is not valid base64; dropped");
        return None;
    }

    Some(ContentBlock::Image(ImageBlock {
        format: format.to_owned(),
        source: ImageSource {
            bytes: payload.to_owned(),
        },
    }))
}

// -- Request building --

/// Whether `model` belongs to the family whose native temperature range is 0 to 1
///
/// Matches Claude model IDs with or without a region and vendor prefix,
/// e.g. `claude-3-haiku`, `anthropic.claude-v2:1`,
/// `us.anthropic.claude-sonnet-4-20250514-v1:0`.
pub fn is_scaled_temperature_family(model: &str) -> bool {
    fn re() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| {
            Regex::new(r"(?i)^(?:[a-z]+(?:-[a-z]+)?\.)?(?:anthropic\.)?claude(?:-[a-z0-9.-]+)?(?::\d+)?$")
                .expect("must be valid regex")
        })
    }

    re().is_match(model)
}

/// Map a canonical temperature (0 to 2) onto the model's native range
pub fn scale_temperature(model: &str, temperature: f64) -> f64 {
    if is_scaled_temperature_family(model) {
        temperature / 2.0
    } else {
        temperature
    }
}

/// Claude 4-generation models reject `temperature` and `top_p` together
fn rejects_combined_sampling(model: &str) -> bool {
    fn re() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new(r"(?i)claude-(?:opus|sonnet|haiku)-[4-9]").expect("must be valid regex"))
    }

    re().is_match(model)
}

/// Assemble the Converse body for a normalized conversation
///
/// With `prompt_caching`, cache points are appended to the system prompt,
/// the last turn and the tool list.
pub fn build_request(request: &ChatRequest, mut conversation: Conversation, prompt_caching: bool) -> ConverseRequest {
    let temperature = request.temperature.map(|t| scale_temperature(&request.model, t));
    let top_p = if temperature.is_some() && rejects_combined_sampling(&request.model) {
        None
    } else {
        request.top_p
    };

    let mut tool_config = build_tool_config(request.tools.as_deref());

    if prompt_caching {
        if !conversation.system.is_empty() {
            conversation.system.push(SystemBlock::CachePoint(CachePoint::default()));
        }
        if let Some(last) = conversation.turns.last_mut() {
            last.content.push(ContentBlock::CachePoint(CachePoint::default()));
        }
        if let Some(config) = tool_config.as_mut() {
            config.tools.push(ToolEntry::CachePoint(CachePoint::default()));
        }
    }

    ConverseRequest {
        messages: conversation.turns,
        system: conversation.system,
        inference_config: InferenceConfig {
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature,
            top_p,
        },
        tool_config,
    }
}

/// Build tool configuration, omitted entirely when there are no tools
fn build_tool_config(tools: Option<&[ToolDefinition]>) -> Option<ToolConfig> {
    let tools = tools.filter(|t| !t.is_empty())?;

    let entries = tools
        .iter()
        .map(|tool| {
            ToolEntry::ToolSpec(ToolSpec {
                name: tool.function.name.clone(),
                description: tool.function.description.clone(),
                input_schema: ToolInputSchema {
                    json: tool
                        .function
                        .parameters
                        .clone()
                        .unwrap_or_else(|| serde_json::json!({"type": "object", "properties": {}})),
                },
            })
        })
        .collect();

    Some(ToolConfig { tools: entries })
}
