//! Incremental reassembly of JSON frames from a raw byte stream
//!
//! Bedrock wraps each converse-stream event in `application/vnd.amazon.eventstream`
//! framing: a 12-byte prelude (total length, headers length, prelude CRC),
//! binary headers, a JSON payload and a trailing message CRC. Messages are
//! located from the prelude lengths, so framing bytes never reach the JSON
//! scanner. A body that starts with `{` is treated as bare concatenated JSON.
//!
//! Either way, the scanner tracks balanced braces outside string literals and
//! only parses an object once it is complete.

use conduit_core::AdapterError;

use crate::protocol::bedrock::StreamFrame;

/// Prelude: total length, headers length, prelude CRC
const PRELUDE_LEN: usize = 12;
/// Prelude plus the trailing message CRC
const MIN_MESSAGE_LEN: usize = PRELUDE_LEN + 4;
/// Largest message the event-stream format allows
const MAX_MESSAGE_LEN: usize = 16 * 1024 * 1024;

/// Wire format, fixed by the first significant byte of the body
///
/// An event-stream message cannot start with `{` or whitespace: that would
/// put its total length far above [`MAX_MESSAGE_LEN`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    EventStream,
    Json,
}

/// Call-scoped frame decoder; never shared between requests
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Bytes not yet handed to the scanner
    pending: Vec<u8>,
    framing: Option<Framing>,
    scanner: JsonScanner,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes, returning every frame completed by them
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Stream`] when a balanced object is not a
    /// valid frame, an event-stream prelude is corrupt, or the provider
    /// sends an exception event
    pub fn process_chunk(&mut self, chunk: &[u8]) -> Result<Vec<StreamFrame>, AdapterError> {
        self.pending.extend_from_slice(chunk);

        let framing = match self.framing {
            Some(framing) => framing,
            None => {
                let Some(&first) = self.pending.iter().find(|b| !b.is_ascii_whitespace()) else {
                    return Ok(Vec::new());
                };
                let framing = if first == b'{' { Framing::Json } else { Framing::EventStream };
                self.framing = Some(framing);
                framing
            }
        };

        match framing {
            Framing::Json => {
                let bytes = std::mem::take(&mut self.pending);
                self.scanner.feed(&bytes)
            }
            Framing::EventStream => self.drain_messages(),
        }
    }

    /// Signal end of input; an unfinished trailing frame is discarded
    pub fn finish(&mut self) {
        if self.scanner.in_frame || !self.pending.is_empty() {
            tracing::debug!(
                pending_bytes = self.pending.len() + self.scanner.buffer.len(),
                "discarding incomplete trailing frame"
            );
        }
        *self = Self::default();
    }

    /// Decode every complete event-stream message in `pending`
    fn drain_messages(&mut self) -> Result<Vec<StreamFrame>, AdapterError> {
        let mut frames = Vec::new();

        while self.pending.len() >= PRELUDE_LEN {
            let total_len = be_u32(&self.pending[0..4]);
            let headers_len = be_u32(&self.pending[4..8]);

            if !(MIN_MESSAGE_LEN..=MAX_MESSAGE_LEN).contains(&total_len) || headers_len > total_len - MIN_MESSAGE_LEN {
                return Err(AdapterError::Stream(format!(
                    "invalid event-stream prelude (total length {total_len}, headers length {headers_len})"
                )));
            }

            if self.pending.len() < total_len {
                break;
            }

            let message: Vec<u8> = self.pending.drain(..total_len).collect();
            let headers = &message[PRELUDE_LEN..PRELUDE_LEN + headers_len];
            let payload = &message[PRELUDE_LEN + headers_len..total_len - 4];

            if let Some(error) = exception(headers, payload) {
                return Err(error);
            }

            frames.extend(self.scanner.feed(payload)?);

            if self.scanner.in_frame {
                return Err(AdapterError::Stream(
                    "event-stream payload is not a complete JSON object".to_owned(),
                ));
            }
            self.scanner.reset();
        }

        Ok(frames)
    }
}

fn be_u32(bytes: &[u8]) -> usize {
    let mut word = [0u8; 4];
    word.copy_from_slice(bytes);
    usize::try_from(u32::from_be_bytes(word)).unwrap_or(usize::MAX)
}

/// Turn an `exception` or `error` message into a stream error
fn exception(headers: &[u8], payload: &[u8]) -> Option<AdapterError> {
    let message_type = string_header(headers, ":message-type")?;
    if message_type == "event" {
        return None;
    }

    let name = string_header(headers, ":exception-type")
        .or_else(|| string_header(headers, ":error-code"))
        .unwrap_or(message_type);

    let detail = serde_json::from_slice::<serde_json::Value>(payload)
        .ok()
        .and_then(|body| body.get("message").and_then(|m| m.as_str()).map(str::to_owned))
        .or_else(|| string_header(headers, ":error-message").map(str::to_owned))
        .unwrap_or_default();

    Some(AdapterError::Stream(format!("{name}: {detail}")))
}

/// Value of a string-typed header, if present
///
/// Header layout: name length (u8), name, value type (u8), value. Only
/// string values (type 7, u16 length prefix) are returned; other types are
/// skipped by their fixed or prefixed size.
fn string_header<'a>(mut headers: &'a [u8], wanted: &str) -> Option<&'a str> {
    while let Some((&name_len, rest)) = headers.split_first() {
        let name = rest.get(..usize::from(name_len))?;
        let (&value_type, rest) = rest.get(usize::from(name_len)..)?.split_first()?;

        let (value, rest) = match value_type {
            0 | 1 => (&[][..], rest),
            2 => rest.split_at_checked(1)?,
            3 => rest.split_at_checked(2)?,
            4 => rest.split_at_checked(4)?,
            5 | 8 => rest.split_at_checked(8)?,
            9 => rest.split_at_checked(16)?,
            6 | 7 => {
                let len = usize::from(u16::from_be_bytes([*rest.first()?, *rest.get(1)?]));
                rest.get(2..)?.split_at_checked(len)?
            }
            _ => return None,
        };

        if value_type == 7 && name == wanted.as_bytes() {
            return std::str::from_utf8(value).ok();
        }
        headers = rest;
    }

    None
}

/// Brace-balanced JSON object scanner
#[derive(Debug, Default)]
struct JsonScanner {
    buffer: Vec<u8>,
    /// Index of the next unscanned byte while inside a frame
    cursor: usize,
    in_frame: bool,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl JsonScanner {
    fn reset(&mut self) {
        *self = Self::default();
    }

    fn feed(&mut self, bytes: &[u8]) -> Result<Vec<StreamFrame>, AdapterError> {
        self.buffer.extend_from_slice(bytes);

        let mut frames = Vec::new();

        loop {
            if !self.in_frame && !self.seek_frame_start() {
                break;
            }

            let Some(end) = self.scan() else {
                break;
            };

            let frame = parse_frame(&self.buffer[..end])?;
            self.buffer.drain(..end);
            self.cursor = 0;
            self.in_frame = false;

            frames.push(frame);
        }

        Ok(frames)
    }

    /// Skip separators before the next `{`; returns whether a frame starts at 0
    fn seek_frame_start(&mut self) -> bool {
        match self.buffer.iter().position(|&b| b == b'{') {
            Some(start) => {
                self.buffer.drain(..start);
                self.in_frame = true;
                self.cursor = 0;
                self.depth = 0;
                self.in_string = false;
                self.escaped = false;
                true
            }
            None => {
                self.buffer.clear();
                false
            }
        }
    }

    /// Continue scanning the open frame; returns its end offset once balanced
    fn scan(&mut self) -> Option<usize> {
        while self.cursor < self.buffer.len() {
            let byte = self.buffer[self.cursor];
            self.cursor += 1;

            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if byte == b'\\' {
                    self.escaped = true;
                } else if byte == b'"' {
                    self.in_string = false;
                }
                continue;
            }

            match byte {
                b'"' => self.in_string = true,
                b'{' => self.depth += 1,
                b'}' => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth == 0 {
                        return Some(self.cursor);
                    }
                }
                _ => {}
            }
        }

        None
    }
}

fn parse_frame(bytes: &[u8]) -> Result<StreamFrame, AdapterError> {
    serde_json::from_slice(bytes).map_err(|e| AdapterError::Stream(e.to_string()))
}
