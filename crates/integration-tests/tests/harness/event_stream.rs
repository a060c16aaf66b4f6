//! `application/vnd.amazon.eventstream` encoding for mock converse-stream bodies
//!
//! CRC fields are written as given rather than computed; the adapter locates
//! messages by their prelude lengths only.

/// An `event` message carrying a JSON payload, with zeroed CRCs
pub fn event(event_type: &str, payload: &str) -> Vec<u8> {
    event_with_crcs(event_type, payload, [0; 4], [0; 4])
}

/// An `event` message with explicit prelude and message CRC bytes
pub fn event_with_crcs(event_type: &str, payload: &str, prelude_crc: [u8; 4], message_crc: [u8; 4]) -> Vec<u8> {
    let headers = [
        (":event-type", event_type),
        (":content-type", "application/json"),
        (":message-type", "event"),
    ];
    message(&headers, payload.as_bytes(), prelude_crc, message_crc)
}

/// An `exception` message as Bedrock sends mid-stream
pub fn exception(exception_type: &str, message_text: &str) -> Vec<u8> {
    let headers = [
        (":exception-type", exception_type),
        (":content-type", "application/json"),
        (":message-type", "exception"),
    ];
    let payload = serde_json::json!({ "message": message_text }).to_string();
    message(&headers, payload.as_bytes(), [0; 4], [0; 4])
}

fn message(headers: &[(&str, &str)], payload: &[u8], prelude_crc: [u8; 4], message_crc: [u8; 4]) -> Vec<u8> {
    let mut encoded = Vec::new();
    for (name, value) in headers {
        encoded.push(u8::try_from(name.len()).unwrap());
        encoded.extend_from_slice(name.as_bytes());
        // string value type
        encoded.push(7);
        encoded.extend_from_slice(&u16::try_from(value.len()).unwrap().to_be_bytes());
        encoded.extend_from_slice(value.as_bytes());
    }

    let total = 12 + encoded.len() + payload.len() + 4;
    let mut bytes = Vec::with_capacity(total);
    bytes.extend_from_slice(&u32::try_from(total).unwrap().to_be_bytes());
    bytes.extend_from_slice(&u32::try_from(encoded.len()).unwrap().to_be_bytes());
    bytes.extend_from_slice(&prelude_crc);
    bytes.extend(encoded);
    bytes.extend_from_slice(payload);
    bytes.extend_from_slice(&message_crc);
    bytes
}
