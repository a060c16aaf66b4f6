mod harness;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, HeaderValue};
use conduit_runtime::types::{FinishReason, Message};
use conduit_runtime::{ChatRequest, ErrorKind, RequestOptions, RuntimeAdapter};
use futures_util::StreamExt;
use harness::callbacks::Recorder;
use harness::config::{TEST_TOKEN, adapter};
use harness::event_stream;
use harness::mock_bedrock::MockBedrock;
use tokio_util::sync::CancellationToken;

const NOVA: &str = "us.amazon.nova-lite-v1:0";
const CLAUDE: &str = "us.anthropic.claude-3-5-sonnet-20241022-v2:0";

/// Wrap a converse-stream payload in an event-stream message of the matching type
fn event(payload: &str) -> Vec<u8> {
    event_stream::event(event_type(payload), payload)
}

fn event_type(payload: &str) -> &'static str {
    if payload.contains("\"stopReason\"") {
        "messageStop"
    } else if payload.contains("\"usage\"") {
        "metadata"
    } else if payload.contains("\"delta\"") {
        "contentBlockDelta"
    } else if payload.contains("\"role\"") {
        "messageStart"
    } else {
        "contentBlockStop"
    }
}

fn hello_world_stream() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend(event(r#"{"role":"assistant","p":"abc"}"#));
    body.extend(event(r#"{"contentBlockIndex":0,"delta":{"text":"Hello"},"p":"abcdef"}"#));
    body.extend(event(r#"{"contentBlockIndex":0,"delta":{"text":" "},"p":"ab"}"#));
    body.extend(event(r#"{"contentBlockIndex":0,"delta":{"text":"{world}"},"p":"abcd"}"#));
    body.extend(event(r#"{"contentBlockIndex":0,"p":"abcdefgh"}"#));
    body.extend(event(r#"{"stopReason":"max_tokens","p":"ab"}"#));
    body.extend(event(
        r#"{"metrics":{"latencyMs":412},"usage":{"inputTokens":12,"outputTokens":3,"totalTokens":15},"p":"a"}"#,
    ));
    body
}

/// Split `body` into pieces of `size` bytes, cutting through frames
fn split(body: &[u8], size: usize) -> Vec<Vec<u8>> {
    body.chunks(size).map(<[u8]>::to_vec).collect()
}

fn request(model: &str) -> ChatRequest {
    ChatRequest::new(model, vec![Message::system("be brief"), Message::user("Say hello")])
}

#[tokio::test]
async fn frames_split_across_reads_become_chunks() {
    let mock = MockBedrock::builder()
        .chunks(split(&hello_world_stream(), 7))
        .chunk_delay(Duration::from_millis(1))
        .start()
        .await
        .unwrap();
    let recorder = Arc::new(Recorder::default());

    let stream = adapter(&mock)
        .chat(&request(NOVA), RequestOptions::default().with_callbacks(recorder.clone()))
        .await
        .unwrap();
    let chunks: Vec<_> = stream.map(Result::unwrap).collect().await;

    let texts: Vec<_> = chunks.iter().filter_map(|c| c.content()).collect();
    assert_eq!(texts, ["Hello", "{world}"]);

    let last = chunks.last().unwrap();
    assert_eq!(last.finish_reason(), Some(FinishReason::Length));
    assert!(chunks.iter().all(|c| c.id == chunks[0].id && c.model == NOVA));
    assert!(chunks.windows(2).all(|w| w[0].created <= w[1].created));
    assert!(chunks.iter().all(|c| c.content().is_none_or(|t| !t.trim().is_empty())));

    assert_eq!(recorder.events(), ["start", "text:Hello", "text:{world}", "finish"]);
    let completion = recorder.completion().unwrap();
    assert_eq!(completion.text, "Hello{world}");
    assert_eq!(completion.usage.unwrap().total_tokens, 15);
    assert_eq!(mock.converse_count(), 1);
}

#[tokio::test]
async fn single_byte_reads_decode_identically() {
    let mock = MockBedrock::streaming(split(&hello_world_stream(), 1)).await.unwrap();

    let stream = adapter(&mock).chat(&request(NOVA), RequestOptions::default()).await.unwrap();
    let chunks: Vec<_> = stream.map(Result::unwrap).collect().await;

    let texts: Vec<_> = chunks.iter().filter_map(|c| c.content()).collect();
    assert_eq!(texts, ["Hello", "{world}"]);
}

#[tokio::test]
async fn json_like_checksum_bytes_do_not_lose_text() {
    let mut body = event_stream::event_with_crcs(
        "contentBlockDelta",
        r#"{"contentBlockIndex":0,"delta":{"text":"Hello"},"p":"ab"}"#,
        [0x11, 0x7b, 0x22, 0x05],
        [0x7b, 0x7d, 0x22, 0x7b],
    );
    body.extend(event_stream::event_with_crcs(
        "contentBlockDelta",
        r#"{"contentBlockIndex":0,"delta":{"text":" world"},"p":"abc"}"#,
        [0x7b, 0x22, 0x7b, 0x22],
        [0x22, 0x5c, 0x7b, 0x7d],
    ));
    body.extend(event(r#"{"stopReason":"end_turn"}"#));

    let mock = MockBedrock::streaming(split(&body, 3)).await.unwrap();

    let stream = adapter(&mock).chat(&request(NOVA), RequestOptions::default()).await.unwrap();
    let chunks: Vec<_> = stream.map(Result::unwrap).collect().await;

    let texts: Vec<_> = chunks.iter().filter_map(|c| c.content()).collect();
    assert_eq!(texts, ["Hello", " world"]);
    assert_eq!(chunks.last().unwrap().finish_reason(), Some(FinishReason::Stop));
}

#[tokio::test]
async fn exception_event_ends_stream_with_stream_error() {
    let mut body = event(r#"{"delta":{"text":"partial"}}"#);
    body.extend(event_stream::exception("throttlingException", "Too many requests"));
    let mock = MockBedrock::streaming([body]).await.unwrap();
    let recorder = Arc::new(Recorder::default());

    let stream = adapter(&mock)
        .chat(&request(NOVA), RequestOptions::default().with_callbacks(recorder.clone()))
        .await
        .unwrap();
    let items: Vec<_> = stream.collect().await;

    let error = items.last().unwrap().as_ref().unwrap_err();
    assert_eq!(error.kind(), ErrorKind::StreamError);
    assert!(error.to_string().contains("throttlingException"));
    assert_eq!(recorder.terminal_count(), 1);
}

#[tokio::test]
async fn request_body_uses_converse_shape() {
    let mock = MockBedrock::streaming([event(r#"{"stopReason":"end_turn"}"#)]).await.unwrap();

    let mut request = request(CLAUDE);
    request.temperature = Some(1.0);
    request.max_tokens = Some(256);

    let stream = adapter(&mock).chat(&request, RequestOptions::default()).await.unwrap();
    let _: Vec<_> = stream.collect().await;

    let captured = mock.last_request();
    assert_eq!(captured.model, CLAUDE);
    assert_eq!(captured.authorization.as_deref(), Some(format!("Bearer {TEST_TOKEN}").as_str()));
    assert_eq!(
        captured.body,
        serde_json::json!({
            "messages": [{"role": "user", "content": [{"text": "Say hello"}]}],
            "system": [{"text": "be brief"}],
            "inferenceConfig": {"maxTokens": 256, "temperature": 0.5},
        })
    );
}

#[tokio::test]
async fn caller_headers_forwarded_without_overriding_auth() {
    let mock = MockBedrock::streaming([event(r#"{"stopReason":"end_turn"}"#)]).await.unwrap();

    let mut headers = HeaderMap::new();
    headers.insert("x-trace-id", HeaderValue::from_static("trace-42"));
    headers.insert("authorization", HeaderValue::from_static("Bearer stolen"));

    let stream = adapter(&mock)
        .chat(&request(NOVA), RequestOptions::default().with_headers(headers))
        .await
        .unwrap();
    let _: Vec<_> = stream.collect().await;

    let captured = mock.last_request();
    assert_eq!(captured.trace_id.as_deref(), Some("trace-42"));
    assert_eq!(captured.authorization.as_deref(), Some(format!("Bearer {TEST_TOKEN}").as_str()));
}

#[tokio::test]
async fn empty_completion_finishes_cleanly() {
    let mock = MockBedrock::streaming([
        event(r#"{"role":"assistant"}"#),
        event(r#"{"stopReason":"end_turn"}"#),
    ])
    .await
    .unwrap();
    let recorder = Arc::new(Recorder::default());

    let stream = adapter(&mock)
        .chat(&request(NOVA), RequestOptions::default().with_callbacks(recorder.clone()))
        .await
        .unwrap();
    let chunks: Vec<_> = stream.map(Result::unwrap).collect().await;

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].finish_reason(), Some(FinishReason::Stop));
    assert_eq!(recorder.events(), ["start", "finish"]);
    assert_eq!(recorder.completion().unwrap().text, "");
}

#[tokio::test]
async fn malformed_frame_ends_stream_with_stream_error() {
    let mock = MockBedrock::builder()
        .chunks([
            event(r#"{"delta":{"text":"partial"}}"#),
            event(r#"{"delta":{"text":"broken",,}}"#),
            event(r#"{"delta":{"text":"never seen"}}"#),
        ])
        .chunk_delay(Duration::from_millis(50))
        .start()
        .await
        .unwrap();
    let recorder = Arc::new(Recorder::default());

    let stream = adapter(&mock)
        .chat(&request(NOVA), RequestOptions::default().with_callbacks(recorder.clone()))
        .await
        .unwrap();
    let items: Vec<_> = stream.collect().await;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap().content(), Some("partial"));
    let error = items[1].as_ref().unwrap_err();
    assert_eq!(error.kind(), ErrorKind::StreamError);
    assert_eq!(error.provider, "bedrock");
    assert_eq!(recorder.events(), ["start", "text:partial", "error:StreamError"]);
}

#[tokio::test]
async fn cancelling_mid_stream_aborts() {
    let mock = MockBedrock::builder()
        .chunks([event(r#"{"delta":{"text":"first"}}"#)])
        .hold_open()
        .start()
        .await
        .unwrap();
    let recorder = Arc::new(Recorder::default());
    let signal = CancellationToken::new();

    let mut stream = adapter(&mock)
        .chat(
            &request(NOVA),
            RequestOptions::default()
                .with_signal(signal.clone())
                .with_callbacks(recorder.clone()),
        )
        .await
        .unwrap();

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.content(), Some("first"));

    signal.cancel();
    let aborted = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("abort must end the pull loop")
        .unwrap()
        .unwrap_err();

    assert_eq!(aborted.kind(), ErrorKind::AbortError);
    assert!(stream.next().await.is_none());
    assert_eq!(recorder.events(), ["start", "text:first", "abort"]);
    assert_eq!(recorder.terminal_count(), 1);
}

#[tokio::test]
async fn dropping_stream_reports_abort_once() {
    let mock = MockBedrock::builder()
        .chunks([event(r#"{"delta":{"text":"only"}}"#)])
        .hold_open()
        .start()
        .await
        .unwrap();
    let recorder = Arc::new(Recorder::default());

    let mut stream = adapter(&mock)
        .chat(&request(NOVA), RequestOptions::default().with_callbacks(recorder.clone()))
        .await
        .unwrap();
    let _ = stream.next().await.unwrap().unwrap();
    drop(stream);

    assert_eq!(recorder.events(), ["start", "text:only", "abort"]);
}
