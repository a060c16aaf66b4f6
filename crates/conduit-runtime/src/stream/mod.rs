//! Streaming pipeline: raw bytes to canonical chunks
//!
//! One pipeline runs per call. It owns its decoder, translator and callback
//! lifecycle, so concurrent calls never share buffers.

pub mod callbacks;
pub mod decoder;
pub mod translator;

use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;

use conduit_core::{AdapterError, ProviderError};
use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

pub use callbacks::{Lifecycle, StreamCallbacks};
pub use decoder::FrameDecoder;
pub use translator::StreamTranslator;

use crate::error::ErrorContext;
use crate::types::CanonicalChunk;

/// Stream of canonical chunks returned to callers
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<CanonicalChunk, ProviderError>> + Send>>;

/// Turn a provider byte stream into canonical chunks
///
/// The stream ends after the terminal chunk, after the first error, or
/// with an `AbortError` once `signal` is cancelled.
pub fn canonical_stream<S, B, E>(
    body: S,
    translator: StreamTranslator,
    lifecycle: Lifecycle,
    errors: ErrorContext,
    signal: CancellationToken,
) -> ChunkStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = Pipeline {
        body: Box::pin(body),
        decoder: FrameDecoder::new(),
        translator,
        lifecycle,
        errors,
        signal,
        pending: VecDeque::new(),
        done: false,
    };

    let stream = futures_util::stream::unfold(state, |mut state| async move {
        let item = state.next_item().await?;
        Some((item, state))
    });

    Box::pin(stream)
}

struct Pipeline<S> {
    body: Pin<Box<S>>,
    decoder: FrameDecoder,
    translator: StreamTranslator,
    lifecycle: Lifecycle,
    errors: ErrorContext,
    signal: CancellationToken,
    pending: VecDeque<CanonicalChunk>,
    done: bool,
}

enum Step<T> {
    Aborted,
    Body(Option<T>),
}

impl<S, B, E> Pipeline<S>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    async fn next_item(&mut self) -> Option<Result<CanonicalChunk, ProviderError>> {
        loop {
            if let Some(chunk) = self.pending.pop_front() {
                return Some(Ok(chunk));
            }

            if self.done {
                return None;
            }

            self.lifecycle.start();

            let step = tokio::select! {
                biased;
                () = self.signal.cancelled() => Step::Aborted,
                item = self.body.next() => Step::Body(item),
            };

            match step {
                Step::Aborted => {
                    tracing::debug!(provider = self.errors.provider(), "stream aborted by caller");
                    self.done = true;
                    self.lifecycle.abort();
                    return Some(Err(self.errors.wrap(AdapterError::Aborted)));
                }
                Step::Body(Some(Ok(bytes))) => match self.decoder.process_chunk(bytes.as_ref()) {
                    Ok(frames) => {
                        for frame in &frames {
                            if let Some(chunk) = self.translator.accept(frame) {
                                if let Some(text) = chunk.content() {
                                    self.lifecycle.text(text);
                                }
                                self.pending.push_back(chunk);
                            }
                        }
                    }
                    Err(cause) => return Some(Err(self.fail(cause))),
                },
                Step::Body(Some(Err(e))) => {
                    return Some(Err(self.fail(AdapterError::Network(e.to_string()))));
                }
                Step::Body(None) => {
                    self.decoder.finish();
                    let (chunk, completion) = self.translator.finish();
                    tracing::debug!(
                        provider = self.errors.provider(),
                        id = self.translator.id(),
                        "stream finished"
                    );
                    self.lifecycle.finish(&completion);
                    self.pending.push_back(chunk);
                    self.done = true;
                }
            }
        }
    }

    fn fail(&mut self, cause: AdapterError) -> ProviderError {
        self.done = true;
        let error = self.errors.wrap(cause);
        tracing::error!(provider = self.errors.provider(), error = %error, "stream failed");
        self.lifecycle.error(&error);
        error
    }
}
