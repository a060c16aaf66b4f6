#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use args::{Args, Command};
use clap::Parser;
use conduit_config::Config;
use conduit_runtime::stream::StreamCallbacks;
use conduit_runtime::types::{EmbeddingRequest, Message};
use conduit_runtime::{BedrockAdapter, ChatRequest, Completion, RequestOptions, RuntimeAdapter};
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)?;

    let _telemetry_guard = conduit_telemetry::init(config.telemetry.as_ref(), &args.log)?;

    let bedrock = config
        .providers
        .bedrock
        .as_ref()
        .context("no bedrock provider configured")?;
    let adapter = BedrockAdapter::new(bedrock, &config.runtime)?;

    tracing::debug!(config_path = %args.config.display(), ?adapter, "adapter configured");

    let signal = CancellationToken::new();
    let signal_clone = signal.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling");
            signal_clone.cancel();
        }
    });

    let options = RequestOptions::default().with_signal(signal);

    match args.command {
        Command::Models => list_models(&adapter).await,
        Command::Chat {
            model,
            system,
            temperature,
            top_p,
            max_tokens,
            prompt,
        } => {
            let mut messages = Vec::with_capacity(2);
            if let Some(system) = system {
                messages.push(Message::system(system));
            }
            messages.push(Message::user(prompt.join(" ")));

            let mut request = ChatRequest::new(model, messages);
            request.temperature = temperature;
            request.top_p = top_p;
            request.max_tokens = max_tokens;

            chat(&adapter, &request, options.with_callbacks(Arc::new(UsageReporter))).await
        }
        Command::Embed {
            model,
            dimensions,
            input,
        } => {
            let request = EmbeddingRequest {
                model,
                input,
                dimensions,
            };
            embed(&adapter, &request, options).await
        }
    }
}

async fn list_models(adapter: &impl RuntimeAdapter) -> anyhow::Result<()> {
    let models = adapter.models().await?;
    let mut stdout = std::io::stdout().lock();

    for model in models {
        match model.display_name {
            Some(name) => writeln!(stdout, "{}\t{name}", model.id)?,
            None => writeln!(stdout, "{}", model.id)?,
        }
    }

    Ok(())
}

async fn chat(adapter: &impl RuntimeAdapter, request: &ChatRequest, options: RequestOptions) -> anyhow::Result<()> {
    let mut chunks = adapter.chat(request, options).await?;

    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        if let Some(text) = chunk.content() {
            let mut stdout = std::io::stdout().lock();
            write!(stdout, "{text}")?;
            stdout.flush()?;
        }
    }

    println!();
    Ok(())
}

async fn embed(adapter: &impl RuntimeAdapter, request: &EmbeddingRequest, options: RequestOptions) -> anyhow::Result<()> {
    let embeddings = adapter.embeddings(request, options).await?;
    println!("{}", serde_json::to_string(&embeddings)?);
    Ok(())
}

/// Logs token usage once a chat stream completes
struct UsageReporter;

impl StreamCallbacks for UsageReporter {
    fn on_finish(&self, completion: &Completion) {
        match completion.usage {
            Some(usage) => tracing::info!(
                finish_reason = ?completion.finish_reason,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "completion finished"
            ),
            None => tracing::info!(finish_reason = ?completion.finish_reason, "completion finished"),
        }
    }

    fn on_abort(&self) {
        tracing::warn!("completion cancelled");
    }
}
