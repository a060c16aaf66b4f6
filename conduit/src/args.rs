use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Conduit model runtime client
#[derive(Debug, Parser)]
#[command(name = "conduit", about = "Chat, embed and list models through a configured provider")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "conduit.toml", env = "CONDUIT_CONFIG")]
    pub config: PathBuf,

    /// Log filter directive, e.g. `debug` or `conduit_runtime=trace`
    #[arg(long, default_value = "warn", env = "CONDUIT_LOG")]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List models exposed by the configured filter
    Models,

    /// Stream a chat completion to stdout
    Chat {
        /// Model identifier
        #[arg(short, long)]
        model: String,

        /// System prompt
        #[arg(short, long)]
        system: Option<String>,

        #[arg(short, long)]
        temperature: Option<f64>,

        #[arg(long)]
        top_p: Option<f64>,

        #[arg(long)]
        max_tokens: Option<u32>,

        /// User prompt; words are joined with spaces
        #[arg(required = true)]
        prompt: Vec<String>,
    },

    /// Embed each input and print the vectors as JSON
    Embed {
        /// Embedding model identifier
        #[arg(short, long)]
        model: String,

        /// Requested vector size
        #[arg(short, long)]
        dimensions: Option<u32>,

        /// Texts to embed, one vector per input
        #[arg(required = true)]
        input: Vec<String>,
    },
}
