#![allow(dead_code)]

pub mod callbacks;
pub mod config;
pub mod event_stream;
pub mod mock_bedrock;
pub mod stalled_body;
