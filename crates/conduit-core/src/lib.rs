//! Shared primitives for conduit runtime adapters

#![allow(clippy::must_use_candidate)]

pub mod error;

pub use error::{
    AdapterError, ErrorEnvelope, ErrorKind, MAX_ERROR_BODY_BYTES, ProviderError, redact, truncate_body,
};
