//! Conversion from canonical types to provider wire formats

pub mod bedrock;
