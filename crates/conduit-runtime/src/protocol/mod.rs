//! Serde mirrors of provider wire formats, used only at the HTTP boundary

pub mod bedrock;
