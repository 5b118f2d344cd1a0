/// Error types shared across the extension contexts
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("failed to encode value: {0}")]
    Encode(String),
    #[error("failed to decode {key}: {message}")]
    Decode { key: String, message: String },
}

impl StoreError {
    pub fn from_js(context: &str, err: wasm_bindgen::JsValue) -> Self {
        StoreError::Unavailable(format!("{}: {:?}", context, err))
    }
}

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("Missing action")]
    MissingAction,
    #[error("Unknown action")]
    UnknownAction(String),
    #[error("Invalid payload for {action}: {message}")]
    InvalidPayload { action: String, message: String },
}
