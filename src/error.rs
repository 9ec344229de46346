use thiserror::Error;
use wasm_bindgen::JsValue;

/// Errors raised while setting up or driving the decorative layers.
///
/// None of these ever reach the visitor: hosts log them and degrade to the
/// static fallback.
#[derive(Debug, Error)]
pub enum FxError {
    #[error("mount container not found")]
    ContainerMissing,
    #[error("no WebGL context could be obtained")]
    ContextUnavailable,
    #[error("shader compilation failed: {0}")]
    ShaderCompile(String),
    #[error("program link failed: {0}")]
    ProgramLink(String),
    #[error("could not allocate GPU {0}")]
    BufferAllocation(&'static str),
    #[error("javascript error: {0}")]
    Js(String),
    #[error("storage unavailable: {0}")]
    Storage(String),
    #[error("malformed preference record: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type FxResult<T> = Result<T, FxError>;

impl From<JsValue> for FxError {
    fn from(value: JsValue) -> Self {
        FxError::Js(value.as_string().unwrap_or_else(|| format!("{value:?}")))
    }
}

impl From<FxError> for JsValue {
    fn from(err: FxError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}
