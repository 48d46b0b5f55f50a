//! Common response envelope
//!
//! Every API response body has the shape
//! `{ "isSuccess": bool, "code": string, "message": string, "result": T }`.
//! The pipeline does not look inside it; callers that care about the
//! application-level outcome call `into_result()`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub is_success: bool,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default = "Option::default")]
    pub result: Option<T>,
}

/// An envelope that reported failure or carried no result.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct EnvelopeError {
    pub code: String,
    pub message: String,
}

impl<T> Envelope<T> {
    /// Unwrap the `result` of a successful envelope.
    pub fn into_result(self) -> Result<T, EnvelopeError> {
        if !self.is_success {
            return Err(EnvelopeError {
                code: self.code,
                message: self.message,
            });
        }
        self.result.ok_or_else(|| EnvelopeError {
            code: self.code,
            message: "response envelope has no result".into(),
        })
    }
}
