//! Wire formats for API modules.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// A request body could not be deserialized.
#[derive(Debug, Error)]
#[error("failed to decode {format} request body: {message}")]
pub struct DecodingError {
    pub format: &'static str,
    pub message: String,
}

/// A response value could not be serialized.
#[derive(Debug, Error)]
#[error("failed to encode {format} response body: {message}")]
pub struct EncodingError {
    pub format: &'static str,
    pub message: String,
}

impl IntoResponse for DecodingError {
    fn into_response(self) -> Response {
        tracing::debug!(error = %self, "Rejecting malformed request body");
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

impl IntoResponse for EncodingError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Response serialization failed");
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

/// A serde-backed body format.
pub trait Codec: Send + Sync + 'static {
    /// Short name used in error messages.
    const FORMAT: &'static str;
    /// Value of the `Content-Type` response header.
    const CONTENT_TYPE: &'static str;

    fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, DecodingError>;
    fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, EncodingError>;
}

/// `application/json` bodies via serde_json.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

impl Codec for Json {
    const FORMAT: &'static str = "JSON";
    const CONTENT_TYPE: &'static str = "application/json; charset=utf-8";

    fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, DecodingError> {
        serde_json::from_slice(body).map_err(|e| DecodingError {
            format: Self::FORMAT,
            message: e.to_string(),
        })
    }

    fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, EncodingError> {
        let mut body = serde_json::to_vec(value).map_err(|e| EncodingError {
            format: Self::FORMAT,
            message: e.to_string(),
        })?;
        // Streaming JSON encoders terminate each value with a newline.
        body.push(b'\n');
        Ok(body)
    }
}

/// `application/xml` bodies via quick-xml. The root element is the type name.
#[derive(Debug, Clone, Copy, Default)]
pub struct Xml;

impl Codec for Xml {
    const FORMAT: &'static str = "XML";
    const CONTENT_TYPE: &'static str = "application/xml";

    fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, DecodingError> {
        let text = std::str::from_utf8(body).map_err(|e| DecodingError {
            format: Self::FORMAT,
            message: e.to_string(),
        })?;
        quick_xml::de::from_str(text).map_err(|e| DecodingError {
            format: Self::FORMAT,
            message: e.to_string(),
        })
    }

    fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, EncodingError> {
        quick_xml::se::to_string(value)
            .map(String::into_bytes)
            .map_err(|e| EncodingError {
                format: Self::FORMAT,
                message: e.to_string(),
            })
    }
}
