use thiserror::Error;

/// Errors arising from envelope/payload parsing and command encoding.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("truncated varint at offset {offset}")]
    TruncatedVarint { offset: usize },

    #[error("field {field} at offset {offset} needs {need} bytes, {left} left{}", format_raw_suffix(raw))]
    TruncatedField {
        field: u32,
        offset: usize,
        need: usize,
        left: usize,
        /// Raw payload bytes for debug context.
        raw: Vec<u8>,
    },

    #[error("unsupported wire type {wire_type} for field {field} at offset {offset}{}", format_raw_suffix(raw))]
    UnsupportedWireType {
        field: u32,
        wire_type: u8,
        offset: usize,
        /// Raw payload bytes for debug context.
        raw: Vec<u8>,
    },

    #[error("invalid string payload: {0}")]
    InvalidString(#[from] std::string::FromUtf8Error),

    #[error("unknown settable field {name:?}")]
    UnknownField { name: String },

    #[error("field {name:?} is a nested group and needs a group setting")]
    GroupField { name: &'static str },

    #[error("field {name:?} is reported by the device but not writable")]
    ReadOnlyField { name: &'static str },

    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("JSON payload is not an object")]
    JsonNotObject,
}

impl WireError {
    /// Create a `TruncatedField` error (raw bytes filled in later via `with_raw`).
    pub(crate) fn truncated_field(field: u32, offset: usize, need: usize, left: usize) -> Self {
        Self::TruncatedField { field, offset, need, left, raw: Vec::new() }
    }

    /// Create an `UnsupportedWireType` error (raw bytes filled in later via `with_raw`).
    pub(crate) fn unsupported_wire_type(field: u32, wire_type: u8, offset: usize) -> Self {
        Self::UnsupportedWireType { field, wire_type, offset, raw: Vec::new() }
    }

    /// Attach raw payload bytes to decode-phase errors for diagnostics.
    pub fn with_raw(self, payload: &[u8]) -> Self {
        match self {
            Self::TruncatedField { field, offset, need, left, .. } => {
                Self::TruncatedField { field, offset, need, left, raw: payload.to_vec() }
            }
            Self::UnsupportedWireType { field, wire_type, offset, .. } => {
                Self::UnsupportedWireType { field, wire_type, offset, raw: payload.to_vec() }
            }
            other => other,
        }
    }
}

/// Format raw bytes as a suffix like " | 0A1210..." (empty if no bytes).
fn format_raw_suffix(raw: &[u8]) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let limit = 16;
    let hex = hex::encode_upper(&raw[..raw.len().min(limit)]);
    let ellipsis = if raw.len() > limit { "..." } else { "" };
    format!(" | {hex}{ellipsis}")
}

pub type Result<T> = std::result::Result<T, WireError>;
