//! Frame validation errors.

use thiserror::Error;

/// A frame from the server that could not be turned into an event.
///
/// The dispatcher drops the frame and reports this error; the session is
/// never closed because of it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    /// The frame is not a JSON object.
    #[error("frame is not valid JSON: {message}")]
    InvalidJson { message: String },

    /// The envelope lacks `kind`, `payload` or `timestamp`.
    #[error("frame is missing required field '{field}'")]
    MissingField { field: &'static str },

    /// An envelope field has the wrong type.
    #[error("frame field '{field}' has the wrong type: expected {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    /// The timestamp is not RFC 3339.
    #[error("invalid timestamp '{value}': {message}")]
    InvalidTimestamp { value: String, message: String },

    /// The payload does not match the schema for its kind.
    #[error("invalid '{kind}' payload: {message}")]
    InvalidPayload { kind: String, message: String },
}

impl ProtocolError {
    /// Short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            ProtocolError::InvalidJson { .. } => "E_PROTO_JSON",
            ProtocolError::MissingField { .. } => "E_PROTO_FIELD",
            ProtocolError::WrongType { .. } => "E_PROTO_TYPE",
            ProtocolError::InvalidTimestamp { .. } => "E_PROTO_TIMESTAMP",
            ProtocolError::InvalidPayload { .. } => "E_PROTO_PAYLOAD",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        assert_eq!(
            ProtocolError::MissingField { field: "kind" }.to_string(),
            "frame is missing required field 'kind'"
        );
        assert_eq!(
            ProtocolError::WrongType {
                field: "timestamp",
                expected: "string"
            }
            .to_string(),
            "frame field 'timestamp' has the wrong type: expected string"
        );
        assert_eq!(
            ProtocolError::InvalidPayload {
                kind: "new-item".to_string(),
                message: "missing field `id`".to_string()
            }
            .to_string(),
            "invalid 'new-item' payload: missing field `id`"
        );
    }

    #[test]
    fn test_protocol_error_code() {
        assert_eq!(
            ProtocolError::InvalidJson {
                message: String::new()
            }
            .error_code(),
            "E_PROTO_JSON"
        );
    }
}
