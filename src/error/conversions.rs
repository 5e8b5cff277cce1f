//! Type Conversions for pipeline errors
//!
//! `From` implementations that turn third-party errors into the stage-level
//! error enums.

use super::types::{CodecError, TransportError};

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        Self::failed("json", err)
    }
}

#[cfg(feature = "xml")]
impl From<quick_xml::DeError> for CodecError {
    fn from(err: quick_xml::DeError) -> Self {
        Self::failed("xml", err)
    }
}

#[cfg(feature = "xml")]
impl From<quick_xml::SeError> for CodecError {
    fn from(err: quick_xml::SeError) -> Self {
        Self::failed("xml", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: CodecError = json_err.into();
        assert!(matches!(err, CodecError::Failed { ref codec, .. } if codec == "json"));
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: TransportError = io.into();
        assert!(matches!(err, TransportError::Io(ref m) if m.contains("missing")));
    }
}
