//! One-time availability probes for the builtin codec backends.
//!
//! Each backend is exercised once per process on first use. The outcome is
//! cached; a failed probe logs one warning and every later use fails fast.

use once_cell::sync::OnceCell;

use super::ContentType;
use crate::error::CodecError;

static JSON: OnceCell<Result<(), String>> = OnceCell::new();
static XML: OnceCell<Result<(), String>> = OnceCell::new();

/// Fails with `CodecUnavailable` if the backend for `content_type` is missing.
pub fn ensure(content_type: ContentType) -> Result<(), CodecError> {
    let outcome = match content_type {
        ContentType::Plain => return Ok(()),
        ContentType::Json => JSON.get_or_init(|| record(content_type, probe_json())),
        ContentType::Xml => XML.get_or_init(|| record(content_type, probe_xml())),
    };
    check(content_type, outcome)
}

fn check(content_type: ContentType, outcome: &Result<(), String>) -> Result<(), CodecError> {
    outcome
        .clone()
        .map_err(|reason| CodecError::CodecUnavailable {
            codec: content_type.name().to_string(),
            reason,
        })
}

pub fn is_available(content_type: ContentType) -> bool {
    ensure(content_type).is_ok()
}

fn record(content_type: ContentType, outcome: Result<(), String>) -> Result<(), String> {
    match &outcome {
        Ok(()) => {
            tracing::debug!(target: "wirelink::codec", codec = %content_type, "codec backend available")
        }
        Err(reason) => {
            tracing::warn!(target: "wirelink::codec", codec = %content_type, %reason, "codec backend unavailable")
        }
    }
    outcome
}

fn probe_json() -> Result<(), String> {
    let wire = serde_json::to_vec(&serde_json::json!({ "probe": [1, "two", true] }))
        .map_err(|e| e.to_string())?;
    serde_json::from_slice::<serde_json::Value>(&wire)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

#[cfg(feature = "xml")]
fn probe_xml() -> Result<(), String> {
    #[derive(serde::Serialize, serde::Deserialize, PartialEq)]
    struct Probe {
        value: u8,
    }

    let wire = quick_xml::se::to_string(&Probe { value: 7 }).map_err(|e| e.to_string())?;
    let back: Probe = quick_xml::de::from_str(&wire).map_err(|e| e.to_string())?;
    if back == (Probe { value: 7 }) {
        Ok(())
    } else {
        Err("xml backend produced a different value on round trip".to_string())
    }
}

#[cfg(not(feature = "xml"))]
fn probe_xml() -> Result<(), String> {
    Err("wirelink was compiled without the `xml` feature".to_string())
}
