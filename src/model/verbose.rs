use std::collections::HashMap;

use super::{DecodeError, VERBOSE_INFO_KEY};

/// Runtime-specific details returned for `verbose = true` status requests.
///
/// Only the fields shared by the common runtimes are typed, everything else
/// is kept in `extra`.
#[derive(Debug, Default, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct VerboseInfo {
    #[serde(default)]
    pub pid: Option<u32>,
    #[serde(default, rename = "sandboxID")]
    pub sandbox_id: Option<String>,
    #[serde(default, rename = "runtimeType")]
    pub runtime_type: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Decodes the JSON document stored under [`VERBOSE_INFO_KEY`].
///
/// Returns `Ok(None)` if the runtime did not report verbose info.
///
/// # Errors
///
/// Returns [`DecodeError`] if the document is not valid JSON of the expected shape.
pub(crate) fn decode_verbose_info(
    info: &HashMap<String, String>,
) -> Result<Option<VerboseInfo>, DecodeError> {
    let Some(raw) = info.get(VERBOSE_INFO_KEY) else {
        return Ok(None);
    };
    serde_json::from_str(raw)
        .map(Some)
        .map_err(|source| DecodeError {
            key: VERBOSE_INFO_KEY.to_owned(),
            source,
        })
}
