/// Error that occurs when a runtime-provided document cannot be decoded.
#[derive(Debug, thiserror::Error)]
#[error("failed to decode verbose info `{key}`: {source}")]
pub struct DecodeError {
    pub key: String,
    #[source]
    pub source: serde_json::Error,
}
