use std::fmt::Display;

/// Logs the error of a [`Result`] and continues with `None`.
///
/// Only meant for the binary boundary; library code returns its errors.
pub trait ResultOkLogExt<T, E> {
    /// Logs `"{context}: {err}"` at `warn` on failure.
    fn ok_log(self, context: impl Display) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error,
{
    fn ok_log(self, context: impl Display) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::warn!("{context}: {err}");
                None
            }
        }
    }
}
