use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tonic::transport::Channel;

use super::{Error, Result};

const UNIX_SCHEME: &str = "unix://";

/// A resolved runtime socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeAddress {
    path: PathBuf,
}

impl RuntimeAddress {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for RuntimeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", UNIX_SCHEME, self.path.display())
    }
}

/// Turns a configured endpoint into a [`RuntimeAddress`].
pub trait AddressResolver: Send + Sync {
    /// # Errors
    ///
    /// Returns [`Error::Resolve`] if the endpoint cannot be used.
    fn resolve(&self, endpoint: &str) -> Result<RuntimeAddress>;
}

/// Resolves `unix:///path` endpoints and bare absolute paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnixSocketResolver;

impl AddressResolver for UnixSocketResolver {
    fn resolve(&self, endpoint: &str) -> Result<RuntimeAddress> {
        let invalid = |reason: &str| Error::Resolve {
            endpoint: endpoint.to_owned(),
            reason: reason.to_owned(),
        };

        let trimmed = endpoint.trim();
        let path = match trimmed.strip_prefix(UNIX_SCHEME) {
            Some(path) => path,
            None if trimmed.contains("://") => {
                return Err(invalid("only the unix protocol is supported"));
            }
            None => trimmed,
        };
        if path.is_empty() {
            return Err(invalid("missing socket path"));
        }
        let path = Path::new(path);
        if !path.is_absolute() {
            return Err(invalid("socket path must be absolute"));
        }

        Ok(RuntimeAddress::new(path))
    }
}

/// Establishes the transport to a resolved runtime address.
#[tonic::async_trait]
pub trait Dialer<T>: Send + Sync {
    /// # Errors
    ///
    /// Returns [`Error::Dial`] if no transport could be established within `timeout`.
    async fn dial(&self, address: &RuntimeAddress, timeout: Duration) -> Result<T>;
}

/// Dials a tonic [`Channel`] over a unix domain socket.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnixDialer;

#[tonic::async_trait]
impl Dialer<Channel> for UnixDialer {
    async fn dial(&self, address: &RuntimeAddress, timeout: Duration) -> Result<Channel> {
        let dial = crate::grpc::channel_for_unix_socket(address.path(), timeout);
        match tokio::time::timeout(timeout, dial).await {
            Ok(Ok(channel)) => Ok(channel),
            Ok(Err(source)) => Err(Error::Dial {
                address: address.to_string(),
                source: Box::new(source),
            }),
            Err(_) => Err(Error::Dial {
                address: address.to_string(),
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("dial timed out after {timeout:?}"),
                )),
            }),
        }
    }
}

/// Owner of a transport that can be released exactly once.
#[derive(Debug)]
pub struct Connection<T> {
    transport: Mutex<Option<T>>,
}

impl<T> Connection<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Mutex::new(Some(transport)),
        }
    }

    /// A connection that was never established.
    pub fn closed() -> Self {
        Self {
            transport: Mutex::new(None),
        }
    }

    pub fn is_open(&self) -> bool {
        self.transport
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Drops the transport. Returns `true` if this call released it.
    pub fn close(&self) -> bool {
        let transport = self
            .transport
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        transport.is_some()
    }
}
