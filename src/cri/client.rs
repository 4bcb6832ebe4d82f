use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tonic::transport::Channel;

use super::connection::{AddressResolver, Connection, Dialer, UnixDialer, UnixSocketResolver};
use super::negotiation::Negotiator;
use super::{ApiGeneration, CallContext, Error, Result, RuntimeService};
use crate::config::ClientConfig;
use crate::model::{
    ContainerStatusResponse, ListContainersResponse, ListPodSandboxResponse,
    PodSandboxStatusResponse, VersionInfo,
};

/// Entry point for talking to a container runtime.
///
/// A bound client forwards every operation to the adapter selected during
/// negotiation. An unbound client, either built with
/// [`RuntimeServiceClient::uninitialized`] or closed, answers every operation
/// with [`Error::NotInitialized`].
pub struct RuntimeServiceClient<T = Channel> {
    service: RwLock<Option<Arc<dyn RuntimeService>>>,
    info: VersionInfo,
    connection: Connection<T>,
    call_timeout: Duration,
}

impl RuntimeServiceClient<Channel> {
    /// Connects to `config.endpoint` and negotiates the API generation.
    ///
    /// # Errors
    ///
    /// Fails if the endpoint cannot be resolved or dialed, or if no candidate
    /// generation answers the version probe.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let negotiator = Negotiator::for_channel(config.negotiation, config.max_recv_msg_size);
        Self::connect_with(config, &UnixSocketResolver, &UnixDialer, &negotiator).await
    }
}

impl<T: Send + Sync> RuntimeServiceClient<T> {
    /// Like [`RuntimeServiceClient::connect`], with every collaborator supplied
    /// by the caller.
    ///
    /// # Errors
    ///
    /// See [`RuntimeServiceClient::connect`]. The transport is released before
    /// a negotiation error is returned.
    pub async fn connect_with(
        config: &ClientConfig,
        resolver: &dyn AddressResolver,
        dialer: &dyn Dialer<T>,
        negotiator: &Negotiator<T>,
    ) -> Result<Self> {
        let address = resolver.resolve(&config.endpoint)?;
        log::debug!("Dialing container runtime at {address}");
        let transport = dialer.dial(&address, config.dial_timeout).await?;

        let negotiated = match negotiator.negotiate(&transport, config.context_timeout).await {
            Ok(negotiated) => negotiated,
            Err(err) => {
                drop(transport);
                log::debug!("Released connection to {address}");
                return Err(err);
            }
        };
        let connection = Connection::new(transport);

        Ok(Self {
            service: RwLock::new(Some(negotiated.service)),
            info: negotiated.info,
            connection,
            call_timeout: config.context_timeout,
        })
    }

    /// A client with no runtime behind it.
    pub fn uninitialized() -> Self {
        Self {
            service: RwLock::new(None),
            info: VersionInfo::default(),
            connection: Connection::closed(),
            call_timeout: crate::config::DEFAULT_CONTEXT_TIMEOUT,
        }
    }

    /// Version reported by the runtime during negotiation.
    ///
    /// Kept after [`close`](Self::close) as a record of the negotiation.
    pub fn info(&self) -> &VersionInfo {
        &self.info
    }

    /// Generation of the bound adapter, `None` once closed.
    pub fn generation(&self) -> Option<ApiGeneration> {
        self.bound().map(|service| service.generation())
    }

    pub fn is_initialized(&self) -> bool {
        self.bound().is_some()
    }

    /// A fresh context bounded by the configured call timeout.
    pub fn context(&self) -> CallContext {
        CallContext::with_timeout(self.call_timeout)
    }

    /// Releases the adapter and the connection. Safe to call more than once.
    pub fn close(&self) {
        let service = self
            .service
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(service);
        if self.connection.close() {
            log::debug!("Closed runtime service client");
        }
    }

    pub async fn version(&self, ctx: &CallContext) -> Result<VersionInfo> {
        self.service()?
            .version(ctx)
            .await
            .map_err(|source| Error::Call {
                operation: "Version",
                source,
            })
    }

    pub async fn list_containers(&self, ctx: &CallContext) -> Result<ListContainersResponse> {
        self.service()?
            .list_containers(ctx)
            .await
            .map_err(|source| Error::Call {
                operation: "ListContainers",
                source,
            })
    }

    pub async fn container_status(
        &self,
        ctx: &CallContext,
        container_id: &str,
        verbose: bool,
    ) -> Result<ContainerStatusResponse> {
        self.service()?
            .container_status(ctx, container_id, verbose)
            .await
            .map_err(|source| Error::Call {
                operation: "ContainerStatus",
                source,
            })
    }

    pub async fn list_pod_sandbox(&self, ctx: &CallContext) -> Result<ListPodSandboxResponse> {
        self.service()?
            .list_pod_sandbox(ctx)
            .await
            .map_err(|source| Error::Call {
                operation: "ListPodSandbox",
                source,
            })
    }

    pub async fn pod_sandbox_status(
        &self,
        ctx: &CallContext,
        sandbox_id: &str,
        verbose: bool,
    ) -> Result<PodSandboxStatusResponse> {
        self.service()?
            .pod_sandbox_status(ctx, sandbox_id, verbose)
            .await
            .map_err(|source| Error::Call {
                operation: "PodSandboxStatus",
                source,
            })
    }

    fn bound(&self) -> Option<Arc<dyn RuntimeService>> {
        self.service
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // In-flight calls keep their own handle, so a concurrent close only
    // affects calls started after it.
    fn service(&self) -> Result<Arc<dyn RuntimeService>> {
        self.bound().ok_or(Error::NotInitialized)
    }
}

impl<T: Send + Sync> std::fmt::Debug for RuntimeServiceClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeServiceClient")
            .field("generation", &self.generation())
            .field("info", &self.info)
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}
