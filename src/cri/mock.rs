//! In-memory runtime used to exercise negotiation and the client facade.
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::connection::{Dialer, RuntimeAddress};
use super::{ApiGeneration, CallContext, CallError, Candidate, RuntimeService};
use crate::model::{
    Container, ContainerState, ContainerStatusResponse, ListContainersResponse, ListPodSandboxResponse,
    PodSandboxStatusResponse, VersionInfo,
};

/// Behaviour of a [`MockRuntime`] version probe.
#[derive(Debug, Clone)]
pub(crate) enum Probe {
    Answer { delay: Duration, info: VersionInfo },
    Fail { delay: Duration },
    Hang,
}

/// Stand-in transport that records how many handles are alive.
pub(crate) type MockTransport = Arc<AtomicUsize>;

/// Hands out clones of one shared transport.
pub(crate) struct MockDialer(pub(crate) MockTransport);

#[tonic::async_trait]
impl Dialer<MockTransport> for MockDialer {
    async fn dial(
        &self,
        _address: &RuntimeAddress,
        _timeout: Duration,
    ) -> super::Result<MockTransport> {
        Ok(Arc::clone(&self.0))
    }
}

pub(crate) struct MockRuntime {
    generation: ApiGeneration,
    probe: Probe,
    _transport: MockTransport,
}

pub(crate) fn info(version: &str, name: &str, runtime_version: &str) -> VersionInfo {
    VersionInfo {
        version: version.to_owned(),
        runtime_name: name.to_owned(),
        runtime_version: runtime_version.to_owned(),
        runtime_api_version: version.to_owned(),
    }
}

pub(crate) fn candidate(generation: ApiGeneration, probe: Probe) -> Candidate<MockTransport> {
    Candidate::new(
        generation,
        move |transport: &MockTransport| -> Arc<dyn RuntimeService> {
            transport.fetch_add(1, Ordering::SeqCst);
            Arc::new(MockRuntime {
                generation,
                probe: probe.clone(),
                _transport: Arc::clone(transport),
            })
        },
    )
}

#[tonic::async_trait]
impl RuntimeService for MockRuntime {
    fn generation(&self) -> ApiGeneration {
        self.generation
    }

    async fn version(&self, _ctx: &CallContext) -> Result<VersionInfo, CallError> {
        match &self.probe {
            Probe::Answer { delay, info } => {
                tokio::time::sleep(*delay).await;
                Ok(info.clone())
            }
            Probe::Fail { delay } => {
                tokio::time::sleep(*delay).await;
                Err(tonic::Status::unimplemented("unknown service").into())
            }
            Probe::Hang => std::future::pending().await,
        }
    }

    async fn list_containers(
        &self,
        _ctx: &CallContext,
    ) -> Result<ListContainersResponse, CallError> {
        Ok(ListContainersResponse {
            containers: vec![Container {
                id: format!("{}-container", self.generation),
                state: ContainerState::Running,
                ..Default::default()
            }],
        })
    }

    async fn container_status(
        &self,
        _ctx: &CallContext,
        container_id: &str,
        _verbose: bool,
    ) -> Result<ContainerStatusResponse, CallError> {
        Err(tonic::Status::not_found(format!("container {container_id} not found")).into())
    }

    async fn list_pod_sandbox(
        &self,
        _ctx: &CallContext,
    ) -> Result<ListPodSandboxResponse, CallError> {
        Ok(ListPodSandboxResponse::default())
    }

    async fn pod_sandbox_status(
        &self,
        _ctx: &CallContext,
        _sandbox_id: &str,
        _verbose: bool,
    ) -> Result<PodSandboxStatusResponse, CallError> {
        Ok(PodSandboxStatusResponse::default())
    }
}

