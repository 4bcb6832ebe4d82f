//! Adapter for the `runtime.v1` CRI API.
pub mod api;

use std::collections::BTreeMap;

use tonic::client::Grpc;
use tonic::transport::Channel;

use super::{ApiGeneration, CallContext, CallError, RuntimeService};
use crate::grpc;
use crate::model::{
    Container, ContainerMetadata, ContainerState, ContainerStatus, ContainerStatusResponse,
    ImageSpec, LinuxContainerResources, ListContainersResponse, ListPodSandboxResponse, Mount,
    MountPropagation, PodSandbox, PodSandboxMetadata, PodSandboxNetworkStatus, PodSandboxState,
    PodSandboxStatus, PodSandboxStatusResponse, VersionInfo,
};

const VERSION: &str = "/runtime.v1.RuntimeService/Version";
const LIST_CONTAINERS: &str = "/runtime.v1.RuntimeService/ListContainers";
const CONTAINER_STATUS: &str = "/runtime.v1.RuntimeService/ContainerStatus";
const LIST_POD_SANDBOX: &str = "/runtime.v1.RuntimeService/ListPodSandbox";
const POD_SANDBOX_STATUS: &str = "/runtime.v1.RuntimeService/PodSandboxStatus";

/// [`RuntimeService`] speaking `runtime.v1`.
#[derive(Debug, Clone)]
pub struct RuntimeServiceV1 {
    grpc: Grpc<Channel>,
}

impl RuntimeServiceV1 {
    pub fn new(channel: Channel, max_recv_msg_size: usize) -> Self {
        Self {
            grpc: Grpc::new(channel).max_decoding_message_size(max_recv_msg_size),
        }
    }
}

#[tonic::async_trait]
impl RuntimeService for RuntimeServiceV1 {
    fn generation(&self) -> ApiGeneration {
        ApiGeneration::V1
    }

    async fn version(&self, ctx: &CallContext) -> Result<VersionInfo, CallError> {
        let request = api::VersionRequest {
            version: super::KUBE_RUNTIME_API_VERSION.to_owned(),
        };
        let response: api::VersionResponse = grpc::unary(&self.grpc, VERSION, ctx, request).await?;

        Ok(response.into())
    }

    async fn list_containers(&self, ctx: &CallContext) -> Result<ListContainersResponse, CallError> {
        let response: api::ListContainersResponse =
            grpc::unary(&self.grpc, LIST_CONTAINERS, ctx, api::ListContainersRequest {}).await?;

        Ok(ListContainersResponse {
            containers: response.containers.into_iter().map(Container::from).collect(),
        })
    }

    async fn container_status(
        &self,
        ctx: &CallContext,
        container_id: &str,
        verbose: bool,
    ) -> Result<ContainerStatusResponse, CallError> {
        let request = api::ContainerStatusRequest {
            container_id: container_id.to_owned(),
            verbose,
        };
        let response: api::ContainerStatusResponse =
            grpc::unary(&self.grpc, CONTAINER_STATUS, ctx, request).await?;

        Ok(ContainerStatusResponse {
            status: response.status.map(ContainerStatus::try_from).transpose()?,
            info: response.info,
        })
    }

    async fn list_pod_sandbox(&self, ctx: &CallContext) -> Result<ListPodSandboxResponse, CallError> {
        let response: api::ListPodSandboxResponse =
            grpc::unary(&self.grpc, LIST_POD_SANDBOX, ctx, api::ListPodSandboxRequest {}).await?;

        Ok(ListPodSandboxResponse {
            items: response
                .items
                .into_iter()
                .map(PodSandbox::try_from)
                .collect::<Result<_, _>>()?,
        })
    }

    async fn pod_sandbox_status(
        &self,
        ctx: &CallContext,
        sandbox_id: &str,
        verbose: bool,
    ) -> Result<PodSandboxStatusResponse, CallError> {
        let request = api::PodSandboxStatusRequest {
            pod_sandbox_id: sandbox_id.to_owned(),
            verbose,
        };
        let response: api::PodSandboxStatusResponse =
            grpc::unary(&self.grpc, POD_SANDBOX_STATUS, ctx, request).await?;

        Ok(PodSandboxStatusResponse {
            status: response.status.map(PodSandboxStatus::try_from).transpose()?,
            info: response.info,
        })
    }
}

fn container_state(raw: i32) -> ContainerState {
    match api::ContainerState::try_from(raw) {
        Ok(api::ContainerState::ContainerCreated) => ContainerState::Created,
        Ok(api::ContainerState::ContainerRunning) => ContainerState::Running,
        Ok(api::ContainerState::ContainerExited) => ContainerState::Exited,
        Ok(api::ContainerState::ContainerUnknown) | Err(_) => ContainerState::Unknown,
    }
}

fn sandbox_state(raw: i32) -> Result<PodSandboxState, CallError> {
    match api::PodSandboxState::try_from(raw) {
        Ok(api::PodSandboxState::SandboxReady) => Ok(PodSandboxState::Ready),
        Ok(api::PodSandboxState::SandboxNotready) => Ok(PodSandboxState::NotReady),
        Err(_) => Err(CallError::MalformedResponse(format!(
            "unknown pod sandbox state {raw}"
        ))),
    }
}

impl From<api::VersionResponse> for VersionInfo {
    fn from(response: api::VersionResponse) -> Self {
        Self {
            version: response.version,
            runtime_name: response.runtime_name,
            runtime_version: response.runtime_version,
            runtime_api_version: response.runtime_api_version,
        }
    }
}

impl From<api::ContainerMetadata> for ContainerMetadata {
    fn from(metadata: api::ContainerMetadata) -> Self {
        Self {
            name: metadata.name,
            attempt: metadata.attempt,
        }
    }
}

impl From<api::ImageSpec> for ImageSpec {
    fn from(image: api::ImageSpec) -> Self {
        Self {
            image: image.image,
            annotations: image.annotations,
        }
    }
}

impl From<api::LinuxContainerResources> for LinuxContainerResources {
    fn from(resources: api::LinuxContainerResources) -> Self {
        Self {
            cpu_period: resources.cpu_period,
            cpu_quota: resources.cpu_quota,
            cpu_shares: resources.cpu_shares,
            memory_limit_in_bytes: resources.memory_limit_in_bytes,
            oom_score_adj: resources.oom_score_adj,
            cpuset_cpus: resources.cpuset_cpus,
            cpuset_mems: resources.cpuset_mems,
            hugepage_limits: resources
                .hugepage_limits
                .into_iter()
                .map(|limit| (limit.page_size, limit.limit))
                .collect::<BTreeMap<_, _>>(),
            unified: resources.unified,
            memory_swap_limit_in_bytes: resources.memory_swap_limit_in_bytes,
        }
    }
}

impl From<api::Container> for Container {
    fn from(container: api::Container) -> Self {
        Self {
            id: container.id,
            pod_sandbox_id: container.pod_sandbox_id,
            metadata: container.metadata.map(Into::into),
            image: container.image.map(Into::into),
            image_ref: container.image_ref,
            state: container_state(container.state),
            created_at: container.created_at,
            labels: container.labels,
            annotations: container.annotations,
            resources: None,
            security_context: None,
        }
    }
}

impl TryFrom<api::Mount> for Mount {
    type Error = CallError;

    fn try_from(mount: api::Mount) -> Result<Self, Self::Error> {
        let propagation = match api::MountPropagation::try_from(mount.propagation) {
            Ok(api::MountPropagation::PropagationPrivate) => MountPropagation::Private,
            Ok(api::MountPropagation::PropagationHostToContainer) => {
                MountPropagation::HostToContainer
            }
            Ok(api::MountPropagation::PropagationBidirectional) => MountPropagation::Bidirectional,
            Err(_) => {
                return Err(CallError::MalformedResponse(format!(
                    "unknown mount propagation {} for `{}`",
                    mount.propagation, mount.container_path
                )));
            }
        };

        Ok(Self {
            container_path: mount.container_path,
            host_path: mount.host_path,
            readonly: mount.readonly,
            selinux_relabel: mount.selinux_relabel,
            propagation,
        })
    }
}

impl TryFrom<api::ContainerStatus> for ContainerStatus {
    type Error = CallError;

    fn try_from(status: api::ContainerStatus) -> Result<Self, Self::Error> {
        Ok(Self {
            id: status.id,
            metadata: status.metadata.map(Into::into),
            state: container_state(status.state),
            created_at: status.created_at,
            started_at: status.started_at,
            finished_at: status.finished_at,
            exit_code: status.exit_code,
            image: status.image.map(Into::into),
            image_ref: status.image_ref,
            reason: status.reason,
            message: status.message,
            labels: status.labels,
            annotations: status.annotations,
            mounts: status
                .mounts
                .into_iter()
                .map(Mount::try_from)
                .collect::<Result<_, _>>()?,
            log_path: status.log_path,
            resources: status
                .resources
                .and_then(|resources| resources.linux)
                .map(Into::into),
            security_context: None,
        })
    }
}

impl From<api::PodSandboxMetadata> for PodSandboxMetadata {
    fn from(metadata: api::PodSandboxMetadata) -> Self {
        Self {
            name: metadata.name,
            uid: metadata.uid,
            namespace: metadata.namespace,
            attempt: metadata.attempt,
        }
    }
}

impl TryFrom<api::PodSandbox> for PodSandbox {
    type Error = CallError;

    fn try_from(sandbox: api::PodSandbox) -> Result<Self, Self::Error> {
        Ok(Self {
            id: sandbox.id,
            metadata: sandbox.metadata.map(Into::into),
            state: sandbox_state(sandbox.state)?,
            created_at: sandbox.created_at,
            labels: sandbox.labels,
            annotations: sandbox.annotations,
            runtime_handler: sandbox.runtime_handler,
        })
    }
}

impl From<api::PodSandboxNetworkStatus> for PodSandboxNetworkStatus {
    fn from(network: api::PodSandboxNetworkStatus) -> Self {
        Self {
            ip: network.ip,
            additional_ips: network.additional_ips.into_iter().map(|ip| ip.ip).collect(),
        }
    }
}

impl TryFrom<api::PodSandboxStatus> for PodSandboxStatus {
    type Error = CallError;

    fn try_from(status: api::PodSandboxStatus) -> Result<Self, Self::Error> {
        Ok(Self {
            id: status.id,
            metadata: status.metadata.map(Into::into),
            state: sandbox_state(status.state)?,
            created_at: status.created_at,
            network: status.network.map(Into::into),
            labels: status.labels,
            annotations: status.annotations,
            runtime_handler: status.runtime_handler,
        })
    }
}
