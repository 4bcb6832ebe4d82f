//! Adapter for the legacy `runtime.v1alpha2` CRI API, served by containerd
//! before 1.7 and CRI-O before 1.24.
//!
//! Container states are reported with their own ordinals
//! ([`ContainerState::CreatedV1Alpha2`] and following).
pub mod api;

use tonic::client::Grpc;
use tonic::transport::Channel;

use super::{ApiGeneration, CallContext, CallError, RuntimeService};
use crate::grpc;
use crate::model::{
    Container, ContainerMetadata, ContainerState, ContainerStatus, ContainerStatusResponse,
    ImageSpec, ListContainersResponse, ListPodSandboxResponse, Mount, MountPropagation,
    PodSandbox, PodSandboxMetadata, PodSandboxNetworkStatus, PodSandboxState, PodSandboxStatus,
    PodSandboxStatusResponse, VersionInfo,
};

const VERSION: &str = "/runtime.v1alpha2.RuntimeService/Version";
const LIST_CONTAINERS: &str = "/runtime.v1alpha2.RuntimeService/ListContainers";
const CONTAINER_STATUS: &str = "/runtime.v1alpha2.RuntimeService/ContainerStatus";
const LIST_POD_SANDBOX: &str = "/runtime.v1alpha2.RuntimeService/ListPodSandbox";
const POD_SANDBOX_STATUS: &str = "/runtime.v1alpha2.RuntimeService/PodSandboxStatus";

/// [`RuntimeService`] speaking `runtime.v1alpha2`.
#[derive(Debug, Clone)]
pub struct RuntimeServiceV1Alpha2 {
    grpc: Grpc<Channel>,
}

impl RuntimeServiceV1Alpha2 {
    pub fn new(channel: Channel, max_recv_msg_size: usize) -> Self {
        Self {
            grpc: Grpc::new(channel).max_decoding_message_size(max_recv_msg_size),
        }
    }
}

#[tonic::async_trait]
impl RuntimeService for RuntimeServiceV1Alpha2 {
    fn generation(&self) -> ApiGeneration {
        ApiGeneration::V1Alpha2
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
        Ok(api::ContainerState::ContainerCreated) => ContainerState::CreatedV1Alpha2,
        Ok(api::ContainerState::ContainerRunning) => ContainerState::RunningV1Alpha2,
        Ok(api::ContainerState::ContainerExited) => ContainerState::ExitedV1Alpha2,
        Ok(api::ContainerState::ContainerUnknown) | Err(_) => ContainerState::UnknownV1Alpha2,
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

// v1alpha2 status messages carry no resources.
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
            resources: None,
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

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_container_states_use_appended_ordinals() {
        assert_eq!(container_state(0).ordinal(), 4);
        assert_eq!(container_state(1).ordinal(), 5);
        assert_eq!(container_state(2).ordinal(), 6);
        assert_eq!(container_state(3).ordinal(), 7);
        assert_eq!(container_state(-3), ContainerState::UnknownV1Alpha2);
        assert!(container_state(1).is_running());
    }

    #[test]
    fn test_container_status_translation() {
        let status = ContainerStatus::try_from(api::ContainerStatus {
            id: "c2".to_owned(),
            metadata: Some(api::ContainerMetadata {
                name: "sidecar".to_owned(),
                attempt: 0,
            }),
            state: api::ContainerState::ContainerExited as i32,
            created_at: 1,
            started_at: 2,
            finished_at: 3,
            exit_code: 137,
            reason: "OOMKilled".to_owned(),
            mounts: vec![api::Mount {
                container_path: "/data".to_owned(),
                host_path: "/srv/data".to_owned(),
                propagation: api::MountPropagation::PropagationHostToContainer as i32,
                ..Default::default()
            }],
            log_path: "/var/log/pods/sidecar/0.log".to_owned(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(status.state, ContainerState::ExitedV1Alpha2);
        assert!(status.is_finished());
        assert_eq!(status.exit_code, 137);
        assert_eq!(status.reason, "OOMKilled");
        assert_eq!(status.mounts[0].propagation, MountPropagation::HostToContainer);
        assert_eq!(status.resources, None);
    }

    #[test]
    fn test_container_status_unknown_propagation() {
        let result = ContainerStatus::try_from(api::ContainerStatus {
            mounts: vec![api::Mount {
                propagation: 3,
                ..Default::default()
            }],
            ..Default::default()
        });

        assert!(matches!(result, Err(CallError::MalformedResponse(_))));
    }

    #[test]
    fn test_container_translation() {
        let translated = Container::from(api::Container {
            id: "c2".to_owned(),
            pod_sandbox_id: "s2".to_owned(),
            state: api::ContainerState::ContainerCreated as i32,
            labels: HashMap::from([("tier".to_owned(), "web".to_owned())]),
            ..Default::default()
        });

        assert_eq!(translated.state, ContainerState::CreatedV1Alpha2);
        assert_eq!(translated.labels["tier"], "web");
        assert_eq!(translated.metadata, None);
    }

    #[test]
    fn test_pod_sandbox_status_translation() {
        let status = PodSandboxStatus::try_from(api::PodSandboxStatus {
            id: "s2".to_owned(),
            state: api::PodSandboxState::SandboxNotready as i32,
            network: Some(api::PodSandboxNetworkStatus {
                ip: String::new(),
                additional_ips: vec![],
            }),
            ..Default::default()
        })
        .unwrap();

        assert!(!status.is_ready());
        assert_eq!(status.ips().count(), 0);
    }

    #[test]
    fn test_pod_sandbox_unknown_state() {
        let result = PodSandbox::try_from(api::PodSandbox {
            id: "s3".to_owned(),
            state: 7,
            ..Default::default()
        });

        assert!(matches!(result, Err(CallError::MalformedResponse(_))));
    }
}
