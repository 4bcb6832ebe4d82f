//! Version-agnostic view of the runtime's containers and pod sandboxes.
//!
//! Every adapter translates its wire schema into these types. All values are
//! snapshots of a single request and are never updated afterwards.
use std::collections::HashMap;

mod container;
mod error;
mod linux;
mod sandbox;
mod state;
mod verbose;

pub use container::{Container, ContainerMetadata, ContainerStatus, ImageSpec, Mount};
pub use error::DecodeError;
pub use linux::{
    Capability, LinuxContainerResources, LinuxContainerSecurityContext, NamespaceOption,
    SeLinuxOption,
};
pub use sandbox::{PodSandbox, PodSandboxMetadata, PodSandboxNetworkStatus, PodSandboxStatus};
pub use state::{ContainerState, MountPropagation, NamespaceMode, PodSandboxState};
pub use verbose::VerboseInfo;

/// Key of the JSON document in a verbose status `info` map.
pub const VERBOSE_INFO_KEY: &str = "info";

/// Identity of the runtime, recorded once during negotiation.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct VersionInfo {
    /// Version of the kubelet runtime API the runtime answered with.
    pub version: String,
    pub runtime_name: String,
    pub runtime_version: String,
    pub runtime_api_version: String,
}

impl VersionInfo {
    /// Returns `true` if the runtime left every field empty.
    pub fn is_empty(&self) -> bool {
        self.version.is_empty()
            && self.runtime_name.is_empty()
            && self.runtime_version.is_empty()
            && self.runtime_api_version.is_empty()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ListContainersResponse {
    pub containers: Vec<Container>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ContainerStatusResponse {
    pub status: Option<ContainerStatus>,
    /// Runtime-specific details, only filled for verbose requests.
    pub info: HashMap<String, String>,
}

impl ContainerStatusResponse {
    /// Decodes the runtime's verbose info document.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] if the document is present but malformed.
    pub fn verbose_info(&self) -> Result<Option<VerboseInfo>, DecodeError> {
        verbose::decode_verbose_info(&self.info)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ListPodSandboxResponse {
    pub items: Vec<PodSandbox>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PodSandboxStatusResponse {
    pub status: Option<PodSandboxStatus>,
    pub info: HashMap<String, String>,
}

impl PodSandboxStatusResponse {
    /// Decodes the runtime's verbose info document.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] if the document is present but malformed.
    pub fn verbose_info(&self) -> Result<Option<VerboseInfo>, DecodeError> {
        verbose::decode_verbose_info(&self.info)
    }
}
