use std::collections::HashMap;

use super::{
    ContainerState, LinuxContainerResources, LinuxContainerSecurityContext, MountPropagation,
};

#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ContainerMetadata {
    pub name: String,
    /// Restart attempt of the container, starting at zero.
    pub attempt: u32,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ImageSpec {
    /// Image reference as requested, e.g. `nginx:latest`.
    pub image: String,
    pub annotations: HashMap<String, String>,
}

/// A container as returned by `ListContainers`.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Container {
    pub id: String,
    /// Sandbox the container runs in. A lookup key only.
    pub pod_sandbox_id: String,
    pub metadata: Option<ContainerMetadata>,
    pub image: Option<ImageSpec>,
    /// Resolved image reference, usually a digest.
    pub image_ref: String,
    pub state: ContainerState,
    /// Creation time in nanoseconds since the Unix epoch.
    pub created_at: i64,
    pub labels: HashMap<String, String>,
    pub annotations: HashMap<String, String>,
    pub resources: Option<LinuxContainerResources>,
    pub security_context: Option<LinuxContainerSecurityContext>,
}

impl Container {
    pub fn name(&self) -> Option<&str> {
        self.metadata.as_ref().map(|metadata| metadata.name.as_str())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Mount {
    pub container_path: String,
    pub host_path: String,
    pub readonly: bool,
    pub selinux_relabel: bool,
    pub propagation: MountPropagation,
}

/// Detailed status of a single container as returned by `ContainerStatus`.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ContainerStatus {
    pub id: String,
    pub metadata: Option<ContainerMetadata>,
    pub state: ContainerState,
    /// Timestamps are nanoseconds since the Unix epoch, `0` when unset.
    pub created_at: i64,
    pub started_at: i64,
    pub finished_at: i64,
    pub exit_code: i32,
    pub image: Option<ImageSpec>,
    pub image_ref: String,
    /// Brief CamelCase reason for the current state.
    pub reason: String,
    pub message: String,
    pub labels: HashMap<String, String>,
    pub annotations: HashMap<String, String>,
    pub mounts: Vec<Mount>,
    /// Absolute path of the container log on the host.
    pub log_path: String,
    pub resources: Option<LinuxContainerResources>,
    pub security_context: Option<LinuxContainerSecurityContext>,
}

impl ContainerStatus {
    pub fn name(&self) -> Option<&str> {
        self.metadata.as_ref().map(|metadata| metadata.name.as_str())
    }

    /// Returns `false` while `finished_at` is unset.
    pub fn is_finished(&self) -> bool {
        self.finished_at != 0
    }
}
