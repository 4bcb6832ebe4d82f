use std::collections::HashMap;

use super::PodSandboxState;

#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PodSandboxMetadata {
    pub name: String,
    pub uid: String,
    pub namespace: String,
    pub attempt: u32,
}

/// A pod sandbox as returned by `ListPodSandbox`.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PodSandbox {
    pub id: String,
    pub metadata: Option<PodSandboxMetadata>,
    pub state: PodSandboxState,
    /// Creation time in nanoseconds since the Unix epoch.
    pub created_at: i64,
    pub labels: HashMap<String, String>,
    pub annotations: HashMap<String, String>,
    /// Runtime handler the sandbox was created with, empty for the default.
    pub runtime_handler: String,
}

/// IP addresses assigned to a pod sandbox.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PodSandboxNetworkStatus {
    pub ip: String,
    pub additional_ips: Vec<String>,
}

/// Detailed status of a pod sandbox as returned by `PodSandboxStatus`.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PodSandboxStatus {
    pub id: String,
    pub metadata: Option<PodSandboxMetadata>,
    pub state: PodSandboxState,
    pub created_at: i64,
    pub network: Option<PodSandboxNetworkStatus>,
    pub labels: HashMap<String, String>,
    pub annotations: HashMap<String, String>,
    pub runtime_handler: String,
}

impl PodSandboxStatus {
    pub fn is_ready(&self) -> bool {
        self.state == PodSandboxState::Ready
    }

    /// All pod IPs, primary first.
    pub fn ips(&self) -> impl Iterator<Item = &str> {
        self.network.iter().flat_map(|network| {
            std::iter::once(network.ip.as_str())
                .filter(|ip| !ip.is_empty())
                .chain(network.additional_ips.iter().map(String::as_str))
        })
    }
}
