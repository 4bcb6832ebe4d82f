use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tokio::time::Instant;

use super::CallError;
use crate::model::{
    ContainerStatusResponse, ListContainersResponse, ListPodSandboxResponse,
    PodSandboxStatusResponse, VersionInfo,
};

/// Runtime API version string sent with every version probe.
pub const KUBE_RUNTIME_API_VERSION: &str = "0.1.0";

/// A CRI wire-protocol generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum ApiGeneration {
    #[serde(rename = "runtime.v1")]
    V1,
    #[serde(rename = "runtime.v1alpha2")]
    V1Alpha2,
}

impl ApiGeneration {
    /// All supported generations, newest first.
    pub const ALL: [ApiGeneration; 2] = [ApiGeneration::V1, ApiGeneration::V1Alpha2];

    /// Protobuf package of the generation.
    pub fn package(self) -> &'static str {
        match self {
            ApiGeneration::V1 => "runtime.v1",
            ApiGeneration::V1Alpha2 => "runtime.v1alpha2",
        }
    }
}

impl fmt::Display for ApiGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.package())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown CRI API generation `{0}` (expected `v1` or `v1alpha2`)")]
pub struct UnknownGenerationError(pub String);

impl FromStr for ApiGeneration {
    type Err = UnknownGenerationError;

    /// Accepts both the short (`v1`) and the package form (`runtime.v1`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches("runtime.") {
            "v1" => Ok(ApiGeneration::V1),
            "v1alpha2" => Ok(ApiGeneration::V1Alpha2),
            _ => Err(UnknownGenerationError(s.to_owned())),
        }
    }
}

/// Deadline bounding a single runtime call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    timeout: Duration,
    deadline: Instant,
}

impl CallContext {
    /// Starts a context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: Instant::now() + timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left until the deadline, zero once expired.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }
}

/// Capabilities every CRI generation adapter provides.
///
/// Implementations translate their wire schema into [`crate::model`] and
/// must honour the [`CallContext`] deadline of every call. Callers never
/// branch on the concrete implementation.
#[tonic::async_trait]
pub trait RuntimeService: Send + Sync {
    /// The wire generation spoken by this adapter.
    fn generation(&self) -> ApiGeneration;

    async fn version(&self, ctx: &CallContext) -> Result<VersionInfo, CallError>;

    async fn list_containers(&self, ctx: &CallContext) -> Result<ListContainersResponse, CallError>;

    async fn container_status(
        &self,
        ctx: &CallContext,
        container_id: &str,
        verbose: bool,
    ) -> Result<ContainerStatusResponse, CallError>;

    async fn list_pod_sandbox(&self, ctx: &CallContext) -> Result<ListPodSandboxResponse, CallError>;

    async fn pod_sandbox_status(
        &self,
        ctx: &CallContext,
        sandbox_id: &str,
        verbose: bool,
    ) -> Result<PodSandboxStatusResponse, CallError>;
}
