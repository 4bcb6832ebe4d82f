//! CRI Runtime Client: a version-negotiating client for the Kubernetes
//! Container Runtime Interface.
//!
//! The client connects to a runtime socket (containerd, CRI-O), determines
//! which CRI API generation the runtime speaks and exposes a single,
//! version-agnostic view of its containers and pod sandboxes.
pub mod config;
pub mod cri;
pub mod error;
pub mod grpc;
pub mod model;

use config::ClientConfig;
use cri::{ApiGeneration, RuntimeServiceClient};
use error::ResultOkLogExt;
use model::{ContainerStatus, PodSandbox, VersionInfo};

/// Snapshot printed by `cri-inspect`.
#[derive(Debug, serde::Serialize)]
pub struct Inventory {
    pub version: VersionInfo,
    pub generation: Option<ApiGeneration>,
    pub pod_sandboxes: Vec<PodSandbox>,
    pub containers: Vec<ContainerStatus>,
}

/// Collects the sandboxes and container statuses known to the runtime.
///
/// A container whose status cannot be fetched is logged and left out.
///
/// # Errors
///
/// Returns an error if listing sandboxes or containers fails.
pub async fn collect_inventory<T: Send + Sync>(
    client: &RuntimeServiceClient<T>,
) -> cri::Result<Inventory> {
    let pod_sandboxes = client.list_pod_sandbox(&client.context()).await?.items;
    let listed = client.list_containers(&client.context()).await?.containers;
    log::debug!(
        "Found {} pod sandboxes and {} containers",
        pod_sandboxes.len(),
        listed.len()
    );

    let mut containers = Vec::with_capacity(listed.len());
    for container in &listed {
        let status = client
            .container_status(&client.context(), &container.id, false)
            .await
            .ok_log(format!("container {}", container.id));
        if let Some(status) = status.and_then(|response| response.status) {
            containers.push(status);
        }
    }

    Ok(Inventory {
        version: client.info().clone(),
        generation: client.generation(),
        pod_sandboxes,
        containers,
    })
}

/// Runs `cri-inspect`.
///
/// Connects to the runtime configured through the environment, prints an
/// [`Inventory`] as JSON to stdout and closes the client.
///
/// # Errors
///
/// Possible errors include:
/// - Invalid configuration values (e.g., `CRI_CONTEXT_TIMEOUT_MS=soon`).
/// - An unreachable runtime socket.
/// - A runtime that speaks none of the supported CRI API versions.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;
    log::debug!("Using configuration {config:?}");

    let client = RuntimeServiceClient::connect(&config).await?;
    let inventory = collect_inventory(&client).await;
    client.close();

    let inventory = inventory?;
    let stdout = std::io::stdout();
    serde_json::to_writer_pretty(stdout.lock(), &inventory)?;
    println!();

    Ok(())
}
