/// Prints a JSON snapshot of the pod sandboxes and containers known to the
/// local container runtime.
///
/// The runtime endpoint and timeouts are read from the environment, see
/// [`cri_runtime_client::config`].
///
/// # Examples
///
/// ```bash
/// RUST_LOG=debug CRI_RUNTIME_ENDPOINT=unix:///run/containerd/containerd.sock cri-inspect
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    cri_runtime_client::run().await
}
