//! In-process `runtime.v1` server on a unix socket. Only `Version` and
//! `ListContainers` are served; every other method, and every other API
//! generation, answers `Unimplemented`.
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tempfile::TempDir;
use tokio::net::UnixListener;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnixListenerStream;
use tonic::codegen::{Body, BoxFuture, StdError, http};
use tonic::server::{NamedService, UnaryService};

use super::v1::api;

/// What the server observed, in arrival order.
#[derive(Debug, Default)]
pub(crate) struct Seen {
    /// `version` field of every version request.
    pub(crate) versions: Vec<String>,
    /// `grpc-timeout` header of every request routed to the service.
    pub(crate) timeouts: Vec<Option<String>>,
}

#[derive(Debug, Clone)]
struct FakeRuntimeV1 {
    containers: usize,
    seen: Arc<Mutex<Seen>>,
}

impl<B> tonic::codegen::Service<http::Request<B>> for FakeRuntimeV1
where
    B: Body + Send + 'static,
    B::Error: Into<StdError> + Send + 'static,
{
    type Response = http::Response<tonic::body::Body>;
    type Error = Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let timeout = req
            .headers()
            .get("grpc-timeout")
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        self.seen.lock().unwrap().timeouts.push(timeout);

        let runtime = self.clone();
        match req.uri().path() {
            "/runtime.v1.RuntimeService/Version" => Box::pin(async move {
                let mut grpc = tonic::server::Grpc::new(tonic::codec::ProstCodec::default());
                Ok(grpc.unary(Version(runtime), req).await)
            }),
            "/runtime.v1.RuntimeService/ListContainers" => Box::pin(async move {
                let mut grpc = tonic::server::Grpc::new(tonic::codec::ProstCodec::default());
                Ok(grpc.unary(ListContainers(runtime), req).await)
            }),
            _ => Box::pin(async { Ok(tonic::Status::unimplemented("not served").into_http()) }),
        }
    }
}

impl NamedService for FakeRuntimeV1 {
    const NAME: &'static str = "runtime.v1.RuntimeService";
}

struct Version(FakeRuntimeV1);

impl UnaryService<api::VersionRequest> for Version {
    type Response = api::VersionResponse;
    type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;

    fn call(&mut self, request: tonic::Request<api::VersionRequest>) -> Self::Future {
        let version = request.into_inner().version;
        self.0.seen.lock().unwrap().versions.push(version.clone());
        Box::pin(async move {
            Ok(tonic::Response::new(api::VersionResponse {
                version,
                runtime_name: "fake-runtime".to_owned(),
                runtime_version: "1.7.0".to_owned(),
                runtime_api_version: "v1".to_owned(),
            }))
        })
    }
}

struct ListContainers(FakeRuntimeV1);

impl UnaryService<api::ListContainersRequest> for ListContainers {
    type Response = api::ListContainersResponse;
    type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;

    fn call(&mut self, _request: tonic::Request<api::ListContainersRequest>) -> Self::Future {
        let containers = (0..self.0.containers)
            .map(|i| api::Container {
                id: format!("{i:064}"),
                pod_sandbox_id: format!("sandbox-{i}"),
                state: api::ContainerState::ContainerRunning as i32,
                ..Default::default()
            })
            .collect();
        Box::pin(async move {
            Ok(tonic::Response::new(api::ListContainersResponse {
                containers,
            }))
        })
    }
}

/// A served socket. The server stops when this is dropped.
pub(crate) struct RunningRuntime {
    pub(crate) endpoint: String,
    pub(crate) seen: Arc<Mutex<Seen>>,
    task: JoinHandle<()>,
    _dir: TempDir,
}

impl Drop for RunningRuntime {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Serves a runtime that lists `containers` containers.
pub(crate) fn serve(containers: usize) -> RunningRuntime {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("runtime.sock");
    let listener = UnixListener::bind(&path).unwrap();
    let seen = Arc::new(Mutex::new(Seen::default()));
    let runtime = FakeRuntimeV1 {
        containers,
        seen: Arc::clone(&seen),
    };

    let task = tokio::spawn(async move {
        let served = tonic::transport::Server::builder()
            .add_service(runtime)
            .serve_with_incoming(UnixListenerStream::new(listener))
            .await;
        if let Err(err) = served {
            log::error!("fake runtime stopped: {err}");
        }
    });

    RunningRuntime {
        endpoint: format!("unix://{}", path.display()),
        seen,
        task,
        _dir: dir,
    }
}
