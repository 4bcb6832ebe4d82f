use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{pin, task};

use hyper_util::rt::TokioIo;
use tokio::net::UnixStream;
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};

use crate::cri::{CallContext, CallError};

/// Connects every request to the runtime socket at `path`, whatever the URI.
#[derive(Debug, Clone)]
struct UnixConnector {
    path: PathBuf,
}

impl tower::Service<hyper::Uri> for UnixConnector {
    type Response = TokioIo<UnixStream>;
    type Error = std::io::Error;
    type Future = pin::Pin<Box<dyn Future<Output = std::io::Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut task::Context<'_>) -> task::Poll<std::io::Result<()>> {
        task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, _uri: hyper::Uri) -> Self::Future {
        let path = self.path.clone();
        Box::pin(async move {
            log::trace!("Opening runtime socket {}", path.display());
            UnixStream::connect(&path).await.map(TokioIo::new)
        })
    }
}

/// Opens an insecure gRPC channel over the unix socket at `path`.
///
/// The connection is established eagerly and bounded by `connect_timeout`.
pub async fn channel_for_unix_socket(
    path: impl AsRef<Path>,
    connect_timeout: Duration,
) -> Result<Channel, tonic::transport::Error> {
    let path = path.as_ref();
    log::debug!("Connecting to {}...", path.display());
    let connector = UnixConnector {
        path: path.to_path_buf(),
    };
    // The authority is ignored by the connector but required by the endpoint.
    let channel = Endpoint::from_static("http://[::]:50051")
        .connect_timeout(connect_timeout)
        .connect_with_connector(connector)
        .await?;
    log::debug!("Created channel for {}.", path.display());

    Ok(channel)
}

/// Issues a unary call to `path` bounded by the deadline of `ctx`.
///
/// The remaining time is propagated to the runtime as `grpc-timeout` and
/// enforced locally, so a stalled runtime cannot hold the call past its
/// deadline.
pub(crate) async fn unary<Req, Resp>(
    grpc: &Grpc<Channel>,
    path: &'static str,
    ctx: &CallContext,
    message: Req,
) -> Result<Resp, CallError>
where
    Req: prost::Message + Send + Sync + 'static,
    Resp: prost::Message + Default + Send + Sync + 'static,
{
    let remaining = ctx.remaining();
    if remaining.is_zero() {
        return Err(CallError::DeadlineExceeded(ctx.timeout()));
    }

    let mut grpc = grpc.clone();
    let mut request = tonic::Request::new(message);
    request.set_timeout(remaining);
    log::trace!("Calling {path} (timeout={remaining:?})");

    let call = async move {
        grpc.ready().await.map_err(|err| {
            tonic::Status::unavailable(format!("runtime service was not ready: {err}"))
        })?;
        let codec: ProstCodec<Req, Resp> = ProstCodec::default();
        grpc.unary(request, PathAndQuery::from_static(path), codec)
            .await
    };

    match tokio::time::timeout_at(ctx.deadline(), call).await {
        Ok(Ok(response)) => Ok(response.into_inner()),
        Ok(Err(status)) if status.code() == tonic::Code::DeadlineExceeded => {
            Err(CallError::DeadlineExceeded(ctx.timeout()))
        }
        Ok(Err(status)) => Err(status.into()),
        Err(_) => Err(CallError::DeadlineExceeded(ctx.timeout())),
    }
}
