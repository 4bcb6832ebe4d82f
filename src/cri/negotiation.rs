use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tonic::transport::Channel;

use super::v1::RuntimeServiceV1;
use super::v1alpha2::RuntimeServiceV1Alpha2;
use super::{ApiGeneration, CallContext, CallError, Error, ProbeFailure, Result, RuntimeService};
use crate::model::VersionInfo;

/// Builds an adapter on top of a shared transport.
pub type AdapterFactory<T> = Box<dyn Fn(&T) -> Arc<dyn RuntimeService> + Send + Sync>;

/// Order in which the default candidates are probed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationPolicy {
    /// `runtime.v1`, then `runtime.v1alpha2`. Kubelet negotiates the same way.
    #[default]
    NewestFirst,
    /// `runtime.v1alpha2`, then `runtime.v1`.
    OldestFirst,
    /// Probe a single generation and fail if it does not answer.
    Only(ApiGeneration),
}

impl NegotiationPolicy {
    pub fn order(self) -> Vec<ApiGeneration> {
        match self {
            NegotiationPolicy::NewestFirst => ApiGeneration::ALL.to_vec(),
            NegotiationPolicy::OldestFirst => ApiGeneration::ALL.iter().rev().copied().collect(),
            NegotiationPolicy::Only(generation) => vec![generation],
        }
    }
}

/// An adapter generation that may be bound to a transport.
pub struct Candidate<T> {
    generation: ApiGeneration,
    factory: AdapterFactory<T>,
}

impl<T> Candidate<T> {
    pub fn new(
        generation: ApiGeneration,
        factory: impl Fn(&T) -> Arc<dyn RuntimeService> + Send + Sync + 'static,
    ) -> Self {
        Self {
            generation,
            factory: Box::new(factory),
        }
    }

    pub fn generation(&self) -> ApiGeneration {
        self.generation
    }
}

impl Candidate<Channel> {
    /// The built-in adapter for `generation` over a tonic channel.
    pub fn for_channel(generation: ApiGeneration, max_recv_msg_size: usize) -> Self {
        match generation {
            ApiGeneration::V1 => Candidate::new(
                generation,
                move |channel: &Channel| -> Arc<dyn RuntimeService> {
                    Arc::new(RuntimeServiceV1::new(channel.clone(), max_recv_msg_size))
                },
            ),
            ApiGeneration::V1Alpha2 => Candidate::new(
                generation,
                move |channel: &Channel| -> Arc<dyn RuntimeService> {
                    Arc::new(RuntimeServiceV1Alpha2::new(
                        channel.clone(),
                        max_recv_msg_size,
                    ))
                },
            ),
        }
    }
}

impl<T> fmt::Debug for Candidate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

/// Outcome of a successful negotiation.
pub struct Negotiated {
    pub generation: ApiGeneration,
    pub service: Arc<dyn RuntimeService>,
    pub info: VersionInfo,
}

impl fmt::Debug for Negotiated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Negotiated")
            .field("generation", &self.generation)
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// Selects the first candidate, in priority order, that answers a version probe.
#[derive(Debug)]
pub struct Negotiator<T> {
    candidates: Vec<Candidate<T>>,
}

impl<T> Negotiator<T> {
    pub fn new(candidates: Vec<Candidate<T>>) -> Self {
        Self { candidates }
    }

    /// Candidate generations in the order they are probed.
    pub fn order(&self) -> impl Iterator<Item = ApiGeneration> + '_ {
        self.candidates.iter().map(Candidate::generation)
    }

    /// Probes every candidate against `transport` until one answers.
    ///
    /// Each probe is bounded by `probe_timeout`. A candidate that fails is
    /// dropped before the next one is built, releasing whatever it holds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NegotiationExhausted`] with one [`ProbeFailure`] per
    /// candidate if none answered.
    pub async fn negotiate(&self, transport: &T, probe_timeout: Duration) -> Result<Negotiated> {
        let mut failures = Vec::with_capacity(self.candidates.len());
        for candidate in &self.candidates {
            let service = (candidate.factory)(transport);
            let ctx = CallContext::with_timeout(probe_timeout);
            match probe(service.as_ref(), &ctx).await {
                Ok(info) => {
                    log::info!(
                        "Negotiated CRI {} with {} {} (api {})",
                        candidate.generation,
                        info.runtime_name,
                        info.runtime_version,
                        info.runtime_api_version
                    );
                    return Ok(Negotiated {
                        generation: candidate.generation,
                        service,
                        info,
                    });
                }
                Err(error) => {
                    log::debug!("CRI {} probe failed: {}", candidate.generation, error);
                    failures.push(ProbeFailure {
                        generation: candidate.generation,
                        error,
                    });
                }
            }
        }

        Err(Error::NegotiationExhausted { failures })
    }
}

impl Negotiator<Channel> {
    /// The built-in adapters in the order given by `policy`.
    pub fn for_channel(policy: NegotiationPolicy, max_recv_msg_size: usize) -> Self {
        Self::new(
            policy
                .order()
                .into_iter()
                .map(|generation| Candidate::for_channel(generation, max_recv_msg_size))
                .collect(),
        )
    }
}

async fn probe(
    service: &dyn RuntimeService,
    ctx: &CallContext,
) -> std::result::Result<VersionInfo, CallError> {
    let info = tokio::time::timeout_at(ctx.deadline(), service.version(ctx))
        .await
        .map_err(|_| CallError::DeadlineExceeded(ctx.timeout()))??;
    if info.is_empty() {
        return Err(CallError::MalformedResponse(
            "empty version response".to_owned(),
        ));
    }

    Ok(info)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::cri::mock::{MockTransport, Probe, candidate, info};

    fn answer(info: VersionInfo) -> Probe {
        Probe::Answer {
            delay: Duration::ZERO,
            info,
        }
    }

    #[tokio::test]
    async fn test_first_successful_candidate_wins() {
        let transport = MockTransport::default();
        let negotiator = Negotiator::new(vec![
            candidate(ApiGeneration::V1, answer(info("v1", "containerd", "1.7.0"))),
            candidate(
                ApiGeneration::V1Alpha2,
                answer(info("v1alpha2", "containerd", "1.6.8")),
            ),
        ]);

        let negotiated = negotiator
            .negotiate(&transport, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(negotiated.generation, ApiGeneration::V1);
        assert_eq!(negotiated.service.generation(), ApiGeneration::V1);
        assert_eq!(negotiated.info, info("v1", "containerd", "1.7.0"));
        // The second candidate is never built.
        assert_eq!(transport.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_falls_back_after_timed_out_probe() {
        let transport = MockTransport::default();
        let negotiator = Negotiator::new(vec![
            candidate(
                ApiGeneration::V1,
                Probe::Fail {
                    delay: Duration::from_millis(50),
                },
            ),
            candidate(
                ApiGeneration::V1Alpha2,
                Probe::Answer {
                    delay: Duration::from_millis(10),
                    info: info("v1alpha2", "containerd", "1.6.8"),
                },
            ),
        ]);

        let negotiated = negotiator
            .negotiate(&transport, Duration::from_millis(500))
            .await
            .unwrap();
        assert_eq!(negotiated.generation, ApiGeneration::V1Alpha2);
        assert_eq!(negotiated.info.version, "v1alpha2");
        assert_eq!(negotiated.info.runtime_name, "containerd");
        assert_eq!(negotiated.info.runtime_version, "1.6.8");
        // Only the bound adapter still holds the transport.
        assert_eq!(Arc::strong_count(&transport), 2);
    }

    #[tokio::test]
    async fn test_hanging_probe_is_bounded_by_timeout() {
        let transport = MockTransport::default();
        let negotiator = Negotiator::new(vec![
            candidate(ApiGeneration::V1, Probe::Hang),
            candidate(
                ApiGeneration::V1Alpha2,
                answer(info("v1alpha2", "cri-o", "1.23.0")),
            ),
        ]);

        let started = tokio::time::Instant::now();
        let negotiated = negotiator
            .negotiate(&transport, Duration::from_millis(50))
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));
        assert_eq!(negotiated.generation, ApiGeneration::V1Alpha2);
        assert_eq!(negotiated.info.runtime_name, "cri-o");
    }

    #[tokio::test]
    async fn test_exhausted_negotiation_releases_candidates() {
        let transport = MockTransport::default();
        let negotiator = Negotiator::new(vec![
            candidate(
                ApiGeneration::V1,
                Probe::Fail {
                    delay: Duration::ZERO,
                },
            ),
            candidate(ApiGeneration::V1Alpha2, Probe::Hang),
        ]);

        let err = negotiator
            .negotiate(&transport, Duration::from_millis(20))
            .await
            .unwrap_err();
        match err {
            Error::NegotiationExhausted { failures } => {
                assert_eq!(failures.len(), 2);
                assert_eq!(failures[0].generation, ApiGeneration::V1);
                assert!(matches!(failures[0].error, CallError::Status(_)));
                assert_eq!(failures[1].generation, ApiGeneration::V1Alpha2);
                assert!(matches!(failures[1].error, CallError::DeadlineExceeded(_)));
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(transport.load(Ordering::SeqCst), 2);
        assert_eq!(Arc::strong_count(&transport), 1);
    }

    #[tokio::test]
    async fn test_empty_version_response_is_rejected() {
        let transport = MockTransport::default();
        let negotiator = Negotiator::new(vec![candidate(
            ApiGeneration::V1,
            answer(VersionInfo::default()),
        )]);

        let err = negotiator
            .negotiate(&transport, Duration::from_secs(1))
            .await
            .unwrap_err();
        match err {
            Error::NegotiationExhausted { failures } => {
                assert!(matches!(failures[0].error, CallError::MalformedResponse(_)));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_no_candidates() {
        let negotiator: Negotiator<MockTransport> = Negotiator::new(Vec::new());

        let err = negotiator
            .negotiate(&MockTransport::default(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NegotiationExhausted { failures } if failures.is_empty()));
    }

    #[test]
    fn test_policy_order() {
        assert_eq!(
            NegotiationPolicy::NewestFirst.order(),
            vec![ApiGeneration::V1, ApiGeneration::V1Alpha2]
        );
        assert_eq!(
            NegotiationPolicy::OldestFirst.order(),
            vec![ApiGeneration::V1Alpha2, ApiGeneration::V1]
        );
        assert_eq!(
            NegotiationPolicy::Only(ApiGeneration::V1Alpha2).order(),
            vec![ApiGeneration::V1Alpha2]
        );
    }

    #[tokio::test]
    async fn test_channel_negotiator_follows_policy() {
        let negotiator = Negotiator::for_channel(NegotiationPolicy::OldestFirst, 1024);
        assert_eq!(
            negotiator.order().collect::<Vec<_>>(),
            vec![ApiGeneration::V1Alpha2, ApiGeneration::V1]
        );
    }
}
