//! Version-negotiating client for the Kubernetes Container Runtime Interface.
//!
//! [`RuntimeServiceClient`] dials the runtime socket, probes the supported API
//! generations in priority order and binds the first adapter that answers.
//! Callers only see the types in [`crate::model`].
pub mod client;
pub mod connection;
mod error;
#[cfg(test)]
pub(crate) mod fake_runtime;
#[cfg(test)]
pub(crate) mod mock;
pub mod negotiation;
mod service;
pub mod v1;
pub mod v1alpha2;

pub use client::RuntimeServiceClient;
pub use connection::{
    AddressResolver, Connection, Dialer, RuntimeAddress, UnixDialer, UnixSocketResolver,
};
pub use error::{CallError, Error, ProbeFailure, Result};
pub use negotiation::{Candidate, Negotiated, NegotiationPolicy, Negotiator};
pub use service::{
    ApiGeneration, CallContext, KUBE_RUNTIME_API_VERSION, RuntimeService, UnknownGenerationError,
};
