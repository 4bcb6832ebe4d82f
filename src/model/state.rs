use std::fmt;

/// Lifecycle state of a container as reported by the runtime.
///
/// The numeric encoding is part of the public contract: downstream consumers
/// persist the ordinal, so existing values are never renumbered. A new
/// protocol generation appends its own set of ordinals even where the states
/// are semantically equivalent to an older set.
///
/// * `0..=3` are reported by the `runtime.v1` adapter.
/// * `4..=7` are reported by the `runtime.v1alpha2` adapter.
///
/// Use [`ContainerState::normalized`] to compare states across generations.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(into = "i32")]
#[repr(i32)]
pub enum ContainerState {
    Created = 0,
    Running = 1,
    Exited = 2,
    #[default]
    Unknown = 3,
    CreatedV1Alpha2 = 4,
    RunningV1Alpha2 = 5,
    ExitedV1Alpha2 = 6,
    UnknownV1Alpha2 = 7,
}

impl ContainerState {
    /// Every state, in ordinal order.
    pub const ALL: [ContainerState; 8] = [
        ContainerState::Created,
        ContainerState::Running,
        ContainerState::Exited,
        ContainerState::Unknown,
        ContainerState::CreatedV1Alpha2,
        ContainerState::RunningV1Alpha2,
        ContainerState::ExitedV1Alpha2,
        ContainerState::UnknownV1Alpha2,
    ];

    pub fn ordinal(self) -> i32 {
        self as i32
    }

    pub fn from_ordinal(ordinal: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.ordinal() == ordinal)
    }

    /// Collapses generation-specific ordinals onto the first generation.
    ///
    /// # Examples
    ///
    /// ```
    /// # use cri_runtime_client::model::ContainerState;
    /// assert_eq!(ContainerState::RunningV1Alpha2.normalized(), ContainerState::Running);
    /// assert_eq!(ContainerState::Exited.normalized(), ContainerState::Exited);
    /// ```
    pub fn normalized(self) -> Self {
        match self {
            ContainerState::Created | ContainerState::CreatedV1Alpha2 => ContainerState::Created,
            ContainerState::Running | ContainerState::RunningV1Alpha2 => ContainerState::Running,
            ContainerState::Exited | ContainerState::ExitedV1Alpha2 => ContainerState::Exited,
            ContainerState::Unknown | ContainerState::UnknownV1Alpha2 => ContainerState::Unknown,
        }
    }

    pub fn is_running(self) -> bool {
        self.normalized() == ContainerState::Running
    }

    pub fn is_exited(self) -> bool {
        self.normalized() == ContainerState::Exited
    }
}

impl From<ContainerState> for i32 {
    fn from(state: ContainerState) -> Self {
        state.ordinal()
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.normalized() {
            ContainerState::Created => "CREATED",
            ContainerState::Running => "RUNNING",
            ContainerState::Exited => "EXITED",
            _ => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// Readiness of a pod sandbox.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(into = "i32")]
#[repr(i32)]
pub enum PodSandboxState {
    Ready = 0,
    #[default]
    NotReady = 1,
}

impl PodSandboxState {
    pub fn from_ordinal(ordinal: i32) -> Option<Self> {
        match ordinal {
            0 => Some(PodSandboxState::Ready),
            1 => Some(PodSandboxState::NotReady),
            _ => None,
        }
    }
}

impl From<PodSandboxState> for i32 {
    fn from(state: PodSandboxState) -> Self {
        state as i32
    }
}

/// Mount propagation mode of a container mount.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(into = "i32")]
#[repr(i32)]
pub enum MountPropagation {
    /// No propagation between host and container (`rprivate`).
    #[default]
    Private = 0,
    /// Host mounts propagate into the container (`rslave`).
    HostToContainer = 1,
    /// Mounts propagate in both directions (`rshared`).
    Bidirectional = 2,
}

impl MountPropagation {
    pub fn from_ordinal(ordinal: i32) -> Option<Self> {
        match ordinal {
            0 => Some(MountPropagation::Private),
            1 => Some(MountPropagation::HostToContainer),
            2 => Some(MountPropagation::Bidirectional),
            _ => None,
        }
    }
}

impl From<MountPropagation> for i32 {
    fn from(propagation: MountPropagation) -> Self {
        propagation as i32
    }
}

/// Namespace sharing mode for the network, PID and IPC namespaces.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(into = "i32")]
#[repr(i32)]
pub enum NamespaceMode {
    #[default]
    Pod = 0,
    Container = 1,
    Node = 2,
    Target = 3,
}

impl NamespaceMode {
    pub fn from_ordinal(ordinal: i32) -> Option<Self> {
        match ordinal {
            0 => Some(NamespaceMode::Pod),
            1 => Some(NamespaceMode::Container),
            2 => Some(NamespaceMode::Node),
            3 => Some(NamespaceMode::Target),
            _ => None,
        }
    }
}

impl From<NamespaceMode> for i32 {
    fn from(mode: NamespaceMode) -> Self {
        mode as i32
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_container_state_ordinals_are_unique() {
        let mut seen = HashSet::new();
        for state in ContainerState::ALL {
            assert!(
                seen.insert(state.ordinal()),
                "duplicate state ordinal: {}",
                state.ordinal()
            );
        }
        assert_eq!(seen.len(), 8);
    }

    #[test]
    fn test_container_state_ordinals_are_stable() {
        assert_eq!(ContainerState::Created.ordinal(), 0);
        assert_eq!(ContainerState::Running.ordinal(), 1);
        assert_eq!(ContainerState::Exited.ordinal(), 2);
        assert_eq!(ContainerState::Unknown.ordinal(), 3);
        assert_eq!(ContainerState::CreatedV1Alpha2.ordinal(), 4);
        assert_eq!(ContainerState::RunningV1Alpha2.ordinal(), 5);
        assert_eq!(ContainerState::ExitedV1Alpha2.ordinal(), 6);
        assert_eq!(ContainerState::UnknownV1Alpha2.ordinal(), 7);
    }

    #[test]
    fn test_container_state_from_ordinal() {
        for state in ContainerState::ALL {
            assert_eq!(ContainerState::from_ordinal(state.ordinal()), Some(state));
        }
        assert_eq!(ContainerState::from_ordinal(8), None);
        assert_eq!(ContainerState::from_ordinal(-1), None);
    }

    #[test]
    fn test_container_state_normalized() {
        assert!(ContainerState::RunningV1Alpha2.is_running());
        assert!(ContainerState::ExitedV1Alpha2.is_exited());
        assert!(!ContainerState::Created.is_running());
        assert_eq!(
            ContainerState::UnknownV1Alpha2.normalized(),
            ContainerState::Unknown
        );
        assert_eq!(ContainerState::RunningV1Alpha2.to_string(), "RUNNING");
    }

    #[test]
    fn test_container_state_serializes_as_ordinal() {
        let json = serde_json::to_string(&ContainerState::ExitedV1Alpha2).unwrap();
        assert_eq!(json, "6");
    }

    #[test]
    fn test_namespace_mode_ordinals() {
        assert_eq!(i32::from(NamespaceMode::Pod), 0);
        assert_eq!(i32::from(NamespaceMode::Container), 1);
        assert_eq!(i32::from(NamespaceMode::Node), 2);
        assert_eq!(i32::from(NamespaceMode::Target), 3);
        assert_eq!(NamespaceMode::from_ordinal(4), None);
    }

    #[test]
    fn test_mount_propagation_ordinals() {
        assert_eq!(i32::from(MountPropagation::Private), 0);
        assert_eq!(i32::from(MountPropagation::HostToContainer), 1);
        assert_eq!(i32::from(MountPropagation::Bidirectional), 2);
        assert_eq!(MountPropagation::from_ordinal(3), None);
    }

    #[test]
    fn test_pod_sandbox_state_ordinals() {
        assert_eq!(PodSandboxState::from_ordinal(0), Some(PodSandboxState::Ready));
        assert_eq!(
            PodSandboxState::from_ordinal(1),
            Some(PodSandboxState::NotReady)
        );
        assert_eq!(PodSandboxState::from_ordinal(2), None);
    }
}
