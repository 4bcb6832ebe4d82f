use std::collections::{BTreeMap, HashMap};

use super::NamespaceMode;

/// Cgroup limits applied to a Linux container.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LinuxContainerResources {
    /// CPU CFS period in microseconds.
    pub cpu_period: i64,
    /// CPU CFS quota in microseconds.
    pub cpu_quota: i64,
    /// Relative CPU weight.
    pub cpu_shares: i64,
    pub memory_limit_in_bytes: i64,
    pub oom_score_adj: i64,
    pub cpuset_cpus: String,
    pub cpuset_mems: String,
    /// Hugepage limit in bytes keyed by page size, e.g. `2MB`.
    pub hugepage_limits: BTreeMap<String, u64>,
    /// Raw cgroup v2 settings keyed by interface file, e.g. `memory.high`.
    pub unified: HashMap<String, String>,
    pub memory_swap_limit_in_bytes: i64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Capability {
    pub add_capabilities: Vec<String>,
    pub drop_capabilities: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct NamespaceOption {
    pub network: NamespaceMode,
    pub pid: NamespaceMode,
    pub ipc: NamespaceMode,
    /// Container whose namespace is joined when a mode is [`NamespaceMode::Target`].
    pub target_id: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SeLinuxOption {
    pub user: String,
    pub role: String,
    #[serde(rename = "type")]
    pub r#type: String,
    pub level: String,
}

/// Security settings applied to a Linux container.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LinuxContainerSecurityContext {
    pub capabilities: Option<Capability>,
    pub privileged: bool,
    pub namespace_options: Option<NamespaceOption>,
    pub selinux_options: Option<SeLinuxOption>,
    pub run_as_user: Option<i64>,
    pub run_as_group: Option<i64>,
    pub run_as_username: String,
    pub readonly_rootfs: bool,
    pub supplemental_groups: Vec<i64>,
    pub apparmor_profile: String,
    pub seccomp_profile_path: String,
    pub no_new_privs: bool,
    pub masked_paths: Vec<String>,
    pub readonly_paths: Vec<String>,
}
