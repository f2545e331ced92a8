//! Typed pod override payload for the orchestrator backend.
//!
//! The payload is validated by construction; serialization failures
//! surface as [`crate::BuildError::Overrides`] instead of being
//! swallowed.

use fnspec::EnvVar;
use serde::{Deserialize, Serialize};

use crate::security::UserSpec;

/// Container name used inside the ephemeral pod.
pub const FUNCTION_CONTAINER_NAME: &str = "krm-function";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodOverrides {
    pub api_version: String,
    pub spec: PodSpecOverride,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpecOverride {
    pub containers: Vec<ContainerOverride>,
    pub security_context: PodSecurityContext,
    pub host_network: bool,
    pub volumes: Vec<Volume>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerOverride {
    pub name: String,
    pub image: String,
    pub stdin: bool,
    pub stdin_once: bool,
    pub env: Vec<EnvVar>,
    pub volume_mounts: Vec<VolumeMount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub name: String,
    #[serde(flatten)]
    pub source: VolumeSource,
}

/// Backing store for one orchestrator volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VolumeSource {
    #[serde(rename_all = "camelCase")]
    HostPath { path: String },
    #[serde(rename_all = "camelCase")]
    EmptyDir { medium: String },
    #[serde(rename_all = "camelCase")]
    PersistentVolumeClaim { claim_name: String },
}

/// Pod-level hardening: pinned numeric identity, no privileged mode,
/// no privilege escalation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSecurityContext {
    pub run_as_user: u32,
    pub run_as_group: u32,
    pub privileged: bool,
    pub allow_privilege_escalation: bool,
}

impl PodSecurityContext {
    pub fn hardened(user: UserSpec) -> Self {
        Self {
            run_as_user: user.uid,
            run_as_group: user.gid,
            privileged: false,
            allow_privilege_escalation: false,
        }
    }
}
