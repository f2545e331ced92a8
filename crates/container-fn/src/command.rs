//! Backend strategies that compose the final invocation argv.

use std::path::Path;

use fnspec::{ContainerEnv, ContainerSpec, StorageMount};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::BuildError;
use crate::exec::BuiltInvocation;
use crate::overrides::{
    ContainerOverride, PodOverrides, PodSecurityContext, PodSpecOverride, Volume, VolumeMount,
    VolumeSource, FUNCTION_CONTAINER_NAME,
};
use crate::security::UserSpec;

const DOCKER_BIN: &str = "docker";
const KUBECTL_BIN: &str = "kubectl";

const NETWORK_NONE: &str = "none";
const NETWORK_HOST: &str = "host";

/// Execution backend for a function step, fixed at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Spawn the function through a local container engine CLI.
    LocalEngine,
    /// Spawn the function as an ephemeral pod through the cluster CLI.
    Orchestrator,
}

impl Backend {
    pub fn from_flag(orchestrator: bool) -> Self {
        if orchestrator {
            Self::Orchestrator
        } else {
            Self::LocalEngine
        }
    }

    pub fn build(
        self,
        spec: &ContainerSpec,
        user: UserSpec,
        working_dir: &Path,
    ) -> Result<BuiltInvocation, BuildError> {
        match self {
            Self::LocalEngine => build_docker(spec, user, working_dir),
            Self::Orchestrator => build_kubectl(spec, user, working_dir),
        }
    }
}

/// Composes the docker argv. Shelling out to the engine CLI keeps
/// image auth and daemon selection identical to a manual `docker run`.
fn build_docker(
    spec: &ContainerSpec,
    user: UserSpec,
    working_dir: &Path,
) -> Result<BuiltInvocation, BuildError> {
    let network = if spec.network {
        NETWORK_HOST
    } else {
        NETWORK_NONE
    };

    let mut args: Vec<String> = [
        "run",
        "--rm",
        "-i",
        "-a",
        "STDIN",
        "-a",
        "STDOUT",
        "-a",
        "STDERR",
        "--network",
        network,
        "--user",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.push(user.to_string());
    args.push("--security-opt=no-new-privileges".to_string());
    // note: the root filesystem stays writable; functions are allowed
    // to spill temp files (heredocs and the like)

    for mount in &spec.storage_mounts {
        // the engine rejects relative sources, so resolve them here
        let mount = mount.with_absolute_src(working_dir);
        args.push("--mount".to_string());
        args.push(mount.to_string());
    }

    args.extend(ContainerEnv::from_entries(&spec.env).docker_flags());
    args.push(spec.image.clone());

    Ok(BuiltInvocation {
        path: DOCKER_BIN.to_string(),
        args,
        working_dir: working_dir.to_path_buf(),
    })
}

/// Composes the kubectl argv with a single-container pod override.
fn build_kubectl(
    spec: &ContainerSpec,
    user: UserSpec,
    working_dir: &Path,
) -> Result<BuiltInvocation, BuildError> {
    let env = ContainerEnv::from_entries(&spec.env).kube_env_vars();

    let mut volumes = Vec::new();
    let mut volume_mounts = Vec::new();
    for mount in &spec.storage_mounts {
        let mount = mount.with_absolute_src(working_dir);
        let source = match mount.mount_type.as_str() {
            "bind" => VolumeSource::HostPath {
                path: mount.src.clone(),
            },
            "tmpfs" => VolumeSource::EmptyDir {
                medium: "Memory".to_string(),
            },
            "volume" => VolumeSource::PersistentVolumeClaim {
                claim_name: mount.src.clone(),
            },
            other => {
                warn!(
                    mount_type = other,
                    dst = %mount.dst_path,
                    "dropping storage mount with unrecognized type"
                );
                continue;
            }
        };
        let name = volume_name(&mount);
        volume_mounts.push(VolumeMount {
            name: name.clone(),
            mount_path: mount.dst_path.clone(),
        });
        volumes.push(Volume { name, source });
    }

    let overrides = PodOverrides {
        api_version: "v1".to_string(),
        spec: PodSpecOverride {
            containers: vec![ContainerOverride {
                name: FUNCTION_CONTAINER_NAME.to_string(),
                image: spec.image.clone(),
                stdin: true,
                stdin_once: true,
                env,
                volume_mounts,
            }],
            security_context: PodSecurityContext::hardened(user),
            host_network: spec.network,
            volumes,
        },
    };
    let payload = serde_json::to_string(&overrides)?;

    let args = vec![
        "run".to_string(),
        pod_name(&spec.image),
        "--rm".to_string(),
        "--stdin".to_string(),
        "--quiet".to_string(),
        "--image".to_string(),
        spec.image.clone(),
        "--restart=Never".to_string(),
        "--overrides".to_string(),
        payload,
    ];

    Ok(BuiltInvocation {
        path: KUBECTL_BIN.to_string(),
        args,
        working_dir: working_dir.to_path_buf(),
    })
}

/// Deterministic orchestrator volume name: first 32 hex chars of the
/// SHA-256 of the resolved mount descriptor. Same descriptor, same
/// name across rebuilds; distinct descriptors collide only with
/// cryptographically negligible probability.
pub fn volume_name(mount: &StorageMount) -> String {
    let mut hasher = Sha256::new();
    hasher.update(mount.to_string().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..32].to_string()
}

/// Pod name for the ephemeral function pod: the image path basename
/// with any tag suffix stripped.
pub fn pod_name(image: &str) -> String {
    let base = image.rsplit('/').next().unwrap_or(image);
    base.split(':').next().unwrap_or(base).to_string()
}
