use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Declarative specification of a containerized function step.
///
/// Constructed once per step and read-only afterwards. Field names on
/// the wire match the declarative config format (`mounts`, `envs`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSpec {
    /// Image reference for the function container.
    pub image: String,

    /// Share the host network namespace. Off by default; functions run
    /// network-isolated unless they explicitly ask otherwise.
    #[serde(default)]
    pub network: bool,

    /// Storage mounts, in declaration order.
    #[serde(default, rename = "mounts")]
    pub storage_mounts: Vec<StorageMount>,

    /// Environment entries: `KEY=VALUE` pairs, or bare `KEY` names
    /// inherited from the calling process at build time.
    #[serde(default, rename = "envs")]
    pub env: Vec<String>,
}

impl ContainerSpec {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.image.trim().is_empty() {
            anyhow::bail!("container function requires an image reference");
        }
        Ok(())
    }
}

/// One declared storage mount for a function container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageMount {
    /// `bind`, `volume`, or `tmpfs`. Other values are forwarded to the
    /// local engine untouched and dropped by the orchestrator backend.
    #[serde(rename = "type")]
    pub mount_type: String,

    /// Host path (`bind`), claim name (`volume`), or unused (`tmpfs`).
    /// May be relative; resolved against the working directory when the
    /// invocation is built.
    #[serde(default)]
    pub src: String,

    /// Absolute path inside the container.
    #[serde(rename = "dst")]
    pub dst_path: String,
}

impl StorageMount {
    pub fn new(
        mount_type: impl Into<String>,
        src: impl Into<String>,
        dst_path: impl Into<String>,
    ) -> Self {
        Self {
            mount_type: mount_type.into(),
            src: src.into(),
            dst_path: dst_path.into(),
        }
    }

    /// Returns a copy with a relative `src` resolved against
    /// `working_dir`. Absolute sources are left untouched.
    pub fn with_absolute_src(&self, working_dir: &Path) -> Self {
        if Path::new(&self.src).is_absolute() {
            return self.clone();
        }
        Self {
            src: working_dir.join(&self.src).to_string_lossy().into_owned(),
            ..self.clone()
        }
    }
}

/// The canonical mount descriptor. This single form serves as the
/// local engine's `--mount` flag value and as the digest input for
/// orchestrator volume naming.
impl fmt::Display for StorageMount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "type={},src={},dst={}",
            self.mount_type, self.src, self.dst_path
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_descriptor_renders_all_fields() {
        let mount = StorageMount::new("bind", "/data/cfg", "/cfg");
        assert_eq!(mount.to_string(), "type=bind,src=/data/cfg,dst=/cfg");
    }

    #[test]
    fn relative_src_resolves_against_working_dir() {
        let mount = StorageMount::new("bind", "data", "/data");
        let resolved = mount.with_absolute_src(Path::new("/work"));
        assert_eq!(resolved.src, "/work/data");
        assert_eq!(resolved.dst_path, "/data");
    }

    #[test]
    fn absolute_src_is_untouched() {
        let mount = StorageMount::new("bind", "/srv/data", "/data");
        let resolved = mount.with_absolute_src(Path::new("/work"));
        assert_eq!(resolved.src, "/srv/data");
    }

    #[test]
    fn validate_rejects_missing_image() {
        assert!(ContainerSpec::new("").validate().is_err());
        assert!(ContainerSpec::new("example/fn:v1").validate().is_ok());
    }

    #[test]
    fn spec_deserializes_declarative_wire_names() {
        let config = concat!(
            "image: example/fn:v1\n",
            "network: true\n",
            "mounts:\n",
            "- type: bind\n",
            "  src: cfg\n",
            "  dst: /cfg\n",
            "envs:\n",
            "- FOO=bar\n",
        );
        let spec: ContainerSpec = serde_yaml::from_str(config).unwrap();
        assert_eq!(spec.image, "example/fn:v1");
        assert!(spec.network);
        assert_eq!(spec.storage_mounts[0].mount_type, "bind");
        assert_eq!(spec.storage_mounts[0].dst_path, "/cfg");
        assert_eq!(spec.env, vec!["FOO=bar".to_string()]);
    }
}
