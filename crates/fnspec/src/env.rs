use serde::{Deserialize, Serialize};
use std::env;

/// Ordered environment for a function container.
///
/// Built from the spec's `envs` list: `KEY=VALUE` entries pass through
/// verbatim, bare `KEY` entries are resolved against the calling
/// process's environment at build time. An unset bare key is still
/// forwarded with an empty value so the variable reaches the function.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerEnv {
    vars: Vec<(String, String)>,
}

impl ContainerEnv {
    pub fn from_entries(entries: &[String]) -> Self {
        let mut vars = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry.split_once('=') {
                Some((key, value)) => vars.push((key.to_string(), value.to_string())),
                None => vars.push((entry.clone(), env::var(entry).unwrap_or_default())),
            }
        }
        Self { vars }
    }

    /// Resolved variables in declaration order.
    pub fn vars(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `-e KEY=VALUE` flag pairs for the local engine CLI.
    pub fn docker_flags(&self) -> Vec<String> {
        let mut flags = Vec::with_capacity(self.vars.len() * 2);
        for (key, value) in &self.vars {
            flags.push("-e".to_string());
            flags.push(format!("{}={}", key, value));
        }
        flags
    }

    /// `{name, value}` structures for the orchestrator override
    /// payload, in declaration order.
    pub fn kube_env_vars(&self) -> Vec<EnvVar> {
        self.vars
            .iter()
            .map(|(name, value)| EnvVar {
                name: name.clone(),
                value: value.clone(),
            })
            .collect()
    }
}

/// One environment entry of an orchestrator container override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}
