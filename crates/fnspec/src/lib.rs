//! Declarative model for containerized function steps.
//!
//! A function step is one containerized transformation applied to a
//! stream of documents: the step declares an image, storage mounts,
//! and environment entries; a backend turns that declaration into a
//! concrete invocation. This crate holds the backend-agnostic half of
//! that contract.

pub mod env;
pub mod spec;

pub use env::{ContainerEnv, EnvVar};
pub use spec::{ContainerSpec, StorageMount};

/// A single document flowing through a function step.
///
/// Parsing and serialization of the document model belong to the
/// caller; steps only see opaque values.
pub type Document = serde_yaml::Value;
