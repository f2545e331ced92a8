//! Turns a declarative function-step spec into a securely configured
//! container invocation and runs it over a document stream.
//!
//! Two backends are supported: a local container engine (docker CLI)
//! and a cluster orchestrator (kubectl, running the function as an
//! ephemeral pod). Both apply the same least-privilege defaults:
//! network isolation unless the spec shares the host network, a
//! non-root numeric identity, and no privilege escalation.
//!
//! The entry point is [`ContainerFilter`], which builds its backend
//! invocation lazily on first use, exactly once, and delegates the
//! actual process exchange to a [`FunctionExec`] collaborator.

pub mod command;
pub mod error;
pub mod exec;
pub mod filter;
pub mod overrides;
pub mod security;

pub use command::Backend;
pub use error::{BuildError, ExecError, FilterError};
pub use exec::{BuiltInvocation, EngineExec, FunctionExec};
pub use filter::ContainerFilter;
pub use security::UserSpec;
