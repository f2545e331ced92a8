use std::env;
use std::fmt;
use std::path::PathBuf;

use fnspec::{ContainerSpec, Document};
use tracing::debug;

use crate::command::Backend;
use crate::error::{BuildError, ExecError, FilterError};
use crate::exec::{BuiltInvocation, EngineExec, FunctionExec};
use crate::security::UserSpec;

/// Runs a single containerized function step over a document stream.
///
/// The backend invocation is composed lazily on first use and cached
/// for the lifetime of the filter; once built it is never rebuilt.
/// Instances are not thread-safe and must not be shared: one filter
/// per function step.
pub struct ContainerFilter<E = EngineExec> {
    spec: ContainerSpec,
    identity: String,
    orchestrator: bool,
    defer_failure: bool,
    working_dir: Option<PathBuf>,
    state: BuildState,
    deferred_exit: Option<ExecError>,
    exec: E,
}

/// Explicit init state, so "built exactly once" is an invariant of the
/// type rather than an empty-string sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
enum BuildState {
    Uninitialized,
    Built(BuiltInvocation),
}

impl ContainerFilter<EngineExec> {
    pub fn new(spec: ContainerSpec, identity: impl Into<String>) -> Self {
        Self::with_exec(spec, identity, EngineExec)
    }
}

impl<E: FunctionExec> ContainerFilter<E> {
    /// Creates a filter with a custom process-exchange collaborator.
    pub fn with_exec(spec: ContainerSpec, identity: impl Into<String>, exec: E) -> Self {
        Self {
            spec,
            identity: identity.into(),
            orchestrator: false,
            defer_failure: false,
            working_dir: None,
            state: BuildState::Uninitialized,
            deferred_exit: None,
            exec,
        }
    }

    /// Run through the cluster orchestrator instead of the local engine.
    pub fn orchestrator(mut self, enabled: bool) -> Self {
        self.orchestrator = enabled;
        self
    }

    /// Capture step failures instead of raising them, until
    /// [`Self::exit_error`] is queried. Lets later steps run first.
    pub fn defer_failure(mut self, defer: bool) -> Self {
        self.defer_failure = defer;
        self
    }

    /// Working directory for relative mount sources. Defaults to the
    /// caller's current directory at build time.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Builds the backend invocation if this filter has not built one
    /// yet. Subsequent calls return the cached invocation unchanged.
    pub fn ensure_built(&mut self) -> Result<BuiltInvocation, BuildError> {
        if let BuildState::Built(invocation) = &self.state {
            return Ok(invocation.clone());
        }

        self.spec.validate().map_err(BuildError::InvalidSpec)?;
        let working_dir = match &self.working_dir {
            Some(dir) => dir.clone(),
            None => env::current_dir().map_err(BuildError::WorkingDir)?,
        };
        let backend = Backend::from_flag(self.orchestrator);
        let user = UserSpec::parse(&self.identity);
        let invocation = backend.build(&self.spec, user, &working_dir)?;
        debug!(
            backend = ?backend,
            path = %invocation.path,
            image = %self.spec.image,
            "built function invocation"
        );
        self.state = BuildState::Built(invocation.clone());
        Ok(invocation)
    }

    /// The cached invocation, if one has been built.
    pub fn invocation(&self) -> Option<&BuiltInvocation> {
        match &self.state {
            BuildState::Built(invocation) => Some(invocation),
            BuildState::Uninitialized => None,
        }
    }

    /// Ensures the invocation is built, then exchanges `input` with the
    /// spawned function through the exec collaborator.
    ///
    /// In defer-failure mode an exec failure is stored for
    /// [`Self::exit_error`] and the input documents are handed back
    /// unchanged.
    pub fn filter(&mut self, input: Vec<Document>) -> Result<Vec<Document>, FilterError> {
        let invocation = self.ensure_built()?;
        let retained = if self.defer_failure {
            Some(input.clone())
        } else {
            None
        };
        match self.exec.run(&invocation, input) {
            Ok(output) => Ok(output),
            Err(err) => match retained {
                Some(docs) => {
                    debug!(error = %err, image = %self.spec.image, "deferring step failure");
                    self.deferred_exit = Some(err);
                    Ok(docs)
                }
                None => Err(err.into()),
            },
        }
    }

    /// A failure captured in defer-failure mode, if any. Querying does
    /// not re-run the step.
    pub fn exit_error(&self) -> Option<&ExecError> {
        self.deferred_exit.as_ref()
    }
}

impl<E> fmt::Display for ContainerFilter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.defer_failure {
            write!(f, "{} deferFailure: {}", self.spec.image, self.defer_failure)
        } else {
            write!(f, "{}", self.spec.image)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_shows_image_and_defer_indicator() {
        let spec = ContainerSpec::new("example/fn:v1");
        let filter = ContainerFilter::new(spec.clone(), "");
        assert_eq!(filter.to_string(), "example/fn:v1");

        let deferred = ContainerFilter::new(spec, "").defer_failure(true);
        assert_eq!(deferred.to_string(), "example/fn:v1 deferFailure: true");
    }

    #[test]
    fn invocation_is_none_before_build() {
        let filter = ContainerFilter::new(ContainerSpec::new("example/fn:v1"), "");
        assert!(filter.invocation().is_none());
    }

    #[test]
    fn build_rejects_empty_image() {
        let mut filter = ContainerFilter::new(ContainerSpec::new(""), "");
        assert!(matches!(
            filter.ensure_built(),
            Err(BuildError::InvalidSpec(_))
        ));
        assert!(filter.invocation().is_none());
    }

    #[test]
    fn working_dir_defaults_to_current_dir() {
        let mut filter = ContainerFilter::new(ContainerSpec::new("example/fn:v1"), "");
        let invocation = filter.ensure_built().unwrap();
        assert_eq!(invocation.working_dir, env::current_dir().unwrap());
    }
}
