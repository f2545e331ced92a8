use std::fmt;
use tracing::debug;

/// The `nobody` uid/gid used whenever an identity is absent or malformed.
pub const NOBODY: u32 = 65534;

/// Numeric identity a function container runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserSpec {
    pub uid: u32,
    pub gid: u32,
}

impl UserSpec {
    pub fn nobody() -> Self {
        Self {
            uid: NOBODY,
            gid: NOBODY,
        }
    }

    /// Parses a declarative identity string.
    ///
    /// Accepted forms are `""`, `"nobody"`, and `"<uid>:<gid>"`. Any
    /// other shape falls back to `nobody` rather than erroring: an
    /// unparseable identity must never grant more privilege than the
    /// caller asked for.
    pub fn parse(identity: &str) -> Self {
        if identity.is_empty() || identity == "nobody" {
            return Self::nobody();
        }
        match identity.split_once(':') {
            Some((uid, gid)) => match (uid.parse(), gid.parse()) {
                (Ok(uid), Ok(gid)) => Self { uid, gid },
                _ => {
                    debug!(identity, "non-numeric identity, running as nobody");
                    Self::nobody()
                }
            },
            None => {
                debug!(identity, "identity missing ':' separator, running as nobody");
                Self::nobody()
            }
        }
    }
}

/// Renders the `uid:gid` form the local engine's `--user` flag takes.
impl fmt::Display for UserSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.uid, self.gid)
    }
}
