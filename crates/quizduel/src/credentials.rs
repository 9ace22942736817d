//! Where the bearer token comes from.
//!
//! The token is issued at login, which is outside this crate. A
//! [`CredentialStore`] only has to hand back whatever was stored.

use quizduel_transport::Credential;

use crate::QuizDuelError;

/// Environment variable read by [`EnvCredentials::default`].
pub const TOKEN_VAR: &str = "QUIZDUEL_TOKEN";

/// Supplies the bearer credential for the match server and the account
/// API.
pub trait CredentialStore: Send + Sync {
    /// Returns the stored credential.
    ///
    /// # Errors
    /// Returns [`QuizDuelError::Config`] if no token is stored, or
    /// [`QuizDuelError::Transport`] if the stored token is unusable.
    fn credential(&self) -> Result<Credential, QuizDuelError>;
}

/// A token held in memory.
#[derive(Clone)]
pub struct StaticCredentials {
    token: String,
}

impl StaticCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl CredentialStore for StaticCredentials {
    fn credential(&self) -> Result<Credential, QuizDuelError> {
        Ok(Credential::bearer(self.token.clone())?)
    }
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticCredentials(***)")
    }
}

/// A token read from an environment variable each time it is needed.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    var: String,
}

impl EnvCredentials {
    /// Reads the token from `var`.
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    pub fn var(&self) -> &str {
        &self.var
    }
}

impl Default for EnvCredentials {
    fn default() -> Self {
        Self::new(TOKEN_VAR)
    }
}

impl CredentialStore for EnvCredentials {
    fn credential(&self) -> Result<Credential, QuizDuelError> {
        let token = std::env::var(&self.var)
            .map_err(|_| QuizDuelError::Config(format!("{} is not set", self.var)))?;
        Ok(Credential::bearer(token)?)
    }
}
