//! Client configuration.

use std::time::Duration;

use quizduel_match::MatchConfig;
use quizduel_transport::{ConnectConfig, CredentialPlacement};

use crate::QuizDuelError;

pub const SERVER_URL_VAR: &str = "QUIZDUEL_SERVER_URL";
pub const API_URL_VAR: &str = "QUIZDUEL_API_URL";
pub const CREDENTIAL_PLACEMENT_VAR: &str = "QUIZDUEL_CREDENTIAL_PLACEMENT";
pub const MATCHMAKING_TIMEOUT_VAR: &str = "QUIZDUEL_MATCHMAKING_TIMEOUT_SECS";
pub const QUESTION_SECS_VAR: &str = "QUIZDUEL_QUESTION_SECS";
pub const DISCONNECT_GRACE_VAR: &str = "QUIZDUEL_DISCONNECT_GRACE_SECS";

/// Everything [`DuelClient`](crate::DuelClient) needs to reach the servers.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// The match server.
    pub connect: ConnectConfig,
    /// Base URL of the account API, for user lookups.
    pub api_base_url: String,
    /// Matchmaking and session timeouts.
    pub match_config: MatchConfig,
}

impl ClientConfig {
    /// Creates a config for the given match server and account API.
    pub fn new(server_url: impl Into<String>, api_base_url: impl Into<String>) -> Self {
        Self {
            connect: ConnectConfig::new(server_url),
            api_base_url: api_base_url.into(),
            match_config: MatchConfig::default(),
        }
    }

    /// Sets where the bearer credential goes in the handshake.
    #[must_use]
    pub fn with_credential_placement(mut self, placement: CredentialPlacement) -> Self {
        self.connect = self.connect.with_credential_placement(placement);
        self
    }

    /// Replaces the match timeouts.
    #[must_use]
    pub fn with_match_config(mut self, match_config: MatchConfig) -> Self {
        self.match_config = match_config;
        self
    }

    /// Reads the config from `QUIZDUEL_*` environment variables. Unset
    /// variables keep their defaults.
    ///
    /// # Errors
    /// Returns [`QuizDuelError::Config`] if a variable is set but invalid.
    pub fn from_env() -> Result<Self, QuizDuelError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), with `lookup` standing in for the
    /// environment.
    ///
    /// # Errors
    /// Returns [`QuizDuelError::Config`] if a value is set but invalid.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, QuizDuelError> {
        let mut config = Self::default();

        if let Some(url) = lookup(SERVER_URL_VAR) {
            config.connect.url = url;
        }
        if let Some(url) = lookup(API_URL_VAR) {
            config.api_base_url = url;
        }
        if let Some(placement) = lookup(CREDENTIAL_PLACEMENT_VAR) {
            config.connect.credential_placement = parse_placement(&placement)?;
        }

        let mut match_config = config.match_config;
        if let Some(timeout) = secs(&lookup, MATCHMAKING_TIMEOUT_VAR)? {
            match_config = match_config.with_matchmaking_timeout(timeout);
        }
        if let Some(limit) = secs(&lookup, QUESTION_SECS_VAR)? {
            match_config = match_config.with_question_time_limit(limit);
        }
        if let Some(grace) = secs(&lookup, DISCONNECT_GRACE_VAR)? {
            match_config = match_config.with_disconnect_grace(grace);
        }
        config.match_config = match_config.validated();

        Ok(config)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("ws://127.0.0.1:3000", "http://127.0.0.1:3000/")
    }
}

fn secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<Duration>, QuizDuelError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u64>()
        .map(|s| Some(Duration::from_secs(s)))
        .map_err(|_| QuizDuelError::Config(format!("{key}: `{raw}` is not a number of seconds")))
}

fn parse_placement(raw: &str) -> Result<CredentialPlacement, QuizDuelError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "header" | "authorization" => Ok(CredentialPlacement::AuthorizationHeader),
        "subprotocol" => Ok(CredentialPlacement::Subprotocol),
        other => Err(QuizDuelError::Config(format!(
            "{CREDENTIAL_PLACEMENT_VAR}: expected `header` or `subprotocol`, got `{other}`"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_empty_environment_gives_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.connect.url, "ws://127.0.0.1:3000");
        assert_eq!(config.api_base_url, "http://127.0.0.1:3000/");
        assert_eq!(config.match_config, MatchConfig::default());
        assert_eq!(
            config.connect.credential_placement,
            CredentialPlacement::Subprotocol
        );
    }

    #[test]
    fn test_values_are_read() {
        let config = ClientConfig::from_lookup(lookup(&[
            (SERVER_URL_VAR, "wss://duel.example"),
            (API_URL_VAR, "https://api.example/v1/"),
            (CREDENTIAL_PLACEMENT_VAR, "Header"),
            (MATCHMAKING_TIMEOUT_VAR, "45"),
            (QUESTION_SECS_VAR, " 10 "),
            (DISCONNECT_GRACE_VAR, "60"),
        ]))
        .unwrap();

        assert_eq!(config.connect.url, "wss://duel.example");
        assert_eq!(config.api_base_url, "https://api.example/v1/");
        assert_eq!(
            config.connect.credential_placement,
            CredentialPlacement::AuthorizationHeader
        );
        assert_eq!(config.match_config.matchmaking_timeout, Duration::from_secs(45));
        assert_eq!(config.match_config.question_time_limit, Duration::from_secs(10));
        assert_eq!(config.match_config.disconnect_grace, Duration::from_secs(60));
    }

    #[test]
    fn test_zero_seconds_is_clamped() {
        let config =
            ClientConfig::from_lookup(lookup(&[(QUESTION_SECS_VAR, "0")])).unwrap();
        assert_eq!(config.match_config.question_time_limit, Duration::from_secs(1));
    }

    #[test]
    fn test_huge_seconds_are_clamped() {
        let config = ClientConfig::from_lookup(lookup(&[
            (QUESTION_SECS_VAR, "18446744073709551615"),
            (DISCONNECT_GRACE_VAR, "9999999"),
        ]))
        .unwrap();
        assert_eq!(config.match_config.question_time_limit, MatchConfig::MAX_DURATION);
        assert_eq!(config.match_config.disconnect_grace, MatchConfig::MAX_DURATION);
    }

    #[test]
    fn test_bad_number_is_config_error() {
        let err = ClientConfig::from_lookup(lookup(&[(MATCHMAKING_TIMEOUT_VAR, "soon")]))
            .unwrap_err();
        assert!(matches!(err, QuizDuelError::Config(_)));
        assert!(err.to_string().contains(MATCHMAKING_TIMEOUT_VAR));
    }

    #[test]
    fn test_bad_placement_is_config_error() {
        let err = ClientConfig::from_lookup(lookup(&[(CREDENTIAL_PLACEMENT_VAR, "cookie")]))
            .unwrap_err();
        assert!(matches!(err, QuizDuelError::Config(_)));
    }
}
