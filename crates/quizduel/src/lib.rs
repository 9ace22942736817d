//! # QuizDuel
//!
//! Client for head-to-head ranked trivia matches.
//!
//! A [`DuelClient`] holds one authenticated connection to the match server.
//! It joins the matchmaking pool on request, and once an opponent is found
//! drives the match session: questions, the answer lock, scores and
//! opponent liveness. Everything the UI needs to show arrives as
//! [`SessionUpdate`]s on a [`MatchHandle`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quizduel::prelude::*;
//!
//! # async fn play() -> Result<(), QuizDuelError> {
//! quizduel::init_tracing();
//! let config = ClientConfig::from_env()?;
//! let client = DuelClient::connect(config, &EnvCredentials::default()).await?;
//!
//! let pending = client.find_match().await?;
//! if let MatchOutcome::Found(mut game) = pending.outcome().await? {
//!     while let Some(update) = game.next_update().await {
//!         if let SessionUpdate::QuestionOpened(prompt) = update {
//!             game.submit_answer(prompt.options[0].clone()).await?;
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod credentials;
mod error;
mod users;

pub use client::{
    DuelClient, DuelClientBuilder, MatchHandle, MatchOutcome, PendingMatch,
};
pub use config::{
    API_URL_VAR, CREDENTIAL_PLACEMENT_VAR, ClientConfig, DISCONNECT_GRACE_VAR,
    MATCHMAKING_TIMEOUT_VAR, QUESTION_SECS_VAR, SERVER_URL_VAR,
};
pub use credentials::{
    CredentialStore, EnvCredentials, StaticCredentials, TOKEN_VAR,
};
pub use error::QuizDuelError;
pub use users::{
    DirectoryError, HttpUserDirectory, StaticDirectory, UserDirectory,
};

pub use quizduel_protocol as protocol;
pub use quizduel_transport as transport;

/// Installs a `tracing` fmt subscriber filtered by `RUST_LOG`, defaulting
/// to `info`. Does nothing if a subscriber is already installed.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// The types most programs need.
pub mod prelude {
    pub use crate::{
        ClientConfig, CredentialStore, DuelClient, EnvCredentials, MatchHandle,
        MatchOutcome, PendingMatch, QuizDuelError, StaticCredentials,
    };
    pub use quizduel_match::{
        AbandonReason, Ending, GameResult, MatchConfig, OpponentPresence,
        Outcome, Player, PlayerProfile, QuestionPrompt, Scoreboard,
        SessionUpdate,
    };
    pub use quizduel_protocol::{GameId, SubscriptionId, UserId};
    pub use quizduel_transport::{ConnectionState, CredentialPlacement};
}
