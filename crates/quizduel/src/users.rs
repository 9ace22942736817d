//! Looking up player identities.
//!
//! The match protocol only ever carries user ids. Display names and
//! avatars come from the account API, which the client reaches over HTTP
//! with the same bearer token it uses for the match server.

use std::collections::HashMap;
use std::future::Future;

use quizduel_match::PlayerProfile;
use quizduel_protocol::UserId;
use quizduel_transport::Credential;
use serde::Deserialize;

/// Errors from a [`UserDirectory`].
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// The request did not complete, or the body was not a user record.
    #[error("user lookup failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("user lookup returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for logging.
        body: String,
    },

    /// The current-user record did not say who we are.
    #[error("user record has no userId")]
    MissingUserId,

    /// The directory has no such user.
    #[error("unknown user {0}")]
    UnknownUser(UserId),
}

/// Resolves user ids to display identities.
pub trait UserDirectory: Send + Sync + 'static {
    /// Looks up the user with `id`.
    fn get_user(
        &self,
        id: &UserId,
        credential: &Credential,
    ) -> impl Future<Output = Result<PlayerProfile, DirectoryError>> + Send;

    /// Looks up the user the credential belongs to.
    fn current_user(
        &self,
        credential: &Credential,
    ) -> impl Future<Output = Result<PlayerProfile, DirectoryError>> + Send;
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// A user as the account API returns it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord {
    #[serde(default)]
    user_id: Option<UserId>,
    username: String,
    #[serde(default)]
    user_avatar: Option<String>,
}

impl UserRecord {
    fn into_profile(self, id: UserId) -> PlayerProfile {
        PlayerProfile {
            id,
            username: self.username,
            avatar: self.user_avatar,
        }
    }
}

/// A [`UserDirectory`] backed by the account API.
///
/// - `GET {base}/user/{id}` for another player
/// - `GET {base}/user/token` for the owner of the bearer token
#[derive(Debug, Clone)]
pub struct HttpUserDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpUserDirectory {
    /// Creates a directory for the API at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Creates a directory that sends its requests through `client`.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    async fn fetch(
        &self,
        path: &str,
        credential: &Credential,
    ) -> Result<UserRecord, DirectoryError> {
        let url = self.url(path);
        tracing::debug!(%url, "looking up user");

        let response = self
            .client
            .get(&url)
            .bearer_auth(credential.expose())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DirectoryError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<UserRecord>().await?)
    }
}

impl UserDirectory for HttpUserDirectory {
    fn get_user(
        &self,
        id: &UserId,
        credential: &Credential,
    ) -> impl Future<Output = Result<PlayerProfile, DirectoryError>> + Send {
        async move {
            let record = self.fetch(&format!("user/{id}"), credential).await?;
            Ok(record.into_profile(id.clone()))
        }
    }

    fn current_user(
        &self,
        credential: &Credential,
    ) -> impl Future<Output = Result<PlayerProfile, DirectoryError>> + Send {
        async move {
            let mut record = self.fetch("user/token", credential).await?;
            let id = record.user_id.take().ok_or(DirectoryError::MissingUserId)?;
            Ok(record.into_profile(id))
        }
    }
}

// ---------------------------------------------------------------------------
// Static
// ---------------------------------------------------------------------------

/// A fixed, in-memory [`UserDirectory`].
///
/// For offline play and tests. Every credential maps to the same local
/// user.
#[derive(Debug, Clone)]
pub struct StaticDirectory {
    local: PlayerProfile,
    users: HashMap<UserId, PlayerProfile>,
}

impl StaticDirectory {
    /// Creates a directory whose current user is `local`.
    pub fn new(local: PlayerProfile) -> Self {
        let mut users = HashMap::new();
        users.insert(local.id.clone(), local.clone());
        Self { local, users }
    }

    /// Adds another known user.
    #[must_use]
    pub fn with_user(mut self, profile: PlayerProfile) -> Self {
        self.users.insert(profile.id.clone(), profile);
        self
    }
}

impl UserDirectory for StaticDirectory {
    fn get_user(
        &self,
        id: &UserId,
        _credential: &Credential,
    ) -> impl Future<Output = Result<PlayerProfile, DirectoryError>> + Send {
        let found = self
            .users
            .get(id)
            .cloned()
            .ok_or_else(|| DirectoryError::UnknownUser(id.clone()));
        async move { found }
    }

    fn current_user(
        &self,
        _credential: &Credential,
    ) -> impl Future<Output = Result<PlayerProfile, DirectoryError>> + Send {
        let local = self.local.clone();
        async move { Ok(local) }
    }
}
