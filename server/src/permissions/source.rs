//! Platform API client for privilege rows and user profiles.

use std::time::Duration;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use super::models::{EntityField, UserProfile};

/// Errors talking to the platform API.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Transport failure or undecodable body.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API answered with a non-success status.
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    /// Source could not answer for another reason.
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// Where privilege rows and profiles come from.
///
/// Implementations return the full, unfiltered row set for a user.
pub trait PrivilegeSource: Send + Sync {
    /// Raw privilege rows for a user, undecoded so that one bad row cannot
    /// fail the whole batch.
    fn fetch_privileges<'a>(
        &'a self,
        user_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Value>, SourceError>>;

    /// Authoritative profile (role and admin scope) for a user.
    fn fetch_profile<'a>(
        &'a self,
        user_id: &'a str,
    ) -> BoxFuture<'a, Result<UserProfile, SourceError>>;

    /// Ids of the clubs belonging to a board.
    fn fetch_board_clubs<'a>(
        &'a self,
        board_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<String>, SourceError>>;
}

/// [`PrivilegeSource`] backed by the platform REST API.
///
/// Endpoints, relative to the configured base URL:
/// - `GET /privileges/user/{user_id}`
/// - `GET /users/{user_id}`
/// - `GET /boards/{board_id}/clubs`
#[derive(Debug, Clone)]
pub struct HttpPrivilegeSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPrivilegeSource {
    /// Create a client for the API rooted at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("campus-gate/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    #[tracing::instrument(skip(self))]
    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, SourceError> {
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url,
                status: status.as_u16(),
            });
        }

        Ok(response.json().await?)
    }
}

impl PrivilegeSource for HttpPrivilegeSource {
    fn fetch_privileges<'a>(
        &'a self,
        user_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Value>, SourceError>> {
        Box::pin(self.get_json::<Vec<Value>>(self.url(&format!("privileges/user/{user_id}"))))
    }

    fn fetch_profile<'a>(
        &'a self,
        user_id: &'a str,
    ) -> BoxFuture<'a, Result<UserProfile, SourceError>> {
        Box::pin(self.get_json::<UserProfile>(self.url(&format!("users/{user_id}"))))
    }

    fn fetch_board_clubs<'a>(
        &'a self,
        board_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<String>, SourceError>> {
        Box::pin(async move {
            let clubs: Vec<EntityField> = self
                .get_json(self.url(&format!("boards/{board_id}/clubs")))
                .await?;
            Ok(clubs.iter().map(|c| c.id().to_string()).collect())
        })
    }
}
