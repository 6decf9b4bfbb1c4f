//! GitHub OAuth code exchange.
//!
//! The web layer keeps only the resulting login in a plain cookie; this
//! module's job is turning a `?code=` callback parameter into that login.
//! Configuration is via environment variables:
//! - `RSK_GITHUB_CLIENT_ID`
//! - `RSK_GITHUB_CLIENT_SECRET`
//!
//! When neither is set the exchange runs in fake mode and the code itself
//! is taken as the login, which is what the tests use.

use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;

use crate::error::Result;

const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const USER_URL: &str = "https://api.github.com/user";

/// GitHub OAuth client.
#[derive(Debug, Clone)]
pub struct GithubAuth {
    client_id: String,
    client_secret: String,
    http: Client,
    fake: bool,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GithubUser {
    login: String,
}

impl GithubAuth {
    /// Create client from environment variables, falling back to fake mode
    /// when the OAuth app is not configured.
    pub fn from_env() -> Self {
        match (
            std::env::var("RSK_GITHUB_CLIENT_ID"),
            std::env::var("RSK_GITHUB_CLIENT_SECRET"),
        ) {
            (Ok(id), Ok(secret)) => Self::new(id, secret),
            _ => Self::fake(),
        }
    }

    /// Create with explicit OAuth app credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            http: Client::new(),
            fake: false,
        }
    }

    /// A client that skips GitHub entirely and treats the callback code as
    /// the login. For tests and local development.
    pub fn fake() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            http: Client::new(),
            fake: true,
        }
    }

    /// Where to send the user to start the OAuth dance.
    pub fn login_uri(&self) -> String {
        format!(
            "https://github.com/login/oauth/authorize?client_id={}",
            self.client_id
        )
    }

    /// Exchange a callback code for the GitHub login, lowercased.
    pub async fn login(&self, code: &str) -> Result<String> {
        if self.fake {
            return Ok(code.to_lowercase());
        }
        let token: TokenResponse = self
            .http
            .post(TOKEN_URL)
            .header(ACCEPT, "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let user: GithubUser = self
            .http
            .get(USER_URL)
            .bearer_auth(token.access_token)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, concat!("rsk/", env!("CARGO_PKG_VERSION")))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(user.login.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_mode_takes_code_as_login() {
        let auth = GithubAuth::fake();
        let login = auth.login("Jeff23").await.unwrap();
        assert_eq!(login, "jeff23");
    }
}
