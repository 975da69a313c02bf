//! Thin WebUI API v2 client with SID cookie session handling.

use reqwest::header::{COOKIE, REFERER, SET_COOKIE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{QBittorrentError, Result};
use crate::models::TorrentInfo;

#[derive(Clone)]
struct Credentials {
    username: String,
    password: String,
}

/// HTTP client for a single qBittorrent WebUI instance.
pub struct QBittorrentClient {
    http: Client,
    base_url: String,
    credentials: Option<Credentials>,
    sid: RwLock<Option<String>>,
}

impl QBittorrentClient {
    /// Create a client for the WebUI at `base_url` (for example `http://localhost:8080`).
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http_client(base_url, Client::new())
    }

    /// Create a client that reuses an existing `reqwest` client.
    #[must_use]
    pub fn with_http_client(base_url: impl Into<String>, http: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            credentials: None,
            sid: RwLock::new(None),
        }
    }

    /// Attach login credentials; enables transparent re-login on `403`.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/api/v2{path}", self.base_url)
    }

    /// Current session cookie, if logged in.
    pub async fn sid(&self) -> Option<String> {
        self.sid.read().await.clone()
    }

    /// Replace the session cookie.
    pub async fn set_sid(&self, sid: Option<String>) {
        *self.sid.write().await = sid;
    }

    /// Log in with the configured credentials and store the session cookie.
    ///
    /// POST /api/v2/auth/login
    ///
    /// # Errors
    ///
    /// Returns [`QBittorrentError::Auth`] when the WebUI rejects the login.
    pub async fn login(&self) -> Result<()> {
        let (username, password) = self
            .credentials
            .as_ref()
            .map_or(("", ""), |creds| (creds.username.as_str(), creds.password.as_str()));
        let params = [("username", username), ("password", password)];

        let response = self
            .http
            .post(self.url("/auth/login"))
            .header(REFERER, self.base_url.as_str())
            .form(&params)
            .send()
            .await?;
        let status = response.status();

        if let Some(sid) = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(parse_sid)
        {
            self.set_sid(Some(sid)).await;
            debug!("stored qbittorrent session cookie");
        }

        let body = response.text().await.unwrap_or_default();
        match (status.is_success(), body.trim()) {
            (true, "Ok.") => Ok(()),
            (_, "Fails.") => Err(QBittorrentError::Auth {
                detail: "invalid username or password".to_string(),
            }),
            _ => Err(QBittorrentError::Auth {
                detail: format!("login failed with status {}: {body}", status.as_u16()),
            }),
        }
    }

    /// End the current session.
    ///
    /// POST /api/v2/auth/logout
    ///
    /// # Errors
    ///
    /// Propagates transport and API failures.
    pub async fn logout(&self) -> Result<()> {
        let url = self.url("/auth/logout");
        self.execute(|http| http.post(&url)).await?;
        self.set_sid(None).await;
        Ok(())
    }

    /// Application version string.
    ///
    /// GET /api/v2/app/version
    ///
    /// # Errors
    ///
    /// Propagates transport and API failures.
    pub async fn app_version(&self) -> Result<String> {
        let url = self.url("/app/version");
        let response = self.execute(|http| http.get(&url)).await?;
        Ok(response.text().await?.trim().to_string())
    }

    /// Torrent list, optionally restricted to `hashes`.
    ///
    /// GET /api/v2/torrents/info
    ///
    /// # Errors
    ///
    /// Propagates transport, API and decoding failures.
    pub async fn torrents_info(&self, hashes: Option<&[&str]>) -> Result<Vec<TorrentInfo>> {
        let url = self.url("/torrents/info");
        let joined = hashes.map(|hashes| hashes.join("|"));
        let response = self
            .execute(|http| {
                let request = http.get(&url);
                match &joined {
                    Some(hashes) => request.query(&[("hashes", hashes.as_str())]),
                    None => request,
                }
            })
            .await?;
        Ok(response.json::<Vec<TorrentInfo>>().await?)
    }

    /// Relocate torrent storage.
    ///
    /// POST /api/v2/torrents/setLocation
    ///
    /// # Errors
    ///
    /// Propagates transport and API failures.
    pub async fn set_location(&self, hashes: &[&str], location: &str) -> Result<()> {
        let url = self.url("/torrents/setLocation");
        let params = [("hashes", hashes.join("|")), ("location", location.to_string())];
        self.execute(|http| http.post(&url).form(&params)).await?;
        Ok(())
    }

    /// Remove torrents, optionally with their data.
    ///
    /// POST /api/v2/torrents/delete
    ///
    /// # Errors
    ///
    /// Propagates transport and API failures.
    pub async fn delete(&self, hashes: &[&str], delete_files: bool) -> Result<()> {
        let url = self.url("/torrents/delete");
        let params = [
            ("hashes", hashes.join("|")),
            ("deleteFiles", delete_files.to_string()),
        ];
        self.execute(|http| http.post(&url).form(&params)).await?;
        Ok(())
    }

    /// Send a request with the session cookie; on `403` log in again and retry once.
    async fn execute<F>(&self, build: F) -> Result<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let response = self.send_once(&build).await?;
        if response.status() == StatusCode::FORBIDDEN && self.credentials.is_some() {
            warn!("qbittorrent session rejected; logging in again");
            self.login().await?;
            let retried = self.send_once(&build).await?;
            return check_status(retried).await;
        }
        check_status(response).await
    }

    async fn send_once<F>(&self, build: &F) -> Result<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut request = build(&self.http);
        if let Some(sid) = self.sid().await {
            request = request.header(COOKIE, format!("SID={sid}"));
        }
        Ok(request.send().await?)
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(QBittorrentError::Api {
        status_code: status.as_u16(),
        message,
    })
}

// "SID=xxx; HttpOnly; path=/" -> "xxx"
fn parse_sid(cookie: &str) -> Option<String> {
    cookie
        .split(';')
        .next()
        .and_then(|pair| pair.trim().strip_prefix("SID="))
        .filter(|sid| !sid.is_empty())
        .map(str::to_string)
}
