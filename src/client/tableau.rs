//! Tableau Server REST client
//!
//! Provides `TableauClient` for signing in to a site with a personal
//! access token, and `Session` for the site-scoped calls an export run
//! makes: listing data sources, downloading their packaged archives, and
//! signing out.

use super::PatCredentials;
use bytes::Bytes;
use eyre::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

/// REST API version prefix used for all requests.
const API_VERSION: &str = "3.22";

/// Header carrying the session auth token.
const AUTH_HEADER: &str = "X-Tableau-Auth";

/// Page size for data source listing requests.
const PAGE_SIZE: usize = 100;

/// A data source handle returned by the server listing.
///
/// Fetched fresh each run and discarded after use; only the id (for the
/// download request) and display name (for matching and blob naming) are
/// kept.
#[derive(Clone, Debug, Deserialize)]
pub struct Datasource {
    pub id: String,
    pub name: String,
}

/// Unauthenticated client for a Tableau Server.
///
/// Use [`TableauClient::sign_in`] to open a [`Session`]; all other server
/// calls are scoped to a session.
#[derive(Clone, Debug)]
pub struct TableauClient {
    client: Client,
    url: Url,
}

impl TableauClient {
    /// Create a new client from a server base URL.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn try_new(url: Url) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(reqwest::header::ACCEPT, "application/json".parse()?);
        let client = Client::builder().default_headers(headers).build()?;
        Ok(Self { client, url })
    }

    /// Sign in to a site with a personal access token, returning an
    /// authenticated [`Session`].
    ///
    /// # Errors
    /// Returns an error if the server is unreachable, rejects the
    /// credentials, or returns an unparseable response.
    pub async fn sign_in(&self, credentials: &PatCredentials, site: &str) -> Result<Session> {
        let body = serde_json::json!({
            "credentials": {
                "personalAccessTokenName": credentials.token_name,
                "personalAccessTokenSecret": credentials.token_secret,
                "site": { "contentUrl": site },
            }
        });

        let response = self
            .client
            .post(endpoint(&self.url, "auth/signin")?)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.url))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            eyre::bail!("Sign-in to {} rejected ({}): {}", self.url, status, text);
        }

        let signin: SignInResponse = response
            .json()
            .await
            .context("Failed to parse sign-in response")?;

        log::debug!("Signed in, site id {}", signin.credentials.site.id);
        Ok(Session {
            client: self.client.clone(),
            url: self.url.clone(),
            token: signin.credentials.token,
            site_id: signin.credentials.site.id,
        })
    }
}

impl std::fmt::Display for TableauClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// An authenticated, site-scoped session.
///
/// One session spans a whole run; [`Session::sign_out`] consumes it so a
/// signed-out session cannot be reused.
pub struct Session {
    client: Client,
    url: Url,
    token: String,
    site_id: String,
}

impl Session {
    /// The site id resolved at sign-in.
    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    /// List every data source visible to the session, in server order.
    ///
    /// Follows the server's pagination until `totalAvailable` entries
    /// have been collected.
    pub async fn list_datasources(&self) -> Result<Vec<Datasource>> {
        let path = format!("sites/{}/datasources", self.site_id);
        let mut all = Vec::new();
        let mut page = 1usize;

        loop {
            let response = self
                .client
                .get(endpoint(&self.url, &path)?)
                .header(AUTH_HEADER, &self.token)
                .query(&[
                    ("pageSize", PAGE_SIZE.to_string()),
                    ("pageNumber", page.to_string()),
                ])
                .send()
                .await
                .context("Failed to list data sources")?;

            if !response.status().is_success() {
                eyre::bail!("Data source listing failed: {}", response.status());
            }

            let body: ListDatasourcesResponse = response
                .json()
                .await
                .context("Failed to parse data source listing")?;

            let total: usize = body
                .pagination
                .total_available
                .parse()
                .context("Unparseable totalAvailable in listing response")?;
            let count = body.datasources.datasource.len();
            all.extend(body.datasources.datasource);

            log::debug!("Listed page {}: {} of {} data source(s)", page, all.len(), total);
            if all.len() >= total || count == 0 {
                break;
            }
            page += 1;
        }

        Ok(all)
    }

    /// Download the packaged representation of a data source, fully into
    /// memory.
    pub async fn download_datasource(&self, id: &str) -> Result<Bytes> {
        let path = format!("sites/{}/datasources/{}/content", self.site_id, id);
        let response = self
            .client
            .get(endpoint(&self.url, &path)?)
            .header(AUTH_HEADER, &self.token)
            .send()
            .await
            .with_context(|| format!("Failed to download data source {}", id))?;

        if !response.status().is_success() {
            eyre::bail!("Data source download failed ({}): {}", id, response.status());
        }

        response
            .bytes()
            .await
            .with_context(|| format!("Failed to read download body for {}", id))
    }

    /// Sign out, invalidating the auth token. Consumes the session.
    pub async fn sign_out(self) -> Result<()> {
        let response = self
            .client
            .post(endpoint(&self.url, "auth/signout")?)
            .header(AUTH_HEADER, &self.token)
            .send()
            .await
            .context("Failed to send sign-out request")?;

        if !response.status().is_success() {
            eyre::bail!("Sign-out failed: {}", response.status());
        }
        log::debug!("Signed out of {}", self.url);
        Ok(())
    }
}

impl std::fmt::Display for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (site: {})", self.url, self.site_id)
    }
}

/// Build a versioned API endpoint URL under the server base URL.
fn endpoint(base: &Url, path: &str) -> Result<Url> {
    base.join(&format!("/api/{}/{}", API_VERSION, path))
        .with_context(|| format!("Invalid API path: {}", path))
}

#[derive(Debug, Deserialize)]
struct SignInResponse {
    credentials: SignInCredentials,
}

#[derive(Debug, Deserialize)]
struct SignInCredentials {
    token: String,
    site: SiteRef,
}

#[derive(Debug, Deserialize)]
struct SiteRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ListDatasourcesResponse {
    pagination: Pagination,
    #[serde(default)]
    datasources: DatasourceList,
}

// The server omits the inner list entirely when a page is empty.
#[derive(Debug, Default, Deserialize)]
struct DatasourceList {
    #[serde(default)]
    datasource: Vec<Datasource>,
}

// Tableau's pagination block carries numbers as JSON strings.
#[derive(Debug, Deserialize)]
struct Pagination {
    #[serde(rename = "totalAvailable")]
    total_available: String,
}
