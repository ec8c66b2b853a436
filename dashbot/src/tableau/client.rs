//! HTTP client for the Tableau REST API and view rendering endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, COOKIE};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::catalog::{ViewPage, ViewSource};
use crate::error::{AuthError, RequestFailure};
use crate::models::{CatalogEntry, Session};

use super::wire::{SignInRequest, SignInResponse, ViewsResponse};

/// Header carrying the session token on REST calls.
const TABLEAU_AUTH_HEADER: &str = "X-Tableau-Auth";

/// Cookie carrying the session token on render calls.
const SESSION_COOKIE: &str = "workgroup_session_id";

/// Fixed presentation parameters for rendered images.
const RENDER_PARAMS: [(&str, &str); 4] = [
    (":embed", "y"),
    (":refresh", "yes"),
    (":highdpi", "true"),
    (":size", "1920,1080"),
];

/// Connection settings for a Tableau server.
#[derive(Debug, Clone)]
pub struct TableauConfig {
    /// Scheme and host, e.g. `https://tableau.example.com`.
    pub base_url: String,
    /// REST API version segment, e.g. `3.0`.
    pub api_version: String,
    /// Site content URL; empty selects the default site.
    pub site_content_url: String,
    /// Upper bound for every request.
    pub request_timeout: Duration,
}

/// Thin wrapper over `reqwest` speaking Tableau's XML API.
#[derive(Debug, Clone)]
pub struct TableauClient {
    http: reqwest::Client,
    base_url: String,
    api_version: String,
    site_content_url: String,
}

impl TableauClient {
    pub fn new(config: &TableauConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(1024)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            site_content_url: config.site_content_url.clone(),
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/{}/{path}", self.base_url, self.api_version)
    }

    /// Sign in and return the resulting session.
    pub async fn sign_in(&self, login: &str, password: &str) -> Result<Session, AuthError> {
        self.sign_in_request(login, password).await.map_err(AuthError)
    }

    async fn sign_in_request(
        &self,
        login: &str,
        password: &str,
    ) -> Result<Session, RequestFailure> {
        let body = SignInRequest::new(login, password, &self.site_content_url)
            .to_xml()
            .map_err(|e| RequestFailure::Malformed(format!("cannot encode sign-in body: {e}")))?;

        let response = self
            .http
            .post(self.api_url("auth/signin"))
            .header(CONTENT_TYPE, "application/xml")
            .body(body)
            .send()
            .await?;

        let body = success_body(response).await?;
        let parsed: SignInResponse = parse_xml(&body)?;
        let credentials = parsed
            .credentials
            .ok_or_else(|| RequestFailure::Malformed("missing credentials element".to_string()))?;

        if credentials.token.is_empty() || credentials.site.id.is_empty() {
            return Err(RequestFailure::Malformed(
                "empty token or site id in credentials".to_string(),
            ));
        }

        Ok(Session::new(credentials.token, credentials.site.id))
    }

    /// Fetch the rendered PNG for a view, fully buffered.
    pub async fn render_view(
        &self,
        session: &Session,
        render_key: &str,
    ) -> Result<Vec<u8>, RequestFailure> {
        if !is_view_path(render_key) {
            return Err(RequestFailure::Malformed(format!(
                "render key is not a view path: {render_key:?}"
            )));
        }
        let url = format!("{}/views/{render_key}.png", self.base_url);
        debug!(render_key, "Requesting rendered view");

        let response = self
            .http
            .get(url)
            .header(COOKIE, format!("{SESSION_COOKIE}={}", session.auth_token))
            .query(&RENDER_PARAMS)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RequestFailure::Status { status, body });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl ViewSource for TableauClient {
    async fn fetch_page(
        &self,
        session: &Session,
        page_number: u32,
        page_size: u32,
    ) -> Result<ViewPage, RequestFailure> {
        let url = self.api_url(&format!("sites/{}/views", session.site_id));

        let response = self
            .http
            .get(url)
            .header(TABLEAU_AUTH_HEADER, &session.auth_token)
            .query(&[("pageSize", page_size), ("pageNumber", page_number)])
            .send()
            .await?;

        let body = success_body(response).await?;
        let parsed: ViewsResponse = parse_xml(&body)?;

        let entries = parsed
            .views
            .items
            .into_iter()
            .map(|view| CatalogEntry::from_view(view.id, view.name, &view.content_url))
            .collect();

        Ok(ViewPage {
            entries,
            page_number: parsed.pagination.page_number,
            page_size: parsed.pagination.page_size,
            total_available: parsed.pagination.total_available,
        })
    }
}

/// Read the body, turning non-success statuses into errors.
async fn success_body(response: reqwest::Response) -> Result<String, RequestFailure> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(RequestFailure::Status { status, body });
    }
    Ok(body)
}

/// `Workbook/View` style keys: non-empty segments, no dot segments, no query or fragment.
fn is_view_path(render_key: &str) -> bool {
    render_key.split('/').all(|segment| {
        !segment.is_empty()
            && segment != "."
            && segment != ".."
            && !segment.contains(['?', '#', '\\', '%'])
    })
}

fn parse_xml<T: DeserializeOwned>(body: &str) -> Result<T, RequestFailure> {
    quick_xml::de::from_str(body).map_err(|e| RequestFailure::Malformed(e.to_string()))
}
