//! XML bodies exchanged with the Tableau REST API.

use serde::{Deserialize, Serialize};

/// `POST /auth/signin` body.
#[derive(Debug, Serialize)]
#[serde(rename = "tsRequest")]
pub struct SignInRequest<'a> {
    pub credentials: CredentialsRequest<'a>,
}

#[derive(Debug, Serialize)]
pub struct CredentialsRequest<'a> {
    #[serde(rename = "@name")]
    pub name: &'a str,
    #[serde(rename = "@password")]
    pub password: &'a str,
    pub site: SiteRequest<'a>,
}

#[derive(Debug, Serialize)]
pub struct SiteRequest<'a> {
    /// Empty string selects the default site.
    #[serde(rename = "@contentUrl")]
    pub content_url: &'a str,
}

impl<'a> SignInRequest<'a> {
    pub const fn new(name: &'a str, password: &'a str, site_content_url: &'a str) -> Self {
        Self {
            credentials: CredentialsRequest {
                name,
                password,
                site: SiteRequest {
                    content_url: site_content_url,
                },
            },
        }
    }

    pub fn to_xml(&self) -> Result<String, quick_xml::SeError> {
        quick_xml::se::to_string(self)
    }
}

/// `POST /auth/signin` response.
#[derive(Debug, Deserialize)]
pub struct SignInResponse {
    pub credentials: Option<Credentials>,
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    #[serde(rename = "@token")]
    pub token: String,
    pub site: SiteRef,
}

#[derive(Debug, Deserialize)]
pub struct SiteRef {
    #[serde(rename = "@id")]
    pub id: String,
}

/// `GET /sites/{site}/views` response.
#[derive(Debug, Deserialize)]
pub struct ViewsResponse {
    pub pagination: Pagination,
    #[serde(default)]
    pub views: ViewList,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(rename = "@pageNumber")]
    pub page_number: u32,
    #[serde(rename = "@pageSize")]
    pub page_size: u32,
    #[serde(rename = "@totalAvailable")]
    pub total_available: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ViewList {
    #[serde(rename = "view", default)]
    pub items: Vec<View>,
}

#[derive(Debug, Deserialize)]
pub struct View {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@contentUrl")]
    pub content_url: String,
}
