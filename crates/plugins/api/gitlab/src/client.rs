//! GitLab API client implementation.

use std::sync::Arc;

use gitprovider_core::config::GITLAB_DOMAIN;
use gitprovider_core::options::ensure_reference;
use gitprovider_core::refs::Reference;
use gitprovider_core::pagination::next_page_from_header;
use gitprovider_core::{
    collect_all, Client, ClientOptions, Error, HttpError, OrgRepositoryRef, OrganizationRef,
    Page, RateLimit, RepositoryRef, Result,
};
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::commits::GitLabCommits;
use crate::deploy_keys::GitLabDeployKeys;
use crate::merge_requests::GitLabMergeRequests;
use crate::organizations::GitLabOrganizations;
use crate::repositories::{GitLabOrgRepositories, GitLabUserRepositories};
use crate::team_access::GitLabTeamAccess;
use crate::teams::GitLabTeams;
use crate::trees::GitLabTrees;
use crate::types::GitLabErrorBody;
use crate::{DEFAULT_GITLAB_URL, PROVIDER_ID};

/// Largest page size GitLab accepts.
const PER_PAGE: &str = "100";

/// Messages GitLab uses when a create collides with an existing object.
const ALREADY_EXISTS_MESSAGES: &[&str] = &["has already been taken", "already shared"];

/// GitLab API client.
///
/// Cheap to clone; every sub-client shares the same transport.
#[derive(Clone)]
pub struct GitLabClient {
    api: Arc<Api>,
}

impl GitLabClient {
    /// Create a client for gitlab.com, or for the self-managed instance
    /// named by `options.domain`.
    pub fn new(token: impl Into<String>, options: ClientOptions) -> Result<Self> {
        let base_url = match options.domain.as_deref() {
            None => DEFAULT_GITLAB_URL.to_string(),
            Some(domain) if domain.eq_ignore_ascii_case(GITLAB_DOMAIN) => {
                DEFAULT_GITLAB_URL.to_string()
            }
            Some(domain) => format!("https://{}", domain),
        };
        Self::with_base_url(base_url, token, options)
    }

    /// Create a client with a custom instance URL (without `/api/v4`).
    pub fn with_base_url(
        base_url: impl Into<String>,
        token: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(options.user_agent.clone())
            .build()
            .map_err(|e| Error::Transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self::with_http_client(http, base_url, token, options))
    }

    /// Create a client over a caller-built `reqwest::Client`.
    pub fn with_http_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        token: impl Into<String>,
        options: ClientOptions,
    ) -> Self {
        let domain = options
            .domain
            .clone()
            .unwrap_or_else(|| GITLAB_DOMAIN.to_string());
        Self {
            api: Arc::new(Api {
                base_url: base_url.into().trim_end_matches('/').to_string(),
                domain,
                token: token.into(),
                options,
                http,
            }),
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.api.options
    }
}

impl std::fmt::Debug for GitLabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitLabClient")
            .field("base_url", &self.api.base_url)
            .field("domain", &self.api.domain)
            .finish_non_exhaustive()
    }
}

impl Client for GitLabClient {
    type Organizations = GitLabOrganizations;
    type OrgRepositories = GitLabOrgRepositories;
    type UserRepositories = GitLabUserRepositories;
    type DeployKeys = GitLabDeployKeys;
    type TeamAccess = GitLabTeamAccess;
    type Teams = GitLabTeams;
    type Commits = GitLabCommits;
    type PullRequests = GitLabMergeRequests;
    type Trees = GitLabTrees;

    fn provider_id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn supported_domain(&self) -> &str {
        &self.api.domain
    }

    fn organizations(&self) -> GitLabOrganizations {
        GitLabOrganizations::new(self.api.clone())
    }

    fn org_repositories(&self) -> GitLabOrgRepositories {
        GitLabOrgRepositories::new(self.api.clone())
    }

    fn user_repositories(&self) -> GitLabUserRepositories {
        GitLabUserRepositories::new(self.api.clone())
    }

    fn deploy_keys(&self, repository: &RepositoryRef) -> GitLabDeployKeys {
        GitLabDeployKeys::new(self.api.clone(), repository.clone())
    }

    fn team_access(&self, repository: &OrgRepositoryRef) -> GitLabTeamAccess {
        GitLabTeamAccess::new(self.api.clone(), repository.clone())
    }

    fn teams(&self, organization: &OrganizationRef) -> GitLabTeams {
        GitLabTeams::new(self.api.clone(), organization.clone())
    }

    fn commits(&self, repository: &RepositoryRef) -> GitLabCommits {
        GitLabCommits::new(self.api.clone(), repository.clone())
    }

    fn pull_requests(&self, repository: &RepositoryRef) -> GitLabMergeRequests {
        GitLabMergeRequests::new(self.api.clone(), repository.clone())
    }

    fn trees(&self, repository: &RepositoryRef) -> GitLabTrees {
        GitLabTrees::new(self.api.clone(), repository.clone())
    }
}

// =============================================================================
// Transport
// =============================================================================

/// Shared HTTP state behind every GitLab sub-client.
pub(crate) struct Api {
    base_url: String,
    domain: String,
    token: String,
    pub(crate) options: ClientOptions,
    http: reqwest::Client,
}

impl Api {
    /// Fail unless `reference` is well formed and on this client's domain.
    pub(crate) fn check<R: Reference + ?Sized>(&self, reference: &R) -> Result<()> {
        ensure_reference(&self.domain, reference)
    }

    pub(crate) fn domain(&self) -> &str {
        &self.domain
    }

    /// Build full API URL for an endpoint.
    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/api/v4{}", self.base_url, endpoint)
    }

    /// Build request with common headers.
    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let mut request = self.http.request(method, url);
        if !self.token.is_empty() {
            request = request.header("PRIVATE-TOKEN", &self.token);
        }
        if let Some(timeout) = self.options.timeout {
            request = request.timeout(timeout);
        }
        request
    }

    fn url_with_params(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<String> {
        let url = self.api_url(endpoint);
        reqwest::Url::parse_with_params(&url, params)
            .map(|u| u.to_string())
            .map_err(|e| Error::InvalidUrl {
                url,
                reason: e.to_string(),
            })
    }

    /// Make an authenticated GET request with typed deserialization.
    pub(crate) async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        self.get_with_params(endpoint, &[]).await
    }

    /// GET one page of a list endpoint with explicit query parameters.
    pub(crate) async fn get_with_params<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = self.url_with_params(endpoint, params)?;
        let (text, _) = self.fetch(&url).await?;
        decode(&text, &url)
    }

    /// GET every page of a list endpoint, following `X-Next-Page`.
    pub(crate) async fn list<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        collect_all(|cursor| {
            let page = cursor.unwrap_or_else(|| "1".to_string());
            async move { self.page(endpoint, params, &page).await }
        })
        .await
    }

    async fn page<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        page: &str,
    ) -> Result<Page<T>> {
        let mut query: Vec<(&str, &str)> = params.to_vec();
        query.push(("per_page", PER_PAGE));
        query.push(("page", page));
        let url = self.url_with_params(endpoint, &query)?;
        let (text, next) = self.fetch(&url).await?;
        Ok(Page::new(decode(&text, &url)?, next))
    }

    /// GET returning the body and the `X-Next-Page` value.
    async fn fetch(&self, url: &str) -> Result<(String, Option<String>)> {
        debug!(url = url, "GitLab GET request");

        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check(response, url).await?;
        let next = header_str(response.headers(), "x-next-page")
            .and_then(|value| next_page_from_header(&value));
        let text = response.text().await.map_err(transport_error)?;
        Ok((text, next))
    }

    /// Send a JSON body and decode the JSON response.
    pub(crate) async fn send<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.api_url(endpoint);
        let response = self.write(method, &url, Some(body)).await?;
        let text = response.text().await.map_err(transport_error)?;
        decode(&text, &url)
    }

    /// Send a request whose response body is ignored.
    pub(crate) async fn send_empty<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<()> {
        let url = self.api_url(endpoint);
        self.write(method, &url, body).await?;
        Ok(())
    }

    pub(crate) async fn delete(&self, endpoint: &str) -> Result<()> {
        self.send_empty::<()>(Method::DELETE, endpoint, None).await
    }

    async fn write<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response> {
        debug!(method = %method, url = url, "GitLab write request");

        let mut request = self.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(transport_error)?;
        check(response, url).await
    }
}

// =============================================================================
// Error normalization
// =============================================================================

fn transport_error(e: reqwest::Error) -> Error {
    Error::Transport(e.to_string())
}

fn decode<T: DeserializeOwned>(text: &str, url: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|e| {
        Error::InvalidServerData(format!("Failed to parse response from {}: {}", url, e))
    })
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn rate_limit_from_headers(headers: &HeaderMap) -> Option<RateLimit> {
    let number = |name: &str| header_str(headers, name).and_then(|v| v.parse::<u64>().ok());
    Some(RateLimit {
        limit: number("ratelimit-limit")?,
        remaining: number("ratelimit-remaining")?,
        reset: number("ratelimit-reset")?,
    })
}

/// Pass successful responses through; normalize everything else.
async fn check(response: reqwest::Response, url: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let rate_limit = rate_limit_from_headers(response.headers());
    let body = response.text().await.unwrap_or_default();
    warn!(
        status = status.as_u16(),
        url = url,
        "GitLab API error response"
    );
    Err(normalize_error(status.as_u16(), &body, url, rate_limit))
}

/// Map a GitLab error response onto the taxonomy.
pub(crate) fn normalize_error(
    status: u16,
    body: &str,
    url: &str,
    rate_limit: Option<RateLimit>,
) -> Error {
    let message = serde_json::from_str::<GitLabErrorBody>(body)
        .map(|parsed| parsed.flatten())
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.to_string());

    let already_exists = matches!(status, 400 | 422) && {
        let lower = message.to_lowercase();
        ALREADY_EXISTS_MESSAGES.iter().any(|m| lower.contains(m))
    };

    let error = Error::from_http(
        HttpError::new(status, message)
            .with_url(url)
            .with_rate_limit(rate_limit),
    );
    if already_exists {
        error.into_already_exists()
    } else {
        error
    }
}

/// Percent-encode a namespaced path for use as a `:id` segment.
pub(crate) fn encode_path(path: &str) -> String {
    url::form_urlencoded::byte_serialize(path.as_bytes()).collect()
}

/// `/projects/:id` endpoint of a repository.
pub(crate) fn project_endpoint(repository: &RepositoryRef) -> String {
    format!("/projects/{}", encode_path(&repository.path()))
}

/// `/groups/:id` endpoint of an organization.
pub(crate) fn group_endpoint(organization: &OrganizationRef) -> String {
    format!("/groups/{}", encode_path(&organization.path()))
}

/// Reference of a group from its `full_path`.
pub(crate) fn organization_ref(domain: &str, full_path: &str) -> Result<OrganizationRef> {
    let mut segments = full_path.split('/').filter(|s| !s.is_empty());
    let top = segments.next().ok_or_else(|| {
        Error::InvalidServerData(format!("group with empty full_path {:?}", full_path))
    })?;
    Ok(OrganizationRef::new(domain, top).with_sub_organizations(segments))
}
