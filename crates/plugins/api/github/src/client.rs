//! GitHub API client implementation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use gitprovider_core::config::GITHUB_DOMAIN;
use gitprovider_core::options::ensure_reference;
use gitprovider_core::refs::Reference;
use gitprovider_core::pagination::next_link_from_header;
use gitprovider_core::{
    collect_all, Client, ClientOptions, Error, HttpError, OrgRepositoryRef, OrganizationRef,
    Page, RateLimit, RepositoryRef, Result,
};
use reqwest::header::{HeaderMap, ETAG, IF_NONE_MATCH, LINK};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::commits::GitHubCommits;
use crate::deploy_keys::GitHubDeployKeys;
use crate::organizations::GitHubOrganizations;
use crate::pull_requests::GitHubPullRequests;
use crate::repositories::{GitHubOrgRepositories, GitHubUserRepositories};
use crate::team_access::GitHubTeamAccess;
use crate::teams::GitHubTeams;
use crate::trees::GitHubTrees;
use crate::types::GitHubErrorBody;
use crate::{DEFAULT_GITHUB_URL, PROVIDER_ID};

const API_VERSION: &str = "2022-11-28";

/// Largest page size GitHub accepts.
const PER_PAGE: &str = "100";

/// Validation (422) messages GitHub uses when a create collides.
const ALREADY_EXISTS_MESSAGES: &[&str] = &[
    "name already exists on this account",
    "key is already in use",
];

/// GitHub API client.
///
/// Cheap to clone; every sub-client shares the same transport.
#[derive(Clone)]
pub struct GitHubClient {
    api: Arc<Api>,
}

impl GitHubClient {
    /// Create a client for github.com, or for the Enterprise server named by
    /// `options.domain`.
    pub fn new(token: impl Into<String>, options: ClientOptions) -> Result<Self> {
        let domain = options
            .domain
            .clone()
            .unwrap_or_else(|| GITHUB_DOMAIN.to_string());
        let base_url = if domain.eq_ignore_ascii_case(GITHUB_DOMAIN) {
            DEFAULT_GITHUB_URL.to_string()
        } else {
            format!("https://{}/api/v3", domain)
        };
        Self::with_base_url(base_url, token, options)
    }

    /// Create a client with a custom API base URL.
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

    /// Create a client over a caller-built `reqwest::Client` (custom CA,
    /// proxy, middleware).
    pub fn with_http_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        token: impl Into<String>,
        options: ClientOptions,
    ) -> Self {
        let domain = options
            .domain
            .clone()
            .unwrap_or_else(|| GITHUB_DOMAIN.to_string());
        Self {
            api: Arc::new(Api {
                base_url: base_url.into().trim_end_matches('/').to_string(),
                domain,
                token: token.into(),
                options,
                http,
                cache: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.api.options
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.api.base_url)
            .field("domain", &self.api.domain)
            .finish_non_exhaustive()
    }
}

impl Client for GitHubClient {
    type Organizations = GitHubOrganizations;
    type OrgRepositories = GitHubOrgRepositories;
    type UserRepositories = GitHubUserRepositories;
    type DeployKeys = GitHubDeployKeys;
    type TeamAccess = GitHubTeamAccess;
    type Teams = GitHubTeams;
    type Commits = GitHubCommits;
    type PullRequests = GitHubPullRequests;
    type Trees = GitHubTrees;

    fn provider_id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn supported_domain(&self) -> &str {
        &self.api.domain
    }

    fn organizations(&self) -> GitHubOrganizations {
        GitHubOrganizations::new(self.api.clone())
    }

    fn org_repositories(&self) -> GitHubOrgRepositories {
        GitHubOrgRepositories::new(self.api.clone())
    }

    fn user_repositories(&self) -> GitHubUserRepositories {
        GitHubUserRepositories::new(self.api.clone())
    }

    fn deploy_keys(&self, repository: &RepositoryRef) -> GitHubDeployKeys {
        GitHubDeployKeys::new(self.api.clone(), repository.clone())
    }

    fn team_access(&self, repository: &OrgRepositoryRef) -> GitHubTeamAccess {
        GitHubTeamAccess::new(self.api.clone(), repository.clone())
    }

    fn teams(&self, organization: &OrganizationRef) -> GitHubTeams {
        GitHubTeams::new(self.api.clone(), organization.clone())
    }

    fn commits(&self, repository: &RepositoryRef) -> GitHubCommits {
        GitHubCommits::new(self.api.clone(), repository.clone())
    }

    fn pull_requests(&self, repository: &RepositoryRef) -> GitHubPullRequests {
        GitHubPullRequests::new(self.api.clone(), repository.clone())
    }

    fn trees(&self, repository: &RepositoryRef) -> GitHubTrees {
        GitHubTrees::new(self.api.clone(), repository.clone())
    }
}

// =============================================================================
// Transport
// =============================================================================

/// A GET response body together with its `Link: rel="next"` target.
#[derive(Debug, Clone)]
struct Fetched {
    text: String,
    next: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedResponse {
    etag: String,
    fetched: Fetched,
}

/// Shared HTTP state behind every GitHub sub-client.
pub(crate) struct Api {
    base_url: String,
    domain: String,
    token: String,
    pub(crate) options: ClientOptions,
    http: reqwest::Client,
    /// ETag cache for conditional requests, keyed by URL
    cache: Mutex<HashMap<String, CachedResponse>>,
}

impl Api {
    /// Fail unless `reference` is well formed and on this client's domain.
    pub(crate) fn check<R: Reference + ?Sized>(&self, reference: &R) -> Result<()> {
        ensure_reference(&self.domain, reference)
    }

    pub(crate) fn domain(&self) -> &str {
        &self.domain
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Build request with common headers.
    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let mut request = self
            .http
            .request(method, url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);
        if !self.token.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.token));
        }
        if let Some(timeout) = self.options.timeout {
            request = request.timeout(timeout);
        }
        request
    }

    /// Make an authenticated GET request with typed deserialization.
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        let fetched = self.fetch(&url).await?;
        decode(&fetched.text, &url)
    }

    /// GET every page of a list endpoint, following `Link` headers.
    pub(crate) async fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let mut query: Vec<(&str, &str)> = params.to_vec();
        query.push(("per_page", PER_PAGE));
        let first = reqwest::Url::parse_with_params(&self.url(path), &query)
            .map_err(|e| Error::InvalidUrl {
                url: self.url(path),
                reason: e.to_string(),
            })?
            .to_string();

        collect_all(|cursor| {
            let url = cursor.unwrap_or_else(|| first.clone());
            async move { self.page(&url).await }
        })
        .await
    }

    /// GET one page of a list endpoint with explicit query parameters.
    pub(crate) async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = reqwest::Url::parse_with_params(&self.url(path), params)
            .map_err(|e| Error::InvalidUrl {
                url: self.url(path),
                reason: e.to_string(),
            })?
            .to_string();
        let fetched = self.fetch(&url).await?;
        decode(&fetched.text, &url)
    }

    async fn page<T: DeserializeOwned>(&self, url: &str) -> Result<Page<T>> {
        let fetched = self.fetch(url).await?;
        let items = decode(&fetched.text, url)?;
        Ok(Page::new(items, fetched.next))
    }

    /// GET with optional ETag revalidation.
    async fn fetch(&self, url: &str) -> Result<Fetched> {
        debug!(url = url, "GitHub GET request");

        let cached = self.cached(url);
        let mut request = self.request(Method::GET, url);
        if let Some(cached) = &cached {
            request = request.header(IF_NONE_MATCH, cached.etag.as_str());
        }

        let response = request.send().await.map_err(transport_error)?;
        if response.status() == StatusCode::NOT_MODIFIED {
            if let Some(cached) = cached {
                debug!(url = url, "Not modified, serving cached response");
                return Ok(cached.fetched);
            }
        }

        let response = check(response, url).await?;
        let etag = header_str(response.headers(), ETAG.as_str());
        let next = header_str(response.headers(), LINK.as_str())
            .and_then(|link| next_link_from_header(&link));
        let text = response.text().await.map_err(transport_error)?;
        let fetched = Fetched { text, next };

        if let Some(etag) = etag {
            self.store(url, etag, &fetched);
        }
        Ok(fetched)
    }

    fn cached(&self, url: &str) -> Option<CachedResponse> {
        if !self.options.conditional_requests {
            return None;
        }
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.get(url).cloned()
    }

    fn store(&self, url: &str, etag: String, fetched: &Fetched) {
        if !self.options.conditional_requests {
            return;
        }
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.insert(
            url.to_string(),
            CachedResponse {
                etag,
                fetched: fetched.clone(),
            },
        );
    }

    /// Send a JSON body and decode the JSON response.
    pub(crate) async fn send<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.url(path);
        let response = self.write(method, &url, Some(body)).await?;
        let text = response.text().await.map_err(transport_error)?;
        decode(&text, &url)
    }

    /// Send a request whose response body is ignored (204 endpoints).
    pub(crate) async fn send_empty<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<()> {
        let url = self.url(path);
        self.write(method, &url, body).await?;
        Ok(())
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<()> {
        self.send_empty::<()>(Method::DELETE, path, None).await
    }

    async fn write<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response> {
        debug!(method = %method, url = url, "GitHub write request");

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
        limit: number("x-ratelimit-limit")?,
        remaining: number("x-ratelimit-remaining")?,
        reset: number("x-ratelimit-reset")?,
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
        "GitHub API error response"
    );
    Err(normalize_error(status.as_u16(), &body, url, rate_limit))
}

/// Map a GitHub error response onto the taxonomy.
pub(crate) fn normalize_error(
    status: u16,
    body: &str,
    url: &str,
    rate_limit: Option<RateLimit>,
) -> Error {
    let parsed = serde_json::from_str::<GitHubErrorBody>(body).ok();
    let (message, documentation_url, details) = match parsed {
        Some(parsed) => {
            let details = parsed.detail_messages();
            (parsed.message, parsed.documentation_url, details)
        }
        None => (body.to_string(), None, Vec::new()),
    };

    let already_exists = status == 422
        && std::iter::once(&message)
            .chain(details.iter())
            .any(|m| is_already_exists_message(m));

    let message = if details.is_empty() {
        message
    } else {
        format!("{} ({})", message, details.join("; "))
    };
    let error = Error::from_http(
        HttpError::new(status, message)
            .with_url(url)
            .with_documentation_url(documentation_url)
            .with_rate_limit(rate_limit),
    );

    if already_exists {
        error.into_already_exists()
    } else {
        error
    }
}

fn is_already_exists_message(message: &str) -> bool {
    let message = message.to_lowercase();
    ALREADY_EXISTS_MESSAGES.iter().any(|m| message.contains(m))
}

/// `owner/name` path of a repository; GitHub has no nested organizations.
pub(crate) fn repository_path(repository: &RepositoryRef) -> Result<String> {
    if let RepositoryRef::Org(reference) = repository {
        organization_login(&reference.organization)?;
    }
    Ok(format!(
        "/repos/{}/{}",
        repository.owner_path(),
        repository.repository_name()
    ))
}

/// Login of a top-level organization.
pub(crate) fn organization_login(organization: &OrganizationRef) -> Result<&str> {
    if !organization.sub_organizations.is_empty() {
        return Err(Error::unsupported(PROVIDER_ID, "sub-organizations"));
    }
    Ok(&organization.organization)
}
