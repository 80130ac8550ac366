//! Identity of users, organizations and repositories.
//!
//! References are plain immutable values. Two references are equal when all
//! of their fields are equal; they never carry backend state.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::types::TransportType;
use crate::validation::{ValidationErrors, Validator};

/// A user account in a domain, e.g. `https://github.com/octocat`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserRef {
    pub domain: String,
    pub user_login: String,
}

/// An organization (or group), optionally nested, e.g.
/// `https://gitlab.com/group/sub-group`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrganizationRef {
    pub domain: String,
    pub organization: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_organizations: Vec<String>,
}

/// A repository owned by an organization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrgRepositoryRef {
    pub organization: OrganizationRef,
    pub repository_name: String,
}

/// A repository owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserRepositoryRef {
    pub user: UserRef,
    pub repository_name: String,
}

/// Either kind of repository reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "owner", rename_all = "lowercase")]
pub enum RepositoryRef {
    Org(OrgRepositoryRef),
    User(UserRepositoryRef),
}

/// What adapters need from any reference before using it in a request.
pub trait Reference {
    fn domain(&self) -> &str;

    fn validate(&self) -> std::result::Result<(), ValidationErrors>;
}

macro_rules! impl_reference {
    ($($name:ident),+) => {
        $(
            impl Reference for $name {
                fn domain(&self) -> &str {
                    $name::domain(self)
                }

                fn validate(&self) -> std::result::Result<(), ValidationErrors> {
                    $name::validate(self)
                }
            }
        )+
    };
}

impl_reference!(UserRef, OrganizationRef, OrgRepositoryRef, UserRepositoryRef, RepositoryRef);

// =============================================================================
// Constructors and accessors
// =============================================================================

impl UserRef {
    pub fn new(domain: impl Into<String>, user_login: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            user_login: user_login.into(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Path below the domain: the login.
    pub fn path(&self) -> String {
        self.user_login.clone()
    }

    pub fn url(&self) -> String {
        format!("https://{}/{}", self.domain, self.path())
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        Validator::new("UserRef")
            .required("domain", &self.domain)
            .required("user_login", &self.user_login)
            .finish()
    }
}

impl OrganizationRef {
    pub fn new(domain: impl Into<String>, organization: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            organization: organization.into(),
            sub_organizations: Vec::new(),
        }
    }

    pub fn with_sub_organizations<I, S>(mut self, sub_organizations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sub_organizations = sub_organizations.into_iter().map(Into::into).collect();
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Full path below the domain, sub-organizations included.
    pub fn path(&self) -> String {
        let mut parts = vec![self.organization.as_str()];
        parts.extend(self.sub_organizations.iter().map(String::as_str));
        parts.join("/")
    }

    /// Name of the innermost organization.
    pub fn leaf_name(&self) -> &str {
        self.sub_organizations
            .last()
            .map(String::as_str)
            .unwrap_or(&self.organization)
    }

    pub fn url(&self) -> String {
        format!("https://{}/{}", self.domain, self.path())
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        let mut validator = Validator::new("OrganizationRef");
        validator
            .required("domain", &self.domain)
            .required("organization", &self.organization);
        for sub in &self.sub_organizations {
            validator.required("sub_organizations", sub);
        }
        validator.finish()
    }
}

impl OrgRepositoryRef {
    pub fn new(organization: OrganizationRef, repository_name: impl Into<String>) -> Self {
        Self {
            organization,
            repository_name: repository_name.into(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.organization.domain
    }

    pub fn path(&self) -> String {
        format!("{}/{}", self.organization.path(), self.repository_name)
    }

    pub fn url(&self) -> String {
        format!("https://{}/{}", self.domain(), self.path())
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        self.organization.validate()?;
        Validator::new("OrgRepositoryRef")
            .required("repository_name", &self.repository_name)
            .finish()
    }
}

impl UserRepositoryRef {
    pub fn new(user: UserRef, repository_name: impl Into<String>) -> Self {
        Self {
            user,
            repository_name: repository_name.into(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.user.domain
    }

    pub fn path(&self) -> String {
        format!("{}/{}", self.user.user_login, self.repository_name)
    }

    pub fn url(&self) -> String {
        format!("https://{}/{}", self.domain(), self.path())
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        self.user.validate()?;
        Validator::new("UserRepositoryRef")
            .required("repository_name", &self.repository_name)
            .finish()
    }
}

impl RepositoryRef {
    pub fn domain(&self) -> &str {
        match self {
            RepositoryRef::Org(r) => r.domain(),
            RepositoryRef::User(r) => r.domain(),
        }
    }

    /// `owner/.../name` below the domain.
    pub fn path(&self) -> String {
        match self {
            RepositoryRef::Org(r) => r.path(),
            RepositoryRef::User(r) => r.path(),
        }
    }

    /// Path of the owning user or organization.
    pub fn owner_path(&self) -> String {
        match self {
            RepositoryRef::Org(r) => r.organization.path(),
            RepositoryRef::User(r) => r.user.path(),
        }
    }

    pub fn repository_name(&self) -> &str {
        match self {
            RepositoryRef::Org(r) => &r.repository_name,
            RepositoryRef::User(r) => &r.repository_name,
        }
    }

    pub fn url(&self) -> String {
        format!("https://{}/{}", self.domain(), self.path())
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        match self {
            RepositoryRef::Org(r) => r.validate(),
            RepositoryRef::User(r) => r.validate(),
        }
    }

    /// Clone URL for the given git transport.
    pub fn clone_url(&self, transport: TransportType) -> String {
        match transport {
            TransportType::Https => format!("{}.git", self.url()),
            TransportType::Git => format!("git://{}/{}.git", self.domain(), self.path()),
            TransportType::Ssh => format!("git@{}:{}.git", self.domain(), self.path()),
        }
    }
}

impl From<OrgRepositoryRef> for RepositoryRef {
    fn from(r: OrgRepositoryRef) -> Self {
        RepositoryRef::Org(r)
    }
}

impl From<UserRepositoryRef> for RepositoryRef {
    fn from(r: UserRepositoryRef) -> Self {
        RepositoryRef::User(r)
    }
}

macro_rules! display_as_url {
    ($($name:ty),+) => {
        $(impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.url())
            }
        })+
    };
}

display_as_url!(
    UserRef,
    OrganizationRef,
    OrgRepositoryRef,
    UserRepositoryRef,
    RepositoryRef
);

// =============================================================================
// URL parsing
// =============================================================================

fn invalid_url(url: &str, reason: impl Into<String>) -> Error {
    Error::InvalidUrl {
        url: url.to_string(),
        reason: reason.into(),
    }
}

/// Split a canonical HTTPS URL into `(domain, path segments)`.
fn parse_url(raw: &str) -> Result<(String, Vec<String>)> {
    let url = Url::parse(raw).map_err(|e| invalid_url(raw, e.to_string()))?;

    if url.scheme() != "https" {
        return Err(invalid_url(raw, "only https URLs are supported"));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(invalid_url(raw, "user info is not allowed"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid_url(raw, "query and fragment are not allowed"));
    }

    let host = url
        .host_str()
        .ok_or_else(|| invalid_url(raw, "missing host"))?;
    let domain = match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };

    let segments: Vec<String> = url
        .path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok((domain, segments))
}

fn strip_git_suffix(name: String) -> String {
    match name.strip_suffix(".git") {
        Some(stripped) => stripped.to_string(),
        None => name,
    }
}

/// Parse `https://<domain>/<login>`.
pub fn parse_user_url(raw: &str) -> Result<UserRef> {
    let (domain, segments) = parse_url(raw)?;
    match segments.as_slice() {
        [login] => Ok(UserRef::new(domain, login.clone())),
        _ => Err(invalid_url(raw, "expected exactly one path segment")),
    }
}

/// Parse `https://<domain>/<org>[/<sub-org>...]`.
pub fn parse_organization_url(raw: &str) -> Result<OrganizationRef> {
    let (domain, mut segments) = parse_url(raw)?;
    if segments.is_empty() {
        return Err(invalid_url(raw, "missing organization"));
    }
    let organization = segments.remove(0);
    Ok(OrganizationRef::new(domain, organization).with_sub_organizations(segments))
}

/// Parse `https://<domain>/<org>[/<sub-org>...]/<repo>[.git]`.
pub fn parse_org_repository_url(raw: &str) -> Result<OrgRepositoryRef> {
    let (domain, mut segments) = parse_url(raw)?;
    if segments.len() < 2 {
        return Err(invalid_url(raw, "expected organization and repository"));
    }
    let repository_name = strip_git_suffix(segments.pop().unwrap_or_default());
    let organization = segments.remove(0);
    Ok(OrgRepositoryRef::new(
        OrganizationRef::new(domain, organization).with_sub_organizations(segments),
        repository_name,
    ))
}

/// Parse `https://<domain>/<login>/<repo>[.git]`.
pub fn parse_user_repository_url(raw: &str) -> Result<UserRepositoryRef> {
    let (domain, segments) = parse_url(raw)?;
    match segments.as_slice() {
        [login, name] => Ok(UserRepositoryRef::new(
            UserRef::new(domain, login.clone()),
            strip_git_suffix(name.clone()),
        )),
        _ => Err(invalid_url(raw, "expected user and repository")),
    }
}
