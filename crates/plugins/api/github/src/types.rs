//! GitHub API response and request types.
//!
//! These types represent the raw JSON of the GitHub REST API. Resource
//! objects keep them as their native object; read-only clients map them
//! into the shared gitprovider types.

use serde::{Deserialize, Serialize};

// =============================================================================
// Errors
// =============================================================================

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub documentation_url: Option<String>,
    /// Either objects with a `message` field or plain strings
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
}

impl GitHubErrorBody {
    /// Messages of the nested `errors` entries.
    pub fn detail_messages(&self) -> Vec<String> {
        self.errors
            .iter()
            .filter_map(|e| match e {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Object(o) => o
                    .get("message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string),
                _ => None,
            })
            .collect()
    }
}

// =============================================================================
// Organizations and teams
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubOrganization {
    pub id: u64,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubUser {
    pub id: u64,
    pub login: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubTeam {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Only present when listed from a repository
    #[serde(default)]
    pub permission: Option<String>,
}

/// Body of `PUT /orgs/{org}/teams/{slug}/repos/{owner}/{repo}`.
#[derive(Debug, Clone, Serialize)]
pub struct TeamRepositoryPermissionRequest {
    pub permission: String,
}

// =============================================================================
// Repositories
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRepository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub owner: GitHubUser,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub private: bool,
    /// "public", "private" or "internal"; absent on older Enterprise servers
    #[serde(default)]
    pub visibility: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub clone_url: Option<String>,
    #[serde(default)]
    pub ssh_url: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateRepositoryRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub private: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_init: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_template: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateRepositoryRequest {
    /// Always sent so an unset description clears the remote one
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
}

// =============================================================================
// Deploy keys
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubDeployKey {
    pub id: u64,
    pub title: String,
    pub key: String,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateDeployKeyRequest {
    pub title: String,
    pub key: String,
    pub read_only: bool,
}

// =============================================================================
// Commits and trees
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubCommit {
    pub sha: String,
    pub commit: GitHubCommitDetail,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubCommitDetail {
    pub message: String,
    #[serde(default)]
    pub author: Option<GitHubCommitAuthor>,
    pub tree: GitHubObjectRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubCommitAuthor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubObjectRef {
    pub sha: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubTree {
    pub sha: String,
    #[serde(default)]
    pub tree: Vec<GitHubTreeEntry>,
    #[serde(default)]
    pub truncated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubTreeEntry {
    pub path: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub sha: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
}

// =============================================================================
// Pull requests
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubPullRequest {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub html_url: String,
    pub head: GitHubBranchRef,
    pub base: GitHubBranchRef,
    #[serde(default)]
    pub merged_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubBranchRef {
    #[serde(rename = "ref")]
    pub branch: String,
    #[serde(default)]
    pub sha: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePullRequestRequest {
    pub title: String,
    pub head: String,
    pub base: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergePullRequestRequest {
    pub merge_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
}
