//! GitLab API response and request types.
//!
//! These types represent the raw JSON responses from GitLab REST API v4.
//! Resource objects keep them as their native object.

use serde::{Deserialize, Serialize};

// =============================================================================
// Errors
// =============================================================================

/// Error body returned with non-2xx responses. `message` is a string, a
/// field-to-messages map or a list depending on the endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitLabErrorBody {
    #[serde(default)]
    pub message: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl GitLabErrorBody {
    /// One line per message, field name first for map-shaped messages.
    pub fn flatten(&self) -> String {
        let mut lines = Vec::new();
        match &self.message {
            Some(serde_json::Value::String(s)) => lines.push(s.clone()),
            Some(serde_json::Value::Object(fields)) => {
                for (field, messages) in fields {
                    match messages {
                        serde_json::Value::Array(items) => {
                            for item in items {
                                if let Some(text) = item.as_str() {
                                    lines.push(format!("{} {}", field, text));
                                }
                            }
                        }
                        serde_json::Value::String(text) => {
                            lines.push(format!("{} {}", field, text))
                        }
                        other => lines.push(format!("{} {}", field, other)),
                    }
                }
            }
            Some(serde_json::Value::Array(items)) => {
                lines.extend(items.iter().filter_map(|i| i.as_str()).map(str::to_string))
            }
            Some(other) => lines.push(other.to_string()),
            None => {}
        }
        if let Some(error) = &self.error {
            lines.push(error.clone());
        }
        lines.join("; ")
    }
}

// =============================================================================
// Users and groups
// =============================================================================

/// GitLab user representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabUser {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// GitLab group (organization, subgroup or team).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabGroup {
    pub id: u64,
    pub name: String,
    pub path: String,
    pub full_path: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<u64>,
}

/// Member of a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabMember {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub access_level: u32,
}

// =============================================================================
// Projects
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabNamespace {
    pub id: u64,
    pub full_path: String,
    /// "group" or "user"
    #[serde(default)]
    pub kind: Option<String>,
}

/// A group a project is shared with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabSharedGroup {
    pub group_id: u64,
    pub group_name: String,
    #[serde(default)]
    pub group_full_path: Option<String>,
    pub group_access_level: u32,
}

/// GitLab project representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabProject {
    pub id: u64,
    pub name: String,
    pub path: String,
    pub path_with_namespace: String,
    #[serde(default)]
    pub description: Option<String>,
    /// `null` until the first push
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub visibility: Option<String>,
    pub web_url: String,
    #[serde(default)]
    pub http_url_to_repo: Option<String>,
    #[serde(default)]
    pub ssh_url_to_repo: Option<String>,
    #[serde(default)]
    pub namespace: Option<GitLabNamespace>,
    #[serde(default)]
    pub shared_with_groups: Vec<GitLabSharedGroup>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_activity_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub visibility: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initialize_with_readme: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateProjectRequest {
    /// Always sent so an unset description clears the remote one
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
}

/// Body of `POST /projects/:id/share`.
#[derive(Debug, Clone, Serialize)]
pub struct ShareProjectRequest {
    pub group_id: u64,
    pub group_access: u32,
}

// =============================================================================
// Deploy keys
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabDeployKey {
    pub id: u64,
    pub title: String,
    pub key: String,
    #[serde(default)]
    pub can_push: bool,
    #[serde(default)]
    pub fingerprint: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateDeployKeyRequest {
    pub title: String,
    pub key: String,
    pub can_push: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateDeployKeyRequest {
    pub title: String,
    pub can_push: bool,
}

// =============================================================================
// Commits and trees
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabCommit {
    pub id: String,
    #[serde(default)]
    pub short_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub author_email: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabTreeEntry {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub path: String,
    pub mode: String,
}

// =============================================================================
// Merge requests
// =============================================================================

/// GitLab merge request representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabMergeRequest {
    pub id: u64,
    pub iid: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub state: String,
    pub source_branch: String,
    pub target_branch: String,
    #[serde(default)]
    pub merged_at: Option<String>,
    pub web_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateMergeRequestRequest {
    pub source_branch: String,
    pub target_branch: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AcceptMergeRequestRequest {
    pub squash: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_commit_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub squash_commit_message: Option<String>,
}
