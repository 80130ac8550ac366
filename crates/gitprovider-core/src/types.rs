//! Common types used across providers.

use serde::{Deserialize, Serialize};

use crate::info::{DefaultedInfoRequest, InfoRequest};
use crate::refs::OrganizationRef;
use crate::validation::{ValidationErrors, Validator};

/// Branch assigned to repositories that do not name one.
pub const DEFAULT_BRANCH: &str = "main";

// =============================================================================
// Enums
// =============================================================================

/// Who can see a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryVisibility {
    Public,
    Internal,
    Private,
}

known_values_enum!(RepositoryVisibility {
    Public => "public",
    Internal => "internal",
    Private => "private",
});

/// Access level granted to a team on a repository, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RepositoryPermission {
    Pull,
    Triage,
    Push,
    Maintain,
    Admin,
}

known_values_enum!(RepositoryPermission {
    Pull => "pull",
    Triage => "triage",
    Push => "push",
    Maintain => "maintain",
    Admin => "admin",
});

/// How a pull request is merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeMethod {
    Merge,
    Squash,
    Rebase,
}

known_values_enum!(MergeMethod {
    Merge => "merge",
    Squash => "squash",
    Rebase => "rebase",
});

/// Git transport used when rendering clone URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportType {
    Https,
    Git,
    Ssh,
}

known_values_enum!(TransportType {
    Https => "https",
    Git => "git",
    Ssh => "ssh",
});

// =============================================================================
// Info requests
// =============================================================================

/// Desired state of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RepositoryInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<RepositoryVisibility>,
}

impl InfoRequest for RepositoryInfo {
    fn validate_info(&self) -> Result<(), ValidationErrors> {
        Validator::new("RepositoryInfo")
            .non_empty_if_set("default_branch", self.default_branch.as_deref())
            .finish()
    }

    /// Backends store an empty description as none, so the two compare equal.
    fn equals(&self, other: &Self) -> bool {
        let description = |info: &Self| info.description.clone().filter(|d| !d.is_empty());
        description(self) == description(other)
            && self.default_branch == other.default_branch
            && self.visibility == other.visibility
    }
}

impl DefaultedInfoRequest for RepositoryInfo {
    fn apply_defaults(&mut self) {
        self.visibility.get_or_insert(RepositoryVisibility::Private);
        self.default_branch
            .get_or_insert_with(|| DEFAULT_BRANCH.to_string());
    }
}

/// Desired access of one team on one repository.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TeamAccessInfo {
    /// Team name (required)
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<RepositoryPermission>,
}

impl InfoRequest for TeamAccessInfo {
    fn validate_info(&self) -> Result<(), ValidationErrors> {
        Validator::new("TeamAccessInfo")
            .required("name", &self.name)
            .finish()
    }
}

impl DefaultedInfoRequest for TeamAccessInfo {
    fn apply_defaults(&mut self) {
        self.permission.get_or_insert(RepositoryPermission::Pull);
    }
}

/// Desired state of a repository deploy key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeployKeyInfo {
    /// Key title, unique within the repository (required)
    pub name: String,
    /// Public key in OpenSSH format (required)
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
}

impl InfoRequest for DeployKeyInfo {
    fn validate_info(&self) -> Result<(), ValidationErrors> {
        Validator::new("DeployKeyInfo")
            .required("name", &self.name)
            .required("key", &self.key)
            .finish()
    }

    /// Keys compare by type and key data; a trailing comment is ignored
    /// because backends may drop it.
    fn equals(&self, other: &Self) -> bool {
        self.name == other.name
            && self.read_only == other.read_only
            && key_material(&self.key) == key_material(&other.key)
    }
}

/// `<type> <base64>` of an OpenSSH public key, without the comment.
pub fn key_material(key: &str) -> String {
    key.split_whitespace().take(2).collect::<Vec<_>>().join(" ")
}

impl DefaultedInfoRequest for DeployKeyInfo {
    fn apply_defaults(&mut self) {
        self.read_only.get_or_insert(true);
    }
}

/// Extra settings only applied when a repository is first created.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RepositoryCreateOptions {
    /// Create an initial commit (README) so the default branch exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_init: Option<bool>,
    /// License template name, e.g. "apache-2.0"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_template: Option<String>,
}

// =============================================================================
// Read-only domain values
// =============================================================================

/// An organization (GitHub org, GitLab group).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Organization {
    pub reference: OrganizationRef,
    /// Display name
    pub name: Option<String>,
    pub description: Option<String>,
}

/// A team within an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Team {
    pub organization: OrganizationRef,
    pub name: String,
    /// Logins of the team's members
    pub members: Vec<String>,
}

/// A commit on a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    /// Empty when the backend does not report it
    pub tree_sha: String,
    pub author: String,
    pub message: String,
    pub created_at: String,
    pub url: String,
}

/// A pull request (GitHub) or merge request (GitLab).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub description: Option<String>,
    pub source_branch: String,
    pub target_branch: String,
    pub web_url: String,
    pub merged: bool,
}

/// One entry of a git tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    pub mode: String,
    /// "blob", "tree" or "commit"
    pub entry_type: String,
    pub size: Option<u64>,
    pub sha: String,
    pub url: Option<String>,
}

/// A git tree, possibly walked recursively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    pub sha: String,
    pub entries: Vec<TreeEntry>,
    /// The backend cut the listing short
    pub truncated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::validate_and_default_info;

    #[test]
    fn test_repository_defaults() {
        let info = validate_and_default_info(RepositoryInfo {
            description: Some("d".to_string()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(info.visibility, Some(RepositoryVisibility::Private));
        assert_eq!(info.default_branch.as_deref(), Some("main"));
        assert_eq!(info.description.as_deref(), Some("d"));
    }

    #[test]
    fn test_defaults_never_overwrite() {
        let mut info = RepositoryInfo {
            description: Some(String::new()),
            default_branch: Some("trunk".to_string()),
            visibility: Some(RepositoryVisibility::Public),
        };
        let before = info.clone();
        info.apply_defaults();
        assert_eq!(info, before);

        let mut key = DeployKeyInfo {
            name: "ci".to_string(),
            key: "ssh-ed25519 AAAA".to_string(),
            read_only: Some(false),
        };
        key.apply_defaults();
        assert_eq!(key.read_only, Some(false));
    }

    #[test]
    fn test_defaults_are_idempotent() {
        let mut once = TeamAccessInfo {
            name: "devs".to_string(),
            permission: None,
        };
        once.apply_defaults();
        let mut twice = once.clone();
        twice.apply_defaults();
        assert_eq!(once, twice);
        assert_eq!(once.permission, Some(RepositoryPermission::Pull));

        let mut repo = RepositoryInfo::default();
        repo.apply_defaults();
        let mut repo_twice = repo.clone();
        repo_twice.apply_defaults();
        assert_eq!(repo, repo_twice);

        let mut key = DeployKeyInfo::default();
        key.apply_defaults();
        let mut key_twice = key.clone();
        key_twice.apply_defaults();
        assert_eq!(key, key_twice);
    }

    #[test]
    fn test_team_access_requires_name() {
        let err = TeamAccessInfo::default().validate_info().unwrap_err();
        assert!(err.has_field("name"));
    }

    #[test]
    fn test_deploy_key_requires_name_and_key() {
        let err = DeployKeyInfo::default().validate_info().unwrap_err();
        assert_eq!(err.len(), 2);
        assert!(err.has_field("name"));
        assert!(err.has_field("key"));
    }

    #[test]
    fn test_repository_rejects_empty_branch() {
        let info = RepositoryInfo {
            default_branch: Some(String::new()),
            ..Default::default()
        };
        assert!(info.validate_info().unwrap_err().has_field("default_branch"));
        assert!(RepositoryInfo::default().validate_info().is_ok());
    }

    #[test]
    fn test_empty_description_equals_unset() {
        let empty = validate_and_default_info(RepositoryInfo {
            description: Some(String::new()),
            ..Default::default()
        })
        .unwrap();
        let unset = validate_and_default_info(RepositoryInfo::default()).unwrap();
        assert!(empty.equals(&unset));
        assert!(unset.equals(&empty));

        let described = RepositoryInfo {
            description: Some("d".to_string()),
            ..unset.clone()
        };
        assert!(!described.equals(&unset));
    }

    #[test]
    fn test_deploy_key_comment_is_ignored() {
        let with_comment = DeployKeyInfo {
            name: "ci".to_string(),
            key: "ssh-ed25519 AAAAC3Nza ci@build-host".to_string(),
            read_only: Some(true),
        };
        let bare = DeployKeyInfo {
            key: "ssh-ed25519 AAAAC3Nza".to_string(),
            ..with_comment.clone()
        };
        assert!(with_comment.equals(&bare));

        let other = DeployKeyInfo {
            key: "ssh-ed25519 BBBBC3Nza ci@build-host".to_string(),
            ..with_comment.clone()
        };
        assert!(!with_comment.equals(&other));
        assert_eq!(key_material("  ssh-rsa  AAAAB3 me "), "ssh-rsa AAAAB3");
    }

    #[test]
    fn test_permission_ordering() {
        assert!(RepositoryPermission::Pull < RepositoryPermission::Push);
        assert!(RepositoryPermission::Maintain < RepositoryPermission::Admin);
    }

    #[test]
    fn test_info_serialization_skips_unset() {
        let info = RepositoryInfo {
            visibility: Some(RepositoryVisibility::Internal),
            ..Default::default()
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json, serde_json::json!({"visibility": "internal"}));

        let parsed: TeamAccessInfo =
            serde_json::from_str(r#"{"name": "ops", "permission": "maintain"}"#).unwrap();
        assert_eq!(parsed.permission, Some(RepositoryPermission::Maintain));
        let unknown = r#"{"name": "ops", "permission": "owner"}"#;
        assert!(serde_json::from_str::<TeamAccessInfo>(unknown).is_err());
    }
}
