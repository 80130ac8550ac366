//! GitLab adapter for gitprovider.
//!
//! Groups are organizations, subgroups are both sub-organizations and
//! teams, projects are repositories, and team access is project sharing.

mod client;
mod commits;
mod deploy_keys;
mod merge_requests;
mod organizations;
mod repositories;
mod team_access;
mod teams;
mod trees;
mod types;

pub use client::GitLabClient;
pub use commits::GitLabCommits;
pub use deploy_keys::{DeployKey, GitLabDeployKeys};
pub use merge_requests::GitLabMergeRequests;
pub use organizations::GitLabOrganizations;
pub use repositories::{GitLabOrgRepositories, GitLabUserRepositories, Project};
pub use team_access::{GitLabTeamAccess, TeamAccess};
pub use teams::GitLabTeams;
pub use trees::GitLabTrees;
pub use types::*;

/// Default GitLab URL.
pub const DEFAULT_GITLAB_URL: &str = "https://gitlab.com";

/// Provider identifier reported by [`GitLabClient`].
pub const PROVIDER_ID: &str = "gitlab";
