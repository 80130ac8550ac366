//! GitHub adapter for gitprovider.
//!
//! Implements the gitprovider client traits against the GitHub REST API
//! (github.com and GitHub Enterprise Server).

mod client;
mod commits;
mod deploy_keys;
mod organizations;
mod pull_requests;
mod repositories;
mod team_access;
mod teams;
mod trees;
mod types;

pub use client::GitHubClient;
pub use commits::GitHubCommits;
pub use deploy_keys::{DeployKey, GitHubDeployKeys};
pub use organizations::GitHubOrganizations;
pub use pull_requests::GitHubPullRequests;
pub use repositories::{GitHubOrgRepositories, GitHubUserRepositories, Repository};
pub use team_access::{GitHubTeamAccess, TeamAccess};
pub use teams::GitHubTeams;
pub use trees::GitHubTrees;
pub use types::*;

/// Default GitHub API URL.
pub const DEFAULT_GITHUB_URL: &str = "https://api.github.com";

/// Provider identifier reported by [`GitHubClient`].
pub const PROVIDER_ID: &str = "github";
