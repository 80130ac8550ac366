//! Subgroups of a GitLab group, as teams.

use std::sync::Arc;

use async_trait::async_trait;
use gitprovider_core::{OrganizationRef, Result, Team, TeamsClient};

use crate::client::{encode_path, group_endpoint, Api};
use crate::types::{GitLabGroup, GitLabMember};

/// Teams of one GitLab group.
pub struct GitLabTeams {
    api: Arc<Api>,
    organization: OrganizationRef,
}

impl GitLabTeams {
    pub(crate) fn new(api: Arc<Api>, organization: OrganizationRef) -> Self {
        Self { api, organization }
    }

    async fn with_members(&self, group: GitLabGroup) -> Result<Team> {
        let members: Vec<GitLabMember> = self
            .api
            .list(&format!("/groups/{}/members", group.id), &[])
            .await?;
        Ok(Team {
            organization: self.organization.clone(),
            name: group.path,
            members: members.into_iter().map(|m| m.username).collect(),
        })
    }
}

#[async_trait]
impl TeamsClient for GitLabTeams {
    /// Look a team up by subgroup path.
    async fn get(&self, name: &str) -> Result<Team> {
        self.api.check(&self.organization)?;
        let full_path = format!("{}/{}", self.organization.path(), name);
        let group: GitLabGroup = self
            .api
            .get(&format!("/groups/{}", encode_path(&full_path)))
            .await?;
        self.with_members(group).await
    }

    async fn list(&self) -> Result<Vec<Team>> {
        self.api.check(&self.organization)?;
        let groups: Vec<GitLabGroup> = self
            .api
            .list(&format!("{}/subgroups", group_endpoint(&self.organization)), &[])
            .await?;

        let mut teams = Vec::with_capacity(groups.len());
        for group in groups {
            teams.push(self.with_members(group).await?);
        }
        Ok(teams)
    }
}
