//! Teams of a GitHub organization.

use std::sync::Arc;

use async_trait::async_trait;
use gitprovider_core::{Error, OrganizationRef, Result, Team, TeamsClient};

use crate::client::{organization_login, Api};
use crate::types::{GitHubTeam, GitHubUser};

/// Teams of one GitHub organization.
pub struct GitHubTeams {
    api: Arc<Api>,
    organization: OrganizationRef,
}

impl GitHubTeams {
    pub(crate) fn new(api: Arc<Api>, organization: OrganizationRef) -> Self {
        Self { api, organization }
    }

    async fn with_members(&self, team: GitHubTeam) -> Result<Team> {
        let org = organization_login(&self.organization)?;
        let members: Vec<GitHubUser> = self
            .api
            .list(&format!("/orgs/{}/teams/{}/members", org, team.slug), &[])
            .await?;
        Ok(Team {
            organization: self.organization.clone(),
            name: team.name,
            members: members.into_iter().map(|m| m.login).collect(),
        })
    }

    async fn list_native(&self) -> Result<Vec<GitHubTeam>> {
        self.api.check(&self.organization)?;
        let org = organization_login(&self.organization)?;
        self.api.list(&format!("/orgs/{}/teams", org), &[]).await
    }
}

#[async_trait]
impl TeamsClient for GitHubTeams {
    /// Look a team up by name or slug.
    async fn get(&self, name: &str) -> Result<Team> {
        let team = self
            .list_native()
            .await?
            .into_iter()
            .find(|t| t.name == name || t.slug == name)
            .ok_or_else(|| Error::not_found(format!("team {} in {}", name, self.organization)))?;
        self.with_members(team).await
    }

    async fn list(&self) -> Result<Vec<Team>> {
        let mut teams = Vec::new();
        for team in self.list_native().await? {
            teams.push(self.with_members(team).await?);
        }
        Ok(teams)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GitHubClient;
    use gitprovider_core::{Client, ClientOptions};
    use httpmock::prelude::*;

    fn teams(server: &MockServer) -> GitHubTeams {
        GitHubClient::with_base_url(server.base_url(), "test-token", ClientOptions::default())
            .unwrap()
            .teams(&OrganizationRef::new("github.com", "acme"))
    }

    #[tokio::test]
    async fn test_get_team_with_members() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/orgs/acme/teams");
            then.status(200).json_body(serde_json::json!([
                {"id": 5, "name": "Platform", "slug": "platform"}
            ]));
        });
        server.mock(|when, then| {
            when.method(GET).path("/orgs/acme/teams/platform/members");
            then.status(200).json_body(serde_json::json!([
                {"id": 1, "login": "alice"},
                {"id": 2, "login": "bob"}
            ]));
        });

        let team = teams(&server).get("platform").await.unwrap();
        assert_eq!(team.name, "Platform");
        assert_eq!(team.members, vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn test_get_missing_team_is_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/orgs/acme/teams");
            then.status(200).json_body(serde_json::json!([]));
        });

        let err = teams(&server).get("ghost").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
