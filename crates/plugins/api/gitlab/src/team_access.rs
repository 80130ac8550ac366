//! Team access as project sharing.
//!
//! A team is a subgroup of the project's group. Granting it access shares
//! the project with that subgroup at a GitLab access level.

use std::sync::Arc;

use async_trait::async_trait;
use gitprovider_core::{
    validate_and_default_info, Error, InfoRequest, OrgRepositoryRef, RepositoryPermission,
    RepositoryRef, ResourceClient, ResourceObject, Result, TeamAccessClient, TeamAccessInfo,
};
use reqwest::Method;
use tracing::{debug, info};

use crate::client::{encode_path, project_endpoint, Api};
use crate::types::{GitLabGroup, GitLabProject, GitLabSharedGroup, ShareProjectRequest};

/// Access of one subgroup to one GitLab project.
pub struct TeamAccess {
    api: Arc<Api>,
    repository: RepositoryRef,
    name: String,
    native: GitLabSharedGroup,
}

impl std::fmt::Debug for TeamAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeamAccess")
            .field("repository", &self.repository)
            .field("name", &self.name)
            .field("native", &self.native)
            .finish()
    }
}

/// GitLab access level for a permission: guest, reporter, developer,
/// maintainer, owner.
fn access_level(permission: RepositoryPermission) -> u32 {
    match permission {
        RepositoryPermission::Pull => 10,
        RepositoryPermission::Triage => 20,
        RepositoryPermission::Push => 30,
        RepositoryPermission::Maintain => 40,
        RepositoryPermission::Admin => 50,
    }
}

fn permission_of(native: &GitLabSharedGroup) -> Result<RepositoryPermission> {
    match native.group_access_level {
        10 => Ok(RepositoryPermission::Pull),
        20 => Ok(RepositoryPermission::Triage),
        30 => Ok(RepositoryPermission::Push),
        40 => Ok(RepositoryPermission::Maintain),
        50 => Ok(RepositoryPermission::Admin),
        other => Err(Error::InvalidServerData(format!(
            "group {} has unknown access level {}",
            native.group_name, other
        ))),
    }
}

#[async_trait]
impl ResourceObject for TeamAccess {
    type Info = TeamAccessInfo;
    type Native = GitLabSharedGroup;

    fn repository(&self) -> &RepositoryRef {
        &self.repository
    }

    fn get(&self) -> TeamAccessInfo {
        TeamAccessInfo {
            name: self.name.clone(),
            permission: permission_of(&self.native).ok(),
        }
    }

    fn set(&mut self, info: TeamAccessInfo) -> Result<()> {
        info.validate_info()?;
        if info.name != self.name {
            return Err(Error::InvalidArgument(format!(
                "team access for {} cannot be renamed to {}",
                self.name, info.name
            )));
        }
        if let Some(permission) = info.permission {
            self.native.group_access_level = access_level(permission);
        }
        Ok(())
    }

    async fn update(&mut self) -> Result<()> {
        // Share levels cannot be edited; replace the share.
        let shares = format!("{}/share", project_endpoint(&self.repository));
        debug!(team = %self.name, level = self.native.group_access_level, "Re-sharing project");
        self.api
            .delete(&format!("{}/{}", shares, self.native.group_id))
            .await?;
        share(
            &self.api,
            &self.repository,
            self.native.group_id,
            self.native.group_access_level,
        )
        .await?;
        self.native = fetch(&self.api, &self.repository, self.native.group_id).await?;
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        self.api.options.ensure_destructive("delete team access")?;
        self.api
            .delete(&format!(
                "{}/share/{}",
                project_endpoint(&self.repository),
                self.native.group_id
            ))
            .await?;
        info!(team = %self.name, repository = %self.repository, "Project share removed");
        Ok(())
    }

    fn api_object(&self) -> &GitLabSharedGroup {
        &self.native
    }
}

async fn share(api: &Api, repository: &RepositoryRef, group_id: u64, level: u32) -> Result<()> {
    let request = ShareProjectRequest {
        group_id,
        group_access: level,
    };
    api.send_empty(
        Method::POST,
        &format!("{}/share", project_endpoint(repository)),
        Some(&request),
    )
    .await
}

async fn shared_groups(api: &Api, repository: &RepositoryRef) -> Result<Vec<GitLabSharedGroup>> {
    let project: GitLabProject = api.get(&project_endpoint(repository)).await?;
    Ok(project.shared_with_groups)
}

/// Re-read one share after a write.
async fn fetch(api: &Api, repository: &RepositoryRef, group_id: u64) -> Result<GitLabSharedGroup> {
    shared_groups(api, repository)
        .await?
        .into_iter()
        .find(|g| g.group_id == group_id)
        .ok_or_else(|| Error::not_found(format!("share of {} with group {}", repository, group_id)))
}

/// Project shares of one GitLab project, addressed by subgroup path.
pub struct GitLabTeamAccess {
    api: Arc<Api>,
    repository: OrgRepositoryRef,
}

impl GitLabTeamAccess {
    pub(crate) fn new(api: Arc<Api>, repository: OrgRepositoryRef) -> Self {
        Self { api, repository }
    }

    /// Team name of a share: the path below the project's group, or the
    /// full path for groups outside it.
    fn team_name(&self, native: &GitLabSharedGroup) -> String {
        let group_path = self.repository.organization.path();
        match native.group_full_path.as_deref() {
            Some(full) => full
                .strip_prefix(&group_path)
                .and_then(|rest| rest.strip_prefix('/'))
                .unwrap_or(full)
                .to_string(),
            None => native.group_name.clone(),
        }
    }

    fn team_full_path(&self, name: &str) -> String {
        format!("{}/{}", self.repository.organization.path(), name)
    }

    fn wrap(&self, native: GitLabSharedGroup) -> Result<TeamAccess> {
        permission_of(&native)?;
        Ok(TeamAccess {
            api: self.api.clone(),
            repository: self.repository.clone().into(),
            name: self.team_name(&native),
            native,
        })
    }
}

#[async_trait]
impl ResourceClient for GitLabTeamAccess {
    type Ref = String;
    type Info = TeamAccessInfo;
    type Resource = TeamAccess;
    type CreateOptions = ();

    async fn get(&self, name: &String) -> Result<TeamAccess> {
        self.api.check(&self.repository)?;
        let repository: RepositoryRef = self.repository.clone().into();
        let native = shared_groups(&self.api, &repository)
            .await?
            .into_iter()
            .find(|g| &self.team_name(g) == name)
            .ok_or_else(|| Error::not_found(format!("team {} on {}", name, self.repository)))?;
        self.wrap(native)
    }

    async fn create(
        &self,
        name: &String,
        desired: TeamAccessInfo,
        _options: (),
    ) -> Result<TeamAccess> {
        self.api.check(&self.repository)?;
        let desired = validate_and_default_info(desired)?;
        if &desired.name != name {
            return Err(Error::InvalidArgument(format!(
                "team name {} does not match {}",
                desired.name, name
            )));
        }

        let group: GitLabGroup = self
            .api
            .get(&format!("/groups/{}", encode_path(&self.team_full_path(name))))
            .await?;
        let permission = desired.permission.unwrap_or(RepositoryPermission::Pull);
        let repository: RepositoryRef = self.repository.clone().into();
        share(&self.api, &repository, group.id, access_level(permission)).await?;
        self.wrap(fetch(&self.api, &repository, group.id).await?)
    }
}

#[async_trait]
impl TeamAccessClient for GitLabTeamAccess {
    async fn list(&self) -> Result<Vec<TeamAccess>> {
        self.api.check(&self.repository)?;
        shared_groups(&self.api, &self.repository.clone().into())
            .await?
            .into_iter()
            .map(|native| self.wrap(native))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GitLabClient;
    use gitprovider_core::{Client, ClientOptions, ErrorKind, OrganizationRef, ReconcileOutcome};
    use httpmock::prelude::*;

    const PROJECT_PATH: &str = "/api/v4/projects/acme%2Fapp";

    fn team_access(server: &MockServer) -> GitLabTeamAccess {
        let client =
            GitLabClient::with_base_url(server.base_url(), "glpat-test", ClientOptions::default())
                .unwrap();
        client.team_access(&OrgRepositoryRef::new(
            OrganizationRef::new("gitlab.com", "acme"),
            "app",
        ))
    }

    fn project_json(shares: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "id": 99,
            "name": "app",
            "path": "app",
            "path_with_namespace": "acme/app",
            "visibility": "private",
            "web_url": "https://gitlab.com/acme/app",
            "shared_with_groups": shares
        })
    }

    fn share_json(level: u32) -> serde_json::Value {
        serde_json::json!({
            "group_id": 31,
            "group_name": "Platform",
            "group_full_path": "acme/platform",
            "group_access_level": level
        })
    }

    #[test]
    fn test_access_levels_round_trip() {
        for permission in [
            RepositoryPermission::Pull,
            RepositoryPermission::Triage,
            RepositoryPermission::Push,
            RepositoryPermission::Maintain,
            RepositoryPermission::Admin,
        ] {
            let native = GitLabSharedGroup {
                group_id: 1,
                group_name: "g".to_string(),
                group_full_path: None,
                group_access_level: access_level(permission),
            };
            assert_eq!(permission_of(&native).unwrap(), permission);
        }
    }

    #[tokio::test]
    async fn test_list_names_teams_relative_to_group() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path(PROJECT_PATH);
            then.status(200).json_body(project_json(serde_json::json!([
                share_json(30),
                {
                    "group_id": 40, "group_name": "Auditors",
                    "group_full_path": "other/auditors", "group_access_level": 20
                }
            ])));
        });

        let shares = team_access(&server).list().await.unwrap();
        let infos: Vec<_> = shares.iter().map(|s| s.get()).collect();
        assert_eq!(
            infos,
            vec![
                TeamAccessInfo {
                    name: "platform".to_string(),
                    permission: Some(RepositoryPermission::Push),
                },
                TeamAccessInfo {
                    name: "other/auditors".to_string(),
                    permission: Some(RepositoryPermission::Triage),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_create_shares_with_subgroup() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/v4/groups/acme%2Fplatform");
            then.status(200).json_body(serde_json::json!({
                "id": 31, "name": "Platform", "path": "platform", "full_path": "acme/platform"
            }));
        });
        let share = server.mock(|when, then| {
            when.method(POST)
                .path(format!("{}/share", PROJECT_PATH))
                .json_body(serde_json::json!({"group_id": 31, "group_access": 10}));
            then.status(201).json_body(serde_json::json!({"id": 1}));
        });
        server.mock(|when, then| {
            when.method(GET).path(PROJECT_PATH);
            then.status(200)
                .json_body(project_json(serde_json::json!([share_json(10)])));
        });

        let created = team_access(&server)
            .create(
                &"platform".to_string(),
                TeamAccessInfo {
                    name: "platform".to_string(),
                    permission: None,
                },
                (),
            )
            .await
            .unwrap();

        share.assert();
        assert_eq!(created.get().permission, Some(RepositoryPermission::Pull));
    }

    #[tokio::test]
    async fn test_reconcile_replaces_share_with_new_level() {
        let server = MockServer::start();
        let mut before = server.mock(|when, then| {
            when.method(GET).path(PROJECT_PATH);
            then.status(200)
                .json_body(project_json(serde_json::json!([share_json(10)])));
        });
        let unshare = server.mock(|when, then| {
            when.method(DELETE).path(format!("{}/share/31", PROJECT_PATH));
            then.status(204);
        });
        let share = server.mock(|when, then| {
            when.method(POST)
                .path(format!("{}/share", PROJECT_PATH))
                .json_body(serde_json::json!({"group_id": 31, "group_access": 40}));
            then.status(201).json_body(serde_json::json!({"id": 1}));
        });

        let access = team_access(&server);
        let mut current = access.get(&"platform".to_string()).await.unwrap();
        before.delete();
        server.mock(|when, then| {
            when.method(GET).path(PROJECT_PATH);
            then.status(200)
                .json_body(project_json(serde_json::json!([share_json(40)])));
        });

        current
            .set(TeamAccessInfo {
                name: "platform".to_string(),
                permission: Some(RepositoryPermission::Maintain),
            })
            .unwrap();
        current.update().await.unwrap();

        unshare.assert();
        share.assert();
        assert_eq!(current.get().permission, Some(RepositoryPermission::Maintain));
    }

    #[tokio::test]
    async fn test_reconcile_matching_share_is_noop() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path(PROJECT_PATH);
            then.status(200)
                .json_body(project_json(serde_json::json!([share_json(30)])));
        });

        let reconciled = team_access(&server)
            .reconcile(
                &"platform".to_string(),
                TeamAccessInfo {
                    name: "platform".to_string(),
                    permission: Some(RepositoryPermission::Push),
                },
                (),
            )
            .await
            .unwrap();
        assert_eq!(reconciled.outcome, ReconcileOutcome::NoOp);
    }

    #[tokio::test]
    async fn test_unknown_access_level_is_invalid_server_data() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path(PROJECT_PATH);
            then.status(200)
                .json_body(project_json(serde_json::json!([share_json(5)])));
        });

        let err = team_access(&server).list().await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidServerData));
    }
}
