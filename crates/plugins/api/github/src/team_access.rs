//! Team permissions on an organization repository.

use std::sync::Arc;

use async_trait::async_trait;
use gitprovider_core::validation::parse_enum;
use gitprovider_core::{
    validate_and_default_info, Error, InfoRequest, KnownValues, OrgRepositoryRef,
    RepositoryPermission, RepositoryRef, ResourceClient, ResourceObject, Result,
    TeamAccessClient, TeamAccessInfo,
};
use reqwest::Method;
use tracing::{debug, info};

use crate::client::{organization_login, Api};
use crate::types::{GitHubTeam, TeamRepositoryPermissionRequest};

/// Access of one team to one GitHub repository.
pub struct TeamAccess {
    api: Arc<Api>,
    repository: RepositoryRef,
    /// Name or slug the access was looked up by
    name: String,
    native: GitHubTeam,
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

fn permission_of(native: &GitHubTeam) -> Result<RepositoryPermission> {
    let value = native.permission.as_deref().ok_or_else(|| {
        Error::InvalidServerData(format!("team {} has no repository permission", native.slug))
    })?;
    parse_enum("GitHubTeam", "permission", value)
        .map_err(|e| Error::InvalidServerData(e.to_string()))
}

fn matches_team(team: &GitHubTeam, name: &str) -> bool {
    team.name == name || team.slug == name
}

#[async_trait]
impl ResourceObject for TeamAccess {
    type Info = TeamAccessInfo;
    type Native = GitHubTeam;

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
        if !matches_team(&self.native, &info.name) {
            return Err(Error::InvalidArgument(format!(
                "team access for {} cannot be renamed to {}",
                self.name, info.name
            )));
        }
        if let Some(permission) = info.permission {
            self.native.permission = Some(permission.as_str().to_string());
        }
        Ok(())
    }

    async fn update(&mut self) -> Result<()> {
        let RepositoryRef::Org(repository) = &self.repository else {
            return Err(Error::InvalidArgument(
                "team access requires an organization repository".to_string(),
            ));
        };
        let permission = permission_of(&self.native)?;
        grant(&self.api, repository, &self.native.slug, permission).await?;
        self.native = fetch(&self.api, repository, &self.native.slug).await?;
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        self.api.options.ensure_destructive("delete team access")?;
        let RepositoryRef::Org(repository) = &self.repository else {
            return Err(Error::InvalidArgument(
                "team access requires an organization repository".to_string(),
            ));
        };
        self.api
            .delete(&team_repository_path(repository, &self.native.slug)?)
            .await?;
        info!(team = %self.name, repository = %self.repository, "Team access removed");
        Ok(())
    }

    fn api_object(&self) -> &GitHubTeam {
        &self.native
    }
}

fn team_repository_path(repository: &OrgRepositoryRef, slug: &str) -> Result<String> {
    let org = organization_login(&repository.organization)?;
    Ok(format!(
        "/orgs/{}/teams/{}/repos/{}/{}",
        org, slug, org, repository.repository_name
    ))
}

async fn grant(
    api: &Api,
    repository: &OrgRepositoryRef,
    slug: &str,
    permission: RepositoryPermission,
) -> Result<()> {
    debug!(team = slug, permission = %permission, "Granting team access");
    let request = TeamRepositoryPermissionRequest {
        permission: permission.as_str().to_string(),
    };
    api.send_empty(
        Method::PUT,
        &team_repository_path(repository, slug)?,
        Some(&request),
    )
    .await
}

async fn list_native(api: &Api, repository: &OrgRepositoryRef) -> Result<Vec<GitHubTeam>> {
    let org = organization_login(&repository.organization)?;
    api.list(
        &format!("/repos/{}/{}/teams", org, repository.repository_name),
        &[],
    )
    .await
}

/// Re-read one team's access after a write.
async fn fetch(api: &Api, repository: &OrgRepositoryRef, name: &str) -> Result<GitHubTeam> {
    list_native(api, repository)
        .await?
        .into_iter()
        .find(|t| matches_team(t, name))
        .ok_or_else(|| Error::not_found(format!("team {} on {}", name, repository)))
}

/// Team permissions on one GitHub repository, addressed by team name or slug.
pub struct GitHubTeamAccess {
    api: Arc<Api>,
    repository: OrgRepositoryRef,
}

impl GitHubTeamAccess {
    pub(crate) fn new(api: Arc<Api>, repository: OrgRepositoryRef) -> Self {
        Self { api, repository }
    }

    fn wrap(&self, name: &str, native: GitHubTeam) -> Result<TeamAccess> {
        permission_of(&native)?;
        Ok(TeamAccess {
            api: self.api.clone(),
            repository: self.repository.clone().into(),
            name: name.to_string(),
            native,
        })
    }
}

#[async_trait]
impl ResourceClient for GitHubTeamAccess {
    type Ref = String;
    type Info = TeamAccessInfo;
    type Resource = TeamAccess;
    type CreateOptions = ();

    async fn get(&self, name: &String) -> Result<TeamAccess> {
        self.api.check(&self.repository)?;
        let native = fetch(&self.api, &self.repository, name).await?;
        self.wrap(name, native)
    }

    /// The grant endpoint overwrites existing access, so an existing grant
    /// is reported as `AlreadyExists` before anything is written.
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

        let org = organization_login(&self.repository.organization)?;
        let teams: Vec<GitHubTeam> = self.api.list(&format!("/orgs/{}/teams", org), &[]).await?;
        let mut team = teams
            .into_iter()
            .find(|t| matches_team(t, name))
            .ok_or_else(|| Error::not_found(format!("team {} in {}", name, org)))?;

        let granted = list_native(&self.api, &self.repository).await?;
        if granted.iter().any(|t| t.slug == team.slug) {
            return Err(Error::already_exists(format!(
                "team {} already has access to {}",
                name, self.repository
            )));
        }

        let permission = desired.permission.unwrap_or(RepositoryPermission::Pull);
        grant(&self.api, &self.repository, &team.slug, permission).await?;
        team.permission = Some(permission.as_str().to_string());
        self.wrap(name, team)
    }
}

#[async_trait]
impl TeamAccessClient for GitHubTeamAccess {
    async fn list(&self) -> Result<Vec<TeamAccess>> {
        self.api.check(&self.repository)?;
        list_native(&self.api, &self.repository)
            .await?
            .into_iter()
            .map(|native| {
                let name = native.name.clone();
                self.wrap(&name, native)
            })
            .collect()
    }
}
