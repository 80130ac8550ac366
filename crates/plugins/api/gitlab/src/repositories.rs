//! Projects owned by groups and users.

use std::sync::Arc;

use async_trait::async_trait;
use gitprovider_core::validation::parse_enum;
use gitprovider_core::{
    validate_and_default_info, Error, InfoRequest, KnownValues, OrgRepositoriesClient,
    OrgRepositoryRef, OrganizationRef, RepositoryCreateOptions, RepositoryInfo, RepositoryRef,
    RepositoryVisibility, ResourceClient, ResourceObject, Result, UserRef,
    UserRepositoriesClient, UserRepositoryRef, DEFAULT_BRANCH,
};
use reqwest::Method;
use tracing::{debug, info};

use crate::client::{encode_path, group_endpoint, project_endpoint, Api};
use crate::types::{
    CreateProjectRequest, GitLabGroup, GitLabProject, GitLabUser, UpdateProjectRequest,
};
use crate::PROVIDER_ID;

/// A GitLab project.
pub struct Project {
    api: Arc<Api>,
    reference: RepositoryRef,
    native: GitLabProject,
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("reference", &self.reference)
            .field("native", &self.native)
            .finish()
    }
}

impl Project {
    fn new(api: Arc<Api>, reference: RepositoryRef, native: GitLabProject) -> Result<Self> {
        visibility_of(&native)?;
        Ok(Self {
            api,
            reference,
            native,
        })
    }
}

fn visibility_of(native: &GitLabProject) -> Result<RepositoryVisibility> {
    let value = native.visibility.as_deref().ok_or_else(|| {
        Error::InvalidServerData(format!(
            "project {} has no visibility",
            native.path_with_namespace
        ))
    })?;
    parse_enum("GitLabProject", "visibility", value)
        .map_err(|e| Error::InvalidServerData(e.to_string()))
}

#[async_trait]
impl ResourceObject for Project {
    type Info = RepositoryInfo;
    type Native = GitLabProject;

    fn repository(&self) -> &RepositoryRef {
        &self.reference
    }

    fn get(&self) -> RepositoryInfo {
        RepositoryInfo {
            description: self.native.description.clone().filter(|d| !d.is_empty()),
            // Empty projects have no default branch until the first push
            default_branch: Some(
                self.native
                    .default_branch
                    .clone()
                    .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            ),
            visibility: visibility_of(&self.native).ok(),
        }
    }

    fn set(&mut self, info: RepositoryInfo) -> Result<()> {
        info.validate_info()?;
        self.native.description = info.description;
        if let Some(branch) = info.default_branch {
            self.native.default_branch = Some(branch);
        }
        if let Some(visibility) = info.visibility {
            self.native.visibility = Some(visibility.as_str().to_string());
        }
        Ok(())
    }

    async fn update(&mut self) -> Result<()> {
        let request = UpdateProjectRequest {
            description: self.native.description.clone().unwrap_or_default(),
            default_branch: self.native.default_branch.clone(),
            visibility: self.native.visibility.clone(),
        };
        let native: GitLabProject = self
            .api
            .send(Method::PUT, &project_endpoint(&self.reference), &request)
            .await?;
        visibility_of(&native)?;
        self.native = native;
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        self.api.options.ensure_destructive("delete repository")?;
        self.api.delete(&project_endpoint(&self.reference)).await?;
        info!(repository = %self.reference, "Project deleted");
        Ok(())
    }

    fn api_object(&self) -> &GitLabProject {
        &self.native
    }
}

fn create_request(
    name: &str,
    namespace_id: Option<u64>,
    desired: RepositoryInfo,
    options: RepositoryCreateOptions,
) -> Result<CreateProjectRequest> {
    if options.license_template.is_some() {
        return Err(Error::unsupported(PROVIDER_ID, "license templates"));
    }
    Ok(CreateProjectRequest {
        name: name.to_string(),
        path: name.to_string(),
        namespace_id,
        description: desired.description,
        visibility: desired
            .visibility
            .unwrap_or(RepositoryVisibility::Private)
            .as_str()
            .to_string(),
        initialize_with_readme: options.auto_init,
        default_branch: desired.default_branch,
    })
}

async fn fetch(api: &Arc<Api>, reference: RepositoryRef) -> Result<Project> {
    let native = api.get(&project_endpoint(&reference)).await?;
    Project::new(api.clone(), reference, native)
}

// =============================================================================
// Group projects
// =============================================================================

/// Projects of GitLab groups and subgroups.
pub struct GitLabOrgRepositories {
    api: Arc<Api>,
}

impl GitLabOrgRepositories {
    pub(crate) fn new(api: Arc<Api>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ResourceClient for GitLabOrgRepositories {
    type Ref = OrgRepositoryRef;
    type Info = RepositoryInfo;
    type Resource = Project;
    type CreateOptions = RepositoryCreateOptions;

    async fn get(&self, reference: &OrgRepositoryRef) -> Result<Project> {
        self.api.check(reference)?;
        fetch(&self.api, reference.clone().into()).await
    }

    async fn create(
        &self,
        reference: &OrgRepositoryRef,
        desired: RepositoryInfo,
        options: RepositoryCreateOptions,
    ) -> Result<Project> {
        self.api.check(reference)?;
        let desired = validate_and_default_info(desired)?;
        let group: GitLabGroup = self.api.get(&group_endpoint(&reference.organization)).await?;

        debug!(repository = %reference, namespace_id = group.id, "Creating group project");
        let request = create_request(&reference.repository_name, Some(group.id), desired, options)?;
        let native = self.api.send(Method::POST, "/projects", &request).await?;
        Project::new(self.api.clone(), reference.clone().into(), native)
    }
}

#[async_trait]
impl OrgRepositoriesClient for GitLabOrgRepositories {
    async fn list(&self, organization: &OrganizationRef) -> Result<Vec<Project>> {
        self.api.check(organization)?;
        let natives: Vec<GitLabProject> = self
            .api
            .list(&format!("{}/projects", group_endpoint(organization)), &[])
            .await?;

        natives
            .into_iter()
            .map(|native| {
                let reference =
                    OrgRepositoryRef::new(organization.clone(), native.path.clone()).into();
                Project::new(self.api.clone(), reference, native)
            })
            .collect()
    }
}

// =============================================================================
// User projects
// =============================================================================

/// Projects in GitLab user namespaces.
pub struct GitLabUserRepositories {
    api: Arc<Api>,
}

impl GitLabUserRepositories {
    pub(crate) fn new(api: Arc<Api>) -> Self {
        Self { api }
    }

    /// Projects without a namespace land in the authenticated user's.
    async fn ensure_authenticated_user(&self, user: &UserRef) -> Result<()> {
        let me: GitLabUser = self.api.get("/user").await?;
        if me.username.eq_ignore_ascii_case(&user.user_login) {
            Ok(())
        } else {
            Err(Error::InvalidArgument(format!(
                "cannot create projects for {} while authenticated as {}",
                user.user_login, me.username
            )))
        }
    }
}

#[async_trait]
impl ResourceClient for GitLabUserRepositories {
    type Ref = UserRepositoryRef;
    type Info = RepositoryInfo;
    type Resource = Project;
    type CreateOptions = RepositoryCreateOptions;

    async fn get(&self, reference: &UserRepositoryRef) -> Result<Project> {
        self.api.check(reference)?;
        fetch(&self.api, reference.clone().into()).await
    }

    async fn create(
        &self,
        reference: &UserRepositoryRef,
        desired: RepositoryInfo,
        options: RepositoryCreateOptions,
    ) -> Result<Project> {
        self.api.check(reference)?;
        let desired = validate_and_default_info(desired)?;
        let request = create_request(&reference.repository_name, None, desired, options)?;
        self.ensure_authenticated_user(&reference.user).await?;

        debug!(repository = %reference, "Creating user project");
        let native = self.api.send(Method::POST, "/projects", &request).await?;
        Project::new(self.api.clone(), reference.clone().into(), native)
    }
}

#[async_trait]
impl UserRepositoriesClient for GitLabUserRepositories {
    async fn list(&self, user: &UserRef) -> Result<Vec<Project>> {
        self.api.check(user)?;
        let natives: Vec<GitLabProject> = self
            .api
            .list(
                &format!("/users/{}/projects", encode_path(&user.user_login)),
                &[],
            )
            .await?;

        natives
            .into_iter()
            .map(|native| {
                let reference = UserRepositoryRef::new(user.clone(), native.path.clone()).into();
                Project::new(self.api.clone(), reference, native)
            })
            .collect()
    }
}
