//! Repositories owned by organizations and users.

use std::sync::Arc;

use async_trait::async_trait;
use gitprovider_core::validation::parse_enum;
use gitprovider_core::{
    validate_and_default_info, Error, InfoRequest, KnownValues, OrgRepositoriesClient,
    OrgRepositoryRef, OrganizationRef, RepositoryCreateOptions, RepositoryInfo, RepositoryRef,
    RepositoryVisibility, ResourceClient, ResourceObject, Result, UserRef,
    UserRepositoriesClient, UserRepositoryRef,
};
use reqwest::Method;
use tracing::{debug, info};

use crate::client::{organization_login, repository_path, Api};
use crate::types::{
    CreateRepositoryRequest, GitHubRepository, GitHubUser, UpdateRepositoryRequest,
};

/// A GitHub repository.
pub struct Repository {
    api: Arc<Api>,
    reference: RepositoryRef,
    native: GitHubRepository,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("reference", &self.reference)
            .field("native", &self.native)
            .finish()
    }
}

impl Repository {
    fn new(api: Arc<Api>, reference: RepositoryRef, native: GitHubRepository) -> Result<Self> {
        visibility_of(&native)?;
        if native.name.is_empty() {
            return Err(Error::InvalidServerData(
                "GitHub repository without a name".to_string(),
            ));
        }
        Ok(Self {
            api,
            reference,
            native,
        })
    }
}

/// Visibility of a native repository. Older Enterprise servers only report
/// the `private` flag.
fn visibility_of(native: &GitHubRepository) -> Result<RepositoryVisibility> {
    match native.visibility.as_deref() {
        Some(value) => parse_enum("GitHubRepository", "visibility", value)
            .map_err(|e| Error::InvalidServerData(e.to_string())),
        None if native.private => Ok(RepositoryVisibility::Private),
        None => Ok(RepositoryVisibility::Public),
    }
}

/// Empty descriptions come back as `null` or `""`; both mean "none".
fn description_of(native: &GitHubRepository) -> Option<String> {
    native.description.clone().filter(|d| !d.is_empty())
}

#[async_trait]
impl ResourceObject for Repository {
    type Info = RepositoryInfo;
    type Native = GitHubRepository;

    fn repository(&self) -> &RepositoryRef {
        &self.reference
    }

    fn get(&self) -> RepositoryInfo {
        RepositoryInfo {
            description: description_of(&self.native),
            default_branch: self.native.default_branch.clone(),
            // Validated when the resource was built
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
            self.native.private = visibility != RepositoryVisibility::Public;
            self.native.visibility = Some(visibility.as_str().to_string());
        }
        Ok(())
    }

    async fn update(&mut self) -> Result<()> {
        let path = repository_path(&self.reference)?;
        let request = UpdateRepositoryRequest {
            description: self.native.description.clone().unwrap_or_default(),
            default_branch: self.native.default_branch.clone(),
            visibility: self.native.visibility.clone(),
        };
        let native: GitHubRepository = self.api.send(Method::PATCH, &path, &request).await?;
        visibility_of(&native)?;
        self.native = native;
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        self.api.options.ensure_destructive("delete repository")?;
        let path = repository_path(&self.reference)?;
        self.api.delete(&path).await?;
        info!(repository = %self.reference, "Repository deleted");
        Ok(())
    }

    fn api_object(&self) -> &GitHubRepository {
        &self.native
    }
}

fn create_request(
    name: &str,
    desired: RepositoryInfo,
    options: RepositoryCreateOptions,
) -> CreateRepositoryRequest {
    let visibility = desired.visibility.unwrap_or(RepositoryVisibility::Private);
    CreateRepositoryRequest {
        name: name.to_string(),
        description: desired.description,
        private: visibility != RepositoryVisibility::Public,
        visibility: Some(visibility.as_str().to_string()),
        auto_init: options.auto_init,
        license_template: options.license_template,
    }
}

// =============================================================================
// Organization repositories
// =============================================================================

/// Repositories of GitHub organizations.
pub struct GitHubOrgRepositories {
    api: Arc<Api>,
}

impl GitHubOrgRepositories {
    pub(crate) fn new(api: Arc<Api>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ResourceClient for GitHubOrgRepositories {
    type Ref = OrgRepositoryRef;
    type Info = RepositoryInfo;
    type Resource = Repository;
    type CreateOptions = RepositoryCreateOptions;

    async fn get(&self, reference: &OrgRepositoryRef) -> Result<Repository> {
        self.api.check(reference)?;
        let reference = RepositoryRef::from(reference.clone());
        let native = self.api.get(&repository_path(&reference)?).await?;
        Repository::new(self.api.clone(), reference, native)
    }

    async fn create(
        &self,
        reference: &OrgRepositoryRef,
        desired: RepositoryInfo,
        options: RepositoryCreateOptions,
    ) -> Result<Repository> {
        self.api.check(reference)?;
        let desired = validate_and_default_info(desired)?;
        let org = organization_login(&reference.organization)?;

        debug!(repository = %reference, "Creating organization repository");
        let request = create_request(&reference.repository_name, desired, options);
        let native = self
            .api
            .send(Method::POST, &format!("/orgs/{}/repos", org), &request)
            .await?;
        Repository::new(self.api.clone(), reference.clone().into(), native)
    }
}

#[async_trait]
impl OrgRepositoriesClient for GitHubOrgRepositories {
    async fn list(&self, organization: &OrganizationRef) -> Result<Vec<Repository>> {
        self.api.check(organization)?;
        let org = organization_login(organization)?;
        let natives: Vec<GitHubRepository> =
            self.api.list(&format!("/orgs/{}/repos", org), &[]).await?;

        natives
            .into_iter()
            .map(|native| {
                let reference =
                    OrgRepositoryRef::new(organization.clone(), native.name.clone()).into();
                Repository::new(self.api.clone(), reference, native)
            })
            .collect()
    }
}

// =============================================================================
// User repositories
// =============================================================================

/// Repositories of GitHub users.
pub struct GitHubUserRepositories {
    api: Arc<Api>,
}

impl GitHubUserRepositories {
    pub(crate) fn new(api: Arc<Api>) -> Self {
        Self { api }
    }

    /// GitHub only creates user repositories for the authenticated user.
    async fn ensure_authenticated_user(&self, user: &UserRef) -> Result<()> {
        let me: GitHubUser = self.api.get("/user").await?;
        if me.login.eq_ignore_ascii_case(&user.user_login) {
            Ok(())
        } else {
            Err(Error::InvalidArgument(format!(
                "cannot create repositories for {} while authenticated as {}",
                user.user_login, me.login
            )))
        }
    }
}

#[async_trait]
impl ResourceClient for GitHubUserRepositories {
    type Ref = UserRepositoryRef;
    type Info = RepositoryInfo;
    type Resource = Repository;
    type CreateOptions = RepositoryCreateOptions;

    async fn get(&self, reference: &UserRepositoryRef) -> Result<Repository> {
        self.api.check(reference)?;
        let reference = RepositoryRef::from(reference.clone());
        let native = self.api.get(&repository_path(&reference)?).await?;
        Repository::new(self.api.clone(), reference, native)
    }

    async fn create(
        &self,
        reference: &UserRepositoryRef,
        desired: RepositoryInfo,
        options: RepositoryCreateOptions,
    ) -> Result<Repository> {
        self.api.check(reference)?;
        let desired = validate_and_default_info(desired)?;
        self.ensure_authenticated_user(&reference.user).await?;

        debug!(repository = %reference, "Creating user repository");
        let request = create_request(&reference.repository_name, desired, options);
        let native = self.api.send(Method::POST, "/user/repos", &request).await?;
        Repository::new(self.api.clone(), reference.clone().into(), native)
    }
}

#[async_trait]
impl UserRepositoriesClient for GitHubUserRepositories {
    async fn list(&self, user: &UserRef) -> Result<Vec<Repository>> {
        self.api.check(user)?;
        let natives: Vec<GitHubRepository> = self
            .api
            .list(&format!("/users/{}/repos", user.user_login), &[])
            .await?;

        natives
            .into_iter()
            .map(|native| {
                let reference =
                    UserRepositoryRef::new(user.clone(), native.name.clone()).into();
                Repository::new(self.api.clone(), reference, native)
            })
            .collect()
    }
}
