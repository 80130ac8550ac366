//! Client traits every backend adapter implements.
//!
//! One trait per resource kind. Mutable kinds (repositories, deploy keys,
//! team access) build on [`ResourceClient`], which supplies `reconcile`
//! from the shared engine; adapters only provide `get`, `create` and the
//! resource object's `set`/`update`.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::Result;
use crate::info::DefaultedInfoRequest;
use crate::reconcile::{reconcile, Reconciled};
use crate::refs::{OrgRepositoryRef, OrganizationRef, RepositoryRef, UserRef, UserRepositoryRef};
use crate::types::{
    Commit, DeployKeyInfo, MergeMethod, Organization, PullRequest, RepositoryCreateOptions,
    RepositoryInfo, Team, TeamAccessInfo, Tree,
};

/// A backend object paired with its info projection.
///
/// The backend-native value is the source of truth; `get` recomputes the
/// projection from it every time.
#[async_trait]
pub trait ResourceObject: Send + Sync {
    type Info: DefaultedInfoRequest;
    type Native: Debug + Send + Sync;

    /// Repository this resource is (or belongs to).
    fn repository(&self) -> &RepositoryRef;

    /// Info projection of the native object.
    fn get(&self) -> Self::Info;

    /// Validate `info` and write it into the native object. Local only.
    fn set(&mut self, info: Self::Info) -> Result<()>;

    /// Push local changes and replace the native object with the response.
    async fn update(&mut self) -> Result<()>;

    /// Delete on the backend. Requires destructive actions.
    async fn delete(&self) -> Result<()>;

    /// Raw backend object, for fields the projection does not carry.
    fn api_object(&self) -> &Self::Native;
}

/// Get, create and reconcile for one mutable resource kind.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    type Ref: Debug + Send + Sync;
    type Info: DefaultedInfoRequest;
    type Resource: ResourceObject<Info = Self::Info>;
    type CreateOptions: Debug + Default + Clone + Send + Sync;

    /// Fetch the resource. Fails with `NotFound` when it does not exist.
    async fn get(&self, reference: &Self::Ref) -> Result<Self::Resource>;

    /// Create the resource. Fails with `AlreadyExists` on collision.
    async fn create(
        &self,
        reference: &Self::Ref,
        desired: Self::Info,
        options: Self::CreateOptions,
    ) -> Result<Self::Resource>;

    /// Converge the backend to `desired`; see [`crate::reconcile::reconcile`].
    async fn reconcile(
        &self,
        reference: &Self::Ref,
        desired: Self::Info,
        options: Self::CreateOptions,
    ) -> Result<Reconciled<Self::Resource>> {
        reconcile(self, reference, desired, options).await
    }
}

/// Repositories owned by organizations.
#[async_trait]
pub trait OrgRepositoriesClient:
    ResourceClient<
    Ref = OrgRepositoryRef,
    Info = RepositoryInfo,
    CreateOptions = RepositoryCreateOptions,
>
{
    /// Every repository of the organization, all pages.
    async fn list(&self, organization: &OrganizationRef) -> Result<Vec<Self::Resource>>;
}

/// Repositories owned by users.
#[async_trait]
pub trait UserRepositoriesClient:
    ResourceClient<
    Ref = UserRepositoryRef,
    Info = RepositoryInfo,
    CreateOptions = RepositoryCreateOptions,
>
{
    /// Every repository of the user, all pages.
    async fn list(&self, user: &UserRef) -> Result<Vec<Self::Resource>>;
}

/// Deploy keys of one repository, addressed by key name.
#[async_trait]
pub trait DeployKeyClient: ResourceClient<Ref = String, Info = DeployKeyInfo, CreateOptions = ()> {
    async fn list(&self) -> Result<Vec<Self::Resource>>;
}

/// Team permissions on one repository, addressed by team name.
#[async_trait]
pub trait TeamAccessClient:
    ResourceClient<Ref = String, Info = TeamAccessInfo, CreateOptions = ()>
{
    async fn list(&self) -> Result<Vec<Self::Resource>>;
}

/// Organizations visible to the authenticated user.
#[async_trait]
pub trait OrganizationsClient: Send + Sync {
    async fn get(&self, organization: &OrganizationRef) -> Result<Organization>;

    async fn list(&self) -> Result<Vec<Organization>>;

    /// Direct sub-organizations.
    async fn children(&self, organization: &OrganizationRef) -> Result<Vec<Organization>>;
}

/// Teams of one organization.
#[async_trait]
pub trait TeamsClient: Send + Sync {
    async fn get(&self, name: &str) -> Result<Team>;

    async fn list(&self) -> Result<Vec<Team>>;
}

/// Commits of one repository.
#[async_trait]
pub trait CommitsClient: Send + Sync {
    /// One page of commits on `branch`, newest first. Pages start at 1.
    async fn list_page(&self, branch: &str, per_page: u32, page: u32) -> Result<Vec<Commit>>;
}

/// Input for opening a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePullRequest {
    pub title: String,
    /// Source branch
    pub branch: String,
    /// Target branch
    pub base_branch: String,
    pub description: Option<String>,
}

/// Pull (merge) requests of one repository.
#[async_trait]
pub trait PullRequestsClient: Send + Sync {
    async fn list(&self) -> Result<Vec<PullRequest>>;

    async fn get(&self, number: u64) -> Result<PullRequest>;

    async fn create(&self, input: CreatePullRequest) -> Result<PullRequest>;

    async fn merge(&self, number: u64, method: MergeMethod, message: Option<&str>) -> Result<()>;
}

/// Git trees of one repository.
#[async_trait]
pub trait TreesClient: Send + Sync {
    async fn get(&self, sha: &str, recursive: bool) -> Result<Tree>;
}

/// Entry point of one backend adapter.
///
/// Sub-clients are cheap handles sharing the adapter's HTTP transport.
pub trait Client: Send + Sync {
    type Organizations: OrganizationsClient;
    type OrgRepositories: OrgRepositoriesClient;
    type UserRepositories: UserRepositoriesClient;
    type DeployKeys: DeployKeyClient;
    type TeamAccess: TeamAccessClient;
    type Teams: TeamsClient;
    type Commits: CommitsClient;
    type PullRequests: PullRequestsClient;
    type Trees: TreesClient;

    /// Provider name (e.g., "github", "gitlab")
    fn provider_id(&self) -> &'static str;

    /// Domain that references must belong to.
    fn supported_domain(&self) -> &str;

    fn organizations(&self) -> Self::Organizations;

    fn org_repositories(&self) -> Self::OrgRepositories;

    fn user_repositories(&self) -> Self::UserRepositories;

    fn deploy_keys(&self, repository: &RepositoryRef) -> Self::DeployKeys;

    fn team_access(&self, repository: &OrgRepositoryRef) -> Self::TeamAccess;

    fn teams(&self, organization: &OrganizationRef) -> Self::Teams;

    fn commits(&self, repository: &RepositoryRef) -> Self::Commits;

    fn pull_requests(&self, repository: &RepositoryRef) -> Self::PullRequests;

    fn trees(&self, repository: &RepositoryRef) -> Self::Trees;
}
