//! Merge requests, exposed as pull requests.

use std::sync::Arc;

use async_trait::async_trait;
use gitprovider_core::{
    CreatePullRequest, Error, MergeMethod, PullRequest, PullRequestsClient, RepositoryRef, Result,
};
use reqwest::Method;
use tracing::info;

use crate::client::{project_endpoint, Api};
use crate::types::{AcceptMergeRequestRequest, CreateMergeRequestRequest, GitLabMergeRequest};
use crate::PROVIDER_ID;

/// Merge requests of one GitLab project, numbered by `iid`.
pub struct GitLabMergeRequests {
    api: Arc<Api>,
    repository: RepositoryRef,
}

impl GitLabMergeRequests {
    pub(crate) fn new(api: Arc<Api>, repository: RepositoryRef) -> Self {
        Self { api, repository }
    }

    fn endpoint(&self) -> String {
        format!("{}/merge_requests", project_endpoint(&self.repository))
    }
}

fn map_merge_request(mr: GitLabMergeRequest) -> PullRequest {
    PullRequest {
        number: mr.iid,
        title: mr.title,
        description: mr.description.filter(|d| !d.is_empty()),
        source_branch: mr.source_branch,
        target_branch: mr.target_branch,
        web_url: mr.web_url,
        merged: mr.state == "merged",
    }
}

#[async_trait]
impl PullRequestsClient for GitLabMergeRequests {
    async fn list(&self) -> Result<Vec<PullRequest>> {
        self.api.check(&self.repository)?;
        let natives: Vec<GitLabMergeRequest> =
            self.api.list(&self.endpoint(), &[("state", "all")]).await?;
        Ok(natives.into_iter().map(map_merge_request).collect())
    }

    async fn get(&self, number: u64) -> Result<PullRequest> {
        self.api.check(&self.repository)?;
        let native = self
            .api
            .get(&format!("{}/{}", self.endpoint(), number))
            .await?;
        Ok(map_merge_request(native))
    }

    async fn create(&self, input: CreatePullRequest) -> Result<PullRequest> {
        self.api.check(&self.repository)?;
        let request = CreateMergeRequestRequest {
            source_branch: input.branch,
            target_branch: input.base_branch,
            title: input.title,
            description: input.description,
        };
        let native: GitLabMergeRequest = self
            .api
            .send(Method::POST, &self.endpoint(), &request)
            .await?;
        info!(iid = native.iid, repository = %self.repository, "Merge request opened");
        Ok(map_merge_request(native))
    }

    async fn merge(&self, number: u64, method: MergeMethod, message: Option<&str>) -> Result<()> {
        self.api.check(&self.repository)?;
        let message = message.map(str::to_string);
        let request = match method {
            MergeMethod::Merge => AcceptMergeRequestRequest {
                squash: false,
                merge_commit_message: message,
                squash_commit_message: None,
            },
            MergeMethod::Squash => AcceptMergeRequestRequest {
                squash: true,
                merge_commit_message: None,
                squash_commit_message: message,
            },
            MergeMethod::Rebase => {
                return Err(Error::unsupported(PROVIDER_ID, "rebase merges"));
            }
        };
        self.api
            .send_empty(
                Method::PUT,
                &format!("{}/{}/merge", self.endpoint(), number),
                Some(&request),
            )
            .await
    }
}
