//! Pull requests of a repository.

use std::sync::Arc;

use async_trait::async_trait;
use gitprovider_core::{
    CreatePullRequest, KnownValues, MergeMethod, PullRequest, PullRequestsClient, RepositoryRef,
    Result,
};
use reqwest::Method;
use tracing::info;

use crate::client::{repository_path, Api};
use crate::types::{CreatePullRequestRequest, GitHubPullRequest, MergePullRequestRequest};

/// Pull requests of one GitHub repository.
pub struct GitHubPullRequests {
    api: Arc<Api>,
    repository: RepositoryRef,
}

impl GitHubPullRequests {
    pub(crate) fn new(api: Arc<Api>, repository: RepositoryRef) -> Self {
        Self { api, repository }
    }

    fn path(&self, suffix: &str) -> Result<String> {
        self.api.check(&self.repository)?;
        Ok(format!("{}/pulls{}", repository_path(&self.repository)?, suffix))
    }
}

fn map_pull_request(native: GitHubPullRequest) -> PullRequest {
    PullRequest {
        number: native.number,
        title: native.title,
        description: native.body,
        source_branch: native.head.branch,
        target_branch: native.base.branch,
        web_url: native.html_url,
        merged: native.merged_at.is_some(),
    }
}

#[async_trait]
impl PullRequestsClient for GitHubPullRequests {
    async fn list(&self) -> Result<Vec<PullRequest>> {
        let natives: Vec<GitHubPullRequest> =
            self.api.list(&self.path("")?, &[("state", "all")]).await?;
        Ok(natives.into_iter().map(map_pull_request).collect())
    }

    async fn get(&self, number: u64) -> Result<PullRequest> {
        let native = self.api.get(&self.path(&format!("/{}", number))?).await?;
        Ok(map_pull_request(native))
    }

    async fn create(&self, input: CreatePullRequest) -> Result<PullRequest> {
        let request = CreatePullRequestRequest {
            title: input.title,
            head: input.branch,
            base: input.base_branch,
            body: input.description,
        };
        let native: GitHubPullRequest = self
            .api
            .send(Method::POST, &self.path("")?, &request)
            .await?;
        info!(number = native.number, repository = %self.repository, "Pull request opened");
        Ok(map_pull_request(native))
    }

    async fn merge(&self, number: u64, method: MergeMethod, message: Option<&str>) -> Result<()> {
        let request = MergePullRequestRequest {
            merge_method: method.as_str().to_string(),
            commit_message: message.map(str::to_string),
        };
        self.api
            .send_empty(
                Method::PUT,
                &self.path(&format!("/{}/merge", number))?,
                Some(&request),
            )
            .await?;
        info!(number = number, method = %method, "Pull request merged");
        Ok(())
    }
}
