//! Commit history of a project.

use std::sync::Arc;

use async_trait::async_trait;
use gitprovider_core::{Commit, CommitsClient, Error, RepositoryRef, Result};

use crate::client::{project_endpoint, Api};
use crate::types::GitLabCommit;

/// Commits of one GitLab project.
pub struct GitLabCommits {
    api: Arc<Api>,
    repository: RepositoryRef,
}

impl GitLabCommits {
    pub(crate) fn new(api: Arc<Api>, repository: RepositoryRef) -> Self {
        Self { api, repository }
    }
}

/// The commits API does not report tree ids; `tree_sha` stays empty.
fn map_commit(native: GitLabCommit) -> Commit {
    Commit {
        sha: native.id,
        tree_sha: String::new(),
        author: native.author_name.or(native.author_email).unwrap_or_default(),
        message: native.message,
        created_at: native.created_at.unwrap_or_default(),
        url: native.web_url.unwrap_or_default(),
    }
}

#[async_trait]
impl CommitsClient for GitLabCommits {
    async fn list_page(&self, branch: &str, per_page: u32, page: u32) -> Result<Vec<Commit>> {
        self.api.check(&self.repository)?;
        if page == 0 {
            return Err(Error::InvalidArgument("pages start at 1".to_string()));
        }
        let endpoint = format!("{}/repository/commits", project_endpoint(&self.repository));
        let per_page = per_page.to_string();
        let page = page.to_string();
        let natives: Vec<GitLabCommit> = self
            .api
            .get_with_params(
                &endpoint,
                &[
                    ("ref_name", branch),
                    ("per_page", per_page.as_str()),
                    ("page", page.as_str()),
                ],
            )
            .await?;
        Ok(natives.into_iter().map(map_commit).collect())
    }
}
