//! Commit history of a repository.

use std::sync::Arc;

use async_trait::async_trait;
use gitprovider_core::{Commit, CommitsClient, Error, RepositoryRef, Result};

use crate::client::{repository_path, Api};
use crate::types::GitHubCommit;

/// Commits of one GitHub repository.
pub struct GitHubCommits {
    api: Arc<Api>,
    repository: RepositoryRef,
}

impl GitHubCommits {
    pub(crate) fn new(api: Arc<Api>, repository: RepositoryRef) -> Self {
        Self { api, repository }
    }
}

fn map_commit(native: GitHubCommit) -> Commit {
    let (author, created_at) = match native.commit.author {
        Some(author) => (
            author.name.or(author.email).unwrap_or_default(),
            author.date.unwrap_or_default(),
        ),
        None => (String::new(), String::new()),
    };
    Commit {
        sha: native.sha,
        tree_sha: native.commit.tree.sha,
        author,
        message: native.commit.message,
        created_at,
        url: native.html_url.unwrap_or_default(),
    }
}

#[async_trait]
impl CommitsClient for GitHubCommits {
    async fn list_page(&self, branch: &str, per_page: u32, page: u32) -> Result<Vec<Commit>> {
        self.api.check(&self.repository)?;
        if page == 0 {
            return Err(Error::InvalidArgument("pages start at 1".to_string()));
        }
        let path = format!("{}/commits", repository_path(&self.repository)?);
        let per_page = per_page.to_string();
        let page = page.to_string();
        let natives: Vec<GitHubCommit> = self
            .api
            .get_with_params(
                &path,
                &[("sha", branch), ("per_page", per_page.as_str()), ("page", page.as_str())],
            )
            .await?;
        Ok(natives.into_iter().map(map_commit).collect())
    }
}
