//! Repository trees.

use std::sync::Arc;

use async_trait::async_trait;
use gitprovider_core::{RepositoryRef, Result, Tree, TreeEntry, TreesClient};

use crate::client::{project_endpoint, Api};
use crate::types::GitLabTreeEntry;

/// Git trees of one GitLab project.
pub struct GitLabTrees {
    api: Arc<Api>,
    repository: RepositoryRef,
}

impl GitLabTrees {
    pub(crate) fn new(api: Arc<Api>, repository: RepositoryRef) -> Self {
        Self { api, repository }
    }
}

fn map_entry(native: GitLabTreeEntry) -> TreeEntry {
    TreeEntry {
        path: native.path,
        mode: native.mode,
        entry_type: native.entry_type,
        size: None,
        sha: native.id,
        url: None,
    }
}

#[async_trait]
impl TreesClient for GitLabTrees {
    /// `sha` may be any ref. The listing is paginated, so it is never
    /// truncated.
    async fn get(&self, sha: &str, recursive: bool) -> Result<Tree> {
        self.api.check(&self.repository)?;
        let endpoint = format!("{}/repository/tree", project_endpoint(&self.repository));
        let recursive = if recursive { "true" } else { "false" };
        let natives: Vec<GitLabTreeEntry> = self
            .api
            .list(&endpoint, &[("ref", sha), ("recursive", recursive)])
            .await?;
        Ok(Tree {
            sha: sha.to_string(),
            entries: natives.into_iter().map(map_entry).collect(),
            truncated: false,
        })
    }
}
