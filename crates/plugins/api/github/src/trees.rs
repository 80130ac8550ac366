//! Git trees of a repository.

use std::sync::Arc;

use async_trait::async_trait;
use gitprovider_core::{RepositoryRef, Result, Tree, TreeEntry, TreesClient};

use crate::client::{repository_path, Api};
use crate::types::GitHubTree;

/// Git trees of one GitHub repository.
pub struct GitHubTrees {
    api: Arc<Api>,
    repository: RepositoryRef,
}

impl GitHubTrees {
    pub(crate) fn new(api: Arc<Api>, repository: RepositoryRef) -> Self {
        Self { api, repository }
    }
}

fn map_tree(native: GitHubTree) -> Tree {
    Tree {
        sha: native.sha,
        entries: native
            .tree
            .into_iter()
            .map(|e| TreeEntry {
                path: e.path,
                mode: e.mode,
                entry_type: e.entry_type,
                size: e.size,
                sha: e.sha,
                url: e.url,
            })
            .collect(),
        truncated: native.truncated,
    }
}

#[async_trait]
impl TreesClient for GitHubTrees {
    /// `sha` may be a tree SHA or a branch name.
    async fn get(&self, sha: &str, recursive: bool) -> Result<Tree> {
        self.api.check(&self.repository)?;
        let path = format!("{}/git/trees/{}", repository_path(&self.repository)?, sha);
        let params: &[(&str, &str)] = if recursive { &[("recursive", "1")] } else { &[] };
        let native: GitHubTree = self.api.get_with_params(&path, params).await?;
        Ok(map_tree(native))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GitHubClient;
    use gitprovider_core::{Client, ClientOptions, OrganizationRef, OrgRepositoryRef};
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_get_recursive_tree() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/repos/acme/app/git/trees/main")
                .query_param("recursive", "1");
            then.status(200).json_body(serde_json::json!({
                "sha": "tree1",
                "truncated": false,
                "tree": [
                    {"path": "README.md", "mode": "100644", "type": "blob", "sha": "b1", "size": 12,
                     "url": "https://api.github.com/repos/acme/app/git/blobs/b1"},
                    {"path": "src", "mode": "040000", "type": "tree", "sha": "t2"}
                ]
            }));
        });

        let client =
            GitHubClient::with_base_url(server.base_url(), "test-token", ClientOptions::default())
                .unwrap();
        let repository =
            OrgRepositoryRef::new(OrganizationRef::new("github.com", "acme"), "app").into();
        let tree = client.trees(&repository).get("main", true).await.unwrap();

        mock.assert();
        assert_eq!(tree.sha, "tree1");
        assert_eq!(tree.entries.len(), 2);
        assert_eq!(tree.entries[0].size, Some(12));
        assert_eq!(tree.entries[1].entry_type, "tree");
        assert!(tree.entries[1].size.is_none());
    }
}
