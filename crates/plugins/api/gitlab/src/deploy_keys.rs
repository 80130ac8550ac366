//! Project deploy keys.
//!
//! Title and push access are edited in place. A changed key body cannot be
//! edited, so the key is deleted and created again.

use std::sync::Arc;

use async_trait::async_trait;
use gitprovider_core::{
    key_material, validate_and_default_info, DeployKeyClient, DeployKeyInfo, Error, InfoRequest,
    RepositoryRef, ResourceClient, ResourceObject, Result,
};
use reqwest::Method;
use tracing::{debug, info};

use crate::client::{project_endpoint, Api};
use crate::types::{CreateDeployKeyRequest, GitLabDeployKey, UpdateDeployKeyRequest};

/// A deploy key enabled on one GitLab project.
pub struct DeployKey {
    api: Arc<Api>,
    repository: RepositoryRef,
    /// Key body as last read from the server
    remote_key: String,
    native: GitLabDeployKey,
}

impl std::fmt::Debug for DeployKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeployKey")
            .field("repository", &self.repository)
            .field("native", &self.native)
            .finish()
    }
}

impl DeployKey {
    fn keys_endpoint(&self) -> String {
        format!("{}/deploy_keys", project_endpoint(&self.repository))
    }
}

#[async_trait]
impl ResourceObject for DeployKey {
    type Info = DeployKeyInfo;
    type Native = GitLabDeployKey;

    fn repository(&self) -> &RepositoryRef {
        &self.repository
    }

    fn get(&self) -> DeployKeyInfo {
        DeployKeyInfo {
            name: self.native.title.clone(),
            key: self.native.key.clone(),
            read_only: Some(!self.native.can_push),
        }
    }

    fn set(&mut self, info: DeployKeyInfo) -> Result<()> {
        info.validate_info()?;
        self.native.title = info.name;
        self.native.key = info.key;
        if let Some(read_only) = info.read_only {
            self.native.can_push = !read_only;
        }
        Ok(())
    }

    async fn update(&mut self) -> Result<()> {
        let keys = self.keys_endpoint();
        let unchanged = key_material(&self.native.key) == key_material(&self.remote_key);
        let native: GitLabDeployKey = if unchanged {
            let request = UpdateDeployKeyRequest {
                title: self.native.title.clone(),
                can_push: self.native.can_push,
            };
            self.api
                .send(Method::PUT, &format!("{}/{}", keys, self.native.id), &request)
                .await?
        } else {
            debug!(key = %self.native.title, "Key body changed, recreating deploy key");
            self.api
                .delete(&format!("{}/{}", keys, self.native.id))
                .await?;
            let request = CreateDeployKeyRequest {
                title: self.native.title.clone(),
                key: self.native.key.clone(),
                can_push: self.native.can_push,
            };
            self.api.send(Method::POST, &keys, &request).await?
        };
        self.remote_key = native.key.clone();
        self.native = native;
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        self.api.options.ensure_destructive("delete deploy key")?;
        self.api
            .delete(&format!("{}/{}", self.keys_endpoint(), self.native.id))
            .await?;
        info!(key = %self.native.title, repository = %self.repository, "Deploy key deleted");
        Ok(())
    }

    fn api_object(&self) -> &GitLabDeployKey {
        &self.native
    }
}

/// Deploy keys of one GitLab project, addressed by title.
pub struct GitLabDeployKeys {
    api: Arc<Api>,
    repository: RepositoryRef,
}

impl GitLabDeployKeys {
    pub(crate) fn new(api: Arc<Api>, repository: RepositoryRef) -> Self {
        Self { api, repository }
    }

    fn wrap(&self, native: GitLabDeployKey) -> DeployKey {
        DeployKey {
            api: self.api.clone(),
            repository: self.repository.clone(),
            remote_key: native.key.clone(),
            native,
        }
    }

    async fn list_native(&self) -> Result<Vec<GitLabDeployKey>> {
        self.api.check(&self.repository)?;
        let endpoint = format!("{}/deploy_keys", project_endpoint(&self.repository));
        self.api.list(&endpoint, &[]).await
    }
}

#[async_trait]
impl ResourceClient for GitLabDeployKeys {
    type Ref = String;
    type Info = DeployKeyInfo;
    type Resource = DeployKey;
    type CreateOptions = ();

    /// More than one key with the same title is `InvalidServerData`.
    async fn get(&self, name: &String) -> Result<DeployKey> {
        let mut matches: Vec<GitLabDeployKey> = self
            .list_native()
            .await?
            .into_iter()
            .filter(|k| &k.title == name)
            .collect();
        match matches.len() {
            0 => Err(Error::not_found(format!(
                "deploy key {} in {}",
                name, self.repository
            ))),
            1 => Ok(self.wrap(matches.remove(0))),
            n => Err(Error::InvalidServerData(format!(
                "{} deploy keys titled {} in {}",
                n, name, self.repository
            ))),
        }
    }

    async fn create(
        &self,
        name: &String,
        desired: DeployKeyInfo,
        _options: (),
    ) -> Result<DeployKey> {
        self.api.check(&self.repository)?;
        let desired = validate_and_default_info(desired)?;
        if &desired.name != name {
            return Err(Error::InvalidArgument(format!(
                "deploy key name {} does not match {}",
                desired.name, name
            )));
        }
        if self.list_native().await?.iter().any(|k| &k.title == name) {
            return Err(Error::already_exists(format!(
                "deploy key {} in {}",
                name, self.repository
            )));
        }

        let request = CreateDeployKeyRequest {
            title: desired.name,
            key: desired.key,
            can_push: !desired.read_only.unwrap_or(true),
        };
        let endpoint = format!("{}/deploy_keys", project_endpoint(&self.repository));
        let native = self.api.send(Method::POST, &endpoint, &request).await?;
        Ok(self.wrap(native))
    }
}

#[async_trait]
impl DeployKeyClient for GitLabDeployKeys {
    async fn list(&self) -> Result<Vec<DeployKey>> {
        Ok(self
            .list_native()
            .await?
            .into_iter()
            .map(|native| self.wrap(native))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GitLabClient;
    use gitprovider_core::{
        Client, ClientOptions, ErrorKind, OrgRepositoryRef, OrganizationRef, ReconcileOutcome,
    };
    use httpmock::prelude::*;

    const KEY: &str =
        "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIOMqqnkVzrm0SdG6UOoqKLsabgH5C9okWi0dh2l9GKJl";
    const ROTATED: &str =
        "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIBW0d0kqGFn7Sq6Ml7oJ7e8rXUQw5yUp1g2ZsYgq3a8n";
    const KEYS_PATH: &str = "/api/v4/projects/acme%2Fapp/deploy_keys";

    fn deploy_keys(server: &MockServer, options: ClientOptions) -> GitLabDeployKeys {
        let client = GitLabClient::with_base_url(server.base_url(), "glpat-test", options).unwrap();
        let repository =
            OrgRepositoryRef::new(OrganizationRef::new("gitlab.com", "acme"), "app").into();
        client.deploy_keys(&repository)
    }

    fn key_json(id: u64, key: &str, can_push: bool) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "title": "ci",
            "key": key,
            "can_push": can_push,
            "fingerprint": "4a:9d:64:15:ed:3a:e6:07:6e:89:36:b3:3b:03:05:d9",
            "created_at": "2024-01-01T00:00:00.000Z"
        })
    }

    fn desired(key: &str, read_only: Option<bool>) -> DeployKeyInfo {
        DeployKeyInfo {
            name: "ci".to_string(),
            key: key.to_string(),
            read_only,
        }
    }

    #[tokio::test]
    async fn test_reconcile_creates_read_only_key() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path(KEYS_PATH);
            then.status(200).json_body(serde_json::json!([]));
        });
        let create = server.mock(|when, then| {
            when.method(POST)
                .path(KEYS_PATH)
                .json_body(serde_json::json!({"title": "ci", "key": KEY, "can_push": false}));
            then.status(201).json_body(key_json(1, KEY, false));
        });

        let reconciled = deploy_keys(&server, ClientOptions::default())
            .reconcile(&"ci".to_string(), desired(KEY, None), ())
            .await
            .unwrap();

        create.assert();
        assert_eq!(reconciled.outcome, ReconcileOutcome::Created);
        assert_eq!(reconciled.resource.get(), desired(KEY, Some(true)));
    }

    #[tokio::test]
    async fn test_push_access_is_edited_in_place() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path(KEYS_PATH);
            then.status(200).json_body(serde_json::json!([key_json(1, KEY, false)]));
        });
        let edit = server.mock(|when, then| {
            when.method(PUT)
                .path(format!("{}/1", KEYS_PATH))
                .json_body(serde_json::json!({"title": "ci", "can_push": true}));
            then.status(200).json_body(key_json(1, KEY, true));
        });
        let delete = server.mock(|when, then| {
            when.method(DELETE).path(format!("{}/1", KEYS_PATH));
            then.status(204);
        });

        let reconciled = deploy_keys(&server, ClientOptions::default())
            .reconcile(&"ci".to_string(), desired(KEY, Some(false)), ())
            .await
            .unwrap();

        edit.assert();
        assert_eq!(delete.hits(), 0);
        assert_eq!(reconciled.outcome, ReconcileOutcome::Updated);
        assert_eq!(reconciled.resource.get().read_only, Some(false));
    }

    #[tokio::test]
    async fn test_rotated_key_is_recreated() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path(KEYS_PATH);
            then.status(200).json_body(serde_json::json!([key_json(1, KEY, false)]));
        });
        let delete = server.mock(|when, then| {
            when.method(DELETE).path(format!("{}/1", KEYS_PATH));
            then.status(204);
        });
        let create = server.mock(|when, then| {
            when.method(POST)
                .path(KEYS_PATH)
                .json_body(serde_json::json!({"title": "ci", "key": ROTATED, "can_push": false}));
            then.status(201).json_body(key_json(2, ROTATED, false));
        });

        let reconciled = deploy_keys(&server, ClientOptions::default())
            .reconcile(&"ci".to_string(), desired(ROTATED, None), ())
            .await
            .unwrap();

        delete.assert();
        create.assert();
        assert_eq!(reconciled.resource.api_object().id, 2);
    }

    #[tokio::test]
    async fn test_comment_change_with_push_change_edits_in_place() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path(KEYS_PATH);
            then.status(200).json_body(serde_json::json!([key_json(1, KEY, false)]));
        });
        let edit = server.mock(|when, then| {
            when.method(PUT).path(format!("{}/1", KEYS_PATH));
            then.status(200).json_body(key_json(1, KEY, true));
        });
        let delete = server.mock(|when, then| {
            when.method(DELETE).path(format!("{}/1", KEYS_PATH));
            then.status(204);
        });

        let commented = format!("{} ci@build-host", KEY);
        let reconciled = deploy_keys(&server, ClientOptions::default())
            .reconcile(&"ci".to_string(), desired(&commented, Some(false)), ())
            .await
            .unwrap();

        edit.assert();
        assert_eq!(delete.hits(), 0);
        assert_eq!(reconciled.outcome, ReconcileOutcome::Updated);
    }

    #[tokio::test]
    async fn test_create_with_taken_title_is_already_exists() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path(KEYS_PATH);
            then.status(200).json_body(serde_json::json!([key_json(1, KEY, false)]));
        });
        let create = server.mock(|when, then| {
            when.method(POST).path(KEYS_PATH);
            then.status(201).json_body(key_json(2, ROTATED, false));
        });

        let err = deploy_keys(&server, ClientOptions::default())
            .create(&"ci".to_string(), desired(ROTATED, None), ())
            .await
            .unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(create.hits(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_titles_are_invalid_server_data() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path(KEYS_PATH);
            then.status(200).json_body(serde_json::json!([
                key_json(1, KEY, false),
                key_json(2, ROTATED, true)
            ]));
        });

        let err = deploy_keys(&server, ClientOptions::default())
            .get(&"ci".to_string())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidServerData));
    }

    #[tokio::test]
    async fn test_duplicate_key_is_already_exists() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path(KEYS_PATH);
            then.status(200).json_body(serde_json::json!([]));
        });
        server.mock(|when, then| {
            when.method(POST).path(KEYS_PATH);
            then.status(400).json_body(serde_json::json!({
                "message": {"deploy_key.fingerprint_sha256": ["has already been taken"]}
            }));
        });

        let err = deploy_keys(&server, ClientOptions::default())
            .create(&"ci".to_string(), desired(KEY, None), ())
            .await
            .unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn test_delete_requires_destructive_actions() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path(KEYS_PATH);
            then.status(200).json_body(serde_json::json!([key_json(1, KEY, false)]));
        });
        let delete = server.mock(|when, then| {
            when.method(DELETE).path(format!("{}/1", KEYS_PATH));
            then.status(204);
        });

        let key = deploy_keys(&server, ClientOptions::default())
            .get(&"ci".to_string())
            .await
            .unwrap();
        assert_eq!(
            key.delete().await.unwrap_err().kind(),
            Some(ErrorKind::DestructiveCallDisallowed)
        );

        let key = deploy_keys(&server, ClientOptions::default().with_destructive_actions(true))
            .get(&"ci".to_string())
            .await
            .unwrap();
        key.delete().await.unwrap();
        delete.assert();
    }
}
