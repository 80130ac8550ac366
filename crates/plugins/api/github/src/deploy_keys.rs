//! Repository deploy keys.
//!
//! GitHub has no endpoint for editing a deploy key, so `update` deletes
//! the key and creates it again with the new settings.

use std::sync::Arc;

use async_trait::async_trait;
use gitprovider_core::{
    validate_and_default_info, DeployKeyClient, DeployKeyInfo, Error, InfoRequest, RepositoryRef,
    ResourceClient, ResourceObject, Result,
};
use reqwest::Method;
use tracing::{debug, info};

use crate::client::{repository_path, Api};
use crate::types::{CreateDeployKeyRequest, GitHubDeployKey};

/// A deploy key of one GitHub repository.
pub struct DeployKey {
    api: Arc<Api>,
    repository: RepositoryRef,
    native: GitHubDeployKey,
}

impl std::fmt::Debug for DeployKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeployKey")
            .field("repository", &self.repository)
            .field("native", &self.native)
            .finish()
    }
}

fn create_request(native: &GitHubDeployKey) -> CreateDeployKeyRequest {
    CreateDeployKeyRequest {
        title: native.title.clone(),
        key: native.key.clone(),
        read_only: native.read_only,
    }
}

#[async_trait]
impl ResourceObject for DeployKey {
    type Info = DeployKeyInfo;
    type Native = GitHubDeployKey;

    fn repository(&self) -> &RepositoryRef {
        &self.repository
    }

    fn get(&self) -> DeployKeyInfo {
        DeployKeyInfo {
            name: self.native.title.clone(),
            key: self.native.key.clone(),
            read_only: Some(self.native.read_only),
        }
    }

    fn set(&mut self, info: DeployKeyInfo) -> Result<()> {
        info.validate_info()?;
        self.native.title = info.name;
        self.native.key = info.key;
        if let Some(read_only) = info.read_only {
            self.native.read_only = read_only;
        }
        Ok(())
    }

    async fn update(&mut self) -> Result<()> {
        let keys = format!("{}/keys", repository_path(&self.repository)?);
        debug!(key = %self.native.title, "Recreating deploy key");

        // Replaces the key in place; not gated on destructive actions.
        self.api
            .delete(&format!("{}/{}", keys, self.native.id))
            .await?;
        self.native = self
            .api
            .send(Method::POST, &keys, &create_request(&self.native))
            .await?;
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        self.api.options.ensure_destructive("delete deploy key")?;
        let path = format!(
            "{}/keys/{}",
            repository_path(&self.repository)?,
            self.native.id
        );
        self.api.delete(&path).await?;
        info!(key = %self.native.title, repository = %self.repository, "Deploy key deleted");
        Ok(())
    }

    fn api_object(&self) -> &GitHubDeployKey {
        &self.native
    }
}

/// Deploy keys of one GitHub repository, addressed by title.
pub struct GitHubDeployKeys {
    api: Arc<Api>,
    repository: RepositoryRef,
}

impl GitHubDeployKeys {
    pub(crate) fn new(api: Arc<Api>, repository: RepositoryRef) -> Self {
        Self { api, repository }
    }

    fn wrap(&self, native: GitHubDeployKey) -> DeployKey {
        DeployKey {
            api: self.api.clone(),
            repository: self.repository.clone(),
            native,
        }
    }

    async fn list_native(&self) -> Result<Vec<GitHubDeployKey>> {
        self.api.check(&self.repository)?;
        let path = format!("{}/keys", repository_path(&self.repository)?);
        self.api.list(&path, &[]).await
    }
}

#[async_trait]
impl ResourceClient for GitHubDeployKeys {
    type Ref = String;
    type Info = DeployKeyInfo;
    type Resource = DeployKey;
    type CreateOptions = ();

    /// Titles are not unique on GitHub; more than one match is reported as
    /// `InvalidServerData`.
    async fn get(&self, name: &String) -> Result<DeployKey> {
        let mut matches: Vec<GitHubDeployKey> = self
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
            read_only: desired.read_only.unwrap_or(true),
        };
        let path = format!("{}/keys", repository_path(&self.repository)?);
        let native = self.api.send(Method::POST, &path, &request).await?;
        Ok(self.wrap(native))
    }
}

#[async_trait]
impl DeployKeyClient for GitHubDeployKeys {
    async fn list(&self) -> Result<Vec<DeployKey>> {
        Ok(self
            .list_native()
            .await?
            .into_iter()
            .map(|native| self.wrap(native))
            .collect())
    }
}
