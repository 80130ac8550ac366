//! Groups and subgroups as organizations.

use std::sync::Arc;

use async_trait::async_trait;
use gitprovider_core::{Organization, OrganizationRef, OrganizationsClient, Result};

use crate::client::{group_endpoint, organization_ref, Api};
use crate::types::GitLabGroup;

/// GitLab groups.
pub struct GitLabOrganizations {
    api: Arc<Api>,
}

impl GitLabOrganizations {
    pub(crate) fn new(api: Arc<Api>) -> Self {
        Self { api }
    }

    fn map_group(&self, native: GitLabGroup) -> Result<Organization> {
        Ok(Organization {
            reference: organization_ref(self.api.domain(), &native.full_path)?,
            name: Some(native.name),
            description: native.description.filter(|d| !d.is_empty()),
        })
    }
}

#[async_trait]
impl OrganizationsClient for GitLabOrganizations {
    async fn get(&self, organization: &OrganizationRef) -> Result<Organization> {
        self.api.check(organization)?;
        let native: GitLabGroup = self.api.get(&group_endpoint(organization)).await?;
        self.map_group(native)
    }

    /// Every group the token can see, subgroups included.
    async fn list(&self) -> Result<Vec<Organization>> {
        let natives: Vec<GitLabGroup> = self.api.list("/groups", &[]).await?;
        natives.into_iter().map(|g| self.map_group(g)).collect()
    }

    async fn children(&self, organization: &OrganizationRef) -> Result<Vec<Organization>> {
        self.api.check(organization)?;
        let natives: Vec<GitLabGroup> = self
            .api
            .list(&format!("{}/subgroups", group_endpoint(organization)), &[])
            .await?;
        natives.into_iter().map(|g| self.map_group(g)).collect()
    }
}
