//! Organizations visible to the authenticated user.

use std::sync::Arc;

use async_trait::async_trait;
use gitprovider_core::{Error, Organization, OrganizationRef, OrganizationsClient, Result};

use crate::client::{organization_login, Api};
use crate::types::GitHubOrganization;
use crate::PROVIDER_ID;

/// GitHub organizations.
pub struct GitHubOrganizations {
    api: Arc<Api>,
}

impl GitHubOrganizations {
    pub(crate) fn new(api: Arc<Api>) -> Self {
        Self { api }
    }
}

fn map_organization(domain: &str, native: GitHubOrganization) -> Organization {
    Organization {
        reference: OrganizationRef::new(domain, native.login),
        name: native.name,
        description: native.description,
    }
}

#[async_trait]
impl OrganizationsClient for GitHubOrganizations {
    async fn get(&self, organization: &OrganizationRef) -> Result<Organization> {
        self.api.check(organization)?;
        let login = organization_login(organization)?;
        let native: GitHubOrganization = self.api.get(&format!("/orgs/{}", login)).await?;
        if native.login.is_empty() {
            return Err(Error::InvalidServerData(format!(
                "organization {} has no login",
                organization
            )));
        }
        Ok(map_organization(organization.domain(), native))
    }

    async fn list(&self) -> Result<Vec<Organization>> {
        let natives: Vec<GitHubOrganization> = self.api.list("/user/orgs", &[]).await?;
        let domain = self.api.domain();
        Ok(natives
            .into_iter()
            .map(|native| map_organization(domain, native))
            .collect())
    }

    async fn children(&self, _organization: &OrganizationRef) -> Result<Vec<Organization>> {
        Err(Error::unsupported(PROVIDER_ID, "sub-organizations"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GitHubClient;
    use gitprovider_core::{Client, ClientOptions, ErrorKind};
    use httpmock::prelude::*;

    fn create_test_client(server: &MockServer) -> GitHubClient {
        GitHubClient::with_base_url(server.base_url(), "test-token", ClientOptions::default())
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_organization() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/orgs/acme");
            then.status(200).json_body(serde_json::json!({
                "id": 1, "login": "acme", "name": "Acme Corp", "description": "Widgets"
            }));
        });

        let org = create_test_client(&server)
            .organizations()
            .get(&OrganizationRef::new("github.com", "acme"))
            .await
            .unwrap();

        assert_eq!(org.reference, OrganizationRef::new("github.com", "acme"));
        assert_eq!(org.name.as_deref(), Some("Acme Corp"));
    }

    #[tokio::test]
    async fn test_get_missing_organization_is_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/orgs/ghost");
            then.status(404).json_body(serde_json::json!({"message": "Not Found"}));
        });

        let err = create_test_client(&server)
            .organizations()
            .get(&OrganizationRef::new("github.com", "ghost"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_organizations() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/user/orgs");
            then.status(200).json_body(serde_json::json!([
                {"id": 1, "login": "acme"},
                {"id": 2, "login": "globex", "description": "Globex"}
            ]));
        });

        let orgs = create_test_client(&server).organizations().list().await.unwrap();
        assert_eq!(orgs.len(), 2);
        assert_eq!(orgs[1].reference.organization, "globex");
        assert_eq!(orgs[1].reference.domain, "github.com");
    }

    #[tokio::test]
    async fn test_children_are_unsupported() {
        let server = MockServer::start();
        let err = create_test_client(&server)
            .organizations()
            .children(&OrganizationRef::new("github.com", "acme"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NoProviderSupport));
    }
}
