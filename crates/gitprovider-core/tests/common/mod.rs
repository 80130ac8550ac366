//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod fake_backend;

use gitprovider_core::{OrgRepositoryRef, OrganizationRef, RepositoryInfo};

pub use fake_backend::{
    CallCounts, FakeBackend, FakeClient, FakeOrganizations, FakeRecord, FakeResource, PAGE_SIZE,
};

pub const DOMAIN: &str = "git.example.com";

pub fn org() -> OrganizationRef {
    OrganizationRef::new(DOMAIN, "acme")
}

pub fn repo(name: &str) -> OrgRepositoryRef {
    OrgRepositoryRef::new(org(), name)
}

/// Fake repositories client scoped to `acme`.
pub fn repositories() -> FakeClient<OrgRepositoryRef, RepositoryInfo> {
    FakeClient {
        backend: FakeBackend::new(repo("placeholder").into()),
    }
}

/// Fake client for a per-repository kind (deploy keys, team access).
pub fn repository_scoped<I>() -> FakeClient<String, I>
where
    I: gitprovider_core::DefaultedInfoRequest,
{
    FakeClient {
        backend: FakeBackend::new(repo("service").into()),
    }
}

pub fn described(description: &str) -> RepositoryInfo {
    RepositoryInfo {
        description: Some(description.to_string()),
        ..Default::default()
    }
}
