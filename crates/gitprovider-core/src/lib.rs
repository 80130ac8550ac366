//! Core traits, reconciliation engine, and error taxonomy for gitprovider.
//!
//! Backend adapters (GitHub, GitLab, ...) implement the client traits in
//! [`client`]; everything else in this crate is backend-agnostic.

#[macro_use]
pub mod validation;

pub mod client;
pub mod config;
pub mod error;
pub mod info;
pub mod options;
pub mod pagination;
pub mod reconcile;
pub mod refs;
pub mod types;

pub use client::{
    Client, CommitsClient, CreatePullRequest, DeployKeyClient, OrgRepositoriesClient,
    OrganizationsClient, PullRequestsClient, ResourceClient, ResourceObject, TeamAccessClient,
    TeamsClient, TreesClient, UserRepositoriesClient,
};
pub use error::{Error, ErrorKind, HttpError, RateLimit, Result};
pub use info::{validate_and_default_info, DefaultedInfoRequest, InfoRequest};
pub use options::ClientOptions;
pub use pagination::{collect_all, Page};
pub use reconcile::{reconcile, ReconcileOutcome, Reconciled};
pub use refs::{
    parse_org_repository_url, parse_organization_url, parse_user_repository_url, parse_user_url,
    OrgRepositoryRef, OrganizationRef, Reference, RepositoryRef, UserRef, UserRepositoryRef,
};
pub use types::*;
pub use validation::{FieldError, FieldErrorKind, KnownValues, ValidationErrors};
