//! Construction-time settings shared by every adapter.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::refs::Reference;

/// User agent sent when the caller does not choose one.
pub const DEFAULT_USER_AGENT: &str = "gitprovider";

/// Adapter settings. Adapters pick their own default domain when
/// `domain` is unset.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Domain override, e.g. "github.example.com" or "gitlab.example.com:8443"
    pub domain: Option<String>,
    /// Allow delete-type calls
    pub destructive_actions: bool,
    pub user_agent: String,
    /// Per-request timeout; `None` leaves it to the caller
    pub timeout: Option<Duration>,
    /// Revalidate cached GET responses with `If-None-Match`
    pub conditional_requests: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            domain: None,
            destructive_actions: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: None,
            conditional_requests: false,
        }
    }
}

impl ClientOptions {
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_destructive_actions(mut self, enabled: bool) -> Self {
        self.destructive_actions = enabled;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_conditional_requests(mut self, enabled: bool) -> Self {
        self.conditional_requests = enabled;
        self
    }

    /// Fail with `DestructiveCallDisallowed` unless deletes were enabled.
    pub fn ensure_destructive(&self, operation: &str) -> Result<()> {
        if self.destructive_actions {
            Ok(())
        } else {
            Err(Error::DestructiveCallDisallowed(format!(
                "{} requires destructive actions to be enabled",
                operation
            )))
        }
    }
}

/// Fail with `DomainUnsupported` unless `actual` is the client's domain.
pub fn ensure_domain(expected: &str, actual: &str) -> Result<()> {
    if expected.eq_ignore_ascii_case(actual) {
        Ok(())
    } else {
        Err(Error::DomainUnsupported {
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

/// Fail unless `reference` is well formed and belongs to `expected`.
///
/// Runs before any request is built.
pub fn ensure_reference<R: Reference + ?Sized>(expected: &str, reference: &R) -> Result<()> {
    ensure_domain(expected, reference.domain())?;
    reference.validate()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destructive_actions_disabled_by_default() {
        let options = ClientOptions::default();
        let err = options.ensure_destructive("delete repository").unwrap_err();
        assert!(matches!(err, Error::DestructiveCallDisallowed(_)));

        let options = options.with_destructive_actions(true);
        assert!(options.ensure_destructive("delete repository").is_ok());
    }

    #[test]
    fn test_ensure_domain() {
        assert!(ensure_domain("github.com", "GitHub.com").is_ok());
        let err = ensure_domain("github.com", "gitlab.com").unwrap_err();
        assert!(matches!(err, Error::DomainUnsupported { .. }));
    }

    #[test]
    fn test_ensure_reference_validates_fields() {
        use crate::refs::{OrgRepositoryRef, OrganizationRef};

        let good = OrgRepositoryRef::new(OrganizationRef::new("github.com", "acme"), "app");
        assert!(ensure_reference("github.com", &good).is_ok());

        let nameless = OrgRepositoryRef::new(OrganizationRef::new("github.com", "acme"), "");
        let err = ensure_reference("github.com", &nameless).unwrap_err();
        let Error::Validation(errors) = err else {
            panic!("expected a validation error, got {:?}", err);
        };
        assert!(errors.has_field("repository_name"));

        let foreign = OrgRepositoryRef::new(OrganizationRef::new("gitlab.com", "acme"), "app");
        assert!(matches!(
            ensure_reference("github.com", &foreign),
            Err(Error::DomainUnsupported { .. })
        ));
    }
}
