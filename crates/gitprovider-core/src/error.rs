//! Error taxonomy for gitprovider.
//!
//! Every backend adapter maps its native failures onto [`Error`] at the
//! adapter boundary. Callers branch on the variant (or on [`Error::kind`]),
//! never on message text. Variants built from an HTTP response keep the
//! [`HttpError`] as their `source()`.

use std::fmt;

use thiserror::Error;

use crate::validation::ValidationErrors;

/// Main error type for gitprovider operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The requested resource does not exist
    #[error("Not found: {message}")]
    NotFound {
        message: String,
        #[source]
        source: Option<HttpError>,
    },

    /// A create call collided with an existing resource
    #[error("Already exists: {message}")]
    AlreadyExists {
        message: String,
        #[source]
        source: Option<HttpError>,
    },

    /// The backend rejected the credentials
    #[error("Invalid credentials: {message}")]
    InvalidCredentials {
        message: String,
        #[source]
        source: Option<HttpError>,
    },

    /// The backend rate limit is exhausted
    #[error("Rate limit exceeded: {source}")]
    RateLimited {
        #[source]
        source: HttpError,
    },

    /// The operation is not implemented by this backend
    #[error("Provider {provider} does not support {operation}")]
    NoProviderSupport { provider: String, operation: String },

    /// A delete-type call was made without opting into destructive actions
    #[error("Destructive call disallowed: {0}")]
    DestructiveCallDisallowed(String),

    /// The backend returned an object that fails our invariants
    #[error("Invalid server data: {0}")]
    InvalidServerData(String),

    /// A reference points at a domain this client does not serve
    #[error("Domain {actual} is not supported by this client (expected {expected})")]
    DomainUnsupported { expected: String, actual: String },

    /// Any other non-2xx response
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Desired state failed validation
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// A URL could not be turned into a reference
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A caller-supplied argument is malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The request never produced a response (connect failure, timeout)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for gitprovider operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The fixed set of error kinds every adapter normalizes onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidCredentials,
    RateLimited,
    NoProviderSupport,
    DestructiveCallDisallowed,
    InvalidServerData,
    DomainUnsupported,
    Http,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::AlreadyExists => "already exists",
            ErrorKind::InvalidCredentials => "invalid credentials",
            ErrorKind::RateLimited => "rate limited",
            ErrorKind::NoProviderSupport => "no provider support",
            ErrorKind::DestructiveCallDisallowed => "destructive call disallowed",
            ErrorKind::InvalidServerData => "invalid server data",
            ErrorKind::DomainUnsupported => "domain unsupported",
            ErrorKind::Http => "http error",
        };
        f.write_str(name)
    }
}

/// Rate-limit metadata reported by the backend alongside a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: u64,
    /// Unix timestamp (seconds) at which the window resets
    pub reset: u64,
}

/// A non-2xx HTTP response, kept as the source of the taxonomy error it
/// was translated into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    pub status: u16,
    pub message: String,
    pub url: Option<String>,
    pub documentation_url: Option<String>,
    pub rate_limit: Option<RateLimit>,
}

impl HttpError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            url: None,
            documentation_url: None,
            rate_limit: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_documentation_url(mut self, documentation_url: Option<String>) -> Self {
        self.documentation_url = documentation_url;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: Option<RateLimit>) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    fn rate_limit_exhausted(&self) -> bool {
        self.rate_limit.as_ref().is_some_and(|r| r.remaining == 0)
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(url) = &self.url {
            write!(f, " from {}", url)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(rate_limit) = &self.rate_limit {
            write!(
                f,
                " (rate limit {}/{}, resets at {})",
                rate_limit.remaining, rate_limit.limit, rate_limit.reset
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for HttpError {}

impl Error {
    /// Translate an HTTP error response into the taxonomy.
    pub fn from_http(err: HttpError) -> Self {
        let message = err.message.clone();
        match err.status {
            404 => Error::NotFound {
                message,
                source: Some(err),
            },
            409 => Error::AlreadyExists {
                message,
                source: Some(err),
            },
            401 => Error::InvalidCredentials {
                message,
                source: Some(err),
            },
            429 => Error::RateLimited { source: err },
            403 if err.rate_limit_exhausted() => Error::RateLimited { source: err },
            403 => Error::InvalidCredentials {
                message,
                source: Some(err),
            },
            _ => Error::Http(err),
        }
    }

    /// Shorthand for [`Error::from_http`] without response metadata.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self::from_http(HttpError::new(status, message))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Error::NotFound {
            message: message.into(),
            source: None,
        }
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Error::AlreadyExists {
            message: message.into(),
            source: None,
        }
    }

    /// Re-tag an HTTP-derived error as `AlreadyExists`, keeping the response.
    pub fn into_already_exists(self) -> Self {
        match self {
            Error::Http(source) => Error::AlreadyExists {
                message: source.message.clone(),
                source: Some(source),
            },
            other => other,
        }
    }

    pub fn unsupported(provider: impl Into<String>, operation: impl Into<String>) -> Self {
        Error::NoProviderSupport {
            provider: provider.into(),
            operation: operation.into(),
        }
    }

    /// Taxonomy kind of this error, if it belongs to one.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::NotFound { .. } => Some(ErrorKind::NotFound),
            Error::AlreadyExists { .. } => Some(ErrorKind::AlreadyExists),
            Error::InvalidCredentials { .. } => Some(ErrorKind::InvalidCredentials),
            Error::RateLimited { .. } => Some(ErrorKind::RateLimited),
            Error::NoProviderSupport { .. } => Some(ErrorKind::NoProviderSupport),
            Error::DestructiveCallDisallowed(_) => Some(ErrorKind::DestructiveCallDisallowed),
            Error::InvalidServerData(_) => Some(ErrorKind::InvalidServerData),
            Error::DomainUnsupported { .. } => Some(ErrorKind::DomainUnsupported),
            Error::Http(_) => Some(ErrorKind::Http),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::AlreadyExists { .. })
    }

    /// The HTTP response behind this error, when there was one.
    pub fn http_error(&self) -> Option<&HttpError> {
        match self {
            Error::NotFound { source, .. }
            | Error::AlreadyExists { source, .. }
            | Error::InvalidCredentials { source, .. } => source.as_ref(),
            Error::RateLimited { source } | Error::Http(source) => Some(source),
            _ => None,
        }
    }
}
