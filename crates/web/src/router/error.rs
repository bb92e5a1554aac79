use http::Method;
use thiserror::Error;

/// Failures of route registration and resolution.
///
/// Registration errors are meant to surface at startup: a `register` call that returns one
/// leaves the router unchanged.
#[derive(Error, Debug)]
pub enum RouteError {
    #[error("invalid http method token '{token}'")]
    InvalidMethod {
        token: String,
        #[source]
        source: http::method::InvalidMethod,
    },

    #[error("http method {method} is not accepted by this router")]
    UnsupportedMethod { method: Method },

    #[error("route {method} {path} has no handler")]
    MissingHandler { method: Method, path: String },

    #[error("metadata of route {path} must be a string keyed object")]
    InvalidMetadata { path: String },

    #[error("invalid group prefix '{prefix}': {reason}")]
    InvalidGroupPrefix { prefix: String, reason: &'static str },

    #[error("path '{path}' can't be compiled into a matcher")]
    InvalidPattern {
        path: String,
        #[source]
        source: regex::Error,
    },
}
