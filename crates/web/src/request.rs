//! Request handling module that provides access to HTTP request information and path parameters.
//!
//! This module contains the core types for working with HTTP requests in the web framework:
//! - `RequestContext`: owns the request head, the buffered body and the matched path parameters
//! - `PathParams`: named values captured from `:name` segments of the matched route
//! - `ExtractError`: failures of the typed extraction helpers (`query`, `json`, `form`)

use bytes::Bytes;
use http::request::Parts;
use http::{Extensions, HeaderMap, Method, Request, Uri, Version};
use mime::Mime;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// The request value threaded through every middleware and the terminal handler.
///
/// Middlewares receive it mutably, so they can rewrite headers or stash values in
/// [`extensions_mut`](RequestContext::extensions_mut) for the handlers that follow.
#[derive(Debug)]
pub struct RequestContext {
    parts: Parts,
    body: Bytes,
    path_params: PathParams,
}

impl RequestContext {
    /// Creates a new RequestContext with the given request head and buffered body
    pub fn new(parts: Parts, body: Bytes) -> Self {
        Self { parts, body, path_params: PathParams::empty() }
    }

    pub fn from_request(request: Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        Self::new(parts, body)
    }

    pub(crate) fn set_path_params(&mut self, path_params: PathParams) {
        self.path_params = path_params;
    }

    /// Returns the HTTP method of the request
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// Returns the URI of the request
    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Returns the path component of the request URI, without the query string
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// Returns the HTTP version of the request
    pub fn version(&self) -> Version {
        self.parts.version
    }

    /// Returns the HTTP headers of the request
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.parts.headers
    }

    pub fn extensions(&self) -> &Extensions {
        &self.parts.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.parts.extensions
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns a reference to the path parameters extracted from the request URL
    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    /// Shortcut for `self.path_params().get(name)`
    pub fn param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name)
    }

    /// Parses the `Content-Type` header, `None` when it is absent or malformed
    pub fn content_type(&self) -> Option<Mime> {
        self.headers().get(http::header::CONTENT_TYPE)?.to_str().ok()?.parse().ok()
    }

    /// Deserializes the query string, an absent query string is treated as empty
    pub fn query<T: DeserializeOwned>(&self) -> Result<T, ExtractError> {
        let query = self.uri().query().unwrap_or_default();
        Ok(serde_qs::from_str(query)?)
    }

    /// Deserializes an `application/json` body
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ExtractError> {
        self.expect_content_type(&mime::APPLICATION_JSON)?;
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Deserializes an `application/x-www-form-urlencoded` body
    pub fn form<T: DeserializeOwned>(&self) -> Result<T, ExtractError> {
        self.expect_content_type(&mime::APPLICATION_WWW_FORM_URLENCODED)?;
        Ok(serde_urlencoded::from_bytes(&self.body)?)
    }

    fn expect_content_type(&self, expected: &Mime) -> Result<(), ExtractError> {
        match self.content_type() {
            Some(actual) if actual.essence_str() == expected.essence_str() => Ok(()),
            actual => Err(ExtractError::UnsupportedContentType {
                expected: expected.essence_str().to_owned(),
                actual: actual.map(|mime| mime.essence_str().to_owned()),
            }),
        }
    }
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("expect content type {expected}, but got {actual:?}")]
    UnsupportedContentType { expected: String, actual: Option<String> },

    #[error("invalid query string: {source}")]
    Query {
        #[from]
        source: serde_qs::Error,
    },

    #[error("invalid json body: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("invalid form body: {source}")]
    Form {
        #[from]
        source: serde_urlencoded::de::Error,
    },
}

/// Represents path parameters extracted from the URL path of an HTTP request.
///
/// Path parameters are named segments in the route pattern. For example, in the pattern
/// `/users/:id`, `id` is a path parameter. Values are kept in the order they appear in the path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    params: Vec<(String, String)>,
}

impl PathParams {
    /// Creates an empty PathParams instance with no parameters
    #[inline]
    pub fn empty() -> Self {
        Self { params: Vec::new() }
    }

    /// Returns true if there are no path parameters
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Returns the number of path parameters
    #[inline]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Gets the value of a path parameter by its name.
    ///
    /// When a pattern repeats a name, the last occurrence wins.
    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        let key = key.as_ref();
        self.params.iter().rfind(|(name, _)| name == key).map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl FromIterator<(String, String)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self { params: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::{ExtractError, PathParams, RequestContext};
    use bytes::Bytes;
    use http::Request;
    use serde::Deserialize;

    #[derive(Deserialize, Debug, PartialEq)]
    struct User {
        name: String,
        zip: String,
    }

    fn request(builder: http::request::Builder, body: &'static str) -> RequestContext {
        RequestContext::from_request(builder.body(Bytes::from_static(body.as_bytes())).unwrap())
    }

    #[test]
    fn test_path_params_last_one_wins() {
        let params: PathParams = vec![("id".to_string(), "1".to_string()), ("id".to_string(), "2".to_string())]
            .into_iter()
            .collect();

        assert_eq!(params.len(), 2);
        assert_eq!(params.get("id"), Some("2"));
        assert_eq!(params.get("name"), None);
        assert!(PathParams::empty().is_empty());
    }

    #[test]
    fn test_query() {
        let req = request(Request::builder().uri("/users?name=hello&zip=world"), "");
        let user: User = req.query().unwrap();
        assert_eq!(user, User { name: "hello".into(), zip: "world".into() });
        assert_eq!(req.path(), "/users");
    }

    #[test]
    fn test_json() {
        let req = request(
            Request::builder().uri("/users").header(http::header::CONTENT_TYPE, "application/json"),
            r#"{"name":"hello","zip":"world"}"#,
        );
        let user: User = req.json().unwrap();
        assert_eq!(user.name, "hello");
    }

    #[test]
    fn test_form() {
        let req = request(
            Request::builder()
                .uri("/users")
                .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded; charset=utf-8"),
            "name=hello&zip=world",
        );
        let user: User = req.form().unwrap();
        assert_eq!(user.zip, "world");
    }

    #[test]
    fn test_json_with_wrong_content_type() {
        let req = request(Request::builder().uri("/users").header(http::header::CONTENT_TYPE, "text/plain"), "{}");
        let result = req.json::<User>();
        assert!(matches!(result, Err(ExtractError::UnsupportedContentType { actual: Some(_), .. })));
    }
}
