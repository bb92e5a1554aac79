//! Response writing module that turns handler results into the response being built.
//!
//! Unlike a classic "return a response" design, every middleware and handler in the chain
//! shares one mutable response. The [`Responder`] trait describes how a value is written into
//! that response, so handlers can stay short:
//!
//! ```
//! use http::StatusCode;
//! use junction_web::{Responder, ResponseBody, WebResponse};
//!
//! let mut resp = WebResponse::new(ResponseBody::empty());
//! (StatusCode::CREATED, "created").respond_to(&mut resp);
//! assert_eq!(resp.status(), StatusCode::CREATED);
//! ```

use crate::body::ResponseBody;
use crate::WebResponse;
use http::{HeaderValue, Response, StatusCode};
use serde::Serialize;
use std::convert::Infallible;
use tracing::error;

/// A trait for types that can be written into an HTTP response.
pub trait Responder {
    fn respond_to(self, resp: &mut WebResponse);
}

/// Represented as json data, serialized into the response body with `application/json`
///
/// # Example
/// ```
/// use junction_web::{Json, Responder, ResponseBody, WebResponse};
///
/// let mut resp = WebResponse::new(ResponseBody::empty());
/// Json(vec!["a", "b"]).respond_to(&mut resp);
/// assert_eq!(resp.body().as_bytes().unwrap().as_ref(), br#"["a","b"]"#);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

/// Implementation for Result allows handlers to write Result types directly.
/// The Ok and Err variants must both implement Responder.
impl<T: Responder, E: Responder> Responder for Result<T, E> {
    fn respond_to(self, resp: &mut WebResponse) {
        match self {
            Ok(t) => t.respond_to(resp),
            Err(e) => e.respond_to(resp),
        }
    }
}

/// None leaves the response untouched.
impl<T: Responder> Responder for Option<T> {
    fn respond_to(self, resp: &mut WebResponse) {
        if let Some(t) = self {
            t.respond_to(resp);
        }
    }
}

/// Implementation for Response replaces the whole response being built.
impl<B> Responder for Response<B>
where
    B: Into<ResponseBody>,
{
    fn respond_to(self, resp: &mut WebResponse) {
        *resp = self.map(Into::into);
    }
}

/// Implementation for (StatusCode, T) tuple allows setting a status code
/// along with the response content.
impl<T: Responder> Responder for (StatusCode, T) {
    fn respond_to(self, resp: &mut WebResponse) {
        let (status, responder) = self;
        responder.respond_to(resp);
        *resp.status_mut() = status;
    }
}

/// Implementation for (T, StatusCode) tuple - same as above but with reversed order.
impl<T: Responder> Responder for (T, StatusCode) {
    fn respond_to(self, resp: &mut WebResponse) {
        let (responder, status) = self;
        (status, responder).respond_to(resp);
    }
}

impl<T: Responder> Responder for Box<T> {
    fn respond_to(self, resp: &mut WebResponse) {
        (*self).respond_to(resp);
    }
}

/// Implementation for unit type () leaves the response untouched.
impl Responder for () {
    fn respond_to(self, _resp: &mut WebResponse) {}
}

impl Responder for &'static str {
    fn respond_to(self, resp: &mut WebResponse) {
        write_text(resp, ResponseBody::from(self));
    }
}

impl Responder for String {
    fn respond_to(self, resp: &mut WebResponse) {
        write_text(resp, ResponseBody::from(self));
    }
}

impl<T: Serialize> Responder for Json<T> {
    fn respond_to(self, resp: &mut WebResponse) {
        match serde_json::to_vec(&self.0) {
            Ok(bytes) => {
                resp.headers_mut().insert(http::header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
                *resp.body_mut() = ResponseBody::from(bytes);
            }
            Err(e) => {
                error!(cause = %e, "serialize json response error");
                *resp.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                *resp.body_mut() = ResponseBody::empty();
            }
        }
    }
}

impl Responder for Infallible {
    fn respond_to(self, _resp: &mut WebResponse) {
        match self {}
    }
}

fn write_text(resp: &mut WebResponse, body: ResponseBody) {
    resp.headers_mut().insert(http::header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    *resp.body_mut() = body;
}

#[cfg(test)]
mod tests {
    use super::{Json, Responder};
    use crate::{ResponseBody, WebResponse};
    use http::{Response, StatusCode};
    use serde::Serialize;

    fn empty() -> WebResponse {
        WebResponse::new(ResponseBody::empty())
    }

    #[test]
    fn test_text() {
        let mut resp = empty();
        "hello".respond_to(&mut resp);

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(resp.body().as_bytes().unwrap().as_ref(), b"hello");
    }

    #[test]
    fn test_status_tuple() {
        let mut resp = empty();
        ("denied".to_string(), StatusCode::UNAUTHORIZED).respond_to(&mut resp);

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.body().len(), 6);
    }

    #[test]
    fn test_json() {
        #[derive(Serialize)]
        struct Pong {
            ok: bool,
        }

        let mut resp = empty();
        Json(Pong { ok: true }).respond_to(&mut resp);

        assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "application/json");
        assert_eq!(resp.body().as_bytes().unwrap().as_ref(), br#"{"ok":true}"#);
    }

    #[test]
    fn test_none_keeps_response() {
        let mut resp = empty();
        "first".respond_to(&mut resp);
        Option::<&'static str>::None.respond_to(&mut resp);

        assert_eq!(resp.body().as_bytes().unwrap().as_ref(), b"first");
    }

    #[test]
    fn test_replace_response() {
        let mut resp = empty();
        "first".respond_to(&mut resp);
        Response::builder().status(StatusCode::ACCEPTED).body("second").unwrap().respond_to(&mut resp);

        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        assert!(resp.headers().get(http::header::CONTENT_TYPE).is_none());
        assert_eq!(resp.body().as_bytes().unwrap().as_ref(), b"second");
    }
}
