//! Request-scoped exchange.
//!
//! # Responsibilities
//! - Carry the request, its body and the response slot through the chain
//! - Hold the resolved request URL and matched route id
//! - Own the per-request "already routed" flag
//! - Expose the request's cancellation token
//!
//! # Design Decisions
//! - All per-request state lives here, never on routes or filters
//! - Body and response sit behind a mutex so `&Exchange` is `Sync`
//!   and predicates can be evaluated from `Send` futures

use std::sync::Mutex;

use axum::body::Body;
use axum::http::{request::Parts, HeaderMap, Method, Request, Response, Uri};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Scheme handled in-process by the local-dispatch filter.
pub const FORWARD_SCHEME: &str = "forward";

/// Header carrying the request id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Per-request context shared by predicates and filters.
#[derive(Debug)]
pub struct Exchange {
    request: Parts,
    body: Mutex<Option<Body>>,
    response: Mutex<Option<Response<Body>>>,
    request_id: String,
    route_id: Option<String>,
    request_url: Option<Url>,
    already_routed: bool,
    cancellation: CancellationToken,
}

impl Exchange {
    pub fn new(request: Request<Body>) -> Self {
        let (parts, body) = request.into_parts();
        let request_id = parts
            .headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Self {
            request: parts,
            body: Mutex::new(Some(body)),
            response: Mutex::new(None),
            request_id,
            route_id: None,
            request_url: None,
            already_routed: false,
            cancellation: CancellationToken::new(),
        }
    }

    /// Build an exchange whose cancellation follows `token`.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn request(&self) -> &Parts {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Parts {
        &mut self.request
    }

    pub fn method(&self) -> &Method {
        &self.request.method
    }

    pub fn uri(&self) -> &Uri {
        &self.request.uri
    }

    pub fn path(&self) -> &str {
        self.request.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.request.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.request.headers
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn route_id(&self) -> Option<&str> {
        self.route_id.as_deref()
    }

    pub fn set_route_id(&mut self, id: impl Into<String>) {
        self.route_id = Some(id.into());
    }

    pub fn request_url(&self) -> Option<&Url> {
        self.request_url.as_ref()
    }

    pub fn set_request_url(&mut self, url: Url) {
        self.request_url = Some(url);
    }

    pub fn is_already_routed(&self) -> bool {
        self.already_routed
    }

    /// Mark the request routed. Returns false if it was already marked.
    pub fn mark_routed(&mut self) -> bool {
        !std::mem::replace(&mut self.already_routed, true)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Take the request body. Subsequent calls return an empty body.
    pub fn take_body(&self) -> Body {
        self.body
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
            .unwrap_or_else(Body::empty)
    }

    /// Rebuild a request from the current parts, consuming the body.
    pub fn take_request(&self) -> Request<Body> {
        Request::from_parts(self.request.clone(), self.take_body())
    }

    pub fn set_response(&self, response: Response<Body>) {
        if let Ok(mut slot) = self.response.lock() {
            *slot = Some(response);
        }
    }

    pub fn take_response(&self) -> Option<Response<Body>> {
        self.response.lock().ok().and_then(|mut slot| slot.take())
    }

    pub fn has_response(&self) -> bool {
        self.response
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange(uri: &str) -> Exchange {
        Exchange::new(Request::builder().uri(uri).body(Body::empty()).unwrap())
    }

    #[test]
    fn test_mark_routed_once() {
        let mut ex = exchange("/a");
        assert!(!ex.is_already_routed());
        assert!(ex.mark_routed());
        assert!(!ex.mark_routed());
        assert!(ex.is_already_routed());
    }

    #[test]
    fn test_request_id_from_header() {
        let req = Request::builder()
            .uri("/a")
            .header(X_REQUEST_ID, "abc")
            .body(Body::empty())
            .unwrap();
        assert_eq!(Exchange::new(req).request_id(), "abc");
        assert!(!exchange("/a").request_id().is_empty());
    }

    #[test]
    fn test_body_taken_once() {
        let ex = Exchange::new(Request::builder().uri("/").body(Body::from("x")).unwrap());
        let _ = ex.take_body();
        assert!(ex.body.lock().unwrap().is_none());
    }

    #[test]
    fn test_cancellation_follows_token() {
        let token = CancellationToken::new();
        let ex = exchange("/").with_cancellation(token.clone());
        assert!(!ex.is_cancelled());
        token.cancel();
        assert!(ex.is_cancelled());
    }
}
