//! Shared helpers for the layer tests.

use std::convert::Infallible;

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use depot_core::UserId;
use http::{Request, StatusCode};
use serde_json::Value;
use tower::Service;

use crate::user::AuthenticatedUser;

/// An inner service that always answers 200.
pub fn ok_service()
-> impl Service<Request<Body>, Response = Response, Error = Infallible, Future: Send> + Clone + Send + 'static
{
    tower::service_fn(|_req: Request<Body>| async {
        Ok::<_, Infallible>(StatusCode::OK.into_response())
    })
}

/// A request carrying an authenticated identity.
pub fn request_as(user_id: i64, role: &str) -> Request<Body> {
    let mut req = Request::builder().body(Body::empty()).unwrap();
    req.extensions_mut()
        .insert(AuthenticatedUser::new(UserId::new(user_id), role));
    req
}

/// Reads a response body as JSON.
pub async fn body_json(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
