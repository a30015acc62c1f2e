//! `x-request-id` generation and propagation.

use std::task::{Context, Poll};

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request, Response},
};
use tower::{Layer, Service};
use uuid::Uuid;

/// Header carrying the request id.
pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Layer that tags every request and response with a request id.
#[derive(Clone, Default)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdMiddleware { inner }
    }
}

/// Keeps an incoming id, or assigns a time-ordered UUIDv7.
#[derive(Clone)]
pub struct RequestIdMiddleware<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for RequestIdMiddleware<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let value = request
            .headers()
            .get(&REQUEST_ID_HEADER)
            .filter(|v| !v.is_empty())
            .cloned()
            .or_else(|| HeaderValue::from_str(&Uuid::now_v7().to_string()).ok());

        if let Some(value) = &value {
            request
                .headers_mut()
                .insert(REQUEST_ID_HEADER.clone(), value.clone());
        }

        let mut inner = self.inner.clone();
        Box::pin(async move {
            let mut response = inner.call(request).await?;
            if let Some(value) = value {
                response.headers_mut().insert(REQUEST_ID_HEADER.clone(), value);
            }
            Ok(response)
        })
    }
}
