//! Inbound API key gate

use axum::{
    body::Body,
    http::{header::AUTHORIZATION, Request},
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use std::{
    collections::HashSet,
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::warn;

use crate::error::AppError;

/// Authentication layer
#[derive(Clone)]
pub struct AuthLayer {
    api_keys: Arc<HashSet<String>>,
}

impl AuthLayer {
    pub fn new(api_keys: Vec<String>) -> Self {
        Self {
            api_keys: Arc::new(
                api_keys
                    .into_iter()
                    .map(|key| key.trim().to_string())
                    .filter(|key| !key.is_empty())
                    .collect(),
            ),
        }
    }

    pub fn is_open(&self) -> bool {
        self.api_keys.is_empty()
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            api_keys: self.api_keys.clone(),
        }
    }
}

/// Authentication middleware service
#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    api_keys: Arc<HashSet<String>>,
}

/// Key from `Authorization: Bearer <key>` or a bare `Authorization: <key>`
fn presented_key(request: &Request<Body>) -> Option<String> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;

    let key = header.strip_prefix("Bearer ").unwrap_or(header).trim();
    (!key.is_empty()).then(|| key.to_string())
}

impl<S> Service<Request<Body>> for AuthMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        if self.api_keys.is_empty() || request.uri().path() == "/health" {
            let future = self.inner.call(request);
            return Box::pin(future);
        }

        match presented_key(&request) {
            Some(key) if self.api_keys.contains(&key) => Box::pin(self.inner.call(request)),
            Some(_) => {
                warn!(path = %request.uri().path(), "Invalid API key provided");
                Box::pin(async move {
                    Ok(AppError::AuthenticationFailed("Invalid API key".to_string()).into_response())
                })
            }
            None => {
                warn!(path = %request.uri().path(), "No API key provided");
                Box::pin(async move {
                    Ok(AppError::AuthenticationFailed(
                        "API key required. Provide via Authorization header: 'Bearer YOUR_API_KEY'"
                            .to_string(),
                    )
                    .into_response())
                })
            }
        }
    }
}
