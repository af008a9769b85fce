use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::trace;

use super::client::{ApiRequest, HttpClient, SimpleHttpResponse};
use crate::session::SessionReader;

pub const AUTHORIZATION: &str = "Authorization";

/// Attaches the current bearer token to outgoing requests
#[derive(Clone)]
pub struct RequestAugmenter {
    session: SessionReader,
}

impl RequestAugmenter {
    pub fn new(session: SessionReader) -> Self {
        Self { session }
    }

    /// Derived copy of `request`, carrying `Authorization: Bearer <token>`
    /// when a token is held. The token is read once, without waiting.
    pub fn augment(&self, request: &ApiRequest) -> ApiRequest {
        let mut derived = request.clone();
        match self.session.token() {
            Some(token) => {
                derived.set_header(AUTHORIZATION, format!("Bearer {}", token));
                trace!(url = %request.url, "Bearer token attached");
            }
            None => trace!(url = %request.url, "No token, request sent anonymously"),
        }
        derived
    }
}

/// An [`HttpClient`] that runs every request through a [`RequestAugmenter`]
pub struct AuthorizedClient {
    inner: Arc<dyn HttpClient>,
    augmenter: RequestAugmenter,
}

impl AuthorizedClient {
    pub fn new(inner: Arc<dyn HttpClient>, augmenter: RequestAugmenter) -> Self {
        Self { inner, augmenter }
    }
}

#[async_trait]
impl HttpClient for AuthorizedClient {
    async fn execute(&self, request: ApiRequest) -> Result<SimpleHttpResponse> {
        let request = self.augmenter.augment(&request);
        self.inner.execute(request).await
    }
}
