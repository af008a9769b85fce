pub mod augmenter;
pub mod client;

pub use augmenter::{AuthorizedClient, RequestAugmenter, AUTHORIZATION};
pub use client::{ApiRequest, HttpClient, HttpMethod, ReqwestHttpClient, SimpleHttpResponse};

#[cfg(test)]
pub use client::mock;
