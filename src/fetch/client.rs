//! Production origin fetcher backed by reqwest
//!
//! No proxy-level timeout is imposed; a fetch fails however the underlying
//! transport decides.

use async_trait::async_trait;
use http::{StatusCode, Uri};

use super::{Fetch, FetchError, WorkerRequest, WorkerResponse};

/// HTTP client implementation of `Fetch`.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, request: &WorkerRequest) -> Result<WorkerResponse, FetchError> {
        // reqwest carries its own http-version types; convert by value.
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| FetchError::InvalidRequest(e.to_string()))?;

        let mut builder = self.client.request(method, request.url.to_string());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.to_vec());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = StatusCode::from_u16(response.status().as_u16())
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(WorkerResponse {
            status,
            headers,
            body,
        })
    }

    async fn probe(&self, url: &Uri) -> bool {
        match self.client.head(url.to_string()).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_fetcher_satisfies_fetch_bounds() {
        fn assert_fetch<T: Fetch>() {}
        assert_fetch::<HttpFetcher>();
    }
}
