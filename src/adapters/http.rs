use crate::domain::ports::{Page, PageFetcher};
use crate::utils::error::{MapperError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// reqwest-backed fetcher. Each call carries its own timeout; non-success statuses are failures.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Page> {
        tracing::debug!("GET {} (timeout {:?})", url, timeout);

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| MapperError::fetch_failed(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MapperError::fetch_failed(url, format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| MapperError::fetch_failed(url, e.to_string()))?;

        Ok(Page {
            url: url.to_string(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/index.do");
            then.status(200)
                .header("Content-Type", "text/html; charset=utf-8")
                .body("<html><body>학사공지</body></html>");
        });

        let fetcher = HttpFetcher::new("dept-mapper-test").unwrap();
        let page = fetcher
            .fetch(&server.url("/index.do"), Duration::from_secs(5))
            .await
            .unwrap();

        mock.assert();
        assert!(page.body.contains("학사공지"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_fetch_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404);
        });

        let fetcher = HttpFetcher::new("dept-mapper-test").unwrap();
        let result = fetcher
            .fetch(&server.url("/missing"), Duration::from_secs(5))
            .await;

        assert!(matches!(result, Err(MapperError::FetchFailed { .. })));
    }

    #[tokio::test]
    async fn test_timeout_is_fetch_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/slow");
            then.status(200)
                .delay(Duration::from_millis(1500))
                .body("<html></html>");
        });

        let fetcher = HttpFetcher::new("dept-mapper-test").unwrap();
        let result = fetcher
            .fetch(&server.url("/slow"), Duration::from_millis(200))
            .await;

        assert!(matches!(result, Err(MapperError::FetchFailed { .. })));
    }
}
