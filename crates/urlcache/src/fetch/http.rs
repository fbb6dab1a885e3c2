use super::{Fetcher, Request, Response, open_file};
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use std::time::Duration;

const DEFAULT_USER_AGENT: &str = concat!("fontlib/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Fetches `http:`, `https:` and `file:` URLs.
///
/// One attempt per request: no retries and no back-off. Redirects are
/// followed and error statuses are reported as
/// [`Transport`](ErrorKind::Transport) errors.
#[derive(Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder().timeout_global(Some(timeout)).build();
        Self { agent: config.into() }
    }

    fn open_remote(agent: &ureq::Agent, request: &Request) -> Result<Response> {
        let user_agent = request.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
        tracing::debug!(url = %request.url, user_agent, "GET");
        let response = agent
            .get(&request.url)
            .header("User-Agent", user_agent)
            .call()
            .or_raise(|| ErrorKind::Transport(request.url.clone()))?;
        let header = |name: &str| response.headers().get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
        let length = header("content-length").and_then(|v| v.parse().ok());
        let reader = response.into_body().into_reader();
        Ok(Response { reader: Box::new(reader), length })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn open(&self, request: &Request) -> Result<Response> {
        let scheme = match url::Url::parse(&request.url) {
            Ok(url) => url.scheme().to_string(),
            Err(_) => exn::bail!(ErrorKind::InvalidUrl(request.url.clone())),
        };
        match scheme.as_str() {
            "file" => open_file(&request.url),
            "http" | "https" => {
                let agent = self.agent.clone();
                let request = request.clone();
                tokio::task::spawn_blocking(move || Self::open_remote(&agent, &request))
                    .await
                    .or_raise(|| ErrorKind::Task)?
            },
            _ => exn::bail!(ErrorKind::UnsupportedScheme(scheme)),
        }
    }
}
