use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::{fs, thread, time::Duration};
use tracing::{debug, info, warn};

use crate::{
    config::ScrapingConfig,
    error::{Result, ScrapeError},
    types::{RawDocument, Source},
};

const STATUS_FORBIDDEN: u16 = 403;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// A single HTTP GET, without any retry policy.
pub trait Transport {
    fn get(&self, url: &str) -> Result<HttpResponse>;
}

/// Blocking reqwest client that sends browser-like headers.
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(config: &ScrapingConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (key, value) in &config.extra_headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| ScrapeError::Parse(format!("invalid header name '{}': {}", key, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ScrapeError::Parse(format!("invalid header value '{}': {}", value, e)))?;
            headers.insert(name, value);
        }

        let client = reqwest::blocking::Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        let response = self.client.get(url).send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        Ok(HttpResponse { status, body })
    }
}

type Sleeper = Box<dyn Fn(Duration)>;

/// Retrieves raw HTML from a remote URL or a local file.
///
/// Remote fetches are retried up to `max_attempts` times. A 403 or a
/// transport error waits `backoff_step * attempt` before the next try; any
/// other non-success status fails immediately.
pub struct Fetcher<T: Transport = ReqwestTransport> {
    transport: T,
    max_attempts: u32,
    backoff_step: Duration,
    sleeper: Sleeper,
}

impl Fetcher<ReqwestTransport> {
    pub fn from_config(config: &ScrapingConfig) -> Result<Self> {
        Ok(Self::new(ReqwestTransport::new(config)?, config))
    }
}

impl<T: Transport> Fetcher<T> {
    pub fn new(transport: T, config: &ScrapingConfig) -> Self {
        Self {
            transport,
            max_attempts: config.max_attempts.max(1),
            backoff_step: config.backoff_step(),
            sleeper: Box::new(thread::sleep),
        }
    }

    /// Replaces the function used to wait between attempts.
    pub fn with_sleeper<F>(mut self, sleeper: F) -> Self
    where
        F: Fn(Duration) + 'static,
    {
        self.sleeper = Box::new(sleeper);
        self
    }

    /// Waits between successive page fetches, using the same sleeper as the backoff.
    pub fn pause(&self, duration: Duration) {
        (self.sleeper)(duration);
    }

    pub fn fetch(&self, source: &Source) -> Result<RawDocument> {
        let html = match source {
            Source::LocalFile(path) => {
                debug!("Reading HTML from {:?}", path);
                fs::read_to_string(path).map_err(|e| ScrapeError::fetch(source.to_string(), e))?
            }
            Source::Remote(url) => self.fetch_remote(url)?,
        };

        info!("Fetched {} ({} bytes)", source, html.len());
        Ok(RawDocument {
            source: source.clone(),
            html,
        })
    }

    fn fetch_remote(&self, url: &str) -> Result<String> {
        let mut last_failure = String::from("no attempts made");

        for attempt in 1..=self.max_attempts {
            match self.transport.get(url) {
                Ok(response) if (200..300).contains(&response.status) => return Ok(response.body),
                Ok(response) if response.status == STATUS_FORBIDDEN => {
                    last_failure = format!("HTTP {}", response.status);
                }
                Ok(response) => {
                    return Err(ScrapeError::fetch(url, format!("HTTP {}", response.status)));
                }
                Err(e) => {
                    last_failure = e.to_string();
                }
            }

            if attempt < self.max_attempts {
                let delay = self.backoff_step.checked_mul(attempt).unwrap_or(Duration::MAX);
                warn!(
                    "Attempt {}/{} for {} failed ({}), waiting {:?} before retrying",
                    attempt, self.max_attempts, url, last_failure, delay
                );
                (self.sleeper)(delay);
            }
        }

        Err(ScrapeError::fetch(
            url,
            format!("max retries exceeded: {}", last_failure),
        ))
    }
}
