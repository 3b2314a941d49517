use crate::config::EditConfig;
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;

/// Raw HTTP response: status code and body bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }
}

/// Request/response exchange with the edit service
pub trait HttpTransport {
    /// POST a JSON body with a bearer token.
    ///
    /// Any HTTP status is a successful exchange; `Err` means the request
    /// never produced a response (connect failure, timeout, ...).
    fn post_json(&self, url: &str, bearer: &str, body: &[u8]) -> Result<HttpResponse>;
}

/// Blocking reqwest client
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &EditConfig) -> Result<Self> {
        // The blocking client has one total timeout covering the read and write phases
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout + config.write_timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn post_json(&self, url: &str, bearer: &str, body: &[u8]) -> Result<HttpResponse> {
        let response = self
            .client
            .post(url)
            .bearer_auth(bearer)
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .body(body.to_vec())
            .send()
            .with_context(|| format!("Failed to send request to {}", url))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .context("Failed to read response body")?
            .to_vec();
        Ok(HttpResponse { status, body })
    }
}
