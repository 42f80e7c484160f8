use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use url::Url;

use crate::settings::FocusConfig;

const DNS_JSON: &str = "application/dns-json";

/// Answers a family-safe resolver returns for blocked names.
const SINKHOLE_ADDRESSES: [&str; 2] = ["0.0.0.0", "::"];

/// JSON body of a DNS-over-HTTPS answer.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct DohResponse {
    #[serde(rename = "Status", default)]
    pub status: Option<u32>,
    #[serde(rename = "Answer", default)]
    pub answer: Vec<DohAnswer>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct DohAnswer {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub record_type: Option<u16>,
    #[serde(default)]
    pub data: String,
}

impl DohResponse {
    /// True if any answer points at a sinkhole address.
    pub fn is_sinkholed(&self) -> bool {
        self.answer
            .iter()
            .any(|record| SINKHOLE_ADDRESSES.contains(&record.data.trim()))
    }
}

/// A-record lookup against a safety resolver.
#[async_trait]
pub trait DohLookup: Send + Sync {
    async fn resolve_a(&self, hostname: &str) -> Result<DohResponse>;
}

/// `reqwest`-backed DNS-over-HTTPS client speaking the JSON API.
#[derive(Debug, Clone)]
pub struct DohClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl DohClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint =
            Url::parse(endpoint).with_context(|| format!("invalid resolver endpoint '{endpoint}'"))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build resolver HTTP client")?;
        Ok(Self { http, endpoint })
    }

    /// Uses a caller-built HTTP client, e.g. one with custom proxy settings.
    pub fn with_client(http: reqwest::Client, endpoint: Url) -> Self {
        Self { http, endpoint }
    }

    pub fn from_config(config: &FocusConfig) -> Result<Self> {
        Self::new(&config.resolver_url, config.lookup_timeout())
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl DohLookup for DohClient {
    async fn resolve_a(&self, hostname: &str) -> Result<DohResponse> {
        let response = self
            .http
            .get(self.endpoint.clone())
            .query(&[("name", hostname), ("type", "A")])
            .header(ACCEPT, DNS_JSON)
            .send()
            .await
            .with_context(|| format!("resolver request for {hostname} failed"))?;

        let status = response.status();
        if !status.is_success() {
            bail!("resolver returned {status} for {hostname}");
        }

        response
            .json::<DohResponse>()
            .await
            .with_context(|| format!("resolver sent an unreadable answer for {hostname}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn sinkhole_answers_are_detected() {
        let blocked: DohResponse =
            serde_json::from_str(r#"{"Answer":[{"data":"0.0.0.0"}]}"#).unwrap();
        assert!(blocked.is_sinkholed());

        let blocked_v6: DohResponse =
            serde_json::from_str(r#"{"Status":0,"Answer":[{"name":"x.","type":28,"data":"::"}]}"#)
                .unwrap();
        assert!(blocked_v6.is_sinkholed());

        let allowed: DohResponse =
            serde_json::from_str(r#"{"Answer":[{"data":"93.184.216.34"}]}"#).unwrap();
        assert!(!allowed.is_sinkholed());
    }

    #[test]
    fn response_without_answers_is_not_sinkholed() {
        let nxdomain: DohResponse = serde_json::from_str(r#"{"Status":3}"#).unwrap();
        assert_eq!(nxdomain.status, Some(3));
        assert!(!nxdomain.is_sinkholed());
    }

    /// Serves exactly one HTTP response and returns the raw request it saw.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let read = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..read]).to_string();
            let reply = format!(
                "{status_line}\r\nContent-Type: application/dns-json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            request
        });
        (format!("http://{addr}/dns-query"), handle)
    }

    fn local_client(endpoint: &str) -> DohClient {
        let http = reqwest::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        DohClient::with_client(http, Url::parse(endpoint).unwrap())
    }

    #[tokio::test]
    async fn client_sends_dns_json_query() {
        let (endpoint, server) =
            serve_once("HTTP/1.1 200 OK", r#"{"Status":0,"Answer":[{"data":"0.0.0.0"}]}"#).await;
        let client = local_client(&endpoint);

        let response = client.resolve_a("blocked.example").await.unwrap();
        assert!(response.is_sinkholed());

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /dns-query?name=blocked.example&type=a "));
        assert!(request.contains("accept: application/dns-json"));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let (endpoint, server) = serve_once("HTTP/1.1 503 Service Unavailable", "").await;
        let client = local_client(&endpoint);

        assert!(client.resolve_a("example.com").await.is_err());
        server.await.unwrap();
    }
}
