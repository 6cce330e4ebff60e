// omnisync/src/omni/client.rs
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::config::SyncConfig;
use crate::errors::{AppError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Thin authenticated wrapper around the Omnidesk REST API.
pub struct OmniClient {
    http: reqwest::Client,
    base_url: Url,
    email: String,
    api_key: String,
}

impl OmniClient {
    pub fn new(config: &SyncConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
            email: config.email.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Builds `{base}/{path}?{query}`.
    pub fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let mut url = self.base_url.join(path)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Issues one GET and decodes the body as JSON.
    ///
    /// Transport failures and non-2xx statuses are `NetworkUnavailable`;
    /// a body that is not JSON is `MalformedResponse`.
    pub async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = self.endpoint(path, query)?;
        tracing::debug!("GET {}", url);

        let response = self
            .http
            .get(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .basic_auth(&self.email, Some(&self.api_key))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::NetworkUnavailable(format!(
                "GET {} returned HTTP {}",
                url.path(),
                status
            )));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| {
            AppError::malformed(format!("body of GET {} is not JSON: {}", url.path(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;
    use wiremock::matchers::{basic_auth, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OmniClient {
        let config = SyncConfig {
            api_base_url: Url::parse(&format!("{}/api/", server.uri())).unwrap(),
            email: "ops@acme.test".to_string(),
            api_key: "k3y".to_string(),
            database_path: PathBuf::from(":memory:"),
        };
        OmniClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_get_json_sends_auth_and_query() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/cases.json"))
            .and(query_param("page", "3"))
            .and(basic_auth("ops@acme.test", "k3y"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let body = client_for(&server)
            .get_json("cases.json", &[("page", "3".to_string())])
            .await?;

        assert_eq!(body, json!({"ok": true}));
        Ok(())
    }

    #[tokio::test]
    async fn test_http_error_status_is_network_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let result = client_for(&server).get_json("cases.json", &[]).await;
        assert!(matches!(result, Err(AppError::NetworkUnavailable(msg)) if msg.contains("503")));
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&server)
            .await;

        let result = client_for(&server).get_json("cases.json", &[]).await;
        assert!(matches!(result, Err(AppError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_unavailable() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        drop(server);

        let result = client.get_json("cases.json", &[]).await;
        assert!(matches!(result, Err(AppError::NetworkUnavailable(_))));
    }

    #[test]
    fn test_endpoint_encodes_query() -> anyhow::Result<()> {
        let config = SyncConfig {
            api_base_url: Url::parse("https://acme.omnidesk.ru/api/")?,
            email: "a@b.c".to_string(),
            api_key: "k".to_string(),
            database_path: PathBuf::from("db.sqlite"),
        };
        let client = OmniClient::new(&config)?;
        let url = client.endpoint(
            "cases.json",
            &[("page", "0".to_string()), ("from_time", "2021-12-01".to_string())],
        )?;

        assert_eq!(
            url.as_str(),
            "https://acme.omnidesk.ru/api/cases.json?page=0&from_time=2021-12-01"
        );
        Ok(())
    }
}
