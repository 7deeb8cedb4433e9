use async_trait::async_trait;
use reqwest::Client;
use sc_core::{ClientConfig, Error, Method, RequestOptions, Result, Transport};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// reqwest-backed [`Transport`] rooted at the API base URL.
#[derive(Clone)]
pub struct HttpClient {
    client: Arc<Client>,
    base_url: Url,
}

impl HttpClient {
    pub fn new(base_url: Url, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
            base_url: with_trailing_slash(base_url),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(config.base_url.clone(), config.timeout)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("client", &"<reqwest::Client>")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn request(&self, method: Method, path: &str, options: RequestOptions) -> Result<Value> {
        let url = self.endpoint(path)?;
        debug!("{} {}", method, url.path());

        let mut request = self.client.request(method.clone(), url);
        if !options.params.is_empty() {
            request = request.query(&options.params);
        }
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &options.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = error_message(&body);
            debug!("{} {} failed with {}", method, path, status.as_u16());
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        match serde_json::from_slice(&body) {
            Ok(payload) => Ok(payload),
            Err(_) => {
                // Some routes answer a bare acknowledgement instead of JSON.
                debug!("{} {} returned a non-JSON body", method, path);
                Ok(Value::String(String::from_utf8_lossy(&body).trim().to_string()))
            }
        }
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Pulls the server's message out of an error body: the `error` or `message`
/// field of a JSON object, a bare JSON string, or non-empty plain text.
fn error_message(body: &[u8]) -> Option<String> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => ["error", "message"]
            .iter()
            .find_map(|key| fields.get(*key).and_then(Value::as_str))
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .map(str::to_string),
        Ok(Value::String(message)) => Some(message.trim().to_string()).filter(|m| !m.is_empty()),
        Ok(_) => None,
        Err(_) => {
            let text = String::from_utf8_lossy(body);
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
    }
}
